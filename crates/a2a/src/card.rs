//! Agent card discovery.

use crate::normalize_url;
use hostagent_core::error::TransportError;
use hostagent_core::registry::AgentCard;
use tracing::{debug, error};

/// GET and parse the agent card published at `url`.
pub async fn fetch_agent_card(
    client: &reqwest::Client,
    url: &str,
) -> Result<AgentCard, TransportError> {
    if url.trim().is_empty() {
        return Err(TransportError::InvalidUrl("agent card URL is empty".into()));
    }
    let url = normalize_url(url);

    debug!(url = %url, "Fetching agent card");

    let response = client
        .get(&url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| TransportError::Network(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| TransportError::Network(format!("Failed to read response body: {e}")))?;

    if !status.is_success() {
        error!(url = %url, status = status.as_u16(), "Agent card request failed");
        return Err(TransportError::Status {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        error!(url = %url, error = %e, "Agent card is not valid");
        TransportError::Decode(e.to_string())
    })
}
