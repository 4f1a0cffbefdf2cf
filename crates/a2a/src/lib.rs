//! A2A protocol plumbing for hostagent.
//!
//! - [`HttpA2aTransport`] sends one `message/send` JSON-RPC call per
//!   capability invocation.
//! - [`fetch_agent_card`] discovers a remote agent's descriptor.

pub mod card;
pub mod client;

pub use card::fetch_agent_card;
pub use client::HttpA2aTransport;

/// Prefix `http://` when the URL carries no scheme.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}
