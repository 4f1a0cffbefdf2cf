//! `hostagent discover`: Fetch a remote agent card.

use hostagent_a2a::fetch_agent_card;

pub async fn run(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();
    let card = fetch_agent_card(&client, url)
        .await
        .map_err(|e| format!("Failed to fetch agent card: {e}"))?;

    eprintln!(
        "  Found {} with {} skill(s). Paste the JSON below into agent_card_json.",
        card.name,
        card.skills.len()
    );
    println!("{}", serde_json::to_string(&card)?);

    Ok(())
}
