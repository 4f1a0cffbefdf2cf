//! `hostagent agents`: List the capability registry.

use hostagent_core::registry::CapabilityRegistryEntry;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    println!("🤝 Remote Agents");
    println!("================");
    println!();

    if config.agents.is_empty() {
        println!("  No agents configured. Add [[agents]] entries to your config,");
        println!("  using `hostagent discover <url>` to fetch each agent card.");
        return Ok(());
    }

    for entry in &config.agents {
        print!("{}", describe(entry));
    }

    Ok(())
}

/// One registry entry with its skills, as printed by `agents`.
fn describe(entry: &CapabilityRegistryEntry) -> String {
    let status = if entry.enabled { "enabled" } else { "disabled" };
    let mut out = format!("  [{}] {} ({status})\n", entry.id, entry.name);

    match entry.card() {
        Ok(card) => {
            out.push_str(&format!("      url: {}\n", entry.endpoint(&card)));
            if card.skills.is_empty() {
                out.push_str("      (no skills)\n");
            }
            for skill in &card.skills {
                out.push_str(&format!("      - {}: {}\n", skill.name, skill.description));
            }
        }
        Err(e) => out.push_str(&format!("      ⚠️  {e}\n")),
    }

    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn entry(card: Option<&str>) -> CapabilityRegistryEntry {
        CapabilityRegistryEntry {
            id: 7,
            name: "weather_agent".into(),
            agent_card_url: "http://localhost:10000/.well-known/agent.json".into(),
            agent_card_json: card.map(String::from),
            enabled: true,
            custom_headers: HashMap::new(),
            data_part_template: None,
        }
    }

    #[test]
    fn lists_skills_from_cached_card() {
        let text = describe(&entry(Some(
            r#"{"name":"Weather","url":"http://localhost:10000","skills":[{"id":"w","name":"forecast","description":"Daily forecast"}]}"#,
        )));
        assert!(text.contains("[7] weather_agent (enabled)"));
        assert!(text.contains("url: http://localhost:10000"));
        assert!(text.contains("- forecast: Daily forecast"));
    }

    #[test]
    fn broken_card_is_reported_inline() {
        let text = describe(&entry(Some("{nope")));
        assert!(text.contains("⚠️"));
    }
}
