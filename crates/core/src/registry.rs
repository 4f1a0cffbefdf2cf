//! Capability registry - the enabled remote agents and their skills.
//!
//! Entries come from an external settings store. Each carries a cached
//! agent card (a JSON descriptor fetched once at discovery time); the skill
//! list is read from that descriptor, never from the network during a run.

use crate::error::AgentError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named capability advertised by a remote agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// The descriptor a remote agent publishes about itself.
///
/// Unknown fields in the card are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
}

impl AgentCard {
    /// Find a skill by its exact name.
    pub fn skill(&self, name: &str) -> Option<&AgentSkill> {
        self.skills.iter().find(|s| s.name == name)
    }
}

/// One configured remote agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityRegistryEntry {
    pub id: i64,

    /// Registry name; this is what the model addresses as `agent_name`
    pub name: String,

    /// Where the agent card was discovered
    #[serde(default)]
    pub agent_card_url: String,

    /// Cached agent card JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_card_json: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Extra HTTP headers sent with every call to this agent
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_headers: HashMap<String, String>,

    /// When set, calls carry a data part built from this template, with
    /// `{{USER_PROMPT}}` replaced by the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_part_template: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl CapabilityRegistryEntry {
    /// Parse the cached agent card.
    pub fn card(&self) -> Result<AgentCard, AgentError> {
        let raw = self.agent_card_json.as_deref().unwrap_or("{}");
        serde_json::from_str(raw).map_err(|e| {
            AgentError::Registry(format!("agent card for '{}' is not valid: {e}", self.name))
        })
    }

    /// The endpoint calls go to: the card's URL, falling back to the
    /// discovery URL when the card has none.
    pub fn endpoint(&self, card: &AgentCard) -> String {
        if card.url.is_empty() {
            self.agent_card_url.clone()
        } else {
            card.url.clone()
        }
    }
}

/// Source of the enabled remote agents for one run.
#[async_trait]
pub trait RegistryProvider: Send + Sync {
    async fn enabled_agents(&self) -> Result<Vec<CapabilityRegistryEntry>, AgentError>;
}

/// A fixed, in-memory registry.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    entries: Vec<CapabilityRegistryEntry>,
}

impl StaticRegistry {
    pub fn new(entries: Vec<CapabilityRegistryEntry>) -> Self {
        Self { entries }
    }

    /// Number of entries, enabled or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RegistryProvider for StaticRegistry {
    async fn enabled_agents(&self) -> Result<Vec<CapabilityRegistryEntry>, AgentError> {
        Ok(self.entries.iter().filter(|e| e.enabled).cloned().collect())
    }
}
