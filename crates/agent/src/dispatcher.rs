//! Capability dispatch: resolve (agent, skill) against the registry and make
//! one remote call.

use hostagent_core::error::AgentError;
use hostagent_core::registry::CapabilityRegistryEntry;
use hostagent_core::transport::{RemoteAgentTransport, RemoteCallRequest, RemoteTask};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Routes `send_to_agent` actions to remote agents.
///
/// No retries: a failed call is reported once and the loop decides what
/// happens next.
pub struct CapabilityDispatcher {
    transport: Arc<dyn RemoteAgentTransport>,
}

impl CapabilityDispatcher {
    pub fn new(transport: Arc<dyn RemoteAgentTransport>) -> Self {
        Self { transport }
    }

    /// Invoke `skill_name` on the agent registered as `agent_name`.
    ///
    /// Lookup failures (`CapabilityNotFound`, `SkillNotFound`) happen before
    /// any network traffic.
    pub async fn dispatch(
        &self,
        agent_name: &str,
        skill_name: &str,
        message: &str,
        registry: &[CapabilityRegistryEntry],
    ) -> Result<RemoteTask, AgentError> {
        let entry = registry
            .iter()
            .find(|e| e.name == agent_name)
            .ok_or_else(|| AgentError::CapabilityNotFound {
                agent_name: agent_name.to_string(),
            })?;

        let card = entry.card()?;
        let skill = card
            .skill(skill_name)
            .ok_or_else(|| AgentError::SkillNotFound {
                agent_name: agent_name.to_string(),
                skill_name: skill_name.to_string(),
            })?;

        let request = RemoteCallRequest {
            agent_url: entry.endpoint(&card),
            task_id: format!("task_id:{}", Uuid::new_v4()),
            message_id: format!("msg_id:{}", Uuid::new_v4()),
            skill_id: skill.id.clone(),
            message: message.to_string(),
            agent_id: Some(entry.id),
            headers: entry.custom_headers.clone(),
            data_part_template: entry.data_part_template.clone(),
        };

        info!(
            agent = agent_name,
            skill = skill_name,
            url = %request.agent_url,
            task_id = %request.task_id,
            "Dispatching capability call"
        );

        let response = self.transport.send_message(request).await?;

        if let Some(error) = response.error {
            return Err(AgentError::RemoteCallFailed(error.message));
        }

        let task = response.result.ok_or_else(|| {
            AgentError::RemoteCallFailed("remote agent returned neither result nor error".into())
        })?;
        debug!(agent = agent_name, state = task.state(), "Capability call returned");
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MockTransport, agent_entry};
    use hostagent_core::error::TransportError;
    use hostagent_core::transport::{RemoteError, RemoteResponse};
    use std::collections::HashSet;

    fn registry() -> Vec<CapabilityRegistryEntry> {
        vec![
            agent_entry(1, "weather_agent", &[("w-1", "forecast"), ("w-2", "alerts")]),
            agent_entry(2, "mail_agent", &[("m-1", "send_mail")]),
        ]
    }

    #[tokio::test]
    async fn unknown_agent_never_touches_the_network() {
        let transport = Arc::new(MockTransport::replying("ok"));
        let dispatcher = CapabilityDispatcher::new(transport.clone());

        let err = dispatcher
            .dispatch("ghost_agent", "forecast", "hi", &registry())
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::CapabilityNotFound { agent_name } if agent_name == "ghost_agent"));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn unknown_skill_never_touches_the_network() {
        let transport = Arc::new(MockTransport::replying("ok"));
        let dispatcher = CapabilityDispatcher::new(transport.clone());

        let err = dispatcher
            .dispatch("weather_agent", "send_mail", "hi", &registry())
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::SkillNotFound { .. }));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn builds_request_from_entry_and_skill() {
        let transport = Arc::new(MockTransport::replying("sunny"));
        let dispatcher = CapabilityDispatcher::new(transport.clone());

        let mut entries = registry();
        entries[0]
            .custom_headers
            .insert("Authorization".into(), "Bearer t".into());

        let task = dispatcher
            .dispatch("weather_agent", "alerts", "Paris", &entries)
            .await
            .unwrap();
        assert_eq!(task.first_text(), "sunny");

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.agent_url, "http://weather_agent.local:9000");
        assert_eq!(call.skill_id, "w-2");
        assert_eq!(call.message, "Paris");
        assert_eq!(call.agent_id, Some(1));
        assert_eq!(call.headers.get("Authorization").map(String::as_str), Some("Bearer t"));
        assert!(call.task_id.starts_with("task_id:"));
        assert!(call.message_id.starts_with("msg_id:"));
    }

    #[tokio::test]
    async fn correlation_ids_are_fresh_per_call() {
        let transport = Arc::new(MockTransport::replying("ok"));
        let dispatcher = CapabilityDispatcher::new(transport.clone());
        let entries = registry();

        for _ in 0..5 {
            dispatcher
                .dispatch("mail_agent", "send_mail", "hi", &entries)
                .await
                .unwrap();
        }

        let calls = transport.calls();
        let task_ids: HashSet<_> = calls.iter().map(|c| c.task_id.clone()).collect();
        let message_ids: HashSet<_> = calls.iter().map(|c| c.message_id.clone()).collect();
        assert_eq!(task_ids.len(), 5);
        assert_eq!(message_ids.len(), 5);
    }

    #[tokio::test]
    async fn error_object_becomes_remote_call_failed() {
        let transport = Arc::new(MockTransport::with_response(Ok(RemoteResponse {
            result: None,
            error: Some(RemoteError {
                code: Some(-32603),
                message: "quota exceeded".into(),
            }),
        })));
        let dispatcher = CapabilityDispatcher::new(transport);

        let err = dispatcher
            .dispatch("weather_agent", "forecast", "hi", &registry())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to send task: quota exceeded");
    }

    #[tokio::test]
    async fn transport_failure_is_propagated() {
        let transport = Arc::new(MockTransport::with_response(Err(TransportError::Network(
            "connection refused".into(),
        ))));
        let dispatcher = CapabilityDispatcher::new(transport);

        let err = dispatcher
            .dispatch("weather_agent", "forecast", "hi", &registry())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Transport(_)));
    }
}
