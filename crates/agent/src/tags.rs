//! Tag extraction from free-form model output.
//!
//! Regex based, not an XML parser: for each tag the first non-greedy match
//! wins, contents may span lines and are trimmed, and malformed nesting is
//! tolerated.

use hostagent_core::error::AgentError;
use regex_lite::Regex;

/// One `send_to_agent(...)` call decoded from an `<action>` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCall {
    pub agent_name: String,
    pub skill_name: String,
    pub message: String,
}

/// Everything extracted from one model completion.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub thought: Option<String>,
    pub final_answer: Option<String>,
    /// `Ok(None)` when there is no `<action>` tag at all.
    pub action: Result<Option<ActionCall>, AgentError>,
}

/// Stateless extractor for `<thought>`, `<action>`, `<observation>` and
/// `<final_answer>` blocks.
pub struct TagExtractor;

impl TagExtractor {
    /// Parse a full completion.
    pub fn parse(text: &str) -> ParsedResponse {
        ParsedResponse {
            thought: Self::thought(text),
            final_answer: Self::final_answer(text),
            action: Self::action(text),
        }
    }

    pub fn thought(text: &str) -> Option<String> {
        non_empty(first_tag(text, "thought"))
    }

    pub fn final_answer(text: &str) -> Option<String> {
        non_empty(first_tag(text, "final_answer"))
    }

    pub fn observation(text: &str) -> Option<String> {
        non_empty(first_tag(text, "observation"))
    }

    /// Decode the `<action>` block.
    ///
    /// No tag is `Ok(None)`. A tag without a `send_to_agent(...)` call, or a
    /// call missing any of its three arguments, is a parse failure.
    pub fn action(text: &str) -> Result<Option<ActionCall>, AgentError> {
        let Some(content) = first_tag(text, "action") else {
            return Ok(None);
        };
        parse_call(&content).map(Some)
    }
}

/// First `<tag>...</tag>` body, trimmed.
fn first_tag(text: &str, tag: &str) -> Option<String> {
    let re = Regex::new(&format!(r"(?s)<{tag}>(.*?)</{tag}>")).ok()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_call(content: &str) -> Result<ActionCall, AgentError> {
    let wrapper = Regex::new(r"(?s)send_to_agent\s*\(\s*(.*?)\s*\)")
        .map_err(|e| AgentError::ParseFailure(e.to_string()))?;

    let args = wrapper
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| {
            AgentError::ParseFailure(format!(
                "<action> does not contain a send_to_agent(...) call: {content}"
            ))
        })?;

    let agent_name = named_arg(args, "agent_name")?;
    let skill_name = named_arg(args, "skill_name")?;
    let message = named_arg(args, "message")?.replace("\\n", "\n");

    Ok(ActionCall {
        agent_name,
        skill_name,
        message,
    })
}

fn named_arg(args: &str, name: &str) -> Result<String, AgentError> {
    let re = Regex::new(&format!(r#"{name}\s*=\s*"([^"]+)""#))
        .map_err(|e| AgentError::ParseFailure(e.to_string()))?;
    re.captures(args)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            AgentError::ParseFailure(format!(
                "Missing required parameter '{name}' in send_to_agent action"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_thought_and_final_answer() {
        let parsed = TagExtractor::parse("<thought>t</thought><final_answer>42</final_answer>");
        assert_eq!(parsed.thought.as_deref(), Some("t"));
        assert_eq!(parsed.final_answer.as_deref(), Some("42"));
        assert!(matches!(parsed.action, Ok(None)));
    }

    #[test]
    fn first_match_wins_and_contents_are_trimmed() {
        let text = "<thought>\n  first\n</thought> noise <thought>second</thought>";
        assert_eq!(TagExtractor::thought(text).as_deref(), Some("first"));
    }

    #[test]
    fn contents_span_lines() {
        let text = "<final_answer>line one\nline two</final_answer>";
        assert_eq!(
            TagExtractor::final_answer(text).as_deref(),
            Some("line one\nline two")
        );
    }

    #[test]
    fn empty_tags_count_as_absent() {
        assert!(TagExtractor::final_answer("<final_answer>  </final_answer>").is_none());
        assert!(TagExtractor::thought("no tags here").is_none());
    }

    #[test]
    fn malformed_nesting_is_tolerated() {
        let text = "<thought>outer <final_answer>inner</thought> tail</final_answer>";
        assert_eq!(
            TagExtractor::thought(text).as_deref(),
            Some("outer <final_answer>inner")
        );
        assert_eq!(
            TagExtractor::final_answer(text).as_deref(),
            Some("inner</thought> tail")
        );
    }

    #[test]
    fn observation_tag() {
        let text = "<observation>1. sunny</observation>";
        assert_eq!(TagExtractor::observation(text).as_deref(), Some("1. sunny"));
    }

    #[test]
    fn action_parses_call() {
        let text = r#"<thought>t</thought><action>send_to_agent(agent_name="X", skill_name="Y", message="hi")</action>"#;
        let action = TagExtractor::action(text).unwrap().unwrap();
        assert_eq!(
            action,
            ActionCall {
                agent_name: "X".into(),
                skill_name: "Y".into(),
                message: "hi".into(),
            }
        );
    }

    #[test]
    fn argument_order_does_not_matter() {
        let expected = ActionCall {
            agent_name: "weather_agent".into(),
            skill_name: "forecast".into(),
            message: "Paris tomorrow".into(),
        };
        let orders = [
            r#"agent_name="weather_agent", skill_name="forecast", message="Paris tomorrow""#,
            r#"message="Paris tomorrow", agent_name="weather_agent", skill_name="forecast""#,
            r#"skill_name = "forecast",message="Paris tomorrow",  agent_name ="weather_agent""#,
        ];
        for args in orders {
            let text = format!("<action>send_to_agent( {args} )</action>");
            assert_eq!(TagExtractor::action(&text).unwrap().unwrap(), expected, "{args}");
        }
    }

    #[test]
    fn escaped_newlines_in_message_are_decoded() {
        let text = r#"<action>send_to_agent(agent_name="a", skill_name="s", message="line1\nline2")</action>"#;
        let action = TagExtractor::action(text).unwrap().unwrap();
        assert_eq!(action.message, "line1\nline2");
    }

    #[test]
    fn missing_argument_is_parse_failure() {
        for args in [
            r#"skill_name="s", message="m""#,
            r#"agent_name="a", message="m""#,
            r#"agent_name="a", skill_name="s""#,
            r#"agent_name="", skill_name="s", message="m""#,
        ] {
            let text = format!("<action>send_to_agent({args})</action>");
            assert!(
                matches!(TagExtractor::action(&text), Err(AgentError::ParseFailure(_))),
                "{args}"
            );
        }
    }

    #[test]
    fn missing_wrapper_is_parse_failure() {
        let text = r#"<action>call_agent(agent_name="a", skill_name="s", message="m")</action>"#;
        assert!(matches!(
            TagExtractor::action(text),
            Err(AgentError::ParseFailure(_))
        ));
    }

    #[test]
    fn absent_action_tag_is_not_an_error() {
        assert!(matches!(
            TagExtractor::action("<thought>just thinking</thought>"),
            Ok(None)
        ));
    }
}
