//! Markdown blocks streamed to the user.

use hostagent_core::transport::RemoteTask;
use regex_lite::Regex;
use serde::Serialize;
use serde_json::Value;

/// Heading used by recoverable failures inside the loop.
pub const ERROR_PREFIX: &str = "#### Error: \n";

/// Heading used by the terminal catch-all (bad registry data and the like).
pub const FATAL_ERROR_PREFIX: &str = "##### Error: \n";

/// Pretty-print with 4-space indentation.
pub fn pretty_json<T: Serialize + ?Sized>(value: &T) -> String {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    match value.serialize(&mut ser) {
        Ok(()) => String::from_utf8(out).unwrap_or_default(),
        Err(_) => "Failed to stringify JSON".to_string(),
    }
}

/// `prefix`, a newline, then `value` as a fenced JSON block.
pub fn json_block_with_prefix<T: Serialize + ?Sized>(prefix: &str, value: &T) -> String {
    format!("{prefix}\n```json\n{}\n```", pretty_json(value))
}

/// Lift an embedded `{...}` span out of `text` into a fenced JSON block.
///
/// The span is matched greedily from the first `{` to the last `}`. Text
/// without a span that parses as JSON is returned unchanged.
pub fn extract_json_block(text: &str) -> String {
    let Ok(re) = Regex::new(r"(?s)\{.*\}") else {
        return text.to_string();
    };
    let Some(m) = re.find(text) else {
        return text.to_string();
    };
    let Ok(value) = serde_json::from_str::<Value>(m.as_str()) else {
        return text.to_string();
    };

    let remaining = text.replacen(m.as_str(), "", 1);
    format!(
        "{} \n```json\n{}\n```",
        remaining.trim(),
        pretty_json(&value)
    )
}

pub fn thought_block(thought: &str) -> String {
    format!("#### Thought: \n{thought} \n")
}

pub fn final_answer_block(answer: &str) -> String {
    format!("#### Final Answer: \n{answer} \n")
}

/// Human-readable summary of one capability call.
pub fn invocation_block(agent_name: &str, skill_name: &str, task: &RemoteTask) -> String {
    let state = task.state();
    let marker = if state == "failed" { "🔴" } else { "🟢" };
    format!(
        "#### A2A Server Response: \n\
         > 🤖  **Discovered Server Name:** {agent_name}  \n\
         > 🛠️  **Discovered Skill Name:** {skill_name}  \n\
         ##### {marker} Invocation {state} \n\
         ```json\n{}\n```\n",
        pretty_json(task)
    )
}

/// The remote agent's text reply, when there is one.
pub fn result_block(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| format!("#### A2A Server Result: \n{text} \n"))
}

/// Observation fed back to the model, tagged with its iteration.
pub fn observation_message(iteration: u32, text: &str) -> String {
    format!("<observation>{iteration}. {text}</observation>")
}
