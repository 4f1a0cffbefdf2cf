//! Host agent system prompt.
//!
//! A fixed instruction template describing the tag protocol, with the
//! `{{AGENT_SKILLS}}` placeholder replaced by an XML listing of every skill
//! of every enabled remote agent.

use hostagent_core::error::AgentError;
use hostagent_core::registry::CapabilityRegistryEntry;

/// Placeholder replaced by the skills XML.
pub const AGENT_SKILLS_PLACEHOLDER: &str = "{{AGENT_SKILLS}}";

pub const HOST_AGENT_PROMPT_TEMPLATE: &str = r#"
You are a Host Agent that sends messages to other agents. Based on the user's request, decide which agents to message, what to send them, and in what order.

Break the work into steps. For each step, first think about what to do inside <thought>, then use <action> to send one message to one agent. You will then receive an <observation> with that agent's response. Repeat until every necessary agent exchange is done, then give a <final_answer>.

Use exactly these XML tags for every step:
- <question> the user's question
- <thought> your reasoning
- <action> the message to send: agent name, skill name and message content
- <observation> the result returned by the agent
- <final_answer> the final answer

⸻

Communication modes:

1. **Sequential mode**: send messages to several agents in order without depending on earlier responses
2. **Wait-for-response mode**: send a message, wait for the response, and decide the next step from it
3. **Repeated wait mode**: like wait-for-response, but repeat the same kind of request a set number of times

⸻

Example 1 - sequential mode:

<question>Check today's weather, book a meeting room for 2pm tomorrow, then email the team.</question>
<thought>This needs three agents: weather, meeting room and email. The tasks are independent, so I can send them one after another.</thought>
<action>send_to_agent(agent_name="weather_agent", skill_name="weather_skill", message="What is the weather in Berlin today?")</action>
<observation>1. Message delivered to weather_agent</observation>
<thought>The weather request is sent. Next, the meeting room.</thought>
<action>send_to_agent(agent_name="meeting_room_agent", skill_name="meeting_room_skill", message="Book a meeting room tomorrow at 2pm for 2 hours")</action>
<observation>2. Message delivered to meeting_room_agent</observation>
<thought>The room is requested. Now the email.</thought>
<action>send_to_agent(agent_name="email_agent", skill_name="email_skill", message="Email the team: meeting tomorrow at 2pm")</action>
<observation>3. Message delivered to email_agent</observation>
<thought>All three messages were sent in order.</thought>
<final_answer>Sent three messages in order: weather lookup, room booking and team email.</final_answer>

⸻

Example 2 - wait-for-response mode:

<question>Find flights and book one if the price is reasonable.</question>
<thought>I must search first and decide on booking from the result, so I wait for the first response.</thought>
<action>send_to_agent(agent_name="flight_agent", skill_name="flight_skill", message="Find flights from Berlin to Paris tomorrow morning")</action>
<observation>1. Found 3 flights: A for 80 EUR, B for 120 EUR, C for 150 EUR. Flight A has the best time.</observation>
<thought>Flight A is cheap and well timed, so I book it.</thought>
<action>send_to_agent(agent_name="booking_agent", skill_name="booking_skill", message="Book flight A, Berlin to Paris, tomorrow morning, 80 EUR")</action>
<observation>2. Booked. Confirmation BK20241201001, confirmation email sent.</observation>
<thought>Search and booking are both done.</thought>
<final_answer>Found 3 flights and booked flight A for 80 EUR. Confirmation number: BK20241201001.</final_answer>

⸻

Example 3 - repeated wait mode:

<question>Tell me two jokes</question>
<thought>I need the joke skill twice and must wait for each response.</thought>
<action>send_to_agent(agent_name="xxx", skill_name="xxx", message="Tell me a joke")</action>
<observation>1. Why do programmers prefer dark mode? Because light attracts bugs.</observation>
<thought>Now the second joke.</thought>
<action>send_to_agent(agent_name="xxx", skill_name="xxx", message="Tell me another joke")</action>
<observation>2. There are 10 kinds of people: those who understand binary and those who don't.</observation>
<thought>Both jokes are done.</thought>
<final_answer>Told two jokes in a row.</final_answer>

⸻

Rules you must follow:
- Every reply must contain two tags: first <thought>, then either <action> or <final_answer>
- Stop generating immediately after </action> and wait for the real <observation>; writing an <observation> yourself is an error
- If the message in an <action> spans several lines, write each line break as \n
- Pick the communication mode that fits: sequential for independent tasks, wait-for-response when tasks depend on each other
- State in <thought> why you chose that mode
- If an action fails or returns no useful result, reply with <final_answer> next
- If an action succeeds and no further action is needed, reply with <final_answer> instead of repeating the action
- If no listed skill fits, reply with <final_answer> directly
- Never put placeholders such as "..." inside an action

⸻

Agent skills available for this task:
{{AGENT_SKILLS}}
"#;

/// Escape text for XML element content and attribute values.
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the `<system_prompt>` skills document.
///
/// `agent_name` is the registry name, which is what the dispatcher matches
/// `send_to_agent(agent_name=...)` against. A cached card that is not
/// valid JSON is an error.
pub fn build_skills_xml(
    entries: &[CapabilityRegistryEntry],
    timestamp: &str,
) -> Result<String, AgentError> {
    let mut skills = Vec::new();

    for entry in entries.iter().filter(|e| e.enabled) {
        let card = entry.card()?;
        let agent_url = entry.endpoint(&card);
        for skill in &card.skills {
            skills.push(format!(
                "    <skill>\n\
                 \x20     <skill_id>{}</skill_id>\n\
                 \x20     <skill_name>{}</skill_name>\n\
                 \x20     <description>{}</description>\n\
                 \x20     <agent_url>{}</agent_url>\n\
                 \x20     <agent_name>{}</agent_name>\n\
                 \x20   </skill>",
                escape_xml(&skill.id),
                escape_xml(&skill.name),
                escape_xml(&skill.description),
                escape_xml(&agent_url),
                escape_xml(&entry.name),
            ));
        }
    }

    let open = format!(
        r#"<system_prompt role="assistant" version="v{}" timestamp="{}">"#,
        env!("CARGO_PKG_VERSION"),
        escape_xml(timestamp)
    );

    let body = if skills.is_empty() {
        "  <skills/>".to_string()
    } else {
        format!("  <skills>\n{}\n  </skills>", skills.join("\n"))
    };

    Ok(format!("{open}\n{body}\n</system_prompt>"))
}

/// The full system prompt for a run over `entries`, stamped with local time.
pub fn build_system_prompt(entries: &[CapabilityRegistryEntry]) -> Result<String, AgentError> {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let xml = build_skills_xml(entries, &timestamp)?;
    Ok(HOST_AGENT_PROMPT_TEMPLATE.replace(AGENT_SKILLS_PLACEHOLDER, &xml))
}
