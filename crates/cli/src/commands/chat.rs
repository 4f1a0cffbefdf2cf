//! `hostagent chat`: Interactive or single-message chat mode.

use hostagent_a2a::HttpA2aTransport;
use hostagent_agent::{AgentStreamEvent, ChunkSink, HostAgent, RunOutcome};
use hostagent_config::AppConfig;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  WARNING: No model API key configured.");
        eprintln!("  Set HOSTAGENT_API_KEY or DEEPSEEK_API_KEY, or add api_key under [model] in:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
    }

    let agent = HostAgent::from_config(&config, Arc::new(HttpA2aTransport::new()));

    if let Some(msg) = message {
        ask(&agent, &msg).await?;
        return Ok(());
    }

    let enabled = config.agents.iter().filter(|a| a.enabled).count();
    println!();
    println!("  hostagent — interactive mode");
    println!();
    println!("  Model:   {} ({})", config.model.model, config.model.provider);
    println!("  Agents:  {enabled} enabled");
    println!();
    println!("  Start a message with @/message/send to route it through remote agents.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        println!();
        ask(&agent, line).await?;
        println!();
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}

/// Run one request, printing its output as it streams.
async fn ask(agent: &HostAgent, prompt: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<AgentStreamEvent>();
    let sink: Arc<dyn ChunkSink> = Arc::new(tx);

    let printer = async move {
        let mut stdout = std::io::stdout();
        while let Some(event) = rx.recv().await {
            render_event(&event, &mut stdout)?;
            stdout.flush()?;
        }
        Ok::<_, std::io::Error>(())
    };

    let (outcome, printed) = tokio::join!(agent.execute(prompt, sink), printer);
    printed?;
    debug!(outcome = ?outcome, "Request finished");

    if let RunOutcome::Exhausted { iterations } = outcome {
        eprintln!("  [stopped after {iterations} iterations without a final answer]");
    }
    Ok(())
}

/// Write one event to `out`. The `"\r"` unit sentinel becomes a newline.
fn render_event(event: &AgentStreamEvent, out: &mut impl Write) -> std::io::Result<()> {
    match event {
        AgentStreamEvent::Chunk { .. } if event.is_unit_end() => writeln!(out),
        AgentStreamEvent::Chunk { content } => write!(out, "{content}"),
        AgentStreamEvent::Complete { .. } => writeln!(out),
    }
}
