//! `ai-commit` command: write a commit message with a local LLM and publish it.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, info};

use crate::ai::{AiClient, OllamaClient};
use crate::git::{ChangeContext, CommandGateway, GitCli, SystemGateway};

/// AI commit command options.
#[derive(Parser, Debug)]
pub struct AiCommitCommand {
    /// Extra guidance for the message, e.g. "mention the cache rewrite".
    #[arg(value_name = "HINT")]
    pub hint: Option<String>,

    /// Ollama model to use (overrides OLLAMA_MODEL).
    #[arg(long)]
    pub model: Option<String>,

    /// Ollama server URL (overrides OLLAMA_BASE_URL).
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,
}

impl AiCommitCommand {
    /// Executes the AI commit flow in the current directory.
    pub async fn execute(self) -> Result<()> {
        let workdir = std::env::current_dir().context("Failed to determine current directory")?;
        let client = OllamaClient::from_settings(self.model, self.base_url);
        let gateway = SystemGateway::new();

        let mut stdout = io::stdout();
        run_ai_commit(
            &gateway,
            &client,
            &workdir,
            self.hint.as_deref(),
            &mut stdout,
        )
        .await?;
        Ok(())
    }
}

/// Generates a message for the pending changes in `workdir`, then stages,
/// commits and pushes.
///
/// Progress and the streamed message go to `out`. Returns `None` when there
/// is nothing to commit.
pub async fn run_ai_commit<W: Write + Send>(
    gateway: &dyn CommandGateway,
    client: &dyn AiClient,
    workdir: &Path,
    hint: Option<&str>,
    out: &mut W,
) -> Result<Option<String>> {
    let git = GitCli::new(gateway, workdir);
    let context = ChangeContext::collect(&git)
        .await
        .context("Failed to collect git context")?;

    if !context.has_changes() {
        writeln!(out, "Nothing to commit.")?;
        return Ok(None);
    }

    let metadata = client.get_metadata();
    info!(
        provider = %metadata.provider,
        model = %metadata.model,
        files = context.changed_files.len() + context.staged_files.len(),
        "Generating commit message"
    );
    writeln!(
        out,
        "🤖 Generating commit message with {} ({})...",
        metadata.provider, metadata.model
    )?;

    let prompt = context.prompt(hint);
    debug!(bytes = prompt.len(), "Prompt built");

    let mut write_error = None;
    let generated = {
        let mut echo = |fragment: &str| {
            if write_error.is_none() {
                if let Err(e) = write!(out, "{fragment}").and_then(|()| out.flush()) {
                    write_error = Some(e);
                }
            }
        };
        client
            .generate(&prompt, &mut echo)
            .await
            .context("Failed to generate commit message")?
    };
    if let Some(e) = write_error {
        return Err(e).context("Failed to echo generated message");
    }
    writeln!(out)?;

    let message = generated.trim().to_string();
    if message.is_empty() {
        bail!("The model returned an empty commit message");
    }

    git.add_all().await.context("Failed to stage changes")?;
    git.commit(&message).await.context("Failed to commit")?;
    git.push().await.context("Failed to push")?;

    writeln!(out, "✅ Committed and pushed: {message}")?;
    Ok(Some(message))
}
