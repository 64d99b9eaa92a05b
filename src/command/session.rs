//! Lists, prints, exports, deletes and prunes saved sessions.

use std::path::PathBuf;

use anyhow::{Context as _, bail};
use clap::{Subcommand, ValueEnum};
use colored::Colorize;

use crate::{
    command::{Context, working_dir},
    internal::{
        config::load_lifecycle_config,
        session::{
            HistorySummary, Session,
            manager::{cleanup_sessions, delete_session, list_sessions, load_state},
        },
    },
    utils::storage::BlobStore,
};

const SUMMARY_COLUMN_WIDTH: usize = 60;

#[derive(Subcommand, Debug)]
pub enum SessionCmds {
    /// List saved sessions, newest first
    List,
    /// Print a redacted markdown transcript of a session
    Show {
        #[arg(help = "The session to show")]
        id: String,
    },
    /// Export a session with secrets redacted
    Export {
        #[arg(help = "The session to export")]
        id: String,
        #[arg(long, value_enum, default_value_t = ExportFormat::Md)]
        format: ExportFormat,
        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Delete a saved session
    Delete {
        #[arg(help = "The session to delete")]
        id: String,
    },
    /// Apply the retention policy from the loaded configuration
    Cleanup {
        /// Never delete this session
        #[arg(long, value_name = "ID")]
        keep: Option<String>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Md,
    Json,
}

pub async fn execute(cmd: SessionCmds, context: &Context) -> anyhow::Result<()> {
    let store = context.open_store()?;
    match cmd {
        SessionCmds::List => handle_list(&store).await,
        SessionCmds::Show { id } => {
            let session = load_session(&store, &id).await?;
            print!("{}", session.export_markdown());
            Ok(())
        }
        SessionCmds::Export { id, format, output } => {
            handle_export(&store, &id, format, output).await
        }
        SessionCmds::Delete { id } => handle_delete(&store, &id).await,
        SessionCmds::Cleanup { keep } => handle_cleanup(&store, keep.as_deref()).await,
    }
}

async fn load_session(store: &dyn BlobStore, id: &str) -> anyhow::Result<Session> {
    let state = load_state(store, id)
        .await
        .with_context(|| format!("cannot load session {id}"))?;
    Ok(Session::from_state(&state))
}

async fn handle_list(store: &dyn BlobStore) -> anyhow::Result<()> {
    let summaries = list_sessions(store).await?;
    if summaries.is_empty() {
        println!("No saved sessions.");
        return Ok(());
    }
    for summary in &summaries {
        println!("{}", format_summary_line(summary));
    }
    Ok(())
}

fn format_summary_line(summary: &HistorySummary) -> String {
    let last_active = summary
        .last_active
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M");
    let text = if summary.summary.is_empty() {
        "(no summary)".dimmed().to_string()
    } else {
        truncate(&summary.summary, SUMMARY_COLUMN_WIDTH)
    };
    format!(
        "{} {} {:>4} msgs {:>7} tok  {}",
        summary.id.yellow(),
        last_active,
        summary.message_count,
        summary.total_tokens,
        text
    )
}

fn truncate(text: &str, width: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > width {
        let cut: String = line.chars().take(width.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

async fn handle_export(
    store: &dyn BlobStore,
    id: &str,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let session = load_session(store, id).await?;
    let rendered = match format {
        ExportFormat::Md => session.export_markdown(),
        ExportFormat::Json => session.export_json()?,
    };
    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Exported session {} to {}", id.yellow(), path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

async fn handle_delete(store: &dyn BlobStore, id: &str) -> anyhow::Result<()> {
    if let Err(e) = load_state(store, id).await {
        if e.is_not_found() {
            bail!("no saved session named {id}");
        }
        tracing::warn!(session_id = id, "deleting unreadable session: {e}");
    }
    delete_session(store, id)
        .await
        .with_context(|| format!("failed to delete session {id}"))?;
    println!("Deleted session {}", id.yellow());
    Ok(())
}

async fn handle_cleanup(store: &dyn BlobStore, keep: Option<&str>) -> anyhow::Result<()> {
    let config = load_lifecycle_config(&working_dir()?);
    let report = cleanup_sessions(store, &config, keep).await?;

    for id in &report.deleted {
        println!("{} {}", "removed".red(), id);
    }
    for (id, error) in &report.failed {
        eprintln!("{} {id}: {error}", "failed".red().bold());
    }
    println!(
        "{} session(s) removed, {} failure(s)",
        report.deleted.len(),
        report.failed.len()
    );
    Ok(())
}
