//! Command-line interface for evicase.
//!
//! Provides commands for analyzing evidence videos, asking follow-up
//! questions, managing saved findings, and exporting reports.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use crate::adapters::{
    CaseStore, EnvIdentity, FileCaseStore, FsObjectStore, HttpInferenceClient, IdentityProvider,
    InferenceClient, ObjectStore, UserId,
};
use crate::config;
use crate::core::report::compile_report;
use crate::core::{SavedEventReconciler, SessionEngine};
use crate::domain::{EvidenceSession, Role, TurnState};
use crate::fingerprint::FingerprintGenerator;
use crate::timecode::format_timecode;

/// evicase - session engine for AI-assisted video evidence analysis
#[derive(Parser, Debug)]
#[command(name = "evicase")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a new session: attach a video and ask the first question
    Analyze {
        /// Path to the evidence video
        video: PathBuf,

        /// Question to ask about the video
        prompt: String,

        /// Model override for the inference collaborator
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Ask a follow-up question against an existing session
    Ask {
        /// Session ID
        session_id: String,

        /// Question to ask
        prompt: String,

        /// Replace the session's evidence with a new video file
        #[arg(long)]
        video: Option<PathBuf>,
    },

    /// List sessions
    Sessions {
        /// Maximum number of sessions to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show a session: status, timeline, and conversation
    Show {
        /// Session ID
        session_id: String,
    },

    /// Toggle the saved state of a timeline event
    Mark {
        /// Session ID
        session_id: String,

        /// Timeline event index (as printed by `show`)
        index: usize,
    },

    /// List saved findings for a session
    Saved {
        /// Session ID
        session_id: String,
    },

    /// Compile the findings report from saved events
    Report {
        /// Session ID
        session_id: String,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a session and everything saved under it
    Delete {
        /// Session ID
        session_id: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

struct Collaborators {
    user: UserId,
    store: Arc<dyn CaseStore>,
    objects: Arc<dyn ObjectStore>,
    inference: Arc<dyn InferenceClient>,
}

fn collaborators() -> Result<Collaborators> {
    let cfg = config::config()?;
    let user = EnvIdentity.current_user()?;

    Ok(Collaborators {
        user,
        store: Arc::new(FileCaseStore::new(config::cases_dir()?)),
        objects: Arc::new(FsObjectStore::new(config::objects_dir()?)),
        inference: Arc::new(HttpInferenceClient::new(
            cfg.inference.endpoint.clone(),
            cfg.inference.api_key.clone(),
        )),
    })
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Analyze {
                video,
                prompt,
                model,
            } => analyze(video, prompt, model).await,
            Commands::Ask {
                session_id,
                prompt,
                video,
            } => ask(session_id, prompt, video).await,
            Commands::Sessions { limit } => sessions(limit).await,
            Commands::Show { session_id } => show(session_id).await,
            Commands::Mark { session_id, index } => mark(session_id, index).await,
            Commands::Saved { session_id } => saved(session_id).await,
            Commands::Report { session_id, output } => report(session_id, output).await,
            Commands::Delete { session_id } => delete(session_id).await,
            Commands::Config => show_config(),
        }
    }
}

fn engine_defaults(engine: &mut SessionEngine, model: Option<String>) -> Result<()> {
    let cfg = config::config()?;
    engine.set_model_id(model.or_else(|| cfg.inference.model.clone()));
    engine.set_fingerprinter(FingerprintGenerator::with_chunk_size(
        cfg.engine.chunk_size_bytes,
    ));
    engine.on_fingerprint_progress(Box::new(|p| {
        eprint!("\rFingerprinting evidence... {:3.0}%", p * 100.0);
        if p >= 1.0 {
            eprintln!();
        }
    }));
    Ok(())
}

async fn analyze(video: PathBuf, prompt: String, model: Option<String>) -> Result<()> {
    let c = collaborators()?;
    let mut engine = SessionEngine::new(c.user, c.store, c.objects, c.inference);
    engine_defaults(&mut engine, model)?;

    engine.attach_evidence(&video);
    engine
        .submit(&prompt)
        .await
        .context("Analysis did not complete")?;

    print_answer(engine.session());
    println!();
    println!("Session: {}", engine.session().id);
    Ok(())
}

async fn ask(session_id: String, prompt: String, video: Option<PathBuf>) -> Result<()> {
    let c = collaborators()?;
    let mut engine =
        SessionEngine::resume(c.user, c.store, c.objects, c.inference, &session_id).await?;
    engine_defaults(&mut engine, None)?;

    if let Some(video) = video {
        println!("Replacing session evidence with {}", video.display());
        engine.attach_evidence(&video);
    }

    engine
        .submit(&prompt)
        .await
        .context("Analysis did not complete")?;

    print_answer(engine.session());
    Ok(())
}

async fn sessions(limit: usize) -> Result<()> {
    let c = collaborators()?;
    let sessions = c.store.list_sessions(&c.user).await?;

    if sessions.is_empty() {
        println!("No sessions.");
        return Ok(());
    }

    for session in sessions.into_iter().take(limit) {
        println!(
            "{}  {:10}  {:4} events  {}",
            session.id,
            session.status.to_string(),
            session.events.len(),
            session.video_name
        );
    }
    Ok(())
}

async fn show(session_id: String) -> Result<()> {
    let c = collaborators()?;
    let session = c.store.load_session(&c.user, &session_id).await?;

    let mut reconciler = SavedEventReconciler::with_tolerance(config::config()?.engine.match_tolerance);
    if let Err(e) = reconciler
        .refresh(c.store.as_ref(), &c.user, &session_id, &session.events)
        .await
    {
        eprintln!("Warning: could not load saved findings: {}", e);
    }

    println!("Session:  {}", session.id);
    println!("Status:   {}", session.status);
    println!("Evidence: {}", session.video_name);
    if let Some(ref fingerprint) = session.fingerprint {
        println!("Digest:   {}", fingerprint);
    }

    println!("\nTimeline ({} events):", session.events.len());
    for (index, event) in session.events.iter().enumerate() {
        let marker = if reconciler.is_saved(index) { "*" } else { " " };
        println!(
            " {}[{}] {}-{}  {}  ({:.2})",
            marker,
            index,
            format_timecode(event.from_time),
            format_timecode(event.to_time),
            event.summary,
            event.confidence
        );
    }

    println!("\nConversation:");
    for turn in &session.conversation {
        let speaker = match turn.role {
            Role::User => "you",
            Role::Assistant => "analysis",
        };
        let state = match turn.state {
            TurnState::Pending => " [pending]",
            TurnState::Failed => " [failed]",
            TurnState::Resolved => "",
        };
        println!("  {}{}: {}", speaker, state, turn.text);
    }
    Ok(())
}

async fn mark(session_id: String, index: usize) -> Result<()> {
    let c = collaborators()?;
    let session = c.store.load_session(&c.user, &session_id).await?;

    let mut reconciler = SavedEventReconciler::with_tolerance(config::config()?.engine.match_tolerance);
    reconciler
        .refresh(c.store.as_ref(), &c.user, &session_id, &session.events)
        .await?;

    let now_saved = reconciler
        .toggle(c.store.as_ref(), &c.user, &session_id, index, &session.events)
        .await?;

    if now_saved {
        println!("Saved event [{}].", index);
    } else {
        println!("Unsaved event [{}].", index);
    }
    Ok(())
}

async fn saved(session_id: String) -> Result<()> {
    let c = collaborators()?;
    let bookmarks = c.store.list_bookmarks(&c.user, &session_id).await?;

    if bookmarks.is_empty() {
        println!("No saved findings.");
        return Ok(());
    }

    for bookmark in bookmarks {
        println!(
            "{}  {}-{}  {}",
            bookmark.id,
            format_timecode(bookmark.from_time),
            format_timecode(bookmark.to_time),
            bookmark.summary
        );
    }
    Ok(())
}

async fn report(session_id: String, output: Option<PathBuf>) -> Result<()> {
    let c = collaborators()?;
    let session = c.store.load_session(&c.user, &session_id).await?;
    let bookmarks = c.store.list_bookmarks(&c.user, &session_id).await?;

    let report = compile_report(&session.video_name, &bookmarks, Utc::now());
    let markdown = report.render_markdown();

    match output {
        Some(path) => {
            tokio::fs::write(&path, &markdown)
                .await
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => print!("{}", markdown),
    }
    Ok(())
}

async fn delete(session_id: String) -> Result<()> {
    let c = collaborators()?;
    c.store.delete_session(&c.user, &session_id).await?;
    println!("Deleted session {}", session_id);
    Ok(())
}

fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("Home:      {}", cfg.home.display());
    println!("Cases:     {}", config::cases_dir()?.display());
    println!("Objects:   {}", config::objects_dir()?.display());
    println!("Inference: {}", cfg.inference.endpoint);
    println!(
        "Model:     {}",
        cfg.inference.model.as_deref().unwrap_or("(default)")
    );
    println!("Tolerance: {}s", cfg.engine.match_tolerance);
    match cfg.config_file {
        Some(ref path) => println!("Config:    {}", path.display()),
        None => println!("Config:    (none found)"),
    }
    Ok(())
}

fn print_answer(session: &EvidenceSession) {
    if let Some(turn) = session
        .conversation
        .iter()
        .rev()
        .find(|t| t.role == Role::Assistant)
    {
        println!("{}", turn.text);

        if let Some(ref findings) = turn.findings {
            for (offset, event) in findings.events.iter().enumerate() {
                let index = session.events.len() - findings.events.len() + offset;
                println!(
                    "  [{}] {}-{}  {}  ({:.2})",
                    index,
                    format_timecode(event.from_time),
                    format_timecode(event.to_time),
                    event.summary,
                    event.confidence
                );
            }
        }
    }
}
