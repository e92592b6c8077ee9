// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Witness - an outreach bot that gathers first-hand incident reports.
//!
//! This is the binary entry point: `serve` runs the scheduler, the other
//! subcommands are operator tools over the same database.

mod admin;
mod app;
mod serve;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use witness_core::{ApprovalStatus, ConversationNode, ConversationState};

use crate::admin::{FormInput, ScriptAction, TickJob};

/// Witness - an outreach bot that gathers first-hand incident reports.
#[derive(Parser, Debug)]
#[command(name = "witness", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print records as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run ingestion and advancement until interrupted.
    Serve,
    /// Run one lock-guarded ingestion tick.
    Ingest,
    /// Run one lock-guarded advancement tick.
    Advance,
    /// Conversation counts, pending posts and lock holders.
    Status,
    /// Start a conversation about a stored post.
    Open {
        post_id: String,
    },
    /// Record a form submission for a conversation.
    Form {
        subject_id: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        region: String,
        /// Incident date (YYYY-MM-DD).
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Force level 0-5.
        #[arg(long)]
        rank: Option<u8>,
    },
    /// Print one conversation.
    Show {
        subject_id: String,
    },
    /// Rank text through the classifier and print label and confidence.
    Rank {
        text: String,
    },
    /// List conversations awaiting review.
    Pending,
    /// Approve a reviewed report.
    Approve {
        subject_id: String,
    },
    /// Reject a reviewed report.
    Reject {
        subject_id: String,
    },
    /// Force a conversation into a state.
    SetState {
        subject_id: String,
        state: ConversationState,
    },
    /// List conversations.
    Conversations {
        #[arg(long)]
        state: Option<ConversationState>,
    },
    /// List candidate posts, newest first.
    Posts {
        #[arg(long)]
        status: Option<ApprovalStatus>,
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Manage message scripts.
    Scripts {
        #[command(subcommand)]
        action: ScriptCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ScriptCommands {
    /// List scripts with their counters.
    List {
        #[arg(long)]
        node: Option<ConversationNode>,
    },
    /// Add a script. Form request scripts must contain `{form_link}`.
    Add {
        node: ConversationNode,
        text: String,
        /// Store the script without making it selectable.
        #[arg(long)]
        inactive: bool,
        #[arg(long)]
        external_ref: Option<String>,
    },
    Activate {
        id: String,
    },
    Deactivate {
        id: String,
    },
}

impl From<ScriptCommands> for ScriptAction {
    fn from(command: ScriptCommands) -> Self {
        match command {
            ScriptCommands::List { node } => ScriptAction::List { node },
            ScriptCommands::Add {
                node,
                text,
                inactive,
                external_ref,
            } => ScriptAction::Add {
                node,
                text,
                inactive,
                external_ref,
            },
            ScriptCommands::Activate { id } => ScriptAction::Activate { id },
            ScriptCommands::Deactivate { id } => ScriptAction::Deactivate { id },
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => witness_config::load_and_validate_path(path),
        None => witness_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            witness_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.bot.log_level);

    let json = cli.json;
    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Ingest) => admin::tick(&config, TickJob::Ingest).await,
        Some(Commands::Advance) => admin::tick(&config, TickJob::Advance).await,
        Some(Commands::Status) => admin::status(&config, json).await,
        Some(Commands::Open { post_id }) => admin::open(&config, &post_id, json).await,
        Some(Commands::Form {
            subject_id,
            city,
            region,
            date,
            rank,
        }) => {
            let input = FormInput {
                subject_id,
                city,
                region,
                incident_date: date,
                force_level: rank,
            };
            admin::form(&config, input, json).await
        }
        Some(Commands::Show { subject_id }) => admin::show(&config, &subject_id, json).await,
        Some(Commands::Rank { text }) => admin::rank(&config, &text, json).await,
        Some(Commands::Pending) => admin::pending(&config, json).await,
        Some(Commands::Approve { subject_id }) => admin::approve(&config, &subject_id, json).await,
        Some(Commands::Reject { subject_id }) => admin::reject(&config, &subject_id, json).await,
        Some(Commands::SetState { subject_id, state }) => {
            admin::set_state(&config, &subject_id, state, json).await
        }
        Some(Commands::Conversations { state }) => {
            admin::conversations(&config, state, json).await
        }
        Some(Commands::Posts { status, limit }) => {
            admin::posts(&config, status, limit, json).await
        }
        Some(Commands::Scripts { action }) => admin::scripts(&config, action.into(), json).await,
        None => {
            println!("witness: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber with an env filter.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("witness={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
