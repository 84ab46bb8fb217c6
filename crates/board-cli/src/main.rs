#![forbid(unsafe_code)]

mod api;
mod config;
mod dashboard;
mod output;
mod transport;

use anyhow::{Context, Result};
use api::{ApiClient, TaskDraft};
use board_core::model::{Priority, Role, Status, Viewer};
use clap::{Args, Parser, Subcommand};
use config::ClientConfig;
use dashboard::Dashboard;
use output::OutputMode;
use std::env;
use std::io::Write;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use transport::EventBus;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tb: live dashboard client for multi-writer task boards",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags.
    const fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

/// Viewer identity overrides. The config file carries the usual identity;
/// these flags let one terminal watch as a different viewer.
#[derive(Args, Debug)]
struct ViewerArgs {
    /// View as this role (admin boards are unfiltered).
    #[arg(long)]
    role: Option<Role>,

    /// View as this username (owner boards show only their tasks).
    #[arg(long)]
    username: Option<String>,

    /// Remote user id, used for server-side filtered snapshot loads.
    #[arg(long)]
    user_id: Option<i64>,
}

impl ViewerArgs {
    fn resolve(&self, config: &ClientConfig) -> Viewer {
        let mut viewer = config.viewer();
        if let Some(role) = self.role {
            viewer.role = role;
        }
        if let Some(username) = &self.username {
            viewer.username.clone_from(username);
        }
        if let Some(id) = self.user_id {
            viewer.id = id;
        }
        viewer
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Watch the board live",
        long_about = "Load a snapshot, then keep the local view reconciled \
                      with the live event stream, printing a notification \
                      line per accepted change.",
        after_help = "EXAMPLES:\n    # Watch as the configured viewer\n    tb watch\n\n    # Watch the unfiltered admin board, reloading every minute\n    tb watch --role admin --refresh 60\n\n    # One JSON object per notification, for piping\n    tb watch --json"
    )]
    Watch {
        #[command(flatten)]
        viewer: ViewerArgs,

        /// Also reload the full snapshot every N seconds.
        #[arg(long, value_name = "SECS")]
        refresh: Option<u64>,
    },

    #[command(
        about = "List tasks from one snapshot",
        after_help = "EXAMPLES:\n    # The configured viewer's tasks\n    tb list\n\n    # Everything, as an admin\n    tb list --role admin --json"
    )]
    List {
        #[command(flatten)]
        viewer: ViewerArgs,
    },

    #[command(about = "List user accounts")]
    Users,

    #[command(
        about = "Create a task",
        after_help = "EXAMPLES:\n    tb create --title \"Fix login timeout\" --user bob --priority high --deadline 2026-09-15T12:00:00Z"
    )]
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Assignee username.
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "medium")]
        priority: Priority,
        #[arg(long, default_value = "todo")]
        status: Status,
        /// RFC 3339 deadline, e.g. 2026-09-15T12:00:00Z.
        #[arg(long)]
        deadline: String,
    },

    #[command(
        about = "Update a task (admin, full replace)",
        after_help = "EXAMPLES:\n    tb update 4 --title \"Fix login timeout\" --user carol --priority high --status progress --deadline 2026-09-20T12:00:00Z"
    )]
    Update {
        id: i64,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        priority: Priority,
        #[arg(long)]
        status: Status,
        #[arg(long)]
        deadline: String,
    },

    #[command(
        about = "Change a task's status (assignee)",
        after_help = "EXAMPLES:\n    tb status 4 done"
    )]
    Status { id: i64, status: Status },

    #[command(about = "Delete a task")]
    Delete { id: i64 },

    #[command(
        about = "Add a comment to a task",
        after_help = "EXAMPLES:\n    tb comment 4 \"blocked on the auth fix\""
    )]
    Comment { id: i64, content: String },
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("TASKBOARD_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "board_core=debug,board_cli=debug,info"
        } else {
            "board_core=info,board_cli=info,warn"
        })
    });

    let format = env::var("TASKBOARD_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

// Single-threaded cooperative scheduling: engine transitions and user
// actions interleave on one executor, never in parallel.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::load_config()?;
    let mode = cli.output_mode();
    let api = ApiClient::new(&config.server_url, config.token.clone())
        .context("failed to construct API client")?;

    match cli.command {
        Commands::Watch { viewer, refresh } => {
            watch(&config, api, viewer.resolve(&config), mode, refresh).await
        }
        Commands::List { viewer } => list(api, &viewer.resolve(&config), mode).await,
        Commands::Users => users(api, mode).await,
        Commands::Create {
            title,
            description,
            user,
            priority,
            status,
            deadline,
        } => {
            let draft = TaskDraft {
                title,
                description,
                user,
                priority: priority.to_string(),
                status: status.to_string(),
                deadline: parse_deadline(&deadline)?,
            };
            let created = api.create_task(&draft).await?;
            output::render_task(&mut std::io::stdout(), mode, &created)?;
            Ok(())
        }
        Commands::Update {
            id,
            title,
            description,
            user,
            priority,
            status,
            deadline,
        } => {
            let patch = TaskDraft {
                title,
                description,
                user,
                priority: priority.to_string(),
                status: status.to_string(),
                deadline: parse_deadline(&deadline)?,
            };
            let updated = api.update_task(id, &patch).await?;
            output::render_task(&mut std::io::stdout(), mode, &updated)?;
            Ok(())
        }
        Commands::Status { id, status } => {
            let updated = api.update_status(id, status).await?;
            output::render_task(&mut std::io::stdout(), mode, &updated)?;
            Ok(())
        }
        Commands::Delete { id } => {
            api.delete_task(id).await?;
            if !mode.is_json() {
                println!("Deleted task {id}.");
            }
            Ok(())
        }
        Commands::Comment { id, content } => {
            let comment = api.add_comment(id, &content).await?;
            if mode.is_json() {
                println!("{}", serde_json::to_string(&comment)?);
            } else {
                println!("Comment {} added to task {id}.", comment.id);
            }
            Ok(())
        }
    }
}

/// Validate a deadline argument and normalize it to RFC 3339.
fn parse_deadline(raw: &str) -> Result<String> {
    let parsed = chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .or_else(|_| {
            // Bare dates are common from shells; treat as end of that day.
            chrono::NaiveDate::from_str(raw)
                .map(|d| d.and_hms_opt(23, 59, 59).unwrap_or_default().and_utc())
        })
        .with_context(|| format!("invalid deadline '{raw}': expected RFC 3339 or YYYY-MM-DD"))?;
    Ok(parsed.to_rfc3339())
}

async fn list(api: ApiClient, viewer: &Viewer, mode: OutputMode) -> Result<()> {
    let tasks = match viewer.role {
        Role::Admin => api.fetch_all().await?,
        Role::User => api.fetch_for_user(viewer.id).await?,
    };
    output::render_tasks(&mut std::io::stdout(), mode, &tasks, chrono::Utc::now())?;
    Ok(())
}

async fn users(api: ApiClient, mode: OutputMode) -> Result<()> {
    let accounts = api.fetch_users().await?;
    output::render_users(&mut std::io::stdout(), mode, &accounts)?;
    Ok(())
}

async fn watch(
    config: &ClientConfig,
    api: ApiClient,
    viewer: Viewer,
    mode: OutputMode,
    refresh: Option<u64>,
) -> Result<()> {
    let bus = EventBus::new();
    let feed = tokio::spawn(transport::run_feed(
        bus.clone(),
        config.socket_endpoint(),
    ));

    let mut dashboard = Dashboard::new(viewer, api, &bus);
    dashboard
        .reload()
        .await
        .context("initial snapshot load failed")?;
    info!(
        viewer = %dashboard.viewer().username,
        tasks = dashboard.view().tasks().len(),
        "dashboard ready"
    );
    output::render_tasks(
        &mut std::io::stdout(),
        mode,
        dashboard.view().tasks(),
        chrono::Utc::now(),
    )?;

    // interval() panics on a zero period; treat --refresh 0 as disabled.
    let refresh = refresh.filter(|secs| *secs > 0).map(Duration::from_secs);
    let on_change = move |view: &board_core::engine::BoardView,
                          record: Option<&board_core::notify::NotificationRecord>| {
        let mut stdout = std::io::stdout();
        if let Some(record) = record {
            let _ = output::render_notification(&mut stdout, mode, record);
        }
        if !mode.is_json() {
            let _ = writeln!(stdout, "  ({} tasks in view)", view.tasks().len());
        }
    };

    tokio::select! {
        () = dashboard.run(refresh, on_change) => {}
        _ = tokio::signal::ctrl_c() => {}
    }
    info!(
        unseen = dashboard.notifications().unseen(),
        "shutting down"
    );

    // Dropping the dashboard releases its push subscription; aborting the
    // feed task closes the socket.
    feed.abort();
    Ok(())
}
