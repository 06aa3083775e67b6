//! craftd - Craft Request Daemon
//!
//! CLI entry point: runs the daemon or talks to a running one.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use craftd::cli::{Cli, Command, OutputFormat, get_log_path};
use craftd::config::Config;
use craftd::daemon::CraftDaemon;
use craftd::discord::DiscordSurfaces;
use craftd::domain::{CraftRequest, RequestId, UserId};
use craftd::intake::IntakeBroadcaster;
use craftd::ipc::{self, DaemonClient};
use craftd::lifecycle::{CraftEvent, Form, LifecycleController, Reply};
use craftd::notify::{MemorySink, NotificationDispatcher, SurfaceSink};
use craftd::state::{RequestEvent, RequestStore};

fn parse_level(level_str: Option<&str>) -> tracing::Level {
    match level_str.map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    }
}

/// Daemon logs go to a file; client commands log to stderr
fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>, to_file: bool) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = parse_level(cli_log_level.or(config_log_level));
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    if to_file {
        let log_path = get_log_path();
        if let Some(log_dir) = log_path.parent() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }
        let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_ansi(false)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    }

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    let serving = matches!(cli.command, Command::Serve { .. });
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref(), serving)
        .context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let socket_path = cli
        .socket
        .clone()
        .unwrap_or_else(|| config.ipc.resolved_socket_path());
    let client = || DaemonClient::with_socket_path(socket_path.clone());

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Serve { dry_run } => {
            debug!(dry_run, "main: matched Serve command");
            cmd_serve(&config, &socket_path, dry_run).await
        }
        Command::Ping => cmd_ping(&client()).await,
        Command::Stop => {
            client().shutdown().await.context("Failed to stop daemon")?;
            println!("craftd is shutting down");
            Ok(())
        }
        Command::Status { format } => cmd_status(&client(), format).await,
        Command::Show { id, format } => cmd_show(&client(), RequestId::from(id), format).await,
        Command::EntryPoint { channel } => {
            send_event(&client(), CraftEvent::EntryPoint { channel_id: channel }).await
        }
        Command::Submit {
            user,
            item,
            notes,
            confirm,
        } => {
            let event = CraftEvent::Submit {
                requester: UserId::from(user),
                item,
                notes,
                confirmation: confirm,
            };
            send_event(&client(), event).await
        }
        Command::Accept { id, user } => {
            let event = CraftEvent::Accept {
                request_id: RequestId::from(id),
                candidate: UserId::from(user),
            };
            send_event(&client(), event).await
        }
        Command::Advance { id, status, user } => {
            let event = CraftEvent::AdvanceStatus {
                request_id: RequestId::from(id),
                actor: UserId::from(user),
                status,
            };
            send_event(&client(), event).await
        }
        Command::Press { custom_id, user } => {
            let reply = client()
                .press(&custom_id, &UserId::from(user))
                .await
                .context("Failed to reach daemon")?;
            print_reply(reply);
            Ok(())
        }
        Command::Complete { id, user, note } => {
            let event = CraftEvent::SubmitCompletionNote {
                request_id: RequestId::from(id),
                actor: UserId::from(user),
                note,
            };
            send_event(&client(), event).await
        }
    }
}

/// Run the daemon until SIGINT, SIGTERM or an IPC shutdown
async fn cmd_serve(config: &Config, socket_path: &PathBuf, dry_run: bool) -> Result<()> {
    debug!(?socket_path, dry_run, "cmd_serve: called");
    info!("Daemon starting...");

    let sink: Arc<dyn SurfaceSink> = if dry_run {
        info!("Dry run: surfaces are rendered in memory only");
        Arc::new(MemorySink::new())
    } else {
        config.validate().context("Invalid configuration")?;
        let token = config.token()?;
        Arc::new(DiscordSurfaces::from_config(&config.discord, token)?)
    };

    let store = RequestStore::spawn();
    let dispatcher = NotificationDispatcher::new(sink.clone(), store.clone());
    let broadcaster = IntakeBroadcaster::new(sink, dispatcher.clone());
    let controller = LifecycleController::new(store.clone(), dispatcher, broadcaster);

    let mut events = store.subscribe_events();
    let event_logger = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(RequestEvent::Created { id, requester }) => info!(%id, %requester, "event: created"),
                Ok(RequestEvent::Accepted { id, accepter }) => info!(%id, %accepter, "event: accepted"),
                Ok(RequestEvent::Advanced { id, status }) => info!(%id, %status, "event: advanced"),
                Err(RecvError::Lagged(n)) => warn!(n, "event logger lagged behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let (listener, socket_path) = ipc::create_listener_at(socket_path)?;
    info!(?socket_path, "IPC socket listening");

    let (daemon, shutdown_rx) = CraftDaemon::new(controller, env!("GIT_DESCRIBE"));
    let shutdown_tx = daemon.shutdown_handle();
    let server = tokio::spawn(async move { daemon.run(listener, shutdown_rx).await });

    println!("craftd listening on {}", socket_path.display());

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let shutdown = shutdown_tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = sigint.recv() => warn!("SIGINT received"),
                _ = sigterm.recv() => warn!("SIGTERM received"),
            }
            let _ = shutdown.send(()).await;
        });
    }

    #[cfg(not(unix))]
    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown.send(()).await;
            }
        });
    }

    let result = server.await.context("Daemon task panicked")?;

    info!("Daemon shutting down...");
    ipc::cleanup_socket(&socket_path);
    event_logger.abort();

    debug!("cmd_serve: shutdown complete");
    result
}

async fn cmd_ping(client: &DaemonClient) -> Result<()> {
    debug!("cmd_ping: called");
    if !client.socket_exists() {
        println!("craftd is not running");
        return Ok(());
    }

    match client.ping().await {
        Ok(version) => {
            println!("Daemon is alive and responsive");
            println!("Version: {}", version);
        }
        Err(e) => {
            println!("Daemon socket exists but is not responding");
            println!("Error: {}", e);
        }
    }
    Ok(())
}

async fn cmd_status(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_status: called");
    let metrics = client.status().await.context("Failed to query daemon")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&metrics)?),
        OutputFormat::Text => {
            println!("Requests:         {}", metrics.total);
            println!("  Pending:          {}", metrics.pending);
            println!("  Accepted:         {}", metrics.accepted);
            println!("  In Progress:      {}", metrics.in_progress);
            println!("  Ready for Pickup: {}", metrics.ready_for_pickup);
        }
    }
    Ok(())
}

async fn cmd_show(client: &DaemonClient, id: RequestId, format: OutputFormat) -> Result<()> {
    debug!(%id, ?format, "cmd_show: called");
    let request = client.show(&id).await.context("Failed to query daemon")?;

    match (request, format) {
        (None, _) => Err(eyre::eyre!("Request not found: {}", id)),
        (Some(request), OutputFormat::Json) => {
            println!("{}", serde_json::to_string_pretty(&request)?);
            Ok(())
        }
        (Some(request), OutputFormat::Text) => {
            print_request(&request);
            Ok(())
        }
    }
}

fn print_request(request: &CraftRequest) {
    println!("Request {}", request.id);
    println!("  Requester: {}", request.requester);
    println!("  Item:      {}", request.item);
    if let Some(notes) = &request.notes {
        println!("  Notes:     {}", notes);
    }
    println!("  Status:    {}", request.status);
    if let Some(accepter) = &request.accepter {
        println!("  Accepter:  {}", accepter);
    }
    if let Some(note) = &request.completion_note {
        println!("  Note:      {}", note);
    }
    println!("  Created:   {}", request.created_at.to_rfc3339());
    println!("  Updated:   {}", request.updated_at.to_rfc3339());
}

async fn send_event(client: &DaemonClient, event: CraftEvent) -> Result<()> {
    debug!(kind = event.kind(), "send_event: called");
    let reply = client.send_event(event).await.context("Failed to reach daemon")?;
    print_reply(reply);
    Ok(())
}

fn print_reply(reply: Reply) {
    match reply {
        Reply::Message { text } => println!("{}", text),
        Reply::OpenForm { form: Form::CraftRequest } => {
            println!("Request form opened; submit it with `craftd submit <ITEM> --user <ID> --confirm yes`");
        }
        Reply::OpenForm {
            form: Form::CompletionNote { request_id },
        } => {
            println!(
                "Completion note requested; finish with `craftd complete {} --user <ID> [--note <TEXT>]`",
                request_id
            );
        }
    }
}
