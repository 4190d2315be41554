use clap::{Args, Subcommand};
use std::sync::Arc;
use std::time::Duration;

use coachtrack::config::Config;
use coachtrack::db::{Reader, Writer};
use coachtrack::sync::{scheduler, SyncClientError, SyncEngine, SyncHttpClient};

#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Subcommand)]
enum SyncSubcommand {
    /// Show local sync state and, if reachable, server status
    Status,

    /// Keep syncing: watch for local changes and run debounced cycles
    Watch {
        /// Seconds between checks of the local dirty set
        #[arg(long, default_value_t = 5)]
        poll_secs: u64,
    },
}

impl SyncCommand {
    pub async fn run(
        &self,
        reader: &Reader,
        writer: &Writer,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            None => {
                let engine = build_engine(reader, writer, config)?;
                let report = engine.run_cycle().await?;
                println!(
                    "Sync complete: {} uploaded ({} failed), {} plans and {} logs downloaded [{}]",
                    report.uploaded,
                    report.upload_failed,
                    report.plans_downloaded,
                    report.logs_downloaded,
                    report.status
                );
            }
            Some(SyncSubcommand::Status) => {
                let session = reader.load_sync_session().await?;
                println!("Status: {}", session.state.status());
                match session.state.last_success() {
                    Some(at) => println!("Last successful sync: {}", at),
                    None => println!("Last successful sync: never"),
                }
                if session.state.dirty_dates().is_empty() {
                    println!("Pending dates: none");
                } else {
                    let dates: Vec<String> = session
                        .state
                        .dirty_dates()
                        .iter()
                        .map(|d| d.to_string())
                        .collect();
                    println!("Pending dates: {}", dates.join(", "));
                }

                if let Some(url) = &config.sync.server_url {
                    let client = SyncHttpClient::new(url, config.sync_timeout())?;
                    match client.status().await {
                        Ok(status) => println!(
                            "Server: {} ({} sessions, {} logs, {} clients)",
                            status.status, status.sessions, status.session_logs, status.clients
                        ),
                        Err(e) => println!("Server: unreachable ({})", e),
                    }
                }
            }
            Some(SyncSubcommand::Watch { poll_secs }) => {
                let engine = Arc::new(build_engine(reader, writer, config)?);
                let (trigger, rx) = scheduler::channel();

                let poll_reader = reader.clone();
                let poll = Duration::from_secs(*poll_secs);
                tokio::spawn(async move {
                    loop {
                        tokio::time::sleep(poll).await;
                        match poll_reader.load_sync_session().await {
                            Ok(session) if !session.state.dirty_dates().is_empty() => {
                                trigger.notify();
                            }
                            Ok(_) => {}
                            Err(e) => tracing::warn!(error = %e, "failed to read sync state"),
                        }
                    }
                });

                println!("Watching for changes (Ctrl-C to stop)");
                scheduler::run_debounced(rx, config.debounce(), || {
                    let engine = engine.clone();
                    async move {
                        match engine.run_cycle().await {
                            Ok(report) => println!(
                                "Synced: {} uploaded, {} plans / {} logs downloaded",
                                report.uploaded, report.plans_downloaded, report.logs_downloaded
                            ),
                            Err(e) => println!("Sync failed: {}", e),
                        }
                    }
                })
                .await;
            }
        }

        Ok(())
    }
}

fn build_engine(
    reader: &Reader,
    writer: &Writer,
    config: &Config,
) -> Result<SyncEngine, SyncClientError> {
    let url = config
        .sync
        .server_url
        .as_deref()
        .ok_or(SyncClientError::NotConfigured)?;
    let client = SyncHttpClient::new(url, config.sync_timeout())?;
    Ok(SyncEngine::new(
        client,
        reader.clone(),
        writer.clone(),
        config.sync.client_name.clone(),
    ))
}

/// Best-effort sync after a local edit. Skipped silently when disabled or
/// unconfigured; failures are reported but never propagate, the dirty set
/// keeps the change safe for the next cycle.
pub(crate) async fn try_auto_sync(reader: &Reader, writer: &Writer, config: &Config) {
    if !config.sync.auto_sync || config.sync.server_url.is_none() {
        return;
    }

    let engine = match build_engine(reader, writer, config) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::debug!(error = %e, "auto-sync unavailable");
            return;
        }
    };

    match engine.run_cycle().await {
        Ok(report) => println!("(auto-synced, status: {})", report.status),
        Err(e) => println!("(sync deferred: {})", e),
    }
}
