use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};
use std::path::PathBuf;

use coachtrack::config::Config;
use coachtrack::db::{Reader, Writer};
use coachtrack::models::SessionLog;

use super::sync_cmd::try_auto_sync;

#[derive(Args)]
pub struct LogCommand {
    #[command(subcommand)]
    command: LogSubcommand,
}

#[derive(Subcommand)]
enum LogSubcommand {
    /// Merge a log payload (JSON file) into the log for a date
    Set {
        date: NaiveDate,
        #[arg(long, short)]
        file: PathBuf,
    },

    /// Show the log for a date, or a range with --end
    Show {
        date: NaiveDate,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
}

impl LogCommand {
    pub async fn run(
        &self,
        reader: &Reader,
        writer: &Writer,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            LogSubcommand::Set { date, file } => {
                let log: SessionLog = serde_json::from_str(&std::fs::read_to_string(file)?)?;
                let outcome = writer
                    .apply_log(*date, &log, Some(&config.modified_by), Utc::now())
                    .await?;
                println!(
                    "Log updated for {} ({} applied, {} ignored as older)",
                    date,
                    outcome.applied.len(),
                    outcome.ignored.len()
                );

                // The date now has pending local changes until a sync confirms it.
                let mut session = reader.load_sync_session().await?;
                session.state.apply_local_edit(*date);
                writer.save_sync_session(&session).await?;

                try_auto_sync(reader, writer, config).await;
            }
            LogSubcommand::Show { date, end } => {
                let records = reader.get_logs(*date, end.unwrap_or(*date)).await?;
                if records.is_empty() {
                    println!("No logs found");
                }
                for record in records {
                    println!("=== {} ===", record.date);
                    println!("{}", serde_json::to_string_pretty(&record.log)?);
                }
            }
        }

        Ok(())
    }
}
