use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};
use std::path::PathBuf;

use coachtrack::config::Config;
use coachtrack::db::{ExercisePatch, PlanMetadata, Reader, Writer};
use coachtrack::models::{Exercise, RawPlan};

#[derive(Args)]
pub struct PlanCommand {
    #[command(subcommand)]
    command: PlanSubcommand,
}

#[derive(Subcommand)]
enum PlanSubcommand {
    /// Set the plan for a date from a JSON file (normalizes raw input)
    Set {
        date: NaiveDate,
        /// JSON file with the plan
        #[arg(long, short)]
        file: PathBuf,
    },

    /// Show the plan for a date, or a range with --end
    Show {
        date: NaiveDate,
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Delete the plan for a date (logs are kept)
    Delete { date: NaiveDate },

    /// Update session-level metadata
    Meta {
        date: NaiveDate,
        #[arg(long)]
        day_name: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        phase: Option<String>,
        #[arg(long)]
        duration: Option<i64>,
    },

    /// Add a normalized exercise (JSON file) to a block
    AddExercise {
        date: NaiveDate,
        /// Block index within the plan
        block: i64,
        #[arg(long, short)]
        file: PathBuf,
        /// Position within the block; defaults to the end
        #[arg(long)]
        position: Option<i64>,
    },

    /// Apply a partial update (JSON file) to a planned exercise
    UpdateExercise {
        date: NaiveDate,
        exercise_key: String,
        #[arg(long, short)]
        file: PathBuf,
    },

    /// Remove a planned exercise
    RemoveExercise {
        date: NaiveDate,
        exercise_key: String,
    },

    /// Ingest a multi-day program: JSON object of {"YYYY-MM-DD": plan, ...}
    Ingest {
        #[arg(long, short)]
        file: PathBuf,
    },

    /// List dates with a scheduled plan
    Dates {
        start: NaiveDate,
        end: NaiveDate,
    },

    /// Planned vs completed counts for the trailing window
    Summary {
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
}

impl PlanCommand {
    pub async fn run(
        &self,
        reader: &Reader,
        writer: &Writer,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let actor = Some(config.modified_by.as_str());
        let now = Utc::now();

        match &self.command {
            PlanSubcommand::Set { date, file } => {
                let raw: RawPlan = serde_json::from_str(&std::fs::read_to_string(file)?)?;
                let plan = writer.set_plan(*date, &raw, actor, now).await?;
                println!("Plan set for {} ({} blocks)", date, plan.blocks.len());
            }
            PlanSubcommand::Show { date, end } => {
                let records = reader.get_plans(*date, end.unwrap_or(*date)).await?;
                if records.is_empty() {
                    println!("No plans found");
                }
                for record in records {
                    println!("=== {} ===", record.date);
                    println!("{}", serde_json::to_string_pretty(&record.plan)?);
                }
            }
            PlanSubcommand::Delete { date } => {
                writer.delete_plan(*date).await?;
                println!("Plan deleted for {}", date);
            }
            PlanSubcommand::Meta {
                date,
                day_name,
                location,
                phase,
                duration,
            } => {
                let meta = PlanMetadata {
                    day_name: day_name.clone(),
                    location: location.clone(),
                    phase: phase.clone(),
                    total_duration_min: *duration,
                };
                writer.update_metadata(*date, &meta, actor, now).await?;
                println!("Plan metadata updated for {}", date);
            }
            PlanSubcommand::AddExercise {
                date,
                block,
                file,
                position,
            } => {
                let exercise: Exercise = serde_json::from_str(&std::fs::read_to_string(file)?)?;
                writer
                    .add_exercise(*date, *block, &exercise, *position, actor, now)
                    .await?;
                println!("Added '{}' to block {} on {}", exercise.id, block, date);
            }
            PlanSubcommand::UpdateExercise {
                date,
                exercise_key,
                file,
            } => {
                let patch: ExercisePatch = serde_json::from_str(&std::fs::read_to_string(file)?)?;
                writer
                    .update_exercise(*date, exercise_key, &patch, actor, now)
                    .await?;
                println!("Updated '{}' on {}", exercise_key, date);
            }
            PlanSubcommand::RemoveExercise { date, exercise_key } => {
                writer.remove_exercise(*date, exercise_key, actor, now).await?;
                println!("Removed '{}' from {}", exercise_key, date);
            }
            PlanSubcommand::Ingest { file } => {
                let program: std::collections::BTreeMap<NaiveDate, RawPlan> =
                    serde_json::from_str(&std::fs::read_to_string(file)?)?;
                let entries: Vec<_> = program.into_iter().collect();
                let count = writer.ingest_program(&entries, actor, now).await?;
                println!("Ingested {} day(s)", count);
            }
            PlanSubcommand::Dates { start, end } => {
                for date in reader.list_scheduled_dates(*start, *end).await? {
                    println!("{}", date);
                }
            }
            PlanSubcommand::Summary { days } => {
                let summary = reader.summary(*days, Utc::now().date_naive()).await?;
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
        }

        Ok(())
    }
}
