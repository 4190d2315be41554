//! Log repository.
//!
//! Logs are user-authoritative. `apply_log` merges an incoming payload with
//! per-record last-write-wins: the session-level feedback row and each
//! exercise entry carry their own `last_modified` and are compared against
//! the incoming timestamp independently. A strictly newer timestamp wins;
//! ties keep what is stored. An exercise entry's set rows and checklist
//! completions always travel with their parent entry and are replaced
//! wholesale, never merged item by item.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Sqlite, Transaction};

use super::{format_date, format_ts, parse_date, parse_ts, Reader, Writer};
use crate::error::StoreError;
use crate::models::{ExerciseLog, SessionLog, SetLog};

/// A stored log together with its newest record timestamp.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub date: NaiveDate,
    pub last_modified: DateTime<Utc>,
    pub log: SessionLog,
}

/// Per-record result of an `apply_log` merge.
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    pub session_applied: bool,
    pub applied: Vec<String>,
    pub ignored: Vec<String>,
}

#[derive(sqlx::FromRow)]
struct SessionLogRow {
    id: i64,
    date: String,
    pain_discomfort: Option<String>,
    general_notes: Option<String>,
    last_modified: String,
}

#[derive(sqlx::FromRow)]
struct ExerciseLogRow {
    id: i64,
    exercise_key: String,
    completed: bool,
    user_note: Option<String>,
    duration_min: Option<f64>,
    avg_hr: Option<i64>,
    max_hr: Option<i64>,
    last_modified: String,
}

impl Writer {
    /// Merges `log` into the stored log for `date` with per-record
    /// last-write-wins at `timestamp`.
    pub async fn apply_log(
        &self,
        date: NaiveDate,
        log: &SessionLog,
        modified_by: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> Result<ApplyOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut outcome = ApplyOutcome::default();

        let existing: Option<(i64, String)> =
            sqlx::query_as("SELECT id, last_modified FROM workout_session_logs WHERE date = ?")
                .bind(format_date(date))
                .fetch_optional(&mut *tx)
                .await?;

        let log_id = match existing {
            None => {
                let row: (i64,) = sqlx::query_as(
                    "INSERT INTO workout_session_logs
                        (date, pain_discomfort, general_notes, last_modified, modified_by)
                     VALUES (?, ?, ?, ?, ?)
                     RETURNING id",
                )
                .bind(format_date(date))
                .bind(&log.session_feedback.pain_discomfort)
                .bind(&log.session_feedback.general_notes)
                .bind(format_ts(timestamp))
                .bind(modified_by)
                .fetch_one(&mut *tx)
                .await?;
                outcome.session_applied = true;
                row.0
            }
            Some((id, stored_ts)) => {
                if timestamp > parse_ts(&stored_ts)? {
                    sqlx::query(
                        "UPDATE workout_session_logs SET
                            pain_discomfort = ?, general_notes = ?, last_modified = ?, modified_by = ?
                         WHERE id = ?",
                    )
                    .bind(&log.session_feedback.pain_discomfort)
                    .bind(&log.session_feedback.general_notes)
                    .bind(format_ts(timestamp))
                    .bind(modified_by)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                    outcome.session_applied = true;
                }
                id
            }
        };

        for (key, entry) in &log.exercises {
            let existing: Option<(i64, String)> = sqlx::query_as(
                "SELECT id, last_modified FROM exercise_logs
                 WHERE session_log_id = ? AND exercise_key = ?",
            )
            .bind(log_id)
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?;

            match existing {
                None => {
                    insert_exercise_log_tx(&mut tx, log_id, key, entry, modified_by, timestamp)
                        .await?;
                    outcome.applied.push(key.clone());
                }
                Some((ex_id, stored_ts)) if timestamp > parse_ts(&stored_ts)? => {
                    sqlx::query("DELETE FROM exercise_logs WHERE id = ?")
                        .bind(ex_id)
                        .execute(&mut *tx)
                        .await?;
                    insert_exercise_log_tx(&mut tx, log_id, key, entry, modified_by, timestamp)
                        .await?;
                    outcome.applied.push(key.clone());
                }
                Some(_) => outcome.ignored.push(key.clone()),
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    /// Replaces the entire stored log for `date`. Used when applying
    /// downloaded logs to the local cache, which are post-merge and
    /// authoritative.
    pub async fn replace_log(
        &self,
        date: NaiveDate,
        log: &SessionLog,
        modified_by: Option<&str>,
        last_modified: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM workout_session_logs WHERE date = ?")
            .bind(format_date(date))
            .execute(&mut *tx)
            .await?;

        let row: (i64,) = sqlx::query_as(
            "INSERT INTO workout_session_logs
                (date, pain_discomfort, general_notes, last_modified, modified_by)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(format_date(date))
        .bind(&log.session_feedback.pain_discomfort)
        .bind(&log.session_feedback.general_notes)
        .bind(format_ts(last_modified))
        .bind(modified_by)
        .fetch_one(&mut *tx)
        .await?;

        for (key, entry) in &log.exercises {
            insert_exercise_log_tx(&mut tx, row.0, key, entry, modified_by, last_modified).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

impl Reader {
    pub async fn get_log(&self, date: NaiveDate) -> Result<Option<LogRecord>, StoreError> {
        let mut logs = self.get_logs(date, date).await?;
        Ok(logs.pop())
    }

    /// Logs for an inclusive date range, ordered by date.
    pub async fn get_logs(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LogRecord>, StoreError> {
        let rows: Vec<SessionLogRow> = sqlx::query_as(
            "SELECT id, date, pain_discomfort, general_notes, last_modified
             FROM workout_session_logs WHERE date >= ? AND date <= ? ORDER BY date",
        )
        .bind(format_date(start))
        .bind(format_date(end))
        .fetch_all(&self.pool)
        .await?;

        self.assemble_log_records(rows).await
    }

    /// Logs where the session row or any exercise entry changed strictly
    /// after `since`.
    pub async fn logs_modified_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<LogRecord>, StoreError> {
        let cutoff = format_ts(since);
        let rows: Vec<SessionLogRow> = sqlx::query_as(
            "SELECT id, date, pain_discomfort, general_notes, last_modified
             FROM workout_session_logs
             WHERE last_modified > ?
                OR id IN (SELECT session_log_id FROM exercise_logs WHERE last_modified > ?)
             ORDER BY date",
        )
        .bind(&cutoff)
        .bind(&cutoff)
        .fetch_all(&self.pool)
        .await?;

        self.assemble_log_records(rows).await
    }

    async fn assemble_log_records(
        &self,
        rows: Vec<SessionLogRow>,
    ) -> Result<Vec<LogRecord>, StoreError> {
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut log = SessionLog::default();
            log.session_feedback.pain_discomfort = row.pain_discomfort;
            log.session_feedback.general_notes = row.general_notes;
            let mut last_modified = parse_ts(&row.last_modified)?;

            let exercises: Vec<ExerciseLogRow> = sqlx::query_as(
                "SELECT id, exercise_key, completed, user_note, duration_min,
                        avg_hr, max_hr, last_modified
                 FROM exercise_logs WHERE session_log_id = ? ORDER BY exercise_key",
            )
            .bind(row.id)
            .fetch_all(&self.pool)
            .await?;

            for ex_row in exercises {
                last_modified = last_modified.max(parse_ts(&ex_row.last_modified)?);

                let sets: Vec<SetLog> = sqlx::query_as::<_, (i64, Option<f64>, Option<i64>, Option<f64>, Option<String>, Option<f64>, bool)>(
                    "SELECT set_num, weight, reps, rpe, unit, duration_sec, completed
                     FROM set_logs WHERE exercise_log_id = ? ORDER BY set_num",
                )
                .bind(ex_row.id)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|(set_num, weight, reps, rpe, unit, duration_sec, completed)| SetLog {
                    set_num,
                    weight,
                    reps,
                    rpe,
                    unit,
                    duration_sec,
                    completed,
                })
                .collect();

                let items: Vec<(String,)> = sqlx::query_as(
                    "SELECT item_text FROM checklist_log_items WHERE exercise_log_id = ? ORDER BY id",
                )
                .bind(ex_row.id)
                .fetch_all(&self.pool)
                .await?;

                log.exercises.insert(
                    ex_row.exercise_key,
                    ExerciseLog {
                        completed: ex_row.completed,
                        user_note: ex_row.user_note,
                        duration_min: ex_row.duration_min,
                        avg_hr: ex_row.avg_hr,
                        max_hr: ex_row.max_hr,
                        sets,
                        completed_items: items.into_iter().map(|(t,)| t).collect(),
                    },
                );
            }

            out.push(LogRecord {
                date: parse_date(&row.date)?,
                last_modified,
                log,
            });
        }
        Ok(out)
    }
}

async fn insert_exercise_log_tx(
    tx: &mut Transaction<'_, Sqlite>,
    log_id: i64,
    exercise_key: &str,
    entry: &ExerciseLog,
    modified_by: Option<&str>,
    timestamp: DateTime<Utc>,
) -> Result<(), StoreError> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO exercise_logs
            (session_log_id, exercise_key, completed, user_note, duration_min,
             avg_hr, max_hr, last_modified, modified_by)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(log_id)
    .bind(exercise_key)
    .bind(entry.completed)
    .bind(&entry.user_note)
    .bind(entry.duration_min)
    .bind(entry.avg_hr)
    .bind(entry.max_hr)
    .bind(format_ts(timestamp))
    .bind(modified_by)
    .fetch_one(&mut **tx)
    .await?;

    for set in &entry.sets {
        sqlx::query(
            "INSERT INTO set_logs
                (exercise_log_id, set_num, weight, reps, rpe, unit, duration_sec, completed)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(row.0)
        .bind(set.set_num)
        .bind(set.weight)
        .bind(set.reps)
        .bind(set.rpe)
        .bind(set.unit.as_deref())
        .bind(set.duration_sec)
        .bind(set.completed)
        .execute(&mut **tx)
        .await?;
    }

    for item in &entry.completed_items {
        sqlx::query("INSERT INTO checklist_log_items (exercise_log_id, item_text) VALUES (?, ?)")
            .bind(row.0)
            .bind(item)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}
