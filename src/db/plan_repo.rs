//! Plan repository.
//!
//! Planner-authoritative side of the store. Writing a plan for a date always
//! replaces the whole session (delete + re-insert inside one transaction);
//! the cascade constraints take the blocks, exercises, and checklist items
//! with it. Every mutation refreshes `last_modified`/`modified_by` on the
//! session row so sync can pick the date up.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, Transaction};
use std::collections::BTreeMap;

use super::{format_date, format_ts, parse_date, parse_ts, Reader, Writer};
use crate::error::StoreError;
use crate::models::{Block, Exercise, ExerciseType, Plan, RawPlan};
use crate::transform::normalize;

/// A stored plan together with its sync timestamp.
#[derive(Debug, Clone)]
pub struct PlanRecord {
    pub date: NaiveDate,
    pub last_modified: DateTime<Utc>,
    pub plan: Plan,
}

/// Partial session-level update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanMetadata {
    pub day_name: Option<String>,
    pub location: Option<String>,
    pub phase: Option<String>,
    pub total_duration_min: Option<i64>,
}

/// Partial exercise update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExercisePatch {
    pub name: Option<String>,
    pub target_sets: Option<i64>,
    pub target_reps: Option<String>,
    pub target_duration_min: Option<i64>,
    pub target_duration_sec: Option<i64>,
    pub rounds: Option<i64>,
    pub work_duration_sec: Option<i64>,
    pub rest_duration_sec: Option<i64>,
    pub guidance_note: Option<String>,
    pub hide_weight: Option<bool>,
    pub show_time: Option<bool>,
    pub items: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub days: i64,
    pub planned_sessions: i64,
    pub completed_sessions: i64,
    pub exercise_types: BTreeMap<String, i64>,
    pub recent_dates: Vec<NaiveDate>,
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: i64,
    date: String,
    day_name: String,
    location: Option<String>,
    phase: Option<String>,
    duration_min: Option<i64>,
    last_modified: String,
    extra: Option<String>,
}

#[derive(sqlx::FromRow)]
struct BlockRow {
    id: i64,
    position: i64,
    block_type: String,
    title: Option<String>,
    duration_min: Option<i64>,
    rest_guidance: Option<String>,
    rounds: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct ExerciseRow {
    id: i64,
    block_id: i64,
    exercise_key: String,
    name: String,
    exercise_type: String,
    target_sets: Option<i64>,
    target_reps: Option<String>,
    target_duration_min: Option<i64>,
    target_duration_sec: Option<i64>,
    rounds: Option<i64>,
    work_duration_sec: Option<i64>,
    rest_duration_sec: Option<i64>,
    guidance_note: Option<String>,
    hide_weight: bool,
    show_time: bool,
    extra: Option<String>,
}

impl Writer {
    /// Normalizes raw plan input and stores it as the plan for `date`,
    /// replacing any existing plan. Returns the normalized plan.
    pub async fn set_plan(
        &self,
        date: NaiveDate,
        raw: &RawPlan,
        modified_by: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Plan, StoreError> {
        let plan = normalize(raw)?;

        let mut tx = self.pool.begin().await?;
        insert_plan_tx(&mut tx, date, &plan, modified_by, now).await?;
        tx.commit().await?;

        Ok(plan)
    }

    /// Stores an already-normalized plan, replacing any existing plan for the
    /// date. Used when applying downloaded plans, which are authoritative and
    /// carry their own timestamp.
    pub async fn set_normalized_plan(
        &self,
        date: NaiveDate,
        plan: &Plan,
        modified_by: Option<&str>,
        last_modified: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        insert_plan_tx(&mut tx, date, plan, modified_by, last_modified).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Deletes the plan for a date. Logs for the date are untouched.
    pub async fn delete_plan(&self, date: NaiveDate) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM workout_sessions WHERE date = ?")
            .bind(format_date(date))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("no plan for {}", date)));
        }
        Ok(())
    }

    /// Updates session-level fields without touching blocks or exercises.
    pub async fn update_metadata(
        &self,
        date: NaiveDate,
        meta: &PlanMetadata,
        modified_by: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE workout_sessions SET
                day_name = COALESCE(?, day_name),
                location = COALESCE(?, location),
                phase = COALESCE(?, phase),
                duration_min = COALESCE(?, duration_min),
                last_modified = ?, modified_by = ?
             WHERE date = ?",
        )
        .bind(&meta.day_name)
        .bind(&meta.location)
        .bind(&meta.phase)
        .bind(meta.total_duration_min)
        .bind(format_ts(now))
        .bind(modified_by)
        .bind(format_date(date))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("no plan for {}", date)));
        }
        Ok(())
    }

    /// Adds a normalized exercise to an existing block. `position` defaults
    /// to the end of the block; inserting mid-block shifts later exercises.
    pub async fn add_exercise(
        &self,
        date: NaiveDate,
        block_index: i64,
        exercise: &Exercise,
        position: Option<i64>,
        modified_by: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let session_id = session_id_tx(&mut tx, date).await?;
        let block_id: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM session_blocks WHERE session_id = ? AND position = ?",
        )
        .bind(session_id)
        .bind(block_index)
        .fetch_optional(&mut *tx)
        .await?;
        let block_id = block_id
            .ok_or_else(|| StoreError::NotFound(format!("no block {} on {}", block_index, date)))?
            .0;

        let exists: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM planned_exercises WHERE session_id = ? AND exercise_key = ?",
        )
        .bind(session_id)
        .bind(&exercise.id)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_some() {
            return Err(StoreError::Validation(format!(
                "exercise key '{}' already exists on {}",
                exercise.id, date
            )));
        }

        let end: (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM planned_exercises WHERE block_id = ?",
        )
        .bind(block_id)
        .fetch_one(&mut *tx)
        .await?;
        let position = position.unwrap_or(end.0).clamp(0, end.0);

        // Two-step shift keeps the (block_id, position) unique constraint
        // satisfied mid-update.
        sqlx::query(
            "UPDATE planned_exercises SET position = -(position + 2)
             WHERE block_id = ? AND position >= ?",
        )
        .bind(block_id)
        .bind(position)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "UPDATE planned_exercises SET position = -position - 1 WHERE block_id = ? AND position < 0",
        )
        .bind(block_id)
        .execute(&mut *tx)
        .await?;

        insert_exercise_tx(&mut tx, session_id, block_id, position, exercise).await?;
        touch_session_tx(&mut tx, session_id, modified_by, now).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Applies a partial update to a planned exercise.
    pub async fn update_exercise(
        &self,
        date: NaiveDate,
        exercise_key: &str,
        patch: &ExercisePatch,
        modified_by: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let session_id = session_id_tx(&mut tx, date).await?;
        let row: Option<ExerciseRow> = sqlx::query_as(
            "SELECT id, block_id, exercise_key, name, exercise_type,
                    target_sets, target_reps, target_duration_min, target_duration_sec,
                    rounds, work_duration_sec, rest_duration_sec, guidance_note,
                    hide_weight, show_time, extra
             FROM planned_exercises WHERE session_id = ? AND exercise_key = ?",
        )
        .bind(session_id)
        .bind(exercise_key)
        .fetch_optional(&mut *tx)
        .await?;
        let row = row.ok_or_else(|| {
            StoreError::NotFound(format!("no exercise '{}' on {}", exercise_key, date))
        })?;

        sqlx::query(
            "UPDATE planned_exercises SET
                name = ?, target_sets = ?, target_reps = ?,
                target_duration_min = ?, target_duration_sec = ?, rounds = ?,
                work_duration_sec = ?, rest_duration_sec = ?, guidance_note = ?,
                hide_weight = ?, show_time = ?
             WHERE id = ?",
        )
        .bind(patch.name.as_ref().unwrap_or(&row.name))
        .bind(patch.target_sets.or(row.target_sets))
        .bind(patch.target_reps.as_ref().or(row.target_reps.as_ref()))
        .bind(patch.target_duration_min.or(row.target_duration_min))
        .bind(patch.target_duration_sec.or(row.target_duration_sec))
        .bind(patch.rounds.or(row.rounds))
        .bind(patch.work_duration_sec.or(row.work_duration_sec))
        .bind(patch.rest_duration_sec.or(row.rest_duration_sec))
        .bind(patch.guidance_note.as_ref().or(row.guidance_note.as_ref()))
        .bind(patch.hide_weight.unwrap_or(row.hide_weight))
        .bind(patch.show_time.unwrap_or(row.show_time))
        .bind(row.id)
        .execute(&mut *tx)
        .await?;

        if let Some(items) = &patch.items {
            sqlx::query("DELETE FROM checklist_items WHERE exercise_id = ?")
                .bind(row.id)
                .execute(&mut *tx)
                .await?;
            for (i, item) in items.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO checklist_items (exercise_id, position, item_text) VALUES (?, ?, ?)",
                )
                .bind(row.id)
                .bind(i as i64)
                .bind(item)
                .execute(&mut *tx)
                .await?;
            }
        }

        touch_session_tx(&mut tx, session_id, modified_by, now).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Removes a planned exercise. Log entries recorded against its key are
    /// kept; the key is the only link and it is soft.
    pub async fn remove_exercise(
        &self,
        date: NaiveDate,
        exercise_key: &str,
        modified_by: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let session_id = session_id_tx(&mut tx, date).await?;
        let result = sqlx::query(
            "DELETE FROM planned_exercises WHERE session_id = ? AND exercise_key = ?",
        )
        .bind(session_id)
        .bind(exercise_key)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "no exercise '{}' on {}",
                exercise_key, date
            )));
        }

        touch_session_tx(&mut tx, session_id, modified_by, now).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Ingests a multi-day program in one transaction. Any invalid day aborts
    /// the whole batch before anything is written.
    pub async fn ingest_program(
        &self,
        entries: &[(NaiveDate, RawPlan)],
        modified_by: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        if entries.is_empty() {
            return Err(StoreError::Validation("program has no days".to_string()));
        }

        let mut normalized = Vec::with_capacity(entries.len());
        for (date, raw) in entries {
            let plan = normalize(raw)
                .map_err(|e| StoreError::Validation(format!("{}: {}", date, e)))?;
            normalized.push((*date, plan));
        }

        let mut tx = self.pool.begin().await?;
        for (date, plan) in &normalized {
            insert_plan_tx(&mut tx, *date, plan, modified_by, now).await?;
        }
        tx.commit().await?;

        Ok(normalized.len())
    }
}

impl Reader {
    pub async fn get_plan(&self, date: NaiveDate) -> Result<Option<PlanRecord>, StoreError> {
        let mut plans = self.get_plans(date, date).await?;
        Ok(plans.pop())
    }

    /// Plans for an inclusive date range, ordered by date.
    pub async fn get_plans(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PlanRecord>, StoreError> {
        let rows: Vec<SessionRow> = sqlx::query_as(
            "SELECT id, date, day_name, location, phase, duration_min, last_modified, extra
             FROM workout_sessions WHERE date >= ? AND date <= ? ORDER BY date",
        )
        .bind(format_date(start))
        .bind(format_date(end))
        .fetch_all(&self.pool)
        .await?;

        self.assemble_plan_records(rows).await
    }

    /// Plans whose session row changed strictly after `since`.
    pub async fn plans_modified_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<PlanRecord>, StoreError> {
        let rows: Vec<SessionRow> = sqlx::query_as(
            "SELECT id, date, day_name, location, phase, duration_min, last_modified, extra
             FROM workout_sessions WHERE last_modified > ? ORDER BY date",
        )
        .bind(format_ts(since))
        .fetch_all(&self.pool)
        .await?;

        self.assemble_plan_records(rows).await
    }

    pub async fn list_scheduled_dates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT date FROM workout_sessions WHERE date >= ? AND date <= ? ORDER BY date",
        )
        .bind(format_date(start))
        .bind(format_date(end))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|(d,)| parse_date(d)).collect()
    }

    /// Planned/completed counts and an exercise-type breakdown for the
    /// trailing `days` ending at `today`.
    pub async fn summary(&self, days: i64, today: NaiveDate) -> Result<PlanSummary, StoreError> {
        let start = today - Duration::days(days - 1);
        let (start_s, end_s) = (format_date(start), format_date(today));

        let planned: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM workout_sessions WHERE date >= ? AND date <= ?",
        )
        .bind(&start_s)
        .bind(&end_s)
        .fetch_one(&self.pool)
        .await?;

        let completed: (i64,) = sqlx::query_as(
            "SELECT COUNT(DISTINCT l.date) FROM workout_session_logs l
             JOIN exercise_logs e ON e.session_log_id = l.id
             WHERE l.date >= ? AND l.date <= ? AND e.completed = 1",
        )
        .bind(&start_s)
        .bind(&end_s)
        .fetch_one(&self.pool)
        .await?;

        let type_rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT pe.exercise_type, COUNT(*) FROM planned_exercises pe
             JOIN workout_sessions s ON s.id = pe.session_id
             WHERE s.date >= ? AND s.date <= ?
             GROUP BY pe.exercise_type",
        )
        .bind(&start_s)
        .bind(&end_s)
        .fetch_all(&self.pool)
        .await?;

        let recent: Vec<(String,)> = sqlx::query_as(
            "SELECT date FROM workout_sessions WHERE date <= ? ORDER BY date DESC LIMIT 7",
        )
        .bind(&end_s)
        .fetch_all(&self.pool)
        .await?;

        Ok(PlanSummary {
            days,
            planned_sessions: planned.0,
            completed_sessions: completed.0,
            exercise_types: type_rows.into_iter().collect(),
            recent_dates: recent
                .iter()
                .map(|(d,)| parse_date(d))
                .collect::<Result<_, _>>()?,
        })
    }

    async fn assemble_plan_records(
        &self,
        rows: Vec<SessionRow>,
    ) -> Result<Vec<PlanRecord>, StoreError> {
        let mut out = Vec::with_capacity(rows.len());
        for session in rows {
            let blocks: Vec<BlockRow> = sqlx::query_as(
                "SELECT id, position, block_type, title, duration_min, rest_guidance, rounds
                 FROM session_blocks WHERE session_id = ? ORDER BY position",
            )
            .bind(session.id)
            .fetch_all(&self.pool)
            .await?;

            let exercises: Vec<ExerciseRow> = sqlx::query_as(
                "SELECT id, block_id, exercise_key, name, exercise_type,
                        target_sets, target_reps, target_duration_min, target_duration_sec,
                        rounds, work_duration_sec, rest_duration_sec, guidance_note,
                        hide_weight, show_time, extra
                 FROM planned_exercises WHERE session_id = ? ORDER BY block_id, position",
            )
            .bind(session.id)
            .fetch_all(&self.pool)
            .await?;

            let items: Vec<(i64, String)> = sqlx::query_as(
                "SELECT ci.exercise_id, ci.item_text FROM checklist_items ci
                 JOIN planned_exercises pe ON pe.id = ci.exercise_id
                 WHERE pe.session_id = ? ORDER BY ci.exercise_id, ci.position",
            )
            .bind(session.id)
            .fetch_all(&self.pool)
            .await?;

            let mut items_by_exercise: BTreeMap<i64, Vec<String>> = BTreeMap::new();
            for (exercise_id, text) in items {
                items_by_exercise.entry(exercise_id).or_default().push(text);
            }

            let mut plan_blocks = Vec::with_capacity(blocks.len());
            for block in &blocks {
                let block_exercises = exercises
                    .iter()
                    .filter(|e| e.block_id == block.id)
                    .map(|e| exercise_from_row(e, &mut items_by_exercise))
                    .collect::<Result<Vec<_>, _>>()?;

                plan_blocks.push(Block {
                    block_index: block.position,
                    block_type: block.block_type.clone(),
                    title: block.title.clone(),
                    duration_min: block.duration_min,
                    rest_guidance: block.rest_guidance.clone().unwrap_or_default(),
                    rounds: block.rounds,
                    exercises: block_exercises,
                });
            }

            out.push(PlanRecord {
                date: parse_date(&session.date)?,
                last_modified: parse_ts(&session.last_modified)?,
                plan: Plan {
                    day_name: session.day_name,
                    location: session.location,
                    phase: session.phase,
                    total_duration_min: session.duration_min,
                    blocks: plan_blocks,
                    extra: parse_extra(session.extra.as_deref())?,
                },
            });
        }
        Ok(out)
    }
}

fn exercise_from_row(
    row: &ExerciseRow,
    items_by_exercise: &mut BTreeMap<i64, Vec<String>>,
) -> Result<Exercise, StoreError> {
    let kind: ExerciseType = row
        .exercise_type
        .parse()
        .map_err(|e: String| StoreError::Validation(e))?;

    Ok(Exercise {
        target_sets: row.target_sets,
        target_reps: row.target_reps.clone(),
        target_duration_min: row.target_duration_min,
        target_duration_sec: row.target_duration_sec,
        rounds: row.rounds,
        work_duration_sec: row.work_duration_sec,
        rest_duration_sec: row.rest_duration_sec,
        guidance_note: row.guidance_note.clone(),
        hide_weight: row.hide_weight,
        show_time: row.show_time,
        items: items_by_exercise.remove(&row.id).unwrap_or_default(),
        extra: parse_extra(row.extra.as_deref())?,
        ..Exercise::new(row.exercise_key.clone(), row.name.clone(), kind)
    })
}

fn parse_extra(raw: Option<&str>) -> Result<serde_json::Map<String, serde_json::Value>, StoreError> {
    match raw {
        Some(s) if !s.is_empty() => Ok(serde_json::from_str(s)?),
        _ => Ok(serde_json::Map::new()),
    }
}

fn serialize_extra(
    extra: &serde_json::Map<String, serde_json::Value>,
) -> Result<Option<String>, StoreError> {
    if extra.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(extra)?))
    }
}

async fn session_id_tx(
    tx: &mut Transaction<'_, Sqlite>,
    date: NaiveDate,
) -> Result<i64, StoreError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM workout_sessions WHERE date = ?")
        .bind(format_date(date))
        .fetch_optional(&mut **tx)
        .await?;
    row.map(|(id,)| id)
        .ok_or_else(|| StoreError::NotFound(format!("no plan for {}", date)))
}

async fn touch_session_tx(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: i64,
    modified_by: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    sqlx::query("UPDATE workout_sessions SET last_modified = ?, modified_by = ? WHERE id = ?")
        .bind(format_ts(now))
        .bind(modified_by)
        .bind(session_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Replaces the session for `date` with `plan` inside the caller's
/// transaction.
pub(super) async fn insert_plan_tx(
    tx: &mut Transaction<'_, Sqlite>,
    date: NaiveDate,
    plan: &Plan,
    modified_by: Option<&str>,
    last_modified: DateTime<Utc>,
) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM workout_sessions WHERE date = ?")
        .bind(format_date(date))
        .execute(&mut **tx)
        .await?;

    let session_id: (i64,) = sqlx::query_as(
        "INSERT INTO workout_sessions
            (date, day_name, location, phase, duration_min, last_modified, modified_by, extra)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(format_date(date))
    .bind(&plan.day_name)
    .bind(&plan.location)
    .bind(&plan.phase)
    .bind(plan.total_duration_min)
    .bind(format_ts(last_modified))
    .bind(modified_by)
    .bind(serialize_extra(&plan.extra)?)
    .fetch_one(&mut **tx)
    .await?;
    let session_id = session_id.0;

    for (position, block) in plan.blocks.iter().enumerate() {
        let block_id: (i64,) = sqlx::query_as(
            "INSERT INTO session_blocks
                (session_id, position, block_type, title, duration_min, rest_guidance, rounds)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(session_id)
        .bind(position as i64)
        .bind(&block.block_type)
        .bind(&block.title)
        .bind(block.duration_min)
        .bind(if block.rest_guidance.is_empty() {
            None
        } else {
            Some(block.rest_guidance.as_str())
        })
        .bind(block.rounds)
        .fetch_one(&mut **tx)
        .await?;

        for (ex_position, exercise) in block.exercises.iter().enumerate() {
            insert_exercise_tx(tx, session_id, block_id.0, ex_position as i64, exercise).await?;
        }
    }

    Ok(())
}

async fn insert_exercise_tx(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: i64,
    block_id: i64,
    position: i64,
    exercise: &Exercise,
) -> Result<(), StoreError> {
    let exercise_id: (i64,) = sqlx::query_as(
        "INSERT INTO planned_exercises
            (session_id, block_id, exercise_key, position, name, exercise_type,
             target_sets, target_reps, target_duration_min, target_duration_sec,
             rounds, work_duration_sec, rest_duration_sec, guidance_note,
             hide_weight, show_time, extra)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(session_id)
    .bind(block_id)
    .bind(&exercise.id)
    .bind(position)
    .bind(&exercise.name)
    .bind(exercise.kind.as_str())
    .bind(exercise.target_sets)
    .bind(&exercise.target_reps)
    .bind(exercise.target_duration_min)
    .bind(exercise.target_duration_sec)
    .bind(exercise.rounds)
    .bind(exercise.work_duration_sec)
    .bind(exercise.rest_duration_sec)
    .bind(&exercise.guidance_note)
    .bind(exercise.hide_weight)
    .bind(exercise.show_time)
    .bind(serialize_extra(&exercise.extra)?)
    .fetch_one(&mut **tx)
    .await?;

    for (i, item) in exercise.items.iter().enumerate() {
        sqlx::query("INSERT INTO checklist_items (exercise_id, position, item_text) VALUES (?, ?, ?)")
            .bind(exercise_id.0)
            .bind(i as i64)
            .bind(item)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn t(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn sample_raw() -> RawPlan {
        serde_json::from_str(
            r#"{"day_name": "Lower Body", "blocks": [
                {"block_type": "warmup",
                 "exercises": [{"name": "Cat-Cow", "reps": 10}]},
                {"block_type": "strength", "rest_guidance": "Rest 2 min",
                 "exercises": [{"name": "Squat", "sets": 4, "reps": "6-8"},
                               {"name": "RDL", "sets": 3, "reps": 10}]}]}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_set_plan_get_plans_roundtrip() {
        let (reader, writer) = init_test_db().await;
        let now = t("2026-03-01T10:00:00Z");

        let stored = writer
            .set_plan(d("2026-03-02"), &sample_raw(), Some("cli"), now)
            .await
            .unwrap();

        let records = reader.get_plans(d("2026-03-01"), d("2026-03-05")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, d("2026-03-02"));
        assert_eq!(records[0].last_modified, now);
        assert_eq!(records[0].plan, stored);
        assert_eq!(records[0].plan.blocks[1].exercises[0].id, "strength_1_1");
    }

    #[tokio::test]
    async fn test_set_plan_replaces_existing() {
        let (reader, writer) = init_test_db().await;
        let date = d("2026-03-02");

        writer
            .set_plan(date, &sample_raw(), None, t("2026-03-01T10:00:00Z"))
            .await
            .unwrap();

        let smaller: RawPlan = serde_json::from_str(
            r#"{"day_name": "Recovery", "blocks": [
                {"block_type": "cardio", "duration_min": 30,
                 "instructions": ["Zone 2 walk"]}]}"#,
        )
        .unwrap();
        writer
            .set_plan(date, &smaller, None, t("2026-03-01T11:00:00Z"))
            .await
            .unwrap();

        let record = reader.get_plan(date).await.unwrap().unwrap();
        assert_eq!(record.plan.day_name, "Recovery");
        assert_eq!(record.plan.blocks.len(), 1);

        // Old rows are gone, not orphaned.
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM planned_exercises")
            .fetch_one(&reader.pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_delete_plan_cascades() {
        let (reader, writer) = init_test_db().await;
        let date = d("2026-03-02");
        writer
            .set_plan(date, &sample_raw(), None, t("2026-03-01T10:00:00Z"))
            .await
            .unwrap();

        writer.delete_plan(date).await.unwrap();

        for table in ["workout_sessions", "session_blocks", "planned_exercises", "checklist_items"] {
            let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&reader.pool)
                .await
                .unwrap();
            assert_eq!(count.0, 0, "{} not empty", table);
        }

        assert!(matches!(
            writer.delete_plan(date).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_metadata_partial() {
        let (reader, writer) = init_test_db().await;
        let date = d("2026-03-02");
        writer
            .set_plan(date, &sample_raw(), None, t("2026-03-01T10:00:00Z"))
            .await
            .unwrap();

        let meta = PlanMetadata {
            location: Some("Gym".to_string()),
            ..PlanMetadata::default()
        };
        writer
            .update_metadata(date, &meta, Some("cli"), t("2026-03-01T11:00:00Z"))
            .await
            .unwrap();

        let record = reader.get_plan(date).await.unwrap().unwrap();
        assert_eq!(record.plan.location.as_deref(), Some("Gym"));
        assert_eq!(record.plan.day_name, "Lower Body"); // untouched
        assert_eq!(record.last_modified, t("2026-03-01T11:00:00Z"));
    }

    #[tokio::test]
    async fn test_add_update_remove_exercise() {
        let (reader, writer) = init_test_db().await;
        let date = d("2026-03-02");
        writer
            .set_plan(date, &sample_raw(), None, t("2026-03-01T10:00:00Z"))
            .await
            .unwrap();

        let extra = Exercise {
            target_sets: Some(3),
            ..Exercise::new("strength_1_extra", "Split Squat", ExerciseType::Strength)
        };
        writer
            .add_exercise(date, 1, &extra, Some(1), None, t("2026-03-01T11:00:00Z"))
            .await
            .unwrap();

        let plan = reader.get_plan(date).await.unwrap().unwrap().plan;
        let keys: Vec<_> = plan.blocks[1].exercises.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(keys, vec!["strength_1_1", "strength_1_extra", "strength_1_2"]);

        // Duplicate key rejected
        assert!(matches!(
            writer
                .add_exercise(date, 1, &extra, None, None, t("2026-03-01T11:30:00Z"))
                .await,
            Err(StoreError::Validation(_))
        ));

        let patch = ExercisePatch {
            target_reps: Some("8/side".to_string()),
            ..ExercisePatch::default()
        };
        writer
            .update_exercise(date, "strength_1_extra", &patch, None, t("2026-03-01T12:00:00Z"))
            .await
            .unwrap();
        let plan = reader.get_plan(date).await.unwrap().unwrap().plan;
        let ex = plan.blocks[1]
            .exercises
            .iter()
            .find(|e| e.id == "strength_1_extra")
            .unwrap();
        assert_eq!(ex.target_reps.as_deref(), Some("8/side"));
        assert_eq!(ex.target_sets, Some(3)); // untouched

        writer
            .remove_exercise(date, "strength_1_extra", None, t("2026-03-01T13:00:00Z"))
            .await
            .unwrap();
        assert!(matches!(
            writer
                .remove_exercise(date, "strength_1_extra", None, t("2026-03-01T13:00:00Z"))
                .await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ingest_program_all_or_nothing() {
        let (reader, writer) = init_test_db().await;

        let bad: RawPlan = serde_json::from_str(r#"{"day_name": "Broken"}"#).unwrap();
        let result = writer
            .ingest_program(
                &[(d("2026-03-02"), sample_raw()), (d("2026-03-03"), bad)],
                None,
                t("2026-03-01T10:00:00Z"),
            )
            .await;
        assert!(matches!(result, Err(StoreError::Validation(_))));

        let records = reader.get_plans(d("2026-03-01"), d("2026-03-10")).await.unwrap();
        assert!(records.is_empty());

        let count = writer
            .ingest_program(
                &[(d("2026-03-02"), sample_raw()), (d("2026-03-04"), sample_raw())],
                None,
                t("2026-03-01T10:00:00Z"),
            )
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            reader.list_scheduled_dates(d("2026-03-01"), d("2026-03-10")).await.unwrap(),
            vec![d("2026-03-02"), d("2026-03-04")]
        );
    }

    #[tokio::test]
    async fn test_plans_modified_since_window() {
        let (reader, writer) = init_test_db().await;
        writer
            .set_plan(d("2026-03-02"), &sample_raw(), None, t("2026-03-01T10:00:00Z"))
            .await
            .unwrap();
        writer
            .set_plan(d("2026-03-03"), &sample_raw(), None, t("2026-03-01T12:00:00Z"))
            .await
            .unwrap();

        let changed = reader
            .plans_modified_since(t("2026-03-01T10:00:00Z"))
            .await
            .unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].date, d("2026-03-03"));
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let (reader, writer) = init_test_db().await;
        writer
            .set_plan(d("2026-03-02"), &sample_raw(), None, t("2026-03-01T10:00:00Z"))
            .await
            .unwrap();

        let summary = reader.summary(7, d("2026-03-05")).await.unwrap();
        assert_eq!(summary.planned_sessions, 1);
        assert_eq!(summary.completed_sessions, 0);
        assert_eq!(summary.exercise_types.get("strength"), Some(&2));
        assert_eq!(summary.exercise_types.get("checklist"), Some(&1));
        assert_eq!(summary.recent_dates, vec![d("2026-03-02")]);
    }
}
