//! Block transform normalizer.
//!
//! Converts loosely-structured authored plan input ([`RawPlan`]) into the
//! strict normalized shape ([`Plan`]) the relational schema depends on. Pure
//! and deterministic: the only failure modes are malformed input (missing
//! `blocks`, a block with no `block_type`, an invalid exercise type on
//! passthrough, or a duplicate exercise id).
//!
//! Detection is per block: a block whose exercises all carry `id` + `type`
//! passes through untouched, so running `normalize` on its own output is a
//! no-op and exercise keys never get regenerated once assigned.

use serde_json::Value;
use std::collections::HashSet;
use std::str::FromStr;

use crate::models::{Block, Exercise, ExerciseType, Plan, RawBlock, RawExercise, RawPlan};

/// Errors raised for malformed plan input.
#[derive(Debug)]
pub enum TransformError {
    /// The plan has no `blocks` array.
    MissingBlocks,
    /// A block has no `block_type` field.
    MissingBlockType { block: usize },
    /// A block's `block_type` is not in the known vocabulary.
    UnknownBlockType { block: usize, value: String },
    /// A block has neither exercises nor instructions.
    EmptyBlock { block: usize },
    /// A passthrough exercise declares a type outside the closed vocabulary.
    InvalidExerciseType { block: usize, value: String },
    /// Two exercises in the plan share an id.
    DuplicateExerciseId { id: String },
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformError::MissingBlocks => write!(f, "Plan must have a 'blocks' array"),
            TransformError::MissingBlockType { block } => {
                write!(f, "Block {} missing 'block_type' field", block)
            }
            TransformError::UnknownBlockType { block, value } => {
                write!(f, "Block {} has unknown block_type '{}'", block, value)
            }
            TransformError::EmptyBlock { block } => {
                write!(f, "Block {} must have either exercises or instructions", block)
            }
            TransformError::InvalidExerciseType { block, value } => {
                write!(f, "Block {} has invalid exercise type '{}'", block, value)
            }
            TransformError::DuplicateExerciseId { id } => {
                write!(f, "Duplicate exercise id '{}' in plan", id)
            }
        }
    }
}

impl std::error::Error for TransformError {}

/// The block vocabulary. Each variant has exactly one transform handler, so
/// adding a block type forces a handler decision at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Warmup,
    Strength,
    Accessory,
    Circuit,
    Power,
    Cardio,
}

type BlockHandler = fn(&RawBlock, &str, usize) -> Vec<Exercise>;

impl BlockType {
    fn handler(&self) -> BlockHandler {
        match self {
            BlockType::Warmup => collapse_warmup,
            BlockType::Strength | BlockType::Accessory => expand_strength,
            BlockType::Circuit | BlockType::Power => expand_circuit,
            BlockType::Cardio => expand_cardio,
        }
    }
}

impl FromStr for BlockType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warmup" => Ok(BlockType::Warmup),
            "strength" => Ok(BlockType::Strength),
            "accessory" => Ok(BlockType::Accessory),
            "circuit" => Ok(BlockType::Circuit),
            "power" => Ok(BlockType::Power),
            "cardio" => Ok(BlockType::Cardio),
            other => Err(format!("unknown block type '{}'", other)),
        }
    }
}

/// Normalizes a raw plan. Idempotent on normalized input.
pub fn normalize(raw: &RawPlan) -> Result<Plan, TransformError> {
    let raw_blocks = raw.blocks.as_ref().ok_or(TransformError::MissingBlocks)?;

    let mut blocks = Vec::with_capacity(raw_blocks.len());
    for (i, rb) in raw_blocks.iter().enumerate() {
        let type_str = rb
            .block_type
            .as_deref()
            .ok_or(TransformError::MissingBlockType { block: i })?;
        let block_type: BlockType =
            type_str
                .parse()
                .map_err(|_| TransformError::UnknownBlockType {
                    block: i,
                    value: type_str.to_string(),
                })?;

        if rb.exercises.is_empty() && rb.instructions.is_empty() {
            return Err(TransformError::EmptyBlock { block: i });
        }

        let exercises = if block_needs_transform(rb) {
            block_type.handler()(rb, type_str, i)
        } else {
            passthrough(rb, i)?
        };

        blocks.push(Block {
            block_index: i as i64,
            block_type: type_str.to_string(),
            title: rb.title.clone(),
            duration_min: rb.duration_min,
            rest_guidance: rb.rest_guidance.clone().unwrap_or_default(),
            rounds: rb.rounds,
            exercises,
        });
    }

    let plan = Plan {
        // A theme set by the author wins over any carried-over day_name.
        day_name: raw
            .theme
            .clone()
            .or_else(|| raw.day_name.clone())
            .unwrap_or_else(|| "Workout".to_string()),
        location: raw.location.clone(),
        phase: raw.phase.clone(),
        total_duration_min: raw.total_duration_min,
        blocks,
        extra: raw.extra.clone(),
    };

    check_unique_ids(&plan)?;
    Ok(plan)
}

/// True when any exercise is missing `id`/`type`, or the block is described
/// only by free-text instructions.
fn block_needs_transform(block: &RawBlock) -> bool {
    if block.exercises.is_empty() {
        return !block.instructions.is_empty();
    }
    block.exercises.iter().any(|e| !e.is_normalized())
}

fn check_unique_ids(plan: &Plan) -> Result<(), TransformError> {
    let mut seen = HashSet::new();
    for block in &plan.blocks {
        for ex in &block.exercises {
            if !seen.insert(ex.id.as_str()) {
                return Err(TransformError::DuplicateExerciseId { id: ex.id.clone() });
            }
        }
    }
    Ok(())
}

/// Converts an already-normalized block without touching keys or order.
fn passthrough(block: &RawBlock, index: usize) -> Result<Vec<Exercise>, TransformError> {
    let mut out = Vec::with_capacity(block.exercises.len());
    for raw in &block.exercises {
        // block_needs_transform guarantees id and type are present here
        let id = raw.id.clone().unwrap_or_default();
        let type_str = raw.kind.as_deref().unwrap_or_default();
        let kind =
            ExerciseType::from_str(type_str).map_err(|_| TransformError::InvalidExerciseType {
                block: index,
                value: type_str.to_string(),
            })?;

        out.push(Exercise {
            target_sets: raw.target_sets,
            target_reps: raw.target_reps.clone(),
            target_duration_min: raw.target_duration_min,
            target_duration_sec: raw.target_duration_sec,
            rounds: raw.rounds,
            work_duration_sec: raw.work_duration_sec,
            rest_duration_sec: raw.rest_duration_sec,
            guidance_note: raw.guidance_note.clone(),
            hide_weight: raw.hide_weight.unwrap_or(false),
            show_time: raw.show_time.unwrap_or(false),
            items: raw.items.clone(),
            extra: raw.extra.clone(),
            ..Exercise::new(id, raw.name.clone().unwrap_or_else(|| "Unknown".to_string()), kind)
        });
    }
    Ok(out)
}

/// Warmup blocks collapse into one synthetic checklist exercise whose items
/// are the ordered exercise names of the block.
fn collapse_warmup(block: &RawBlock, _type_str: &str, index: usize) -> Vec<Exercise> {
    let items = block
        .exercises
        .iter()
        .map(|ex| {
            let name = ex.name.clone().unwrap_or_else(|| "Unknown".to_string());
            match &ex.reps {
                Some(Value::Number(n)) => format!("{} x{}", name, n),
                Some(Value::String(s)) if !s.is_empty() => format!("{} {}", name, s),
                _ => name,
            }
        })
        .collect();

    let title = block.title.clone().unwrap_or_else(|| "Warmup".to_string());
    vec![Exercise {
        items,
        ..Exercise::new(format!("warmup_{}", index), title, ExerciseType::Checklist)
    }]
}

/// Strength and accessory blocks expand to independent strength exercises.
fn expand_strength(block: &RawBlock, type_str: &str, index: usize) -> Vec<Exercise> {
    expand_lifts(block, type_str, index, None)
}

/// Circuit and power blocks expand like strength, but the block-level
/// `rounds` value backfills `target_sets` for exercises without their own.
fn expand_circuit(block: &RawBlock, type_str: &str, index: usize) -> Vec<Exercise> {
    expand_lifts(block, type_str, index, block.rounds)
}

fn expand_lifts(
    block: &RawBlock,
    type_str: &str,
    index: usize,
    fallback_sets: Option<i64>,
) -> Vec<Exercise> {
    let rest_guidance = block.rest_guidance.as_deref().unwrap_or_default();

    block
        .exercises
        .iter()
        .enumerate()
        .map(|(j, raw)| {
            let name = raw.name.clone().unwrap_or_else(|| "Unknown".to_string());
            let mut ex = Exercise::new(
                format!("{}_{}_{}", type_str, index, j + 1),
                name.clone(),
                ExerciseType::Strength,
            );

            // Exercise-level sets always win over the block rounds fallback.
            ex.target_sets = match &raw.sets {
                Some(Value::Number(n)) => n.as_i64(),
                Some(_) => Some(3),
                None => fallback_sets,
            };

            if let Some(reps) = &raw.reps {
                let reps_str = match reps {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                if reps_str.to_lowercase().contains("sec") {
                    ex.show_time = true;
                }
                ex.target_reps = Some(reps_str);
            }

            ex.hide_weight = derive_hide_weight(raw.equipment.as_deref(), &name);

            let mut notes: Vec<String> = Vec::new();
            if let Some(tempo) = &raw.tempo {
                notes.push(format!("Tempo {}", tempo));
            }
            if let Some(load) = &raw.load_guide {
                notes.push(load.clone());
            }
            if let Some(n) = &raw.notes {
                notes.push(n.clone());
            }
            if type_str == "strength" && !rest_guidance.is_empty() {
                notes.push(rest_guidance.to_string());
            }
            if !notes.is_empty() {
                ex.guidance_note = Some(notes.join(". "));
            }

            ex
        })
        .collect()
}

/// Cardio blocks carrying free-text instructions become a single duration or
/// interval exercise depending on whether the text reads as repeating
/// work/rest or one continuous effort.
fn expand_cardio(block: &RawBlock, type_str: &str, index: usize) -> Vec<Exercise> {
    // A cardio block authored with exercise entries instead of instruction
    // lines becomes one duration exercise per entry.
    if block.instructions.is_empty() {
        return block
            .exercises
            .iter()
            .enumerate()
            .map(|(j, raw)| {
                let name = raw.name.clone().unwrap_or_else(|| "Cardio".to_string());
                let mut ex = Exercise::new(
                    format!("{}_{}_{}", type_str, index, j + 1),
                    name,
                    ExerciseType::Duration,
                );
                ex.target_duration_min = raw.target_duration_min.or(block.duration_min);
                ex.guidance_note = raw.notes.clone();
                ex
            })
            .collect();
    }

    let text = block.instructions.join(" ");
    let guidance = block.instructions.join(" | ");

    let mut ex = match parse_interval(&text) {
        Some(interval) => {
            let title = block
                .title
                .clone()
                .unwrap_or_else(|| "VO2 Max Intervals".to_string());
            let mut ex = Exercise::new(
                format!("{}_{}_1", type_str, index),
                title,
                ExerciseType::Interval,
            );
            ex.rounds = interval.rounds;
            ex.work_duration_sec = interval.work_sec;
            ex.rest_duration_sec = interval.rest_sec;
            ex
        }
        None => {
            let title = block
                .title
                .clone()
                .unwrap_or_else(|| "Zone 2 Cardio".to_string());
            let mut ex = Exercise::new(
                format!("{}_{}_1", type_str, index),
                title,
                ExerciseType::Duration,
            );
            ex.target_duration_min = block.duration_min;
            ex
        }
    };

    if !guidance.is_empty() {
        ex.guidance_note = Some(guidance);
    }
    vec![ex]
}

/// Equipment is authoritative when declared; otherwise fall back to a
/// best-effort name vocabulary for bodyweight/band movements.
fn derive_hide_weight(equipment: Option<&str>, name: &str) -> bool {
    match equipment {
        Some(eq) => matches!(eq, "bodyweight" | "band"),
        None => is_bodyweight_or_band(name),
    }
}

const BODYWEIGHT_KEYWORDS: &[&str] = &[
    "push-up",
    "pushup",
    "push up",
    "bodyweight",
    "band",
    "jump squat",
    "plank",
    "dead hang",
    "wall sit",
    "glute bridge",
];

fn is_bodyweight_or_band(name: &str) -> bool {
    let lower = name.to_lowercase();
    BODYWEIGHT_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[derive(Debug, Default, PartialEq)]
struct IntervalSpec {
    rounds: Option<i64>,
    work_sec: Option<i64>,
    rest_sec: Option<i64>,
}

/// Reads an instruction line as repeating work/rest if it carries interval
/// markers ("VO2", "HARD", "4x ...") or a parseable work/rest pair
/// ("30 sec hard, 90 sec easy"). Returns None for continuous efforts.
fn parse_interval(text: &str) -> Option<IntervalSpec> {
    let lower = text.to_lowercase();
    let mut spec = IntervalSpec::default();

    let words: Vec<&str> = lower
        .split(|c: char| c.is_whitespace() || c == ',' || c == '/' || c == ':')
        .filter(|w| !w.is_empty())
        .collect();

    let mut pending_sec: Option<i64> = None;
    for (i, word) in words.iter().enumerate() {
        // "4x" or "4" followed by "rounds"/"intervals"
        if let Some(stripped) = word.strip_suffix('x') {
            if let Ok(n) = stripped.parse::<i64>() {
                spec.rounds = Some(n);
                continue;
            }
        }
        if let Ok(n) = word.parse::<i64>() {
            match words.get(i + 1).copied() {
                Some("rounds") | Some("round") | Some("intervals") => spec.rounds = Some(n),
                Some("sec") | Some("secs") | Some("seconds") | Some("s") => pending_sec = Some(n),
                _ => {}
            }
            continue;
        }
        if let Some(sec) = pending_sec {
            match *word {
                "on" | "work" | "hard" | "sprint" => {
                    spec.work_sec = Some(sec);
                    pending_sec = None;
                }
                "off" | "rest" | "easy" | "recovery" => {
                    spec.rest_sec = Some(sec);
                    pending_sec = None;
                }
                "sec" | "secs" | "seconds" | "s" => {}
                _ => pending_sec = None,
            }
        }
    }

    let keyword_interval = lower.contains("vo2") || text.contains("HARD");
    if keyword_interval || (spec.work_sec.is_some() && spec.rest_sec.is_some()) {
        Some(spec)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_plan(json: &str) -> RawPlan {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_warmup_collapses_to_checklist() {
        let raw = raw_plan(
            r#"{"blocks": [{"block_type": "warmup",
                "exercises": [{"name": "Cat-Cow"}, {"name": "Bird-Dog"}]}]}"#,
        );
        let plan = normalize(&raw).unwrap();

        assert_eq!(plan.blocks.len(), 1);
        let ex = &plan.blocks[0].exercises[0];
        assert_eq!(ex.id, "warmup_0");
        assert_eq!(ex.kind, ExerciseType::Checklist);
        assert_eq!(ex.items, vec!["Cat-Cow", "Bird-Dog"]);
    }

    #[test]
    fn test_warmup_items_render_reps() {
        let raw = raw_plan(
            r#"{"blocks": [{"block_type": "warmup", "title": "Stability Start",
                "exercises": [{"name": "Cat-Cow", "reps": 10},
                              {"name": "Bird-Dog", "reps": "x5/side"}]}]}"#,
        );
        let plan = normalize(&raw).unwrap();

        let ex = &plan.blocks[0].exercises[0];
        assert_eq!(ex.name, "Stability Start");
        assert_eq!(ex.items, vec!["Cat-Cow x10", "Bird-Dog x5/side"]);
    }

    #[test]
    fn test_strength_block_expands_exercises() {
        let raw = raw_plan(
            r#"{"blocks": [{"block_type": "strength", "rest_guidance": "Rest 2 min",
                "exercises": [{"name": "Bench Press", "sets": 4, "reps": "6-8",
                               "tempo": "3-1-1"},
                              {"name": "DB Row", "sets": 3, "reps": 10}]}]}"#,
        );
        let plan = normalize(&raw).unwrap();
        let exercises = &plan.blocks[0].exercises;

        assert_eq!(exercises[0].id, "strength_0_1");
        assert_eq!(exercises[1].id, "strength_0_2");
        assert_eq!(exercises[0].kind, ExerciseType::Strength);
        assert_eq!(exercises[0].target_sets, Some(4));
        assert_eq!(exercises[0].target_reps.as_deref(), Some("6-8"));
        assert_eq!(exercises[1].target_reps.as_deref(), Some("10"));
        assert_eq!(
            exercises[0].guidance_note.as_deref(),
            Some("Tempo 3-1-1. Rest 2 min")
        );
    }

    #[test]
    fn test_circuit_rounds_fallback_precedence() {
        let raw = raw_plan(
            r#"{"blocks": [{"block_type": "circuit", "rounds": 4,
                "exercises": [{"name": "KB Swing", "sets": 3},
                              {"name": "Goblet Squat"}]}]}"#,
        );
        let plan = normalize(&raw).unwrap();
        let exercises = &plan.blocks[0].exercises;

        // Exercise-level sets wins; sibling falls back to block rounds
        assert_eq!(exercises[0].target_sets, Some(3));
        assert_eq!(exercises[1].target_sets, Some(4));
        assert_eq!(exercises[0].id, "circuit_0_1");
    }

    #[test]
    fn test_equipment_overrides_name_heuristic() {
        let raw = raw_plan(
            r#"{"blocks": [{"block_type": "strength",
                "exercises": [{"name": "Push-Up Press", "equipment": "barbell"},
                              {"name": "Push-Up"},
                              {"name": "Overhead Press", "equipment": "bodyweight"}]}]}"#,
        );
        let plan = normalize(&raw).unwrap();
        let exercises = &plan.blocks[0].exercises;

        assert!(!exercises[0].hide_weight); // explicit barbell beats the name match
        assert!(exercises[1].hide_weight); // name heuristic
        assert!(exercises[2].hide_weight); // explicit bodyweight
    }

    #[test]
    fn test_show_time_for_timed_reps() {
        let raw = raw_plan(
            r#"{"blocks": [{"block_type": "strength",
                "exercises": [{"name": "Farmer's Carry", "sets": 2, "reps": "45 sec"}]}]}"#,
        );
        let plan = normalize(&raw).unwrap();
        assert!(plan.blocks[0].exercises[0].show_time);
    }

    #[test]
    fn test_cardio_instructions_continuous() {
        let raw = raw_plan(
            r#"{"blocks": [{"block_type": "cardio", "title": "Conditioning",
                "duration_min": 15,
                "instructions": ["Zone 2 bike, keep HR 135-148"]}]}"#,
        );
        let plan = normalize(&raw).unwrap();
        let ex = &plan.blocks[0].exercises[0];

        assert_eq!(ex.kind, ExerciseType::Duration);
        assert_eq!(ex.id, "cardio_0_1");
        assert_eq!(ex.target_duration_min, Some(15));
        assert_eq!(ex.guidance_note.as_deref(), Some("Zone 2 bike, keep HR 135-148"));
    }

    #[test]
    fn test_cardio_instructions_interval() {
        let raw = raw_plan(
            r#"{"blocks": [{"block_type": "cardio",
                "instructions": ["4x 30 sec hard, 90 sec easy on the bike"]}]}"#,
        );
        let plan = normalize(&raw).unwrap();
        let ex = &plan.blocks[0].exercises[0];

        assert_eq!(ex.kind, ExerciseType::Interval);
        assert_eq!(ex.rounds, Some(4));
        assert_eq!(ex.work_duration_sec, Some(30));
        assert_eq!(ex.rest_duration_sec, Some(90));
    }

    #[test]
    fn test_cardio_exercise_entries_become_duration() {
        let raw = raw_plan(
            r#"{"blocks": [{"block_type": "cardio", "duration_min": 25,
                "exercises": [{"name": "Incline Walk", "notes": "Keep HR in zone 2"}]}]}"#,
        );
        let plan = normalize(&raw).unwrap();
        let ex = &plan.blocks[0].exercises[0];

        assert_eq!(ex.id, "cardio_0_1");
        assert_eq!(ex.kind, ExerciseType::Duration);
        assert_eq!(ex.target_duration_min, Some(25));
        assert_eq!(ex.guidance_note.as_deref(), Some("Keep HR in zone 2"));
    }

    #[test]
    fn test_cardio_vo2_keyword_is_interval() {
        let raw = raw_plan(
            r#"{"blocks": [{"block_type": "cardio",
                "instructions": ["VO2 max session, all out efforts"]}]}"#,
        );
        let plan = normalize(&raw).unwrap();
        assert_eq!(plan.blocks[0].exercises[0].kind, ExerciseType::Interval);
        assert_eq!(plan.blocks[0].exercises[0].name, "VO2 Max Intervals");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = raw_plan(
            r#"{"theme": "Lower Body", "blocks": [
                {"block_type": "warmup",
                 "exercises": [{"name": "Cat-Cow", "reps": 10}]},
                {"block_type": "strength", "rest_guidance": "Rest 90 sec",
                 "exercises": [{"name": "Trap Bar Deadlift", "sets": 4, "reps": 5}]},
                {"block_type": "circuit", "rounds": 3,
                 "exercises": [{"name": "KB Swing"}]},
                {"block_type": "cardio", "duration_min": 20,
                 "instructions": ["Zone 2 elliptical"]}]}"#,
        );
        let once = normalize(&raw).unwrap();

        let reparsed: RawPlan =
            serde_json::from_value(serde_json::to_value(&once).unwrap()).unwrap();
        let twice = normalize(&reparsed).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_keys_stable_across_repeated_normalization() {
        let raw = raw_plan(
            r#"{"blocks": [{"block_type": "strength",
                "exercises": [{"name": "Squat", "sets": 3}, {"name": "Lunge"}]}]}"#,
        );
        let first = normalize(&raw).unwrap();
        let second = normalize(&raw).unwrap();

        let keys = |p: &Plan| {
            p.blocks
                .iter()
                .flat_map(|b| b.exercises.iter().map(|e| e.id.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(keys(&first), keys(&second));
        assert_eq!(keys(&first), vec!["strength_0_1", "strength_0_2"]);
    }

    #[test]
    fn test_partially_normalized_block_untouched() {
        // First block already normalized, second still raw: keys in the first
        // block must not be regenerated.
        let raw = raw_plan(
            r#"{"blocks": [
                {"block_type": "warmup",
                 "exercises": [{"id": "warmup_0", "name": "Stability", "type": "checklist",
                                "items": ["Cat-Cow x10"]}]},
                {"block_type": "strength",
                 "exercises": [{"name": "Squat", "sets": 3}]}]}"#,
        );
        let plan = normalize(&raw).unwrap();

        assert_eq!(plan.blocks[0].exercises[0].id, "warmup_0");
        assert_eq!(plan.blocks[0].exercises[0].items, vec!["Cat-Cow x10"]);
        assert_eq!(plan.blocks[1].exercises[0].id, "strength_1_1");
    }

    #[test]
    fn test_missing_blocks_rejected() {
        let raw = raw_plan(r#"{"day_name": "Workout"}"#);
        assert!(matches!(normalize(&raw), Err(TransformError::MissingBlocks)));
    }

    #[test]
    fn test_missing_block_type_rejected() {
        let raw = raw_plan(r#"{"blocks": [{"exercises": [{"name": "Squat"}]}]}"#);
        assert!(matches!(
            normalize(&raw),
            Err(TransformError::MissingBlockType { block: 0 })
        ));
    }

    #[test]
    fn test_unknown_block_type_rejected() {
        let raw = raw_plan(
            r#"{"blocks": [{"block_type": "yoga", "exercises": [{"name": "Pose"}]}]}"#,
        );
        assert!(matches!(
            normalize(&raw),
            Err(TransformError::UnknownBlockType { block: 0, .. })
        ));
    }

    #[test]
    fn test_empty_block_rejected() {
        let raw = raw_plan(r#"{"blocks": [{"block_type": "strength"}]}"#);
        assert!(matches!(normalize(&raw), Err(TransformError::EmptyBlock { block: 0 })));
    }

    #[test]
    fn test_invalid_passthrough_type_rejected() {
        let raw = raw_plan(
            r#"{"blocks": [{"block_type": "strength",
                "exercises": [{"id": "ex_1", "name": "Squat", "type": "mystery"}]}]}"#,
        );
        assert!(matches!(
            normalize(&raw),
            Err(TransformError::InvalidExerciseType { block: 0, .. })
        ));
    }

    #[test]
    fn test_duplicate_passthrough_id_rejected() {
        let raw = raw_plan(
            r#"{"blocks": [{"block_type": "strength",
                "exercises": [{"id": "ex_1", "name": "Squat", "type": "strength"},
                              {"id": "ex_1", "name": "Lunge", "type": "strength"}]}]}"#,
        );
        assert!(matches!(
            normalize(&raw),
            Err(TransformError::DuplicateExerciseId { .. })
        ));
    }

    #[test]
    fn test_theme_takes_precedence_for_day_name() {
        let raw = raw_plan(
            r#"{"theme": "Push Day", "day_name": "Day 3",
                "blocks": [{"block_type": "strength",
                "exercises": [{"name": "Bench"}]}]}"#,
        );
        assert_eq!(normalize(&raw).unwrap().day_name, "Push Day");

        let raw = raw_plan(
            r#"{"day_name": "Day 3", "blocks": [{"block_type": "strength",
                "exercises": [{"name": "Bench"}]}]}"#,
        );
        assert_eq!(normalize(&raw).unwrap().day_name, "Day 3");
    }

    #[test]
    fn test_parse_interval_shapes() {
        assert_eq!(
            parse_interval("4x 30 sec hard, 90 sec easy"),
            Some(IntervalSpec {
                rounds: Some(4),
                work_sec: Some(30),
                rest_sec: Some(90),
            })
        );
        assert_eq!(
            parse_interval("5 rounds of 40 sec on 20 sec off"),
            Some(IntervalSpec {
                rounds: Some(5),
                work_sec: Some(40),
                rest_sec: Some(20),
            })
        );
        assert_eq!(parse_interval("Steady Zone 2, 25 minutes"), None);
    }
}
