//! Workout plan model.
//!
//! A `Plan` is the normalized, relational-ready shape: blocks in order, every
//! exercise carrying a stable `id` (the exercise key) and a closed-vocabulary
//! `type`. The `Raw*` types are the loosely-structured authored input accepted
//! by the normalizer in [`crate::transform`]; they are a superset of the
//! normalized shape, so already-normalized JSON parses into them unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Closed vocabulary of normalized exercise types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseType {
    Strength,
    Duration,
    Checklist,
    WeightedTime,
    Interval,
}

impl ExerciseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseType::Strength => "strength",
            ExerciseType::Duration => "duration",
            ExerciseType::Checklist => "checklist",
            ExerciseType::WeightedTime => "weighted_time",
            ExerciseType::Interval => "interval",
        }
    }
}

impl FromStr for ExerciseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strength" => Ok(ExerciseType::Strength),
            "duration" => Ok(ExerciseType::Duration),
            "checklist" => Ok(ExerciseType::Checklist),
            "weighted_time" => Ok(ExerciseType::WeightedTime),
            "interval" => Ok(ExerciseType::Interval),
            other => Err(format!("unknown exercise type '{}'", other)),
        }
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The plan for one calendar date (the Session), normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub day_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration_min: Option<i64>,
    pub blocks: Vec<Block>,
    #[serde(default, flatten, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// An ordered grouping of exercises within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub block_index: i64,
    pub block_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_min: Option<i64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rest_guidance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounds: Option<i64>,
    pub exercises: Vec<Exercise>,
}

/// A normalized planned exercise. `id` is the exercise key: unique within the
/// session and the sole join point between plan and log data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ExerciseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_sets: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_reps: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_duration_min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_duration_sec: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_duration_sec: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest_duration_sec: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance_note: Option<String>,
    #[serde(default, skip_serializing_if = "super::is_false")]
    pub hide_weight: bool,
    #[serde(default, skip_serializing_if = "super::is_false")]
    pub show_time: bool,
    /// Checklist item texts, in order. Only meaningful for `checklist` type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
    #[serde(default, flatten, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Exercise {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ExerciseType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            target_sets: None,
            target_reps: None,
            target_duration_min: None,
            target_duration_sec: None,
            rounds: None,
            work_duration_sec: None,
            rest_duration_sec: None,
            guidance_note: None,
            hide_weight: false,
            show_time: false,
            items: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// Loosely-structured plan input as authored by a human or an LLM.
///
/// `blocks` is optional so its absence can be rejected with a proper
/// validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlan {
    pub day_name: Option<String>,
    /// Authoring tools sometimes send `theme` instead of `day_name`.
    pub theme: Option<String>,
    pub location: Option<String>,
    pub phase: Option<String>,
    pub total_duration_min: Option<i64>,
    pub blocks: Option<Vec<RawBlock>>,
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBlock {
    pub block_type: Option<String>,
    pub title: Option<String>,
    pub duration_min: Option<i64>,
    pub rest_guidance: Option<String>,
    pub rounds: Option<i64>,
    #[serde(default)]
    pub exercises: Vec<RawExercise>,
    /// Free-text instruction lines; cardio blocks may carry these instead of
    /// structured exercises.
    #[serde(default)]
    pub instructions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExercise {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Raw authored fields; `sets`/`reps` accept both numbers and strings.
    pub sets: Option<Value>,
    pub reps: Option<Value>,
    pub equipment: Option<String>,
    pub tempo: Option<String>,
    pub load_guide: Option<String>,
    pub notes: Option<String>,
    // Normalized fields pass through untouched when already present.
    pub target_sets: Option<i64>,
    pub target_reps: Option<String>,
    pub target_duration_min: Option<i64>,
    pub target_duration_sec: Option<i64>,
    pub rounds: Option<i64>,
    pub work_duration_sec: Option<i64>,
    pub rest_duration_sec: Option<i64>,
    pub guidance_note: Option<String>,
    #[serde(default)]
    pub hide_weight: Option<bool>,
    #[serde(default)]
    pub show_time: Option<bool>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl RawExercise {
    /// True when the exercise already carries the normalized `id` + `type`.
    pub fn is_normalized(&self) -> bool {
        self.id.is_some() && self.kind.is_some()
    }
}
