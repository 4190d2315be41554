//! Workout log model.
//!
//! A `SessionLog` is the user-authoritative record for one date. Exercise
//! entries are keyed by the planned exercise's key; the reference is soft, so
//! a log entry survives deletion of the plan it was recorded against.
//!
//! JSON shape (exercise entries flattened next to `session_feedback`):
//! ```text
//! {
//!   "session_feedback": {"pain_discomfort": "...", "general_notes": "..."},
//!   "ex_1": {"completed": true, "sets": [{"set_num": 1, "weight": 50, "reps": 10}]},
//!   "warmup_0": {"completed_items": ["Cat-Cow x10"]}
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    #[serde(default)]
    pub session_feedback: SessionFeedback,
    #[serde(flatten)]
    pub exercises: BTreeMap<String, ExerciseLog>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionFeedback {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pain_discomfort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general_notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseLog {
    #[serde(default, skip_serializing_if = "super::is_false")]
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_note: Option<String>,
    // Duration/heart-rate summary, used by duration-type exercises.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_hr: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_hr: Option<i64>,
    /// Per-set records for strength/circuit exercises. Always replaced as a
    /// complete set on write, never merged item-by-item.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sets: Vec<SetLog>,
    /// Completed item texts for checklist exercises.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub completed_items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetLog {
    pub set_num: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpe: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f64>,
    #[serde(default, skip_serializing_if = "super::is_false")]
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_json_roundtrip() {
        let mut log = SessionLog::default();
        log.session_feedback.general_notes = Some("Felt strong".to_string());
        log.exercises.insert(
            "ex_1".to_string(),
            ExerciseLog {
                completed: true,
                sets: vec![SetLog {
                    set_num: 1,
                    weight: Some(53.0),
                    reps: Some(10),
                    rpe: Some(7.5),
                    unit: Some("lbs".to_string()),
                    ..SetLog::default()
                }],
                ..ExerciseLog::default()
            },
        );

        let json = serde_json::to_string(&log).unwrap();
        let parsed: SessionLog = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, log);
    }

    #[test]
    fn test_exercise_entries_flattened() {
        let json = r#"{
            "session_feedback": {"pain_discomfort": "knee tightness"},
            "ex_1": {"completed": true},
            "warmup_0": {"completed_items": ["Cat-Cow x10", "Bird-Dog x5/side"]}
        }"#;
        let log: SessionLog = serde_json::from_str(json).unwrap();

        assert_eq!(
            log.session_feedback.pain_discomfort.as_deref(),
            Some("knee tightness")
        );
        assert_eq!(log.exercises.len(), 2);
        assert!(log.exercises["ex_1"].completed);
        assert_eq!(log.exercises["warmup_0"].completed_items.len(), 2);
    }

    #[test]
    fn test_empty_fields_omitted() {
        let log = SessionLog::default();
        let json = serde_json::to_value(&log).unwrap();
        let obj = json.as_object().unwrap();
        // session_feedback is always present, everything else only as needed
        assert_eq!(obj.len(), 1);
        assert!(obj.contains_key("session_feedback"));
    }
}
