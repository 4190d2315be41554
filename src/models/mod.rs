mod log;
mod plan;

pub use log::{ExerciseLog, SessionFeedback, SessionLog, SetLog};
pub use plan::{Block, Exercise, ExerciseType, Plan, RawBlock, RawExercise, RawPlan};

pub(crate) fn is_false(v: &bool) -> bool {
    !*v
}
