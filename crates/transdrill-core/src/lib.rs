//! transdrill-core: answer evaluation and mastery progression.
//!
//! This crate defines the data model, the trait seams to the AI services,
//! local similarity scoring, the mastery streak, and the session controller
//! that ties them together.

pub mod error;
pub mod levels;
pub mod model;
pub mod normalize;
pub mod progress;
pub mod reply;
pub mod session;
pub mod similarity;
pub mod streak;
pub mod traits;

pub use error::{FallbackReason, ProviderError};
pub use model::{DiffStatus, ExerciseContent, SubmissionResult, WordDiffEntry};
pub use session::{ExerciseSession, NextOutcome, Phase, SessionState, SubmitOutcome};
pub use streak::{StreakPolicy, StreakState};
