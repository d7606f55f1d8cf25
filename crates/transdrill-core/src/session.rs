//! Exercise session controller.
//!
//! Owns the state of one exercise slot and exposes the three transitions a
//! front end drives: [`ExerciseSession::submit`],
//! [`ExerciseSession::request_next`] and [`ExerciseSession::reset`].
//!
//! Each transition takes `&self` and performs at most one suspending call.
//! The state lock is never held across that call; instead every transition
//! bumps a request token, and a call that resolves after the token has moved
//! on is discarded as stale.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::model::{ExerciseContent, SubmissionResult};
use crate::streak::{StreakPolicy, StreakState};
use crate::traits::{AnswerScorer, NoopProgress, ProgressSink, QuestionGenerator};

/// Where the session is in the submit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingInput,
    Evaluating,
    ShowingResult,
}

/// Snapshot of everything a front end renders.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub content: ExerciseContent,
    pub user_answer: String,
    /// Present only in [`Phase::ShowingResult`].
    pub result: Option<SubmissionResult>,
    pub phase: Phase,
    pub streak: StreakState,
}

/// Why a transition was rejected without touching state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The answer was empty or whitespace.
    EmptyAnswer,
    /// A submission is already being evaluated.
    EvaluationInFlight,
    /// A new question is being generated.
    GenerationInFlight,
    /// The slot is mastered; only `request_next` moves it on.
    AlreadyMastered,
}

/// Result of [`ExerciseSession::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Evaluated {
        result: SubmissionResult,
        passed: bool,
        streak: StreakState,
    },
    Ignored(IgnoreReason),
    /// The session moved on while the answer was being scored.
    Stale,
}

/// Result of [`ExerciseSession::request_next`].
#[derive(Debug, Clone, PartialEq)]
pub enum NextOutcome {
    /// The slot is mastered. `recorded` is false if the progress sink failed.
    LevelComplete { level_id: u32, recorded: bool },
    NewQuestion(ExerciseContent),
    Ignored(IgnoreReason),
    /// The session was reset while the question was being generated.
    Stale,
}

struct Inner {
    state: SessionState,
    request_token: u64,
    generating: bool,
}

/// One exercise slot: its content, its submit cycle, and its streak.
pub struct ExerciseSession {
    id: Uuid,
    level_id: u32,
    policy: StreakPolicy,
    scorer: Arc<dyn AnswerScorer>,
    generator: Arc<dyn QuestionGenerator>,
    progress: Arc<dyn ProgressSink>,
    inner: Mutex<Inner>,
}

impl ExerciseSession {
    pub fn new(
        level_id: u32,
        content: ExerciseContent,
        scorer: Arc<dyn AnswerScorer>,
        generator: Arc<dyn QuestionGenerator>,
    ) -> Self {
        let policy = StreakPolicy::default();
        Self {
            id: Uuid::new_v4(),
            level_id,
            policy,
            scorer,
            generator,
            progress: Arc::new(NoopProgress),
            inner: Mutex::new(Inner {
                state: SessionState {
                    content,
                    user_answer: String::new(),
                    result: None,
                    phase: Phase::AwaitingInput,
                    streak: StreakState::new(policy.target),
                },
                request_token: 0,
                generating: false,
            }),
        }
    }

    /// Use a different pass threshold and streak target. Resets the streak.
    pub fn with_policy(mut self, policy: StreakPolicy) -> Self {
        self.policy = policy;
        self.inner.get_mut().state.streak = StreakState::new(policy.target);
        self
    }

    /// Report mastery to `progress` instead of dropping it.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn level_id(&self) -> u32 {
        self.level_id
    }

    pub fn policy(&self) -> StreakPolicy {
        self.policy
    }

    /// A copy of the current state.
    pub async fn snapshot(&self) -> SessionState {
        self.inner.lock().await.state.clone()
    }

    /// Score `user_answer` against the current reference and feed the result
    /// into the streak.
    ///
    /// Exactly one streak transition happens per evaluated submission,
    /// including ones the scorer resolved through its local fallback.
    #[instrument(skip(self, user_answer), fields(session = %self.id, level = self.level_id))]
    pub async fn submit(&self, user_answer: &str) -> SubmitOutcome {
        let (token, reference, note) = {
            let mut inner = self.inner.lock().await;
            if user_answer.trim().is_empty() {
                return SubmitOutcome::Ignored(IgnoreReason::EmptyAnswer);
            }
            if inner.state.phase == Phase::Evaluating {
                debug!("submission already in flight");
                return SubmitOutcome::Ignored(IgnoreReason::EvaluationInFlight);
            }
            if inner.generating {
                return SubmitOutcome::Ignored(IgnoreReason::GenerationInFlight);
            }
            if inner.state.streak.mastered() {
                return SubmitOutcome::Ignored(IgnoreReason::AlreadyMastered);
            }

            inner.request_token += 1;
            inner.state.phase = Phase::Evaluating;
            inner.state.user_answer = user_answer.to_string();
            inner.state.result = None;
            (
                inner.request_token,
                inner.state.content.reference_translation.clone(),
                inner.state.content.explanation_note.clone(),
            )
        };

        let context = (!note.trim().is_empty()).then_some(note.as_str());
        let result = self.scorer.evaluate(user_answer, &reference, context).await;

        let mut inner = self.inner.lock().await;
        if inner.request_token != token {
            debug!("discarding stale evaluation");
            return SubmitOutcome::Stale;
        }

        let passed = result.passed(self.policy.pass_threshold);
        let streak = inner.state.streak.record(passed);
        inner.state.streak = streak;
        inner.state.result = Some(result.clone());
        inner.state.phase = Phase::ShowingResult;

        info!(
            score = result.score,
            passed,
            streak = streak.consecutive_passes(),
            mastered = streak.mastered(),
            "submission evaluated"
        );

        SubmitOutcome::Evaluated {
            result,
            passed,
            streak,
        }
    }

    /// Move on from the current item.
    ///
    /// A mastered slot only signals completion to the progress sink and is
    /// otherwise left untouched. Otherwise a variant of the current item is
    /// generated and replaces it; the streak carries over.
    #[instrument(skip(self), fields(session = %self.id, level = self.level_id))]
    pub async fn request_next(&self, topic_hint: Option<&str>) -> NextOutcome {
        let (token, current) = {
            let mut inner = self.inner.lock().await;
            if inner.state.streak.mastered() {
                drop(inner);
                return self.complete_level().await;
            }
            if inner.generating {
                return NextOutcome::Ignored(IgnoreReason::GenerationInFlight);
            }
            inner.request_token += 1;
            inner.generating = true;
            (inner.request_token, inner.state.content.clone())
        };

        let content = self.generator.generate_similar(&current, topic_hint).await;

        let mut inner = self.inner.lock().await;
        if inner.request_token != token {
            debug!("discarding stale question");
            return NextOutcome::Stale;
        }

        if content.is_generation_failed() {
            warn!("question generation failed, showing placeholder content");
        }

        inner.generating = false;
        inner.state.content = content.clone();
        inner.state.user_answer.clear();
        inner.state.result = None;
        inner.state.phase = Phase::AwaitingInput;

        info!(
            streak = inner.state.streak.consecutive_passes(),
            "loaded new question"
        );

        NextOutcome::NewQuestion(content)
    }

    /// Try the same item again: clear the answer and result, keep content and streak.
    ///
    /// Any evaluation or generation still in flight becomes stale.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.request_token += 1;
        inner.generating = false;
        inner.state.user_answer.clear();
        inner.state.result = None;
        inner.state.phase = Phase::AwaitingInput;
    }

    async fn complete_level(&self) -> NextOutcome {
        let recorded = match self.progress.level_mastered(self.level_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("failed to record mastery of level {}: {e:#}", self.level_id);
                false
            }
        };
        info!(level = self.level_id, recorded, "level mastered");
        NextOutcome::LevelComplete {
            level_id: self.level_id,
            recorded,
        }
    }
}
