//! Request Orchestrator — drives one submission from validation to a settled session.
//!
//! Flow: try_begin_submission (validate → Pending) → CvGenerator::generate →
//!       settle (Success | Failed).
//!
//! Submissions are serialized per session: a submit while one is pending is
//! rejected with `SubmitError::Busy`. The busy flag is always lowered on the way
//! out of Pending, including when the submit future is dropped or the generator panics.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument, Span};

use crate::enhancement::generator::{CvGenerator, GenerationError};
use crate::enhancement::session::{
    Admission, SessionHandle, Settlement, SubmissionInput, GENERATION_FAILURE_MESSAGE,
    VALIDATION_MESSAGE,
};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{}", VALIDATION_MESSAGE)]
    Validation,

    #[error("A submission is already in progress for this session")]
    Busy,

    /// The user only ever sees `GENERATION_FAILURE_MESSAGE`; the source is for logs.
    #[error("{}", GENERATION_FAILURE_MESSAGE)]
    Generation(#[source] GenerationError),
}

#[derive(Clone)]
pub struct Orchestrator {
    generator: Arc<dyn CvGenerator>,
}

impl Orchestrator {
    pub fn new(generator: Arc<dyn CvGenerator>) -> Self {
        Self { generator }
    }

    /// Submits the session's current input for enhancement and returns the enhanced text.
    ///
    /// Reads the input from the holder at call time. On every outcome the session
    /// already reflects the result when this returns.
    pub async fn submit(&self, session: &SessionHandle) -> Result<String, SubmitError> {
        self.begin(session)?.run().await
    }

    /// Validates and moves the session to Pending without calling the generator.
    /// The returned submission must be `run` (or dropped, which settles it as Failed).
    pub fn begin(&self, session: &SessionHandle) -> Result<PendingSubmission, SubmitError> {
        let (submission, input) = match session.try_begin_submission() {
            Admission::Accepted { submission, input } => (submission, input),
            Admission::Incomplete { missing } => {
                info!(
                    "Submission rejected for session {}: missing {:?}",
                    session.id(),
                    missing
                );
                return Err(SubmitError::Validation);
            }
            Admission::Busy => {
                warn!(
                    "Submission rejected for session {}: already pending",
                    session.id()
                );
                return Err(SubmitError::Busy);
            }
        };

        Ok(PendingSubmission {
            generator: Arc::clone(&self.generator),
            span: info_span!("submission", session_id = %session.id(), submission),
            guard: PendingGuard::new(session.clone(), submission),
            input,
        })
    }
}

/// A submission that has entered Pending and awaits its generator call.
pub struct PendingSubmission {
    generator: Arc<dyn CvGenerator>,
    input: SubmissionInput,
    guard: PendingGuard,
    span: Span,
}

impl PendingSubmission {
    pub async fn run(self) -> Result<String, SubmitError> {
        let PendingSubmission {
            generator,
            input,
            guard,
            span,
        } = self;

        async move {
            info!(
                "Enhancing CV for '{}' ({}) in {}",
                input.job_title, input.position, input.language
            );

            let outcome = generator
                .generate(
                    &input.original_cv,
                    &input.job_title,
                    &input.position,
                    input.language,
                )
                .await;

            match outcome {
                Ok(text) => {
                    guard.settle(Settlement::Success(text.clone()));
                    info!("Submission succeeded ({} chars)", text.len());
                    Ok(text)
                }
                Err(e) => {
                    error!("CV enhancement failed: {e}");
                    guard.settle(Settlement::Failure);
                    Err(SubmitError::Generation(e))
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// Owns the obligation to move a session out of Pending.
/// Dropped unsettled (cancellation or panic) it settles the session as Failed.
struct PendingGuard {
    session: SessionHandle,
    submission: u64,
    settled: bool,
}

impl PendingGuard {
    fn new(session: SessionHandle, submission: u64) -> Self {
        Self {
            session,
            submission,
            settled: false,
        }
    }

    fn settle(mut self, settlement: Settlement) {
        self.session.settle(self.submission, settlement);
        self.settled = true;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if !self.settled {
            warn!(
                "Submission {} for session {} ended before the generator returned",
                self.submission,
                self.session.id()
            );
            self.session.settle(self.submission, Settlement::Failure);
        }
    }
}
