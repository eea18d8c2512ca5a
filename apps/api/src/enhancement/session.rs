//! Input State Holder — one user's CV, target role and the state of their last submission.
//!
//! A `SessionHandle` wraps a `tokio::sync::watch` channel: every mutation publishes a
//! new `Session` snapshot to subscribers. Input setters never validate. Request-state
//! transitions are only driven by the orchestrator, through `try_begin_submission` and
//! `settle`, both of which run atomically under the channel's lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::enhancement::language::Language;

/// Shown when a submission is attempted with a required field empty.
pub const VALIDATION_MESSAGE: &str = "Please fill in all fields and provide your CV.";

/// Shown for every generation failure, whatever the cause.
pub const GENERATION_FAILURE_MESSAGE: &str =
    "An error occurred while enhancing your CV. Please try again.";

/// The four user-supplied fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionInput {
    pub original_cv: String,
    pub job_title: String,
    pub position: String,
    pub language: Language,
}

impl SubmissionInput {
    /// Names of required fields that are empty. Whitespace counts as content.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("original_cv", &self.original_cv),
            ("job_title", &self.job_title),
            ("position", &self.position),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Applies every field present in `patch`, leaving the rest untouched.
    pub fn apply(&mut self, patch: InputPatch) {
        if let Some(original_cv) = patch.original_cv {
            self.original_cv = original_cv;
        }
        if let Some(job_title) = patch.job_title {
            self.job_title = job_title;
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(language) = patch.language {
            self.language = language;
        }
    }
}

/// Partial update of `SubmissionInput`, as sent by the input form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputPatch {
    pub original_cv: Option<String>,
    pub job_title: Option<String>,
    pub position: Option<String>,
    pub language: Option<Language>,
}

/// Observable outcome of the latest submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestState {
    pub is_loading: bool,
    pub error: Option<String>,
    pub result: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Failed,
}

/// Full snapshot of one session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: Uuid,
    #[serde(flatten)]
    pub input: SubmissionInput,
    #[serde(flatten)]
    pub request: RequestState,
    pub status: SubmissionStatus,
    /// Number of submissions that reached the generator.
    pub submissions: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(input: SubmissionInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            input,
            request: RequestState::default(),
            status: SubmissionStatus::Idle,
            submissions: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validation failure: only the error changes, the previous result stays visible.
    fn reject_incomplete(&mut self) {
        self.request.error = Some(VALIDATION_MESSAGE.to_string());
    }

    /// Enter Pending. Error and result are cleared in the same update that raises
    /// the busy flag, so no snapshot pairs the flag with stale output.
    fn begin_submission(&mut self) -> SubmissionInput {
        self.request.error = None;
        self.request.result.clear();
        self.request.is_loading = true;
        self.status = SubmissionStatus::Pending;
        self.submissions += 1;
        self.input.clone()
    }

    fn complete(&mut self, settlement: Settlement) {
        self.request.is_loading = false;
        match settlement {
            Settlement::Success(text) => {
                self.request.error = None;
                self.request.result = text;
                self.status = SubmissionStatus::Success;
            }
            Settlement::Failure => {
                self.request.error = Some(GENERATION_FAILURE_MESSAGE.to_string());
                self.request.result.clear();
                self.status = SubmissionStatus::Failed;
            }
        }
    }
}

/// Result of asking the holder to start a submission.
#[derive(Debug, PartialEq)]
pub enum Admission {
    /// Now Pending; carries the submission number and the input it read.
    Accepted {
        submission: u64,
        input: SubmissionInput,
    },
    /// A required field is empty; the validation error has been set.
    Incomplete { missing: Vec<&'static str> },
    /// Already Pending; nothing was changed.
    Busy,
}

/// How a pending submission ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    Success(String),
    Failure,
}

/// Shared handle to one session's state.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    tx: Arc<watch::Sender<Session>>,
}

impl SessionHandle {
    pub fn new(input: SubmissionInput) -> Self {
        let session = Session::new(input);
        let id = session.id;
        let (tx, _rx) = watch::channel(session);
        Self {
            id,
            tx: Arc::new(tx),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub fn set_original_cv(&self, original_cv: impl Into<String>) {
        let original_cv = original_cv.into();
        self.update_input(|input| input.original_cv = original_cv);
    }

    pub fn set_job_title(&self, job_title: impl Into<String>) {
        let job_title = job_title.into();
        self.update_input(|input| input.job_title = job_title);
    }

    pub fn set_position(&self, position: impl Into<String>) {
        let position = position.into();
        self.update_input(|input| input.position = position);
    }

    pub fn set_language(&self, language: Language) {
        self.update_input(|input| input.language = language);
    }

    /// Applies each present field through its setter; every field publishes its own snapshot.
    pub fn apply_input(&self, patch: InputPatch) {
        let InputPatch {
            original_cv,
            job_title,
            position,
            language,
        } = patch;

        if let Some(original_cv) = original_cv {
            self.set_original_cv(original_cv);
        }
        if let Some(job_title) = job_title {
            self.set_job_title(job_title);
        }
        if let Some(position) = position {
            self.set_position(position);
        }
        if let Some(language) = language {
            self.set_language(language);
        }
    }

    /// True when nothing is pending and the last change is at least `idle_for` old.
    pub fn is_idle_for(&self, idle_for: Duration) -> bool {
        let session = self.tx.borrow();
        if session.request.is_loading {
            return false;
        }
        Utc::now()
            .signed_duration_since(session.updated_at)
            .to_std()
            .map(|elapsed| elapsed >= idle_for)
            .unwrap_or(false)
    }

    fn update_input(&self, f: impl FnOnce(&mut SubmissionInput)) {
        self.tx.send_modify(|session| {
            f(&mut session.input);
            session.updated_at = Utc::now();
        });
    }

    /// Atomically validates the current input and, if it is complete and nothing is
    /// in flight, moves the session to Pending.
    pub fn try_begin_submission(&self) -> Admission {
        let mut admission = Admission::Busy;
        self.tx.send_if_modified(|session| {
            if session.request.is_loading {
                return false;
            }
            let missing = session.input.missing_fields();
            if missing.is_empty() {
                let input = session.begin_submission();
                admission = Admission::Accepted {
                    submission: session.submissions,
                    input,
                };
            } else {
                session.reject_incomplete();
                admission = Admission::Incomplete { missing };
            }
            session.updated_at = Utc::now();
            true
        });
        admission
    }

    /// Leaves Pending. Ignored (returns false) unless `submission` is the one in flight.
    pub fn settle(&self, submission: u64, settlement: Settlement) -> bool {
        self.tx.send_if_modified(|session| {
            if !session.request.is_loading || session.submissions != submission {
                return false;
            }
            session.complete(settlement);
            session.updated_at = Utc::now();
            true
        })
    }
}
