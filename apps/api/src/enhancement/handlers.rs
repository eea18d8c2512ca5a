//! Axum route handlers for the Enhancement API.

use std::time::Duration;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::enhancement::language::Language;
use crate::enhancement::session::{InputPatch, Session, SessionHandle, SubmissionInput};
use crate::errors::AppError;
use crate::state::AppState;

/// Longest a `settled` long-poll may wait.
const MAX_SETTLE_WAIT_SECS: u64 = 300;
const DEFAULT_SETTLE_WAIT_SECS: u64 = 60;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct SubmitParams {
    /// Return 202 as soon as the session is Pending instead of awaiting the generator.
    #[serde(default)]
    pub detach: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SettleParams {
    pub timeout_secs: Option<u64>,
}

/// Original and enhanced CV side by side, plus the role they were tailored for.
#[derive(Debug, Serialize)]
pub struct ComparisonResponse {
    pub original_cv: String,
    pub enhanced_cv: String,
    pub job_title: String,
    pub position: String,
    pub language: Language,
}

#[derive(Debug, Serialize)]
pub struct LanguageInfo {
    pub tag: Language,
    pub name: &'static str,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
///
/// Creates a session. The body is optional and may pre-fill any input field.
pub async fn handle_create_session(
    State(state): State<AppState>,
    body: Option<Json<InputPatch>>,
) -> (StatusCode, Json<Session>) {
    let mut input = SubmissionInput::default();
    if let Some(Json(patch)) = body {
        input.apply(patch);
    }
    let handle = state.sessions.create(input).await;
    (StatusCode::CREATED, Json(handle.snapshot()))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, AppError> {
    let handle = find_session(&state, id).await?;
    Ok(Json(handle.snapshot()))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found(id))
    }
}

/// PATCH /api/v1/sessions/:id/input
///
/// Replaces any of the four input fields. Allowed while a submission is pending.
pub async fn handle_update_input(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<InputPatch>,
) -> Result<Json<Session>, AppError> {
    let handle = find_session(&state, id).await?;
    handle.apply_input(patch);
    Ok(Json(handle.snapshot()))
}

/// POST /api/v1/sessions/:id/cv
///
/// Multipart upload of a plain-text CV. The first field carrying a file name
/// (or the first field, if none does) replaces `original_cv`.
pub async fn handle_upload_cv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Session>, AppError> {
    let handle = find_session(&state, id).await?;
    let max_bytes = state.config.max_cv_bytes;

    let mut fallback: Option<Vec<u8>> = None;
    let mut upload: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(mut field) = multipart.next_field().await? {
        let file_name = field.file_name().map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(AppError::Payload(format!(
                    "CV file exceeds the {max_bytes} byte limit"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        if file_name.is_some() {
            upload = Some((file_name, bytes));
            break;
        }
        if fallback.is_none() {
            fallback = Some(bytes);
        }
    }

    let (file_name, bytes) = upload
        .or_else(|| fallback.map(|bytes| (None, bytes)))
        .ok_or_else(|| AppError::Payload("No CV file in upload".to_string()))?;

    let text = String::from_utf8(bytes)
        .map_err(|_| AppError::Payload("CV file must be UTF-8 encoded text".to_string()))?;

    info!(
        "CV uploaded to session {id}: {} bytes from {}",
        text.len(),
        file_name.as_deref().unwrap_or("<unnamed field>")
    );
    handle.set_original_cv(text);
    Ok(Json(handle.snapshot()))
}

/// POST /api/v1/sessions/:id/submit
///
/// Runs one submission and returns the session.
/// 400 on missing fields, 409 while another submission is pending.
/// Attached (default): awaits the generator; 502 with a generic message on failure.
/// `?detach=true`: 202 with the Pending session; the outcome is observed via
/// GET /sessions/:id or /sessions/:id/settled.
///
/// The generator call always runs on its own task, so a client disconnect
/// never cancels a submission.
pub async fn handle_submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<SubmitParams>,
) -> Result<(StatusCode, Json<Session>), AppError> {
    let handle = find_session(&state, id).await?;

    let pending = state.orchestrator.begin(&handle)?;
    let pending_snapshot = handle.snapshot();
    let task = tokio::spawn(pending.run());

    if params.detach {
        // Outcome is written to the session and logged by the task.
        return Ok((StatusCode::ACCEPTED, Json(pending_snapshot)));
    }

    match task.await {
        Ok(outcome) => {
            outcome?;
        }
        Err(e) => {
            // Only a panic gets here; the pending guard has already settled the session.
            error!("Submission task for session {id} did not complete: {e}");
            return Err(AppError::Generation);
        }
    }
    Ok((StatusCode::OK, Json(handle.snapshot())))
}

/// GET /api/v1/sessions/:id/settled?timeout_secs=N
///
/// Long-poll: returns once the session is not Pending, or after the timeout
/// (default 60s, max 300s) with whatever state it is in.
pub async fn handle_settled(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<SettleParams>,
) -> Result<Json<Session>, AppError> {
    let handle = find_session(&state, id).await?;
    let wait = Duration::from_secs(
        params
            .timeout_secs
            .unwrap_or(DEFAULT_SETTLE_WAIT_SECS)
            .min(MAX_SETTLE_WAIT_SECS),
    );

    let mut rx = handle.subscribe();
    let settled = tokio::time::timeout(wait, async {
        rx.wait_for(|session| !session.request.is_loading)
            .await
            .map(|session| session.clone())
    })
    .await;

    match settled {
        Ok(Ok(session)) => Ok(Json(session)),
        _ => Ok(Json(handle.snapshot())),
    }
}

/// GET /api/v1/sessions/:id/comparison
///
/// Available once a submission has succeeded and none is pending.
pub async fn handle_comparison(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ComparisonResponse>, AppError> {
    let session = find_session(&state, id).await?.snapshot();

    if session.request.is_loading || session.request.result.is_empty() {
        return Err(AppError::NotFound(format!(
            "No enhanced CV available for session {id}"
        )));
    }

    Ok(Json(ComparisonResponse {
        original_cv: session.input.original_cv,
        enhanced_cv: session.request.result,
        job_title: session.input.job_title,
        position: session.input.position,
        language: session.input.language,
    }))
}

/// GET /api/v1/languages
pub async fn handle_languages() -> Json<Vec<LanguageInfo>> {
    Json(
        Language::ALL
            .into_iter()
            .map(|tag| LanguageInfo {
                tag,
                name: tag.display_name(),
            })
            .collect(),
    )
}

async fn find_session(state: &AppState, id: Uuid) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| session_not_found(id))
}

fn session_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {id} not found"))
}
