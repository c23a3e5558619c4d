use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::schemas::attempt::{AttemptListResponse, AutosaveRequest, GradeRequest, SubmitRequest};
use crate::store::models::QuestionMark;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/exam/autosave", post(autosave))
        .route("/exam/submit", post(submit))
        .route("/teacher/attempts/:exam_id", get(list_attempts))
        .route("/teacher/mark/:exam_id/:student", get(mark_page))
        .route("/teacher/save_marks/:exam_id/:student", post(save_marks))
}

async fn autosave(
    State(state): State<AppState>,
    Json(payload): Json<AutosaveRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if payload.exam_id.trim().is_empty() {
        return Err(ApiError::BadRequest("examId is required".to_string()));
    }

    let exam = state.exams().load(&payload.exam_id).await?;
    let outcome = state
        .attempts()
        .autosave(
            &exam,
            payload.qindex,
            &payload.student_name,
            &payload.answer_text,
            payload.overlay_image.as_deref(),
        )
        .await?;

    let saved_at = outcome
        .attempt
        .answers
        .get(&payload.qindex.to_string())
        .map(|entry| entry.saved_at.clone());
    Ok(Json(json!({
        "status": "success",
        "overlay_file": outcome.overlay_file,
        "attempt_file": outcome.attempt_file,
        "saved_at": saved_at,
    })))
}

async fn submit(
    State(state): State<AppState>,
    Json(payload): Json<SubmitRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if payload.exam_id.trim().is_empty() || payload.student_name.trim().is_empty() {
        return Err(ApiError::BadRequest("examId and studentName are required".to_string()));
    }

    let attempt = state.attempts().submit(&payload.exam_id, &payload.student_name).await?;
    Ok(Json(json!({
        "status": "submitted",
        "submitted_at": attempt.submitted_at,
    })))
}

async fn list_attempts(
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<Json<AttemptListResponse>, ApiError> {
    let students = state.attempts().list_students(&exam_id).await?;
    Ok(Json(AttemptListResponse { exam_id, students }))
}

/// Grading view: the attempt joined with the exam's question list.
async fn mark_page(
    State(state): State<AppState>,
    Path((exam_id, student)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let exam = state.exams().load(&exam_id).await?;
    let attempt = state.attempts().load(&exam_id, &student).await?;

    Ok(Json(json!({
        "exam_id": exam.exam_id,
        "title": exam.title,
        "student": student,
        "questions": exam.questions,
        "attempt": attempt,
    })))
}

async fn save_marks(
    State(state): State<AppState>,
    Path((exam_id, student)): Path<(String, String)>,
    Json(payload): Json<GradeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let marks: BTreeMap<String, QuestionMark> = payload
        .marks
        .into_iter()
        .map(|(qindex, mark)| {
            (qindex, QuestionMark { score: mark.score, comment: mark.comment })
        })
        .collect();

    state
        .attempts()
        .grade(
            &exam_id,
            &student,
            marks,
            payload.overall_comment,
            payload.released,
            payload.graded_by,
        )
        .await?;

    Ok(Json(json!({ "status": "saved" })))
}
