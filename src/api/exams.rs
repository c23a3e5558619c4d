use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::helpers::{content_type_for, read_field_capped};
use crate::api::validation::validate_image_upload;
use crate::core::config::max_upload_bytes;
use crate::core::state::AppState;
use crate::core::time::{compact_stamp, now_rfc3339};
use crate::schemas::exam::{ExamCreate, ExamSummaryResponse, QuestionCreate};
use crate::store::layout::sanitize_component;
use crate::store::models::{Exam, Question};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/teacher/create_exam", get(create_exam_page))
        .route("/teacher/save_exam", post(save_exam))
        .route("/teacher/exams", get(list_exams))
        .route("/exam_file/:exam_id/:filename", get(exam_file))
        .route("/exam/start/:exam_id", get(start_exam_page))
        .route("/exam/:exam_id/q/:qindex", get(exam_question_page))
}

async fn create_exam_page() -> Html<&'static str> {
    Html(
        "<!doctype html><html><body>\
         <h1>Create an exam</h1>\
         <form method=\"post\" action=\"/teacher/save_exam\" \
         enctype=\"multipart/form-data\">\
         <input name=\"title\" placeholder=\"Exam title\">\
         <input name=\"created_by\" placeholder=\"Your name\">\
         <textarea name=\"questions\"></textarea>\
         <input type=\"file\" name=\"images\" multiple>\
         <button type=\"submit\">Save</button>\
         </form></body></html>",
    )
}

/// Accepts either a multipart form (question images inline) or a plain JSON
/// body describing the exam.
async fn save_exam(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<serde_json::Value>, ApiError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let (payload, assets) = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|err| ApiError::BadRequest(format!("Malformed multipart body: {err}")))?;
        parse_multipart_exam(&state, multipart).await?
    } else {
        let cap = max_upload_bytes(state.settings()) as usize;
        let bytes = axum::body::to_bytes(request.into_body(), cap)
            .await
            .map_err(|err| ApiError::BadRequest(format!("Unreadable request body: {err}")))?;
        let payload: ExamCreate = serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::BadRequest(format!("Invalid exam payload: {err}")))?;
        (payload, Vec::new())
    };

    payload.validate().map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let exam_id = match payload.exam_id.as_deref().filter(|id| !id.trim().is_empty()) {
        Some(id) => sanitize_component(id),
        None => format!("exam_{}", compact_stamp()),
    };

    if state.exams().exists(&exam_id).await {
        return Err(ApiError::BadRequest(format!("Exam '{exam_id}' already exists")));
    }

    let questions = payload
        .questions
        .into_iter()
        .enumerate()
        .map(|(index, question)| build_question(index, question))
        .collect();

    let exam = Exam {
        exam_id: exam_id.clone(),
        title: payload.title,
        created_by: payload.created_by,
        created_at: now_rfc3339(),
        questions,
    };
    state.exams().create(&exam).await?;

    for (filename, bytes) in assets {
        state.exams().save_asset(&exam_id, &filename, &bytes).await?;
    }

    tracing::info!(exam_id = %exam_id, "Exam created");
    Ok(Json(json!({
        "exam_id": exam_id,
        "preview_url": format!("/exam/start/{exam_id}"),
    })))
}

fn build_question(index: usize, question: QuestionCreate) -> Question {
    let qid = question
        .qid
        .filter(|id| !id.trim().is_empty())
        .map(|id| sanitize_component(&id))
        .unwrap_or_else(|| format!("q{}", index + 1));
    Question {
        qid,
        marks: question.marks,
        instruction: question.instruction,
        model_answer: question.model_answer,
        question_image: question.question_image,
        diagram_image: question.diagram_image,
    }
}

async fn parse_multipart_exam(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<(ExamCreate, Vec<(String, Vec<u8>)>), ApiError> {
    let cap = max_upload_bytes(state.settings()) as usize;
    let allowed = state.settings().storage().allowed_image_extensions.clone();

    let mut exam_id: Option<String> = None;
    let mut title = String::new();
    let mut created_by = String::new();
    let mut questions: Vec<QuestionCreate> = Vec::new();
    let mut assets: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(format!("Malformed multipart body: {err}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(|value| value.to_string());

        if let Some(filename) = filename.filter(|value| !value.is_empty()) {
            let content_type = field.content_type().unwrap_or_default().to_string();
            validate_image_upload(&filename, &content_type, &allowed)?;
            let bytes = read_field_capped(&mut field, cap).await?;
            assets.push((filename, bytes));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|err| ApiError::BadRequest(format!("Malformed field: {err}")))?;
        match name.as_str() {
            "exam_id" => exam_id = Some(value),
            "title" => title = value,
            "created_by" => created_by = value,
            "questions" => {
                questions = serde_json::from_str(&value).map_err(|err| {
                    ApiError::BadRequest(format!("Invalid questions payload: {err}"))
                })?;
            }
            _ => continue,
        }
    }

    Ok((ExamCreate { exam_id, title, created_by, questions }, assets))
}

async fn list_exams(
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamSummaryResponse>>, ApiError> {
    let exams = state.exams().list().await?;
    let summaries = exams
        .into_iter()
        .map(|exam| ExamSummaryResponse {
            exam_id: exam.exam_id,
            title: exam.title,
            created_by: exam.created_by,
            created_at: exam.created_at,
            question_count: exam.questions.len(),
        })
        .collect();
    Ok(Json(summaries))
}

async fn exam_file(
    State(state): State<AppState>,
    Path((exam_id, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let bytes = state.exams().read_asset(&exam_id, &filename).await?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&filename))], bytes).into_response())
}

async fn start_exam_page(
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let exam = state.exams().load(&exam_id).await?;
    Ok(Html(format!(
        "<!doctype html><html><body>\
         <h1>{title}</h1>\
         <p>{count} questions</p>\
         <input id=\"student_name\" placeholder=\"Your name\">\
         <a href=\"/exam/{exam_id}/q/1\">Start</a>\
         </body></html>",
        title = exam.title,
        count = exam.questions.len(),
        exam_id = exam.exam_id,
    )))
}

async fn exam_question_page(
    State(state): State<AppState>,
    Path((exam_id, qindex)): Path<(String, String)>,
) -> Result<Html<String>, ApiError> {
    let exam = state.exams().load(&exam_id).await?;
    let index: usize = qindex
        .parse()
        .ok()
        .filter(|index| (1..=exam.questions.len()).contains(index))
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;
    let question = &exam.questions[index - 1];

    let question_image = if question.question_image.is_empty() {
        String::new()
    } else {
        format!(
            "<img src=\"/exam_file/{exam_id}/{image}\">",
            exam_id = exam.exam_id,
            image = question.question_image,
        )
    };
    let diagram_image = question
        .diagram_image
        .as_deref()
        .map(|image| {
            format!("<img src=\"/exam_file/{exam_id}/{image}\">", exam_id = exam.exam_id)
        })
        .unwrap_or_default();

    let prev = if index > 1 {
        format!("<a href=\"/exam/{exam_id}/q/{}\">Previous</a>", index - 1)
    } else {
        String::new()
    };
    let next = if index < exam.questions.len() {
        format!("<a href=\"/exam/{exam_id}/q/{}\">Next</a>", index + 1)
    } else {
        String::new()
    };

    Ok(Html(format!(
        "<!doctype html><html><body>\
         <h1>{title}</h1>\
         <div id=\"question\" data-exam=\"{exam_id}\" data-qindex=\"{index}\">\
         <p>{instruction} [{marks} marks]</p>{question_image}{diagram_image}</div>\
         <textarea id=\"answer\"></textarea><canvas id=\"overlay\"></canvas>\
         {prev}{next}\
         </body></html>",
        title = exam.title,
        exam_id = exam.exam_id,
        instruction = question.instruction,
        marks = question.marks,
    )))
}
