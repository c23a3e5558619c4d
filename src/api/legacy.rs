use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::json;

use crate::api::errors::ApiError;
use crate::api::helpers::{content_type_for, read_field_capped};
use crate::api::validation::validate_image_upload;
use crate::core::config::max_upload_bytes;
use crate::core::state::AppState;
use crate::core::time::compact_stamp;
use crate::schemas::legacy::{
    FixedQuestionSubmission, IndexSubmission, SaveDiagramRequest, SaveExamAnswerRequest,
};
use crate::services::overlay;
use crate::store::layout::sanitize_component;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index_page).post(index_submit))
        .route("/submissions", get(submissions_page))
        .route("/download/:filename", get(download_file))
        .route("/get_diagram/:filename", get(get_diagram))
        .route("/get_overlay/:filename", get(get_overlay))
        .route("/diagram/:filename", get(diagram_page))
        .route("/save_diagram", post(save_diagram))
        .route("/question/:qid", get(fixed_question_page))
        .route("/submit_fixed_question", post(submit_fixed_question))
        .route("/upload_question", get(upload_question_page))
        .route("/teacher/upload_question", post(teacher_upload_question))
        .route("/exam/:exam_id", get(single_question_page))
        .route("/question_file/:qid/:filename", get(question_file))
        .route("/save_exam_answer", post(save_exam_answer))
}

async fn index_page() -> Html<&'static str> {
    Html(
        "<!doctype html><html><body>\
         <h1>Submit your answer</h1>\
         <form method=\"post\" action=\"/\">\
         <input name=\"student_name\" placeholder=\"Your name\">\
         <textarea name=\"answer_text\"></textarea>\
         <input type=\"hidden\" name=\"drawing_data\">\
         <button type=\"submit\">Submit</button>\
         </form></body></html>",
    )
}

async fn index_submit(
    State(state): State<AppState>,
    Form(form): Form<IndexSubmission>,
) -> Result<&'static str, ApiError> {
    let timestamp = compact_stamp();
    state.legacy().append_answer_row(&timestamp, &form.student_name, &form.answer_text).await?;

    if form.drawing_data.starts_with("data:image/png;base64,") {
        let bytes = overlay::decode_image_data_url(&form.drawing_data)
            .map_err(|err| ApiError::BadRequest(err.to_string()))?;
        let filename_base = format!("{}_{timestamp}", form.student_name);
        state.legacy().save_drawing(&filename_base, &bytes).await?;
    }

    Ok("Submission received!")
}

async fn submissions_page(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let files = state.legacy().list_files().await?;
    let items: String = files
        .iter()
        .map(|file| format!("<li><a href=\"/download/{file}\">{file}</a></li>"))
        .collect();
    Ok(Html(format!(
        "<!doctype html><html><body><h1>Submissions</h1><ul>{items}</ul></body></html>"
    )))
}

async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state.legacy().read_submission(&filename).await?;
    let stored = sanitize_component(&filename);
    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&stored).to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{stored}\"")),
        ],
        bytes,
    )
        .into_response())
}

async fn get_diagram(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state.legacy().read_diagram(&filename).await?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&filename))], bytes).into_response())
}

async fn get_overlay(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state.legacy().read_overlay(&filename).await?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&filename))], bytes).into_response())
}

async fn diagram_page(Path(filename): Path<String>) -> Html<String> {
    let diagram = sanitize_component(&filename);
    Html(format!(
        "<!doctype html><html><body>\
         <h1>Annotate {diagram}</h1>\
         <img id=\"diagram\" src=\"/get_diagram/{diagram}\">\
         <canvas id=\"overlay\"></canvas>\
         </body></html>"
    ))
}

async fn save_diagram(
    State(state): State<AppState>,
    Json(payload): Json<SaveDiagramRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if payload.image_data.is_empty() {
        return Err(ApiError::BadRequest("No image data received".to_string()));
    }

    let bytes = overlay::decode_image_data_url(&payload.image_data)
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;
    let filename = state.legacy().save_overlay(&payload.source_diagram, &bytes).await?;

    Ok(Json(json!({ "status": "success", "file": filename })))
}

async fn fixed_question_page(
    State(state): State<AppState>,
    Path(qid): Path<String>,
) -> Result<Html<String>, ApiError> {
    let question = state
        .fixed_questions()
        .get(&qid)
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    let parts: String =
        question.parts.iter().map(|part| format!("<li>{part}</li>")).collect();
    Ok(Html(format!(
        "<!doctype html><html><body>\
         <div id=\"question\" data-qid=\"{qid}\">{text}</div>\
         <img src=\"/get_diagram/{diagram}\">\
         <ol>{parts}</ol>\
         </body></html>",
        text = question.text,
        diagram = question.diagram,
    )))
}

async fn submit_fixed_question(
    State(state): State<AppState>,
    Json(payload): Json<FixedQuestionSubmission>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let timestamp = payload.timestamp.unwrap_or_else(compact_stamp);
    let filename = state
        .legacy()
        .write_fixed_submission(
            &payload.student,
            &payload.question,
            &payload.diagram,
            &payload.answer,
            &timestamp,
        )
        .await?;

    Ok(Json(json!({ "status": "Saved", "file": filename })))
}

async fn upload_question_page() -> Html<&'static str> {
    Html(
        "<!doctype html><html><body>\
         <h1>Upload a question</h1>\
         <form method=\"post\" action=\"/teacher/upload_question\" \
         enctype=\"multipart/form-data\">\
         <input name=\"question_id\" placeholder=\"Question ID\">\
         <input type=\"file\" name=\"question_image\">\
         <input type=\"file\" name=\"diagram_image\">\
         <button type=\"submit\">Upload</button>\
         </form></body></html>",
    )
}

async fn teacher_upload_question(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Html<String>, ApiError> {
    let cap = max_upload_bytes(state.settings()) as usize;
    let allowed = state.settings().storage().allowed_image_extensions.clone();

    let mut qid: Option<String> = None;
    let mut question_image: Option<Vec<u8>> = None;
    let mut diagram_image: Option<Vec<u8>> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(format!("Malformed multipart body: {err}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "question_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| ApiError::BadRequest(format!("Malformed field: {err}")))?;
                qid = Some(value);
            }
            "question_image" | "diagram_image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                if filename.is_empty() {
                    continue;
                }
                validate_image_upload(&filename, &content_type, &allowed)?;
                let bytes = read_field_capped(&mut field, cap).await?;
                if name == "question_image" {
                    question_image = Some(bytes);
                } else {
                    diagram_image = Some(bytes);
                }
            }
            _ => continue,
        }
    }

    let qid = qid.filter(|value| !value.trim().is_empty()).ok_or_else(|| {
        ApiError::BadRequest("Missing question ID".to_string())
    })?;
    let question_image = question_image
        .ok_or_else(|| ApiError::BadRequest("Missing question image".to_string()))?;

    let meta =
        state.questions().save_uploaded(&qid, &question_image, diagram_image.as_deref()).await?;

    let student_url = format!("/exam/{}", meta.question_id);
    Ok(Html(format!(
        "Question {qid} uploaded successfully!<br>\
         Student page: <a href=\"{student_url}\" target=\"_blank\">{student_url}</a>"
    )))
}

async fn single_question_page(
    State(state): State<AppState>,
    Path(qid): Path<String>,
) -> Result<Html<String>, ApiError> {
    let meta = state
        .questions()
        .load_meta(&qid)
        .await
        .map_err(|_| ApiError::NotFound("Question not found".to_string()))?;

    let diagram = meta
        .diagram_image
        .map(|file| format!("<img src=\"/question_file/{qid}/{file}\">", qid = meta.question_id))
        .unwrap_or_default();
    Ok(Html(format!(
        "<!doctype html><html><body>\
         <div id=\"question\" data-qid=\"{qid}\">\
         <img src=\"/question_file/{qid}/{question}\">{diagram}</div>\
         <textarea id=\"answer\"></textarea>\
         </body></html>",
        qid = meta.question_id,
        question = meta.question_image,
    )))
}

async fn question_file(
    State(state): State<AppState>,
    Path((qid, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let bytes = state.questions().read_file(&qid, &filename).await?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&filename))], bytes).into_response())
}

async fn save_exam_answer(
    State(state): State<AppState>,
    Json(payload): Json<SaveExamAnswerRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let overlay_bytes = if overlay::is_image_data_url(&payload.overlay_image) {
        Some(
            overlay::decode_image_data_url(&payload.overlay_image)
                .map_err(|err| ApiError::BadRequest(err.to_string()))?,
        )
    } else {
        None
    };

    let text_file = state
        .legacy()
        .write_exam_answer(
            &payload.qid,
            &payload.student_name,
            &payload.answer_text,
            overlay_bytes.as_deref(),
        )
        .await?;

    Ok(Json(json!({ "status": "success", "file": text_file })))
}
