use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct AutosaveRequest {
    #[serde(default)]
    #[serde(alias = "examId")]
    pub(crate) exam_id: String,
    #[serde(default)]
    pub(crate) qindex: i64,
    #[serde(default)]
    #[serde(alias = "studentName")]
    pub(crate) student_name: String,
    #[serde(default)]
    #[serde(alias = "answerText")]
    pub(crate) answer_text: String,
    #[serde(default)]
    #[serde(alias = "overlayImage")]
    pub(crate) overlay_image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    #[serde(default)]
    #[serde(alias = "examId")]
    pub(crate) exam_id: String,
    #[serde(default)]
    #[serde(alias = "studentName")]
    pub(crate) student_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionMarkIn {
    pub(crate) score: f64,
    #[serde(default)]
    pub(crate) comment: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GradeRequest {
    #[serde(default)]
    pub(crate) marks: BTreeMap<String, QuestionMarkIn>,
    #[serde(default)]
    #[serde(alias = "overallComment")]
    pub(crate) overall_comment: String,
    #[serde(default)]
    pub(crate) released: bool,
    #[serde(default)]
    #[serde(alias = "gradedBy")]
    pub(crate) graded_by: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptListResponse {
    pub(crate) exam_id: String,
    pub(crate) students: Vec<String>,
}
