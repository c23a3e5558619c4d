use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(default)]
    pub(crate) qid: Option<String>,
    #[serde(default)]
    pub(crate) marks: u32,
    #[serde(default)]
    pub(crate) instruction: String,
    #[serde(default)]
    #[serde(alias = "modelAnswer")]
    pub(crate) model_answer: String,
    #[serde(default)]
    #[serde(alias = "questionImage")]
    pub(crate) question_image: String,
    #[serde(default)]
    #[serde(alias = "diagramImage")]
    pub(crate) diagram_image: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[serde(default)]
    #[serde(alias = "examId")]
    pub(crate) exam_id: Option<String>,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    #[serde(alias = "createdBy")]
    pub(crate) created_by: String,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) questions: Vec<QuestionCreate>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamSummaryResponse {
    pub(crate) exam_id: String,
    pub(crate) title: String,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) question_count: usize,
}
