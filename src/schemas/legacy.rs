use serde::Deserialize;

/// Form body of the original single-page submission (POST `/`).
#[derive(Debug, Deserialize)]
pub(crate) struct IndexSubmission {
    #[serde(default = "default_student")]
    pub(crate) student_name: String,
    #[serde(default)]
    pub(crate) answer_text: String,
    #[serde(default)]
    pub(crate) drawing_data: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SaveDiagramRequest {
    #[serde(default)]
    #[serde(alias = "imageData")]
    pub(crate) image_data: String,
    #[serde(default = "default_unknown")]
    #[serde(alias = "sourceDiagram")]
    pub(crate) source_diagram: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FixedQuestionSubmission {
    #[serde(default)]
    pub(crate) timestamp: Option<String>,
    #[serde(default = "default_student")]
    pub(crate) student: String,
    #[serde(default = "default_unknown")]
    pub(crate) question: String,
    #[serde(default)]
    pub(crate) diagram: String,
    #[serde(default)]
    pub(crate) answer: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SaveExamAnswerRequest {
    #[serde(default = "default_unknown")]
    pub(crate) qid: String,
    #[serde(default = "default_student")]
    #[serde(alias = "studentName")]
    pub(crate) student_name: String,
    #[serde(default)]
    #[serde(alias = "answerText")]
    pub(crate) answer_text: String,
    #[serde(default)]
    #[serde(alias = "overlayImage")]
    pub(crate) overlay_image: String,
}

fn default_student() -> String {
    "Unknown".to_string()
}

fn default_unknown() -> String {
    "unknown".to_string()
}
