use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Exam definition, persisted as `exams/<exam_id>/exam.json`. Immutable after
/// creation; there is no edit path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Exam {
    pub(crate) exam_id: String,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    #[serde(default)]
    pub(crate) questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Question {
    pub(crate) qid: String,
    #[serde(default)]
    pub(crate) marks: u32,
    #[serde(default)]
    pub(crate) instruction: String,
    #[serde(default)]
    pub(crate) model_answer: String,
    #[serde(default)]
    pub(crate) question_image: String,
    #[serde(default)]
    pub(crate) diagram_image: Option<String>,
}

/// One student's accumulated work for one exam, persisted as
/// `attempts/<exam_id>/<student>.json`. Answers are keyed by the stringified
/// 1-based question index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Attempt {
    pub(crate) exam_id: String,
    pub(crate) student: String,
    #[serde(default)]
    pub(crate) answers: BTreeMap<String, AnswerEntry>,
    #[serde(default)]
    pub(crate) submitted: bool,
    #[serde(default)]
    pub(crate) submitted_at: Option<String>,
    #[serde(default)]
    pub(crate) grading: Option<Grading>,
}

impl Attempt {
    pub(crate) fn new(exam_id: &str, student: &str) -> Self {
        Self {
            exam_id: exam_id.to_string(),
            student: student.to_string(),
            answers: BTreeMap::new(),
            submitted: false,
            submitted_at: None,
            grading: None,
        }
    }
}

/// Replaced wholesale on every autosave for its question index; no history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AnswerEntry {
    pub(crate) answer_text: String,
    #[serde(default)]
    pub(crate) overlay_file: String,
    pub(crate) saved_at: String,
}

/// Teacher-assigned marks. Attached (and re-attached, overwriting wholesale)
/// by the grading endpoint; may land before or after submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Grading {
    #[serde(default)]
    pub(crate) marks: BTreeMap<String, QuestionMark>,
    #[serde(default)]
    pub(crate) overall_comment: String,
    #[serde(default)]
    pub(crate) released: bool,
    pub(crate) graded_at: String,
    #[serde(default)]
    pub(crate) graded_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct QuestionMark {
    pub(crate) score: f64,
    #[serde(default)]
    pub(crate) comment: String,
}

/// `questions/<qid>/meta.json` for the single-question legacy path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct QuestionMeta {
    pub(crate) question_id: String,
    pub(crate) question_image: String,
    #[serde(default)]
    pub(crate) diagram_image: Option<String>,
}

/// Entry in the immutable fixed-question demo map.
#[derive(Debug, Clone)]
pub(crate) struct FixedQuestion {
    pub(crate) diagram: &'static str,
    pub(crate) text: &'static str,
    pub(crate) parts: &'static [&'static str],
}
