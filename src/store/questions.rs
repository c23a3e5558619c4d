use std::collections::HashMap;

use tokio::fs;

use crate::store::error::StoreError;
use crate::store::layout::{sanitize_component, StorageLayout};
use crate::store::models::{FixedQuestion, QuestionMeta};

const QUESTION_IMAGE: &str = "question.png";
const DIAGRAM_IMAGE: &str = "diagram.png";
const META_FILE: &str = "meta.json";

/// Single-question legacy path: one teacher-uploaded question per folder
/// under `questions/<qid>/`. No grading or read-back beyond serving the
/// stored files.
#[derive(Debug, Clone)]
pub(crate) struct QuestionStore {
    layout: StorageLayout,
}

impl QuestionStore {
    pub(crate) fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    pub(crate) async fn save_uploaded(
        &self,
        qid: &str,
        question_image: &[u8],
        diagram_image: Option<&[u8]>,
    ) -> Result<QuestionMeta, StoreError> {
        let dir = self.layout.question_dir(qid);
        fs::create_dir_all(&dir).await?;

        fs::write(dir.join(QUESTION_IMAGE), question_image).await?;
        if let Some(bytes) = diagram_image {
            fs::write(dir.join(DIAGRAM_IMAGE), bytes).await?;
        }

        let meta = QuestionMeta {
            question_id: sanitize_component(qid),
            question_image: QUESTION_IMAGE.to_string(),
            diagram_image: diagram_image.map(|_| DIAGRAM_IMAGE.to_string()),
        };
        fs::write(dir.join(META_FILE), serde_json::to_vec_pretty(&meta)?).await?;
        Ok(meta)
    }

    pub(crate) async fn load_meta(&self, qid: &str) -> Result<QuestionMeta, StoreError> {
        let path = self.layout.question_dir(qid).join(META_FILE);
        match fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::not_found(format!("Question '{qid}' not found")))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) async fn read_file(
        &self,
        qid: &str,
        filename: &str,
    ) -> Result<Vec<u8>, StoreError> {
        let path = self.layout.question_dir(qid).join(sanitize_component(filename));
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::not_found(format!("File '{filename}' not found")))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Immutable demo-question map, built once at startup rather than inside a
/// request handler.
#[derive(Debug)]
pub(crate) struct FixedQuestions {
    questions: HashMap<&'static str, FixedQuestion>,
}

impl FixedQuestions {
    pub(crate) fn builtin() -> Self {
        let mut questions = HashMap::new();
        questions.insert(
            "light_q5",
            FixedQuestion {
                diagram: "light_question.png",
                text: "<p>(a) A ray of light is incident normally on the curved surface of a \
                       semicircular block.</p>\
                       <p>(i) Calculate the critical angle.</p>\
                       <p>(ii) Draw and describe the path of the ray.</p>",
                parts: &["(i) Critical angle", "(ii) Ray path explanation"],
            },
        );
        Self { questions }
    }

    pub(crate) fn get(&self, qid: &str) -> Option<&FixedQuestion> {
        self.questions.get(qid)
    }
}
