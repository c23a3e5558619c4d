use tokio::fs;

use crate::store::error::StoreError;
use crate::store::layout::{sanitize_component, StorageLayout};
use crate::store::models::Exam;

const EXAM_FILE: &str = "exam.json";
// Earlier snapshots wrote the definition as meta.json; still readable.
const LEGACY_EXAM_FILE: &str = "meta.json";

#[derive(Debug, Clone)]
pub(crate) struct ExamRepository {
    layout: StorageLayout,
}

impl ExamRepository {
    pub(crate) fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    pub(crate) async fn create(&self, exam: &Exam) -> Result<(), StoreError> {
        let dir = self.layout.exam_dir(&exam.exam_id);
        fs::create_dir_all(&dir).await?;
        let bytes = serde_json::to_vec_pretty(exam)?;
        fs::write(dir.join(EXAM_FILE), bytes).await?;
        Ok(())
    }

    pub(crate) async fn load(&self, exam_id: &str) -> Result<Exam, StoreError> {
        let dir = self.layout.exam_dir(exam_id);

        for candidate in [EXAM_FILE, LEGACY_EXAM_FILE] {
            match fs::read(dir.join(candidate)).await {
                Ok(bytes) => return Ok(serde_json::from_slice(&bytes)?),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(StoreError::not_found(format!("Exam '{exam_id}' not found")))
    }

    pub(crate) async fn exists(&self, exam_id: &str) -> bool {
        self.load(exam_id).await.is_ok()
    }

    pub(crate) async fn list(&self) -> Result<Vec<Exam>, StoreError> {
        let mut exams = Vec::new();
        let mut entries = match fs::read_dir(self.layout.exams_dir()).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(exams),
            Err(err) => return Err(err.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let exam_id = entry.file_name().to_string_lossy().to_string();
            match self.load(&exam_id).await {
                Ok(exam) => exams.push(exam),
                Err(StoreError::NotFound(_)) => continue,
                Err(err) => {
                    tracing::warn!(error = %err, exam_id = %exam_id, "Skipping unreadable exam record");
                }
            }
        }

        exams.sort_by(|a, b| a.exam_id.cmp(&b.exam_id));
        Ok(exams)
    }

    /// Store an uploaded media file under the exam's namespace. Returns the
    /// sanitized name the file was saved as.
    pub(crate) async fn save_asset(
        &self,
        exam_id: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String, StoreError> {
        let dir = self.layout.exam_dir(exam_id);
        fs::create_dir_all(&dir).await?;
        let stored = sanitize_component(filename);
        fs::write(dir.join(&stored), bytes).await?;
        Ok(stored)
    }

    pub(crate) async fn read_asset(
        &self,
        exam_id: &str,
        filename: &str,
    ) -> Result<Vec<u8>, StoreError> {
        let path = self.layout.exam_dir(exam_id).join(sanitize_component(filename));
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::not_found(format!("File '{filename}' not found")))
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::now_rfc3339;
    use crate::store::models::Question;

    fn sample_exam(exam_id: &str, title: &str) -> Exam {
        Exam {
            exam_id: exam_id.to_string(),
            title: title.to_string(),
            created_by: "teacher".to_string(),
            created_at: now_rfc3339(),
            questions: vec![Question {
                qid: "q1".to_string(),
                marks: 5,
                instruction: "Calculate the critical angle.".to_string(),
                model_answer: "42 degrees".to_string(),
                question_image: "question.png".to_string(),
                diagram_image: Some("diagram.png".to_string()),
            }],
        }
    }

    async fn repo() -> (tempfile::TempDir, ExamRepository) {
        let root = tempfile::tempdir().expect("tempdir");
        let layout = StorageLayout::new(root.path());
        layout.init().await.expect("init");
        (root, ExamRepository::new(layout))
    }

    #[tokio::test]
    async fn create_then_load_round_trips() {
        let (_root, repo) = repo().await;
        repo.create(&sample_exam("exam_1", "Physics Paper 1")).await.expect("create");

        let loaded = repo.load("exam_1").await.expect("load");
        assert_eq!(loaded.title, "Physics Paper 1");
        assert_eq!(loaded.questions.len(), 1);
        assert_eq!(loaded.questions[0].marks, 5);
    }

    #[tokio::test]
    async fn load_missing_exam_is_not_found() {
        let (_root, repo) = repo().await;
        let err = repo.load("nope").await.expect_err("missing");
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_returns_exams_sorted_by_id() {
        let (_root, repo) = repo().await;
        repo.create(&sample_exam("exam_2", "B")).await.expect("create");
        repo.create(&sample_exam("exam_1", "A")).await.expect("create");

        let exams = repo.list().await.expect("list");
        let ids: Vec<&str> = exams.iter().map(|e| e.exam_id.as_str()).collect();
        assert_eq!(ids, vec!["exam_1", "exam_2"]);
    }

    #[tokio::test]
    async fn assets_round_trip_and_stay_in_namespace() {
        let (root, repo) = repo().await;
        let stored =
            repo.save_asset("exam_1", "../escape attempt.png", b"png-bytes").await.expect("save");
        assert_eq!(stored, "..escape_attempt.png");

        let bytes = repo.read_asset("exam_1", "../escape attempt.png").await.expect("read");
        assert_eq!(bytes, b"png-bytes");
        assert!(root.path().join("exams/exam_1").join(&stored).is_file());
    }

    #[tokio::test]
    async fn read_missing_asset_is_not_found() {
        let (_root, repo) = repo().await;
        repo.create(&sample_exam("exam_1", "A")).await.expect("create");
        let err = repo.read_asset("exam_1", "missing.png").await.expect_err("missing");
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
