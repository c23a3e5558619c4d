use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;

use crate::core::time::{compact_stamp, now_rfc3339};
use crate::services::overlay;
use crate::store::error::StoreError;
use crate::store::layout::{sanitize_component, StorageLayout};
use crate::store::models::{AnswerEntry, Attempt, Exam, Grading, QuestionMark};

/// Durable accumulation of a student's per-question work for one exam.
///
/// Every write is a read-modify-write of the whole JSON record. Records are
/// keyed by (exam_id, student) and each key is guarded by its own async mutex,
/// so concurrent autosaves for the same student cannot drop each other's
/// answers; distinct students proceed in parallel. Identity is the sanitized
/// student name, so two students sharing a name share a record.
#[derive(Debug)]
pub(crate) struct AttemptStore {
    layout: StorageLayout,
    locks: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

#[derive(Debug)]
pub(crate) struct AutosaveOutcome {
    pub(crate) attempt: Attempt,
    pub(crate) overlay_file: Option<String>,
    pub(crate) attempt_file: String,
}

impl AttemptStore {
    pub(crate) fn new(layout: StorageLayout) -> Self {
        Self { layout, locks: Mutex::new(HashMap::new()) }
    }

    pub(crate) async fn autosave(
        &self,
        exam: &Exam,
        qindex: i64,
        student: &str,
        answer_text: &str,
        overlay_data_url: Option<&str>,
    ) -> Result<AutosaveOutcome, StoreError> {
        if student.trim().is_empty() {
            return Err(StoreError::validation("studentName is required"));
        }

        let question_count = exam.questions.len() as i64;
        if qindex < 1 || qindex > question_count {
            return Err(StoreError::validation(format!(
                "qindex must be between 1 and {question_count}"
            )));
        }

        let lock = self.record_lock(&exam.exam_id, student).await;
        let _guard = lock.lock().await;

        let mut overlay_file = None;
        if let Some(data_url) = overlay_data_url.filter(|url| overlay::is_image_data_url(url)) {
            let bytes = overlay::decode_image_data_url(data_url)
                .map_err(|err| StoreError::validation(err.to_string()))?;
            let filename = format!(
                "{}_{}_{}_{}.png",
                sanitize_component(&exam.exam_id),
                sanitize_component(student),
                qindex,
                compact_stamp()
            );
            // Written before the record update; a failed record write can
            // leave this file orphaned (documented gap, no rollback).
            fs::write(self.layout.drawings_dir().join(&filename), &bytes).await?;
            overlay_file = Some(filename);
        }

        let path = self.layout.attempt_file(&exam.exam_id, student);
        let mut attempt = self
            .read_record(&path)
            .await?
            .unwrap_or_else(|| Attempt::new(&exam.exam_id, student));

        attempt.answers.insert(
            qindex.to_string(),
            AnswerEntry {
                answer_text: answer_text.to_string(),
                overlay_file: overlay_file.clone().unwrap_or_default(),
                saved_at: now_rfc3339(),
            },
        );

        self.write_record(&path, &attempt).await?;

        Ok(AutosaveOutcome { attempt, overlay_file, attempt_file: self.display_path(&path) })
    }

    /// Idempotent: the flag is one-way, the timestamp is refreshed every call.
    pub(crate) async fn submit(&self, exam_id: &str, student: &str) -> Result<Attempt, StoreError> {
        let lock = self.record_lock(exam_id, student).await;
        let _guard = lock.lock().await;

        let path = self.layout.attempt_file(exam_id, student);
        let mut attempt = self.read_record(&path).await?.ok_or_else(|| {
            StoreError::not_found(format!("No attempt for '{student}' in exam '{exam_id}'"))
        })?;

        attempt.submitted = true;
        attempt.submitted_at = Some(now_rfc3339());
        self.write_record(&path, &attempt).await?;
        Ok(attempt)
    }

    /// Replaces the prior grading wholesale; ordering relative to submission
    /// is not enforced.
    pub(crate) async fn grade(
        &self,
        exam_id: &str,
        student: &str,
        marks: BTreeMap<String, QuestionMark>,
        overall_comment: String,
        released: bool,
        graded_by: String,
    ) -> Result<Attempt, StoreError> {
        let lock = self.record_lock(exam_id, student).await;
        let _guard = lock.lock().await;

        let path = self.layout.attempt_file(exam_id, student);
        let mut attempt = self.read_record(&path).await?.ok_or_else(|| {
            StoreError::not_found(format!("No attempt for '{student}' in exam '{exam_id}'"))
        })?;

        attempt.grading =
            Some(Grading { marks, overall_comment, released, graded_at: now_rfc3339(), graded_by });
        self.write_record(&path, &attempt).await?;
        Ok(attempt)
    }

    pub(crate) async fn load(&self, exam_id: &str, student: &str) -> Result<Attempt, StoreError> {
        let path = self.layout.attempt_file(exam_id, student);
        self.read_record(&path).await?.ok_or_else(|| {
            StoreError::not_found(format!("No attempt for '{student}' in exam '{exam_id}'"))
        })
    }

    /// Student identifiers derived from file presence under
    /// `attempts/<exam_id>/`.
    pub(crate) async fn list_students(&self, exam_id: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.layout.exam_attempts_dir(exam_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut students = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(stem) = name.strip_suffix(".json") {
                students.push(stem.to_string());
            }
        }
        students.sort();
        Ok(students)
    }

    async fn record_lock(&self, exam_id: &str, student: &str) -> Arc<Mutex<()>> {
        let key = (sanitize_component(exam_id), sanitize_component(student));
        let mut locks = self.locks.lock().await;
        locks.entry(key).or_default().clone()
    }

    async fn read_record(&self, path: &Path) -> Result<Option<Attempt>, StoreError> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_record(&self, path: &Path, attempt: &Attempt) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(attempt)?;
        fs::write(path, bytes).await?;
        Ok(())
    }

    fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(self.layout.root()).unwrap_or(path).display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::now_rfc3339;
    use crate::store::models::Question;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    fn exam_with_questions(exam_id: &str, count: usize) -> Exam {
        Exam {
            exam_id: exam_id.to_string(),
            title: "Physics Paper 1".to_string(),
            created_by: "teacher".to_string(),
            created_at: now_rfc3339(),
            questions: (1..=count)
                .map(|i| Question {
                    qid: format!("q{i}"),
                    marks: 5,
                    instruction: String::new(),
                    model_answer: String::new(),
                    question_image: String::new(),
                    diagram_image: None,
                })
                .collect(),
        }
    }

    async fn store() -> (tempfile::TempDir, AttemptStore) {
        let root = tempfile::tempdir().expect("tempdir");
        let layout = StorageLayout::new(root.path());
        layout.init().await.expect("init");
        (root, AttemptStore::new(layout))
    }

    #[tokio::test]
    async fn autosave_is_last_write_wins_per_question() {
        let (_root, store) = store().await;
        let exam = exam_with_questions("exam_1", 2);

        store.autosave(&exam, 1, "Asha", "first draft", None).await.expect("autosave");
        store.autosave(&exam, 1, "Asha", "42 degrees", None).await.expect("autosave");

        let attempt = store.load("exam_1", "Asha").await.expect("load");
        assert_eq!(attempt.answers.len(), 1);
        assert_eq!(attempt.answers["1"].answer_text, "42 degrees");
    }

    #[tokio::test]
    async fn autosave_keeps_answers_for_distinct_questions() {
        let (_root, store) = store().await;
        let exam = exam_with_questions("exam_1", 2);

        store.autosave(&exam, 1, "Asha", "answer one", None).await.expect("autosave");
        store.autosave(&exam, 2, "Asha", "answer two", None).await.expect("autosave");

        let attempt = store.load("exam_1", "Asha").await.expect("load");
        assert_eq!(attempt.answers.len(), 2);
        assert_eq!(attempt.answers["1"].answer_text, "answer one");
        assert_eq!(attempt.answers["2"].answer_text, "answer two");
    }

    #[tokio::test]
    async fn autosave_rejects_out_of_range_qindex_without_writing() {
        let (root, store) = store().await;
        let exam = exam_with_questions("exam_1", 1);

        for qindex in [0, -1, 2] {
            let err = store.autosave(&exam, qindex, "Asha", "x", None).await.expect_err("range");
            assert!(matches!(err, StoreError::Validation(_)), "qindex {qindex}");
        }

        assert!(!root.path().join("attempts/exam_1/Asha.json").exists());
        assert!(store.load("exam_1", "Asha").await.is_err());
    }

    #[tokio::test]
    async fn autosave_rejects_empty_student() {
        let (_root, store) = store().await;
        let exam = exam_with_questions("exam_1", 1);
        let err = store.autosave(&exam, 1, "  ", "x", None).await.expect_err("student");
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn autosave_persists_overlay_bytes_exactly() {
        let (root, store) = store().await;
        let exam = exam_with_questions("exam_1", 1);

        let payload = b"fake png contents";
        let data_url = format!("data:image/png;base64,{}", STANDARD.encode(payload));
        let outcome = store
            .autosave(&exam, 1, "Asha", "see drawing", Some(&data_url))
            .await
            .expect("autosave");

        let overlay_file = outcome.overlay_file.expect("overlay file");
        assert!(overlay_file.starts_with("exam_1_Asha_1_"));
        let on_disk = std::fs::read(root.path().join("drawings").join(&overlay_file)).unwrap();
        assert_eq!(on_disk, payload);

        let attempt = store.load("exam_1", "Asha").await.expect("load");
        assert_eq!(attempt.answers["1"].overlay_file, overlay_file);
    }

    #[tokio::test]
    async fn autosave_rejects_malformed_overlay() {
        let (_root, store) = store().await;
        let exam = exam_with_questions("exam_1", 1);
        let err = store
            .autosave(&exam, 1, "Asha", "x", Some("data:image/png;base64,!!!"))
            .await
            .expect_err("overlay");
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn submit_requires_existing_attempt() {
        let (_root, store) = store().await;
        let err = store.submit("exam_1", "Asha").await.expect_err("missing");
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn submit_is_idempotent_and_restamps() {
        let (_root, store) = store().await;
        let exam = exam_with_questions("exam_1", 1);
        store.autosave(&exam, 1, "Asha", "42 degrees", None).await.expect("autosave");

        let first = store.submit("exam_1", "Asha").await.expect("submit");
        assert!(first.submitted);
        let first_stamp = first.submitted_at.expect("stamp");

        let second = store.submit("exam_1", "Asha").await.expect("resubmit");
        assert!(second.submitted);
        assert!(second.submitted_at.is_some());
        // Both stamps are valid RFC 3339; the second is never earlier.
        assert!(second.submitted_at.unwrap() >= first_stamp);
    }

    #[tokio::test]
    async fn grade_replaces_grading_wholesale() {
        let (_root, store) = store().await;
        let exam = exam_with_questions("exam_1", 2);
        store.autosave(&exam, 1, "Asha", "42 degrees", None).await.expect("autosave");

        let mut marks = BTreeMap::new();
        marks.insert("1".to_string(), QuestionMark { score: 4.0, comment: "close".to_string() });
        marks.insert("2".to_string(), QuestionMark { score: 0.0, comment: String::new() });
        store
            .grade("exam_1", "Asha", marks, "good work".to_string(), false, "Mr Iyer".to_string())
            .await
            .expect("grade");

        // Regrade with an empty marks map still persists the metadata.
        let regraded = store
            .grade("exam_1", "Asha", BTreeMap::new(), "final".to_string(), true, "Ms K".to_string())
            .await
            .expect("regrade");

        let grading = regraded.grading.expect("grading");
        assert!(grading.marks.is_empty());
        assert_eq!(grading.overall_comment, "final");
        assert!(grading.released);
        assert_eq!(grading.graded_by, "Ms K");
    }

    #[tokio::test]
    async fn grade_requires_existing_attempt() {
        let (_root, store) = store().await;
        let err = store
            .grade("exam_1", "Asha", BTreeMap::new(), String::new(), false, String::new())
            .await
            .expect_err("missing");
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn grading_before_submission_is_allowed() {
        let (_root, store) = store().await;
        let exam = exam_with_questions("exam_1", 1);
        store.autosave(&exam, 1, "Asha", "draft", None).await.expect("autosave");

        let graded = store
            .grade("exam_1", "Asha", BTreeMap::new(), "early".to_string(), false, "T".to_string())
            .await
            .expect("grade");
        assert!(!graded.submitted);
        assert!(graded.grading.is_some());

        let submitted = store.submit("exam_1", "Asha").await.expect("submit");
        assert!(submitted.grading.is_some(), "grading survives submission");
    }

    #[tokio::test]
    async fn list_students_reflects_file_presence() {
        let (_root, store) = store().await;
        let exam = exam_with_questions("exam_1", 1);

        assert!(store.list_students("exam_1").await.expect("empty").is_empty());

        store.autosave(&exam, 1, "Asha Rao", "a", None).await.expect("autosave");
        store.autosave(&exam, 1, "Ben", "b", None).await.expect("autosave");

        let students = store.list_students("exam_1").await.expect("list");
        assert_eq!(students, vec!["Asha_Rao".to_string(), "Ben".to_string()]);
    }

    #[tokio::test]
    async fn same_name_students_share_a_record() {
        let (_root, store) = store().await;
        let exam = exam_with_questions("exam_1", 2);

        store.autosave(&exam, 1, "Asha Rao", "from laptop", None).await.expect("autosave");
        store.autosave(&exam, 2, "Asha_Rao", "from tablet", None).await.expect("autosave");

        let attempt = store.load("exam_1", "Asha Rao").await.expect("load");
        assert_eq!(attempt.answers.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_autosaves_to_different_questions_both_survive() {
        let (_root, store) = store().await;
        let store = Arc::new(store);
        let exam = Arc::new(exam_with_questions("exam_1", 2));

        let mut handles = Vec::new();
        for qindex in [1_i64, 2] {
            let store = store.clone();
            let exam = exam.clone();
            handles.push(tokio::spawn(async move {
                store.autosave(&exam, qindex, "Asha", "racing", None).await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("autosave");
        }

        let attempt = store.load("exam_1", "Asha").await.expect("load");
        assert_eq!(attempt.answers.len(), 2);
    }
}
