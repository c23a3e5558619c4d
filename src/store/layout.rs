use std::path::{Path, PathBuf};

use tokio::fs;

/// Directory layout under the data root. Every user-supplied string becomes a
/// path component only after passing [`sanitize_component`].
#[derive(Debug, Clone)]
pub(crate) struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub(crate) async fn init(&self) -> std::io::Result<()> {
        for dir in [
            self.submissions_dir(),
            self.diagrams_dir(),
            self.overlays_dir(),
            self.questions_dir(),
            self.exams_dir(),
            self.attempts_dir(),
            self.drawings_dir(),
        ] {
            fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn submissions_dir(&self) -> PathBuf {
        self.root.join("submissions")
    }

    pub(crate) fn diagrams_dir(&self) -> PathBuf {
        self.root.join("diagrams")
    }

    pub(crate) fn overlays_dir(&self) -> PathBuf {
        self.root.join("diagram_overlays")
    }

    pub(crate) fn questions_dir(&self) -> PathBuf {
        self.root.join("questions")
    }

    pub(crate) fn question_dir(&self, qid: &str) -> PathBuf {
        self.questions_dir().join(sanitize_component(qid))
    }

    pub(crate) fn exams_dir(&self) -> PathBuf {
        self.root.join("exams")
    }

    pub(crate) fn exam_dir(&self, exam_id: &str) -> PathBuf {
        self.exams_dir().join(sanitize_component(exam_id))
    }

    pub(crate) fn attempts_dir(&self) -> PathBuf {
        self.root.join("attempts")
    }

    pub(crate) fn exam_attempts_dir(&self, exam_id: &str) -> PathBuf {
        self.attempts_dir().join(sanitize_component(exam_id))
    }

    pub(crate) fn attempt_file(&self, exam_id: &str, student: &str) -> PathBuf {
        self.exam_attempts_dir(exam_id).join(format!("{}.json", sanitize_component(student)))
    }

    pub(crate) fn drawings_dir(&self) -> PathBuf {
        self.root.join("drawings")
    }
}

/// Canonical sanitizer for user-supplied path components: spaces become
/// underscores, everything outside `[A-Za-z0-9._-]` is dropped, and a result
/// that is empty or dots-only falls back to `unknown`.
pub(crate) fn sanitize_component(raw: &str) -> String {
    let sanitized: String = raw
        .trim()
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "unknown".to_string()
    } else {
        sanitized
    }
}
