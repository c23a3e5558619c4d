use std::path::PathBuf;

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::core::time::compact_stamp;
use crate::store::error::StoreError;
use crate::store::layout::{sanitize_component, StorageLayout};

const ANSWERS_CSV: &str = "answers.csv";

/// Flat-file legacy submissions: the append-only `answers.csv`, uniquely named
/// text/image pairs under `submissions/`, and the diagram/overlay folders.
#[derive(Debug, Clone)]
pub(crate) struct LegacyStore {
    layout: StorageLayout,
}

impl LegacyStore {
    pub(crate) fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// Append one row to `submissions/answers.csv`
    /// (columns: timestamp, student_name, answer_text).
    pub(crate) async fn append_answer_row(
        &self,
        timestamp: &str,
        student_name: &str,
        answer_text: &str,
    ) -> Result<(), StoreError> {
        let dir = self.layout.submissions_dir();
        fs::create_dir_all(&dir).await?;

        let row = format!(
            "{},{},{}\r\n",
            csv_escape(timestamp),
            csv_escape(student_name),
            csv_escape(answer_text)
        );
        let mut file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(dir.join(ANSWERS_CSV))
            .await?;
        file.write_all(row.as_bytes()).await?;
        // The row must be durable before the handler reports success.
        file.flush().await?;
        Ok(())
    }

    pub(crate) async fn save_drawing(
        &self,
        filename_base: &str,
        bytes: &[u8],
    ) -> Result<String, StoreError> {
        let filename = format!("{}.png", sanitize_component(filename_base));
        fs::write(self.layout.submissions_dir().join(&filename), bytes).await?;
        Ok(filename)
    }

    pub(crate) async fn list_files(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match fs::read_dir(self.layout.submissions_dir()).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        files.sort();
        Ok(files)
    }

    pub(crate) async fn read_submission(&self, filename: &str) -> Result<Vec<u8>, StoreError> {
        self.read_from(self.layout.submissions_dir(), filename).await
    }

    pub(crate) async fn read_diagram(&self, filename: &str) -> Result<Vec<u8>, StoreError> {
        self.read_from(self.layout.diagrams_dir(), filename).await
    }

    pub(crate) async fn read_overlay(&self, filename: &str) -> Result<Vec<u8>, StoreError> {
        self.read_from(self.layout.overlays_dir(), filename).await
    }

    /// Persist an annotation-tool overlay as
    /// `diagram_overlays/overlay_<sanitized>_<stamp>.png`.
    pub(crate) async fn save_overlay(
        &self,
        source_diagram: &str,
        bytes: &[u8],
    ) -> Result<String, StoreError> {
        let filename =
            format!("overlay_{}_{}.png", sanitize_component(source_diagram), compact_stamp());
        fs::write(self.layout.overlays_dir().join(&filename), bytes).await?;
        Ok(filename)
    }

    /// Fixed-question demo submission: a single flat text file
    /// `<student>_<stamp>_<qid>.txt`.
    pub(crate) async fn write_fixed_submission(
        &self,
        student_raw: &str,
        qid: &str,
        diagram: &str,
        answer: &str,
        timestamp: &str,
    ) -> Result<String, StoreError> {
        let filename = format!(
            "{}_{}_{}.txt",
            sanitize_component(student_raw),
            sanitize_component(timestamp),
            sanitize_component(qid)
        );
        let body = format!(
            "Student: {student_raw}\nQuestion: {qid}\nDiagram: {diagram}\n\nAnswer:\n{answer}"
        );
        fs::write(self.layout.submissions_dir().join(&filename), body).await?;
        Ok(filename)
    }

    /// Single-question exam answer: `<qid>_<student>_<stamp>.txt` plus an
    /// optional overlay PNG alongside it. Returns the text filename.
    pub(crate) async fn write_exam_answer(
        &self,
        qid: &str,
        student: &str,
        answer_text: &str,
        overlay_bytes: Option<&[u8]>,
    ) -> Result<String, StoreError> {
        let base = format!(
            "{}_{}_{}",
            sanitize_component(qid),
            sanitize_component(student),
            compact_stamp()
        );
        let dir = self.layout.submissions_dir();

        let text_file = format!("{base}.txt");
        let body = format!("Question: {qid}\nStudent: {student}\n\nAnswer:\n{answer_text}");
        fs::write(dir.join(&text_file), body).await?;

        if let Some(bytes) = overlay_bytes {
            fs::write(dir.join(format!("{base}.png")), bytes).await?;
        }

        Ok(text_file)
    }

    async fn read_from(&self, dir: PathBuf, filename: &str) -> Result<Vec<u8>, StoreError> {
        let path = dir.join(sanitize_component(filename));
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::not_found(format!("File '{filename}' not found")))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Minimal RFC 4180 quoting; only applied when the field needs it.
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
