use std::sync::Arc;

use crate::core::config::Settings;
use crate::store::attempts::AttemptStore;
use crate::store::exams::ExamRepository;
use crate::store::layout::StorageLayout;
use crate::store::questions::{FixedQuestions, QuestionStore};
use crate::store::submissions::LegacyStore;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    layout: StorageLayout,
    exams: ExamRepository,
    attempts: AttemptStore,
    questions: QuestionStore,
    legacy: LegacyStore,
    fixed_questions: FixedQuestions,
}

impl AppState {
    pub(crate) fn new(settings: Settings, layout: StorageLayout) -> Self {
        let exams = ExamRepository::new(layout.clone());
        let attempts = AttemptStore::new(layout.clone());
        let questions = QuestionStore::new(layout.clone());
        let legacy = LegacyStore::new(layout.clone());

        Self {
            inner: Arc::new(InnerState {
                settings,
                layout,
                exams,
                attempts,
                questions,
                legacy,
                fixed_questions: FixedQuestions::builtin(),
            }),
        }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn layout(&self) -> &StorageLayout {
        &self.inner.layout
    }

    pub(crate) fn exams(&self) -> &ExamRepository {
        &self.inner.exams
    }

    pub(crate) fn attempts(&self) -> &AttemptStore {
        &self.inner.attempts
    }

    pub(crate) fn questions(&self) -> &QuestionStore {
        &self.inner.questions
    }

    pub(crate) fn legacy(&self) -> &LegacyStore {
        &self.inner.legacy
    }

    pub(crate) fn fixed_questions(&self) -> &FixedQuestions {
        &self.inner.fixed_questions
    }
}
