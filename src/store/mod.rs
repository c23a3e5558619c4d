pub(crate) mod attempts;
pub(crate) mod error;
pub(crate) mod exams;
pub(crate) mod layout;
pub(crate) mod models;
pub(crate) mod questions;
pub(crate) mod submissions;
