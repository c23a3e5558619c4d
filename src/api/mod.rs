pub(crate) mod attempts;
pub(crate) mod errors;
pub(crate) mod exams;
pub(crate) mod handlers;
pub(crate) mod helpers;
pub(crate) mod legacy;
pub(crate) mod router;
pub(crate) mod validation;
