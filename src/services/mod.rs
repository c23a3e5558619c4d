pub(crate) mod overlay;
