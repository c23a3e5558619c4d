use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

pub(crate) fn now_rfc3339() -> String {
    format_primitive(primitive_now_utc())
}

/// Compact `YYYYMMDD_HHMMSS` stamp used in submission and overlay filenames.
pub(crate) fn compact_stamp() -> String {
    format_compact(primitive_now_utc())
}

pub(crate) fn format_compact(value: PrimitiveDateTime) -> String {
    let format = format_description!("[year][month][day]_[hour][minute][second]");
    value.format(&format).unwrap_or_else(|_| "00000000_000000".to_string())
}
