//! Percent-encoding for header parameters and URL path segments.

use std::borrow::Cow;

/// Encode a value for an RFC 5987 `ext-value` such as `filename*=UTF-8''<value>`.
/// Only RFC 3986 unreserved bytes pass through, a subset of `attr-char`, so the
/// output is pure ASCII with no quotes, separators or control characters.
pub fn rfc5987_value(input: &str) -> Cow<'_, str> {
    urlencoding::encode(input)
}

/// Encode a single URL path segment (`/` included).
pub fn path_segment(input: &str) -> Cow<'_, str> {
    urlencoding::encode(input)
}

/// `attachment` disposition carrying the display name as an encoded ext-value.
pub fn attachment_disposition(file_name: &str) -> String {
    format!("attachment; filename*=UTF-8''{}", rfc5987_value(file_name))
}
