//! Identifier sanitizing for names interpolated into SQL text.

/// Strip every character outside `[A-Za-z0-9_]`.
///
/// Applied to table, schema and alias names right before they are embedded in a
/// statement. Values are never passed through here; see [`crate::dialect::Dialect`].
pub fn sanitize_ident(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}
