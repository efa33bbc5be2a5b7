//! Lightweight input validation helpers. Keep logic minimal and deterministic.

use crate::CoreError;

/// A name must contain at least one character. Whitespace-only names are
/// accepted as-is.
pub fn validate_name(s: &str) -> Result<(), CoreError> {
    if s.is_empty() {
        return Err(CoreError::InvalidInput("the name cannot be empty".into()));
    }
    Ok(())
}

/// Lightweight email check; full RFC compliance not required here.
pub fn validate_email(s: &str) -> Result<(), CoreError> {
    if s.is_empty() || !s.contains('@') {
        return Err(CoreError::InvalidInput("the email is invalid".into()));
    }
    Ok(())
}

/// True when a search query should be treated as "no filter".
pub fn is_blank_query(query: Option<&str>) -> bool {
    query.map_or(true, |q| q.trim().is_empty())
}
