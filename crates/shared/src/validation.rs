//! Common validation utilities.

use validator::ValidationError;

/// Minimum username length.
pub const USERNAME_MIN_LEN: usize = 3;

/// Maximum username length.
pub const USERNAME_MAX_LEN: usize = 32;

/// Minimum length of a member search query.
pub const SEARCH_QUERY_MIN_LEN: usize = 2;

lazy_static::lazy_static! {
    static ref USERNAME_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

/// Validates a display username (3-32 chars of letters, digits, `_` or `-`).
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        let mut err = ValidationError::new("username_length");
        err.message = Some(
            format!(
                "Username must be between {} and {} characters",
                USERNAME_MIN_LEN, USERNAME_MAX_LEN
            )
            .into(),
        );
        return Err(err);
    }

    if !USERNAME_REGEX.is_match(username) {
        let mut err = ValidationError::new("username_charset");
        err.message =
            Some("Username may only contain letters, digits, '_' and '-'".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a table number against the fixed table count.
pub fn validate_table_number(table: i16, table_count: i16) -> Result<(), ValidationError> {
    if (1..=table_count).contains(&table) {
        Ok(())
    } else {
        let mut err = ValidationError::new("table_range");
        err.message = Some(format!("Table must be between 1 and {}", table_count).into());
        Err(err)
    }
}

/// Normalizes a search query: trims whitespace and returns `None` when it is
/// too short to search for.
pub fn normalize_search_query(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.chars().count() < SEARCH_QUERY_MIN_LEN {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}
