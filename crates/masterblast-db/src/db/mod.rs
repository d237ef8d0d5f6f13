//! Database repositories for data access layer
//!
//! Each repository owns a clone of the pool and is responsible for one domain
//! entity. `get_*` lookups that must resolve to a single row return
//! [`LookupError`] so callers can tell "does not exist" from other failures.

pub mod accession;
pub mod buddy;
pub mod hit;
pub mod job;
pub mod user;

pub use accession::AccessionRepository;
pub use buddy::BuddyRepository;
pub use hit::HitRepository;
pub use job::BlastJobRepository;
pub use user::UserRepository;

use masterblast_core::LookupError;

/// Collapse the rows of a `LIMIT 2` query into exactly one row.
pub(crate) fn exactly_one<T>(
    entity: &'static str,
    rows: Result<Vec<T>, sqlx::Error>,
) -> Result<T, LookupError> {
    let mut rows = rows.map_err(|source| LookupError::Database { entity, source })?;
    match rows.len() {
        0 => Err(LookupError::NotFound(entity)),
        1 => Ok(rows.remove(0)),
        _ => Err(LookupError::MultipleFound(entity)),
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one() {
        assert_eq!(exactly_one("row", Ok(vec![1])).unwrap(), 1);
        assert!(matches!(
            exactly_one::<i32>("row", Ok(vec![])),
            Err(LookupError::NotFound("row"))
        ));
        assert!(matches!(
            exactly_one("row", Ok(vec![1, 2])),
            Err(LookupError::MultipleFound("row"))
        ));
        assert!(matches!(
            exactly_one::<i32>("row", Err(sqlx::Error::RowNotFound)),
            Err(LookupError::Database { entity: "row", .. })
        ));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
        assert_eq!(escape_like("plain"), "plain");
    }
}
