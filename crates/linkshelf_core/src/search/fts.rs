//! SQLite FTS5-based link search.
//!
//! # Responsibility
//! - Rewrite free text into a prefix-matching FTS5 expression.
//! - Return matching link ids ordered by rank.
//!
//! # Invariants
//! - Blank input returns an empty result without touching the database.
//! - Bare `AND`/`OR`/`NOT` tokens are kept as operators; every other token is
//!   quoted and gets a trailing `*`.
//! - Operators always sit between two terms; runs collapse to their last one.

use crate::db::DbError;
use crate::mapper::RowDecoder;
use crate::model::LinkId;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

const SEARCH_SQL: &str = "select id from search where search match ? order by rank";

/// FTS5 control characters stripped from user tokens.
static CONTROL_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"["*^():{}]+"#).expect("search control character pattern is valid")
});

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error for query parsing, DB interaction and result decoding.
#[derive(Debug)]
pub enum SearchError {
    /// The rewritten expression is still not valid FTS5 syntax.
    InvalidQuery {
        query: String,
        message: String,
    },
    Db(DbError),
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidQuery { .. } => None,
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::from(value))
    }
}

/// Searches link url/title/description and returns matching ids.
pub fn search_links(conn: &Connection, term: &str) -> SearchResult<Vec<LinkId>> {
    let Some(match_expr) = build_match_expression(term) else {
        return Ok(Vec::new());
    };

    let mut stmt = conn.prepare_cached(SEARCH_SQL)?;
    let mut rows = stmt
        .query([match_expr.as_str()])
        .map_err(|err| map_query_error(err, &match_expr))?;
    let mut ids = Vec::new();

    while let Some(row) = rows
        .next()
        .map_err(|err| map_query_error(err, &match_expr))?
    {
        let id = RowDecoder::new(row, "search")
            .uuid("id")
            .map_err(|err| SearchError::InvalidData(err.to_string()))?;
        ids.push(id);
    }

    Ok(ids)
}

/// Rewrites user input into an FTS5 prefix expression.
///
/// Returns `None` when nothing searchable remains.
pub fn build_match_expression(term: &str) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for token in term.split_whitespace() {
        if is_operator(token) {
            // In a run of operators only the last one applies.
            if parts.last().is_some_and(|part| is_operator(part)) {
                parts.pop();
            }
            parts.push(token.to_string());
            continue;
        }
        let cleaned = CONTROL_CHARS.replace_all(token, "");
        if cleaned.is_empty() {
            continue;
        }
        parts.push(format!("\"{cleaned}\"*"));
    }

    // Operators need an operand on both sides.
    while parts.first().is_some_and(|part| is_operator(part)) {
        parts.remove(0);
    }
    while parts.last().is_some_and(|part| is_operator(part)) {
        parts.pop();
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn is_operator(token: &str) -> bool {
    matches!(token, "AND" | "OR" | "NOT")
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }

    SearchError::Db(DbError::from(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::build_match_expression;

    #[test]
    fn tokens_get_quoted_prefix_wildcards() {
        assert_eq!(
            build_match_expression("rust async").as_deref(),
            Some("\"rust\"* \"async\"*")
        );
    }

    #[test]
    fn boolean_operators_pass_through() {
        assert_eq!(
            build_match_expression("rust OR go NOT java").as_deref(),
            Some("\"rust\"* OR \"go\"* NOT \"java\"*")
        );
        assert_eq!(
            build_match_expression("or").as_deref(),
            Some("\"or\"*")
        );
    }

    #[test]
    fn consecutive_operators_collapse_to_last() {
        assert_eq!(
            build_match_expression("rust AND OR go").as_deref(),
            Some("\"rust\"* OR \"go\"*")
        );
        assert_eq!(
            build_match_expression("OR rust NOT NOT AND").as_deref(),
            Some("\"rust\"*")
        );
        assert_eq!(
            build_match_expression("rust AND \"*\" NOT go").as_deref(),
            Some("\"rust\"* NOT \"go\"*")
        );
    }

    #[test]
    fn control_characters_are_stripped() {
        assert_eq!(
            build_match_expression("\"quoted\" (group) ^start*").as_deref(),
            Some("\"quoted\"* \"group\"* \"start\"*")
        );
        assert_eq!(
            build_match_expression("example.com").as_deref(),
            Some("\"example.com\"*")
        );
    }

    #[test]
    fn blank_or_operator_only_input_yields_none() {
        assert_eq!(build_match_expression("   "), None);
        assert_eq!(build_match_expression("\"*\" ()"), None);
        assert_eq!(build_match_expression("AND OR"), None);
    }

    #[test]
    fn dangling_operators_are_trimmed() {
        assert_eq!(
            build_match_expression("AND rust OR").as_deref(),
            Some("\"rust\"*")
        );
    }
}
