//! SQL safety guard for read-only enforcement.
//!
//! This module decides whether a candidate SQL statement may be executed by
//! the `query` tool. It is a denylist/heuristic gate operating on raw text,
//! deliberately not a SQL parser: it trades completeness for simplicity and
//! is best-effort protection for a cooperative agent, not a security boundary
//! against a hostile client with direct protocol access.
//!
//! Each check is an independent predicate; [`validate_sql`] composes them
//! first-match-wins:
//!
//! 1. statement shape (`SELECT`/`SHOW` only)
//! 2. disallowed keyword denylist
//! 3. sensitive field denylist
//! 4. injection heuristics (stored-procedure call, stacked statements,
//!    unbalanced quotes)

use regex::Regex;
use std::sync::LazyLock;

/// Mutating/DDL/procedural keywords rejected anywhere in the statement,
/// including inside string literals. Matching substrings rather than tokens
/// over-rejects (e.g. `WHERE name='DROP'`), which is the accepted tradeoff.
const DANGEROUS_KEYWORDS: &[&str] = &[
    "DROP",
    "DELETE",
    "INSERT",
    "UPDATE",
    "ALTER",
    "CREATE",
    "TRUNCATE",
    "REPLACE",
    "MERGE",
    "CALL",
    "EXEC",
    "UNION",
    "SCRIPT",
    "JAVASCRIPT",
    "VBSCRIPT",
];

/// Column-name substrings considered sensitive. Also matched as substrings,
/// so an identifier like `phone_extension` is rejected too.
const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "passwd",
    "pwd",
    "salary",
    "income",
    "wage",
    "ssn",
    "social_security_number",
    "credit_card",
    "card_number",
    "phone",
    "email",
    "address",
];

/// Stored-procedure invocation: `exec sp_...` / `exec xp_...`.
static STORED_PROC_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)exec(\s|\+)+(s|x)p\w+").expect("valid regex"));

/// UNION-based injection.
static UNION_SELECT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bunion\s+select").expect("valid regex"));

/// Stacked mutating statement after a semicolon.
static STACKED_STATEMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i);\s*(drop|delete|insert|update)").expect("valid regex"));

/// The injection heuristic that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionKind {
    /// A known attack pattern matched (stored procedure, UNION SELECT,
    /// stacked mutating statement).
    PatternMatch,
    /// Odd number of single quotes (unbalanced string literal).
    UnmatchedQuotes,
    /// More than one semicolon, or a semicolon not at the end.
    MultipleStatements,
}

impl InjectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PatternMatch => "pattern_match",
            Self::UnmatchedQuotes => "unmatched_quotes",
            Self::MultipleStatements => "multiple_statements",
        }
    }
}

/// Why a statement was rejected. Produced fresh per call, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Statement does not start with SELECT or SHOW.
    NotReadOnly,
    /// Statement contains a denylisted keyword.
    DisallowedKeyword(&'static str),
    /// Statement references a sensitive field.
    SensitiveField(&'static str),
    /// An injection heuristic fired.
    Injection(InjectionKind),
}

impl Rejection {
    /// Human-readable rejection reason.
    pub fn reason(&self) -> String {
        match self {
            Self::NotReadOnly => {
                "not a read-only statement; only SELECT and SHOW are allowed".to_string()
            }
            Self::DisallowedKeyword(kw) => format!("contains disallowed keyword: {}", kw),
            Self::SensitiveField(field) => format!("references a sensitive field: {}", field),
            Self::Injection(kind) => {
                format!("potential SQL injection detected: {}", kind.as_str())
            }
        }
    }
}

/// Check that the statement starts with SELECT or SHOW (case-insensitive,
/// ignoring leading whitespace).
pub fn is_read_only(sql: &str) -> bool {
    let clean = sql.trim().to_uppercase();
    clean.starts_with("SELECT") || clean.starts_with("SHOW")
}

/// Find the first denylisted keyword appearing anywhere in the statement.
pub fn find_disallowed_keyword(sql: &str) -> Option<&'static str> {
    let upper = sql.to_uppercase();
    DANGEROUS_KEYWORDS
        .iter()
        .find(|kw| upper.contains(*kw))
        .copied()
}

/// Find the first sensitive field name appearing anywhere in the statement.
pub fn find_sensitive_field(sql: &str) -> Option<&'static str> {
    let lower = sql.to_lowercase();
    SENSITIVE_FIELDS
        .iter()
        .find(|field| lower.contains(*field))
        .copied()
}

/// Run the injection heuristics against the raw statement text.
///
/// Returns the first heuristic that fires, or `None` when the statement
/// looks clean.
pub fn detect_sql_injection(sql: &str) -> Option<InjectionKind> {
    if STORED_PROC_PATTERN.is_match(sql)
        || UNION_SELECT_PATTERN.is_match(sql)
        || STACKED_STATEMENT_PATTERN.is_match(sql)
    {
        return Some(InjectionKind::PatternMatch);
    }

    let single_quotes = sql.matches('\'').count();
    if single_quotes % 2 != 0 {
        return Some(InjectionKind::UnmatchedQuotes);
    }

    // A single trailing semicolon is fine; anything else smells of stacking.
    let semicolons = sql.matches(';').count();
    let ends_with_semicolon = sql.trim().ends_with(';');
    if semicolons > 1 || (semicolons == 1 && !ends_with_semicolon) {
        return Some(InjectionKind::MultipleStatements);
    }

    None
}

/// Validate a candidate SQL statement for the query tool.
///
/// Returns `Ok(())` when the statement passes every check, or the first
/// [`Rejection`] in check order.
///
/// # Examples
///
/// ```
/// use mysql_mcp_server::tools::guard::{validate_sql, Rejection};
///
/// assert!(validate_sql("SELECT id, name FROM students").is_ok());
/// assert_eq!(
///     validate_sql("DELETE FROM students"),
///     Err(Rejection::NotReadOnly)
/// );
/// ```
pub fn validate_sql(sql: &str) -> Result<(), Rejection> {
    if !is_read_only(sql) {
        return Err(Rejection::NotReadOnly);
    }
    if let Some(kw) = find_disallowed_keyword(sql) {
        return Err(Rejection::DisallowedKeyword(kw));
    }
    if let Some(field) = find_sensitive_field(sql) {
        return Err(Rejection::SensitiveField(field));
    }
    if let Some(kind) = detect_sql_injection(sql) {
        return Err(Rejection::Injection(kind));
    }
    Ok(())
}
