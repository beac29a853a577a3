//! Integration tests for SQL validation.
//!
//! These tests verify that the safety guard rejects write operations and
//! injection-shaped statements while allowing read-only queries.

use mysql_mcp_server::tools::guard::{
    InjectionKind, Rejection, detect_sql_injection, validate_sql,
};

/// Test that a plain SELECT is allowed.
#[test]
fn test_allows_select() {
    assert!(validate_sql("SELECT * FROM students WHERE id = 1").is_ok());
}

/// Test that SHOW statements are allowed.
#[test]
fn test_allows_show() {
    assert!(validate_sql("SHOW TABLES").is_ok());
    assert!(validate_sql("  show databases").is_ok());
}

/// Test that complex read-only queries pass the guard.
#[test]
fn test_allows_complex_select() {
    let sql = r#"
        SELECT s.name, c.title, g.grade
        FROM students s
        JOIN grades g ON g.student_id = s.id
        JOIN courses c ON c.id = g.course_id
        WHERE g.grade > 60
        ORDER BY g.grade DESC
        LIMIT 10
    "#;
    assert!(validate_sql(sql).is_ok(), "Complex SELECT should be allowed");
}

/// Test that non-read-only statements are rejected, whatever the casing.
#[test]
fn test_rejects_non_read_only() {
    for sql in [
        "INSERT INTO students (name) VALUES ('test')",
        "insert into students values (1)",
        "UPDATE students SET name = 'x' WHERE id = 1",
        "DELETE FROM students",
        "DESCRIBE students",
        "EXPLAIN SELECT 1",
        "BEGIN",
    ] {
        assert_eq!(
            validate_sql(sql),
            Err(Rejection::NotReadOnly),
            "Should reject as non-read-only: {}",
            sql
        );
    }
}

/// Test that denylisted keywords are caught anywhere in the statement.
#[test]
fn test_rejects_embedded_keywords() {
    assert_eq!(
        validate_sql("SELECT * FROM t; DROP TABLE t"),
        Err(Rejection::DisallowedKeyword("DROP"))
    );
    assert_eq!(
        validate_sql("SELECT * FROM t UNION SELECT * FROM u"),
        Err(Rejection::DisallowedKeyword("UNION"))
    );
}

/// Test that a keyword inside a string literal is still rejected.
///
/// The guard works on raw text, not a parse tree, so false positives like
/// this are accepted behavior.
#[test]
fn test_rejects_keyword_in_string_literal() {
    assert_eq!(
        validate_sql("SELECT * FROM t WHERE name='DROP'"),
        Err(Rejection::DisallowedKeyword("DROP"))
    );
}

/// Test that sensitive fields are rejected.
#[test]
fn test_rejects_sensitive_fields() {
    assert_eq!(
        validate_sql("SELECT password FROM accounts"),
        Err(Rejection::SensitiveField("password"))
    );
    assert_eq!(
        validate_sql("SELECT name, SALARY FROM staff"),
        Err(Rejection::SensitiveField("salary"))
    );
}

/// Test that sensitive-field matching extends to substrings of unrelated
/// identifiers (known over-rejection).
#[test]
fn test_sensitive_field_substring_over_rejects() {
    assert_eq!(
        validate_sql("SELECT phone_extension FROM offices"),
        Err(Rejection::SensitiveField("phone"))
    );
}

/// Test that every statement with an odd number of single quotes is flagged
/// as unmatched_quotes.
#[test]
fn test_odd_quote_count_always_flagged() {
    for sql in [
        "SELECT * FROM t WHERE a = 'x",
        "SELECT '",
        "SELECT ''' FROM t",
        "SELECT * FROM t WHERE a = 'x' AND b = 'y",
    ] {
        assert_eq!(
            detect_sql_injection(sql),
            Some(InjectionKind::UnmatchedQuotes),
            "Should flag odd quotes: {}",
            sql
        );
    }
}

/// Test the semicolon heuristics: one trailing semicolon is fine, anything
/// else is flagged.
#[test]
fn test_semicolon_heuristics() {
    assert_eq!(detect_sql_injection("SELECT 1;"), None);
    assert_eq!(
        detect_sql_injection("SELECT 1; SELECT 2"),
        Some(InjectionKind::MultipleStatements)
    );
    assert_eq!(
        detect_sql_injection("SELECT 1;;"),
        Some(InjectionKind::MultipleStatements)
    );
}

/// Test that stored-procedure and stacked-mutation patterns are flagged.
#[test]
fn test_injection_patterns() {
    assert_eq!(
        detect_sql_injection("exec sp_helpdb"),
        Some(InjectionKind::PatternMatch)
    );
    assert_eq!(
        detect_sql_injection("exec  xp_cmdshell"),
        Some(InjectionKind::PatternMatch)
    );
    assert_eq!(
        detect_sql_injection("1; delete from t"),
        Some(InjectionKind::PatternMatch)
    );
}

/// Test that rejection reasons name the offending check.
#[test]
fn test_rejection_reasons() {
    let reason = validate_sql("SELECT * WHERE a = 'x")
        .unwrap_err()
        .reason();
    assert!(reason.contains("unmatched_quotes"), "got: {}", reason);

    let reason = validate_sql("SELECT email FROM users").unwrap_err().reason();
    assert!(reason.contains("email"), "got: {}", reason);
}
