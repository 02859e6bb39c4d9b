//! First-token statement authorization.
//!
//! The policy is deliberately coarse: only the leading verb is inspected, so a
//! mutating statement hidden behind a read-only keyword is not detected.

use super::{AuthorizedStatement, PolicyViolation, Role, StatementKind};

/// The statement terminator character.
pub const STATEMENT_TERMINATOR: char = ';';

/// Verbs that are executed as queries.
pub const READ_ONLY_VERBS: [&str; 3] = ["select", "show", "desc"];

/// Trims the input and strips exactly one trailing terminator.
///
/// Only ASCII whitespace and control characters count as blank; a non-breaking
/// space is part of the statement.
///
/// Returns `Ok(None)` when nothing is left to execute and
/// `Err(PolicyViolation::MultiStatement)` when a terminator remains in the body.
pub fn normalize(raw: &str) -> Result<Option<String>, PolicyViolation> {
    let mut sql = trim_ascii(raw);
    if sql.is_empty() {
        return Ok(None);
    }

    if let Some(stripped) = sql.strip_suffix(STATEMENT_TERMINATOR) {
        sql = trim_ascii(stripped);
    }

    if sql.contains(STATEMENT_TERMINATOR) {
        return Err(PolicyViolation::MultiStatement);
    }

    if sql.is_empty() {
        return Ok(None);
    }

    Ok(Some(sql.to_string()))
}

/// Authorizes raw SQL text for the given role.
///
/// - `Ok(None)`: blank input, nothing to do.
/// - `Ok(Some(stmt))`: may be executed; `stmt.kind` selects query vs update.
/// - `Err(violation)`: refused before reaching the database.
pub fn authorize(raw: &str, role: Role) -> Result<Option<AuthorizedStatement>, PolicyViolation> {
    let Some(sql) = normalize(raw)? else {
        return Ok(None);
    };

    let verb = sql
        .split(|c: char| c.is_ascii_whitespace())
        .next()
        .unwrap_or_default()
        .to_lowercase();

    let kind = classify_verb(&verb);

    if kind == StatementKind::Mutating && !role.may_mutate() {
        return Err(PolicyViolation::NotPermitted { verb });
    }

    Ok(Some(AuthorizedStatement { sql, verb, kind }))
}

fn trim_ascii(sql: &str) -> &str {
    sql.trim_matches(|c: char| c.is_ascii_whitespace() || c.is_ascii_control())
}

/// Classifies an already lower-cased verb.
fn classify_verb(verb: &str) -> StatementKind {
    if READ_ONLY_VERBS.contains(&verb) {
        StatementKind::ReadOnly
    } else {
        StatementKind::Mutating
    }
}
