//! Conjunctive SQL predicate builder shared by catalogue browsing and the
//! search compiler.
//!
//! Every clause is AND-ed with the others. Substring clauses use `LIKE` with
//! `\` as the escape character, so user input containing `%` or `_` is matched
//! literally. SQLite's `LIKE` is case-insensitive for ASCII text.

use libsql::Value;

/// A conjunction of SQL conditions with their positional parameters
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Predicate {
    /// Create an empty predicate (matches every row)
    pub fn new() -> Self {
        Self::default()
    }

    /// `column` contains `term` as a substring
    pub fn contains(&mut self, column: &str, term: &str) -> &mut Self {
        self.clauses.push(like_clause(column));
        self.params.push(like_pattern(term).into());
        self
    }

    /// At least one of `columns` contains `term` as a substring
    pub fn any_contains(&mut self, columns: &[&str], term: &str) -> &mut Self {
        if columns.is_empty() {
            return self;
        }
        let alternatives: Vec<String> = columns.iter().map(|c| like_clause(c)).collect();
        self.clauses.push(format!("({})", alternatives.join(" OR ")));
        for _ in columns {
            self.params.push(like_pattern(term).into());
        }
        self
    }

    /// `column` equals `value` exactly
    pub fn equals(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.clauses.push(format!("{} = ?", column));
        self.params.push(value.into());
        self
    }

    /// `column >= value`
    pub fn at_least(&mut self, column: &str, value: i64) -> &mut Self {
        self.clauses.push(format!("{} >= ?", column));
        self.params.push(value.into());
        self
    }

    /// `column <= value`
    pub fn at_most(&mut self, column: &str, value: i64) -> &mut Self {
        self.clauses.push(format!("{} <= ?", column));
        self.params.push(value.into());
        self
    }

    /// `column > 0`
    pub fn positive(&mut self, column: &str) -> &mut Self {
        self.clauses.push(format!("{} > 0", column));
        self
    }

    /// The `WHERE ...` fragment, or an empty string when unconstrained
    pub fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    /// Parameters in the order their placeholders appear
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Consume the predicate, returning its parameters
    pub fn into_params(self) -> Vec<Value> {
        self.params
    }
}

fn like_clause(column: &str) -> String {
    format!("{} LIKE ? ESCAPE '\\'", column)
}

/// Wrap `term` in `%` wildcards, escaping LIKE metacharacters
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
