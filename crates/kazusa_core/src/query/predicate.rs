//! crates/kazusa_core/src/query/predicate.rs
//!
//! A small structured builder for SQL predicate fragments.
//!
//! A predicate is a list of `(column, operator, value)` clauses. Clauses are
//! only added for filter fields that are actually set, so an all-unset filter
//! yields an empty predicate. Values never appear in the rendered text; they
//! are returned as a positional argument list bound to `$n` placeholders.

use crate::ports::{PortError, PortResult};
use uuid::Uuid;

/// A value bound to a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Uuid(Uuid),
    Text(String),
    Int(i64),
    Bool(bool),
}

impl From<Uuid> for SqlValue {
    fn from(value: Uuid) -> Self {
        SqlValue::Uuid(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
}

impl Op {
    fn as_sql(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "<>",
        }
    }
}

/// What a clause says about how many rows the query can match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseRole {
    /// Exact identity of the row; matches at most one row by convention.
    Identity,
    /// Reference to an owning entity, e.g. all modules of one course.
    Parent,
    /// Any other column.
    Attribute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
    column: &'static str,
    op: Op,
    value: SqlValue,
    role: ClauseRole,
}

/// Joins clauses when rendering.
///
/// `And` is the predicate separator. `Comma` renders the same clause list as a
/// `SET` assignment list and must never be used for a `WHERE` fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Separator {
    #[default]
    And,
    Comma,
}

impl Separator {
    fn as_sql(self) -> &'static str {
        match self {
            Separator::And => " AND ",
            Separator::Comma => ", ",
        }
    }
}

/// How bounded a query is before pagination is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Selective,
    Scoped,
    Unbounded,
}

/// A rendered fragment with the arguments for its placeholders, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    clauses: Vec<Clause>,
    separator: Separator,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clause list meant for an `UPDATE ... SET` statement.
    pub fn assignments() -> Self {
        Self {
            clauses: Vec::new(),
            separator: Separator::Comma,
        }
    }

    pub fn push(mut self, column: &'static str, op: Op, value: SqlValue, role: ClauseRole) -> Self {
        self.clauses.push(Clause {
            column,
            op,
            value,
            role,
        });
        self
    }

    pub fn identity(self, column: &'static str, id: Option<Uuid>) -> Self {
        match id {
            Some(id) => self.push(column, Op::Eq, id.into(), ClauseRole::Identity),
            None => self,
        }
    }

    pub fn parent(self, column: &'static str, id: Option<Uuid>) -> Self {
        match id {
            Some(id) => self.push(column, Op::Eq, id.into(), ClauseRole::Parent),
            None => self,
        }
    }

    pub fn attribute<V: Into<SqlValue>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.push(column, Op::Eq, value.into(), ClauseRole::Attribute),
            None => self,
        }
    }

    pub fn eq<V: Into<SqlValue>>(self, column: &'static str, value: V) -> Self {
        self.push(column, Op::Eq, value.into(), ClauseRole::Attribute)
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn separator(&self) -> Separator {
        self.separator
    }

    pub fn scope(&self) -> Scope {
        let has = |role| self.clauses.iter().any(|c| c.role == role);
        if has(ClauseRole::Identity) {
            Scope::Selective
        } else if has(ClauseRole::Parent) {
            Scope::Scoped
        } else {
            Scope::Unbounded
        }
    }

    /// Fails with `InvalidFilter` when no clause is set.
    pub fn require_any(&self, what: &str) -> PortResult<()> {
        if self.is_empty() {
            return Err(PortError::InvalidFilter(format!(
                "at least one of {what} must be set"
            )));
        }
        Ok(())
    }

    /// Fails with `InvalidFilter` unless every listed column has a clause.
    pub fn require_all(&self, columns: &[&str]) -> PortResult<()> {
        let missing: Vec<&str> = columns
            .iter()
            .copied()
            .filter(|col| !self.clauses.iter().any(|c| c.column == *col))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PortError::InvalidFilter(format!(
                "{} must be set",
                missing.join(" and ")
            )))
        }
    }

    /// Renders the clauses with placeholders numbered from `first_placeholder`.
    /// An empty predicate renders to an empty fragment.
    pub fn render(&self, first_placeholder: usize) -> Rendered {
        let mut parts = Vec::with_capacity(self.clauses.len());
        let mut args = Vec::with_capacity(self.clauses.len());
        for (offset, clause) in self.clauses.iter().enumerate() {
            parts.push(format!(
                "{} {} ${}",
                clause.column,
                clause.op.as_sql(),
                first_placeholder + offset
            ));
            args.push(clause.value.clone());
        }
        Rendered {
            sql: parts.join(self.separator.as_sql()),
            args,
        }
    }

    /// Renders a `WHERE ...` fragment, or nothing for an empty predicate.
    pub fn render_where(&self, first_placeholder: usize) -> Rendered {
        let mut rendered = self.render(first_placeholder);
        if !rendered.sql.is_empty() {
            rendered.sql = format!("WHERE {}", rendered.sql);
        }
        rendered
    }
}
