//! Typed query-language clauses.
//!
//! Clauses are accumulated as values and rendered to the full-text query
//! language once, when a request body is built. A [`QueryExpression`] is an
//! `AND`-joined list of clauses; every builder method consumes the
//! expression and returns a new one.

use std::fmt;

use crate::types::BoolOp;

/// Quote a value as a phrase, escaping embedded quotes and backslashes.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// A set of quoted phrases joined by one operator, e.g. `"a" OR "b"`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Phrases {
    values: Vec<String>,
    op: BoolOp,
}

impl Phrases {
    pub fn any<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_op(values, BoolOp::Or)
    }

    pub fn with_op<I, S>(values: I, op: BoolOp) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            op,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for Phrases {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = format!(" {} ", self.op.as_str());
        let rendered: Vec<String> = self.values.iter().map(|v| quote(v)).collect();
        write!(f, "{}", rendered.join(&separator))
    }
}

/// One clause of a query expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// `field:("a" OR "b")`
    Field { field: String, phrases: Phrases },
    /// `(c1 OR c2 ...)`
    AnyOf(Vec<Clause>),
    /// `NOT c`
    Not(Box<Clause>),
}

impl Clause {
    pub fn field(field: impl Into<String>, phrases: Phrases) -> Self {
        Self::Field {
            field: field.into(),
            phrases,
        }
    }

    /// The same phrases matched against any of several fields.
    pub fn any_field(fields: &[&str], phrases: &Phrases) -> Self {
        if fields.len() == 1 {
            return Self::field(fields[0], phrases.clone());
        }
        Self::AnyOf(
            fields
                .iter()
                .map(|field| Self::field(*field, phrases.clone()))
                .collect(),
        )
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field { field, phrases } => write!(f, "{}:({})", field, phrases),
            Self::AnyOf(clauses) if clauses.len() == 1 => write!(f, "{}", clauses[0]),
            Self::AnyOf(clauses) => {
                let rendered: Vec<String> = clauses.iter().map(ToString::to_string).collect();
                write!(f, "({})", rendered.join(" OR "))
            }
            Self::Not(inner) => write!(f, "NOT {}", inner),
        }
    }
}

/// An `AND`-joined list of clauses.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryExpression {
    clauses: Vec<Clause>,
}

impl QueryExpression {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Append a clause only when `phrases` is non-empty.
    #[must_use]
    pub fn and_field(self, field: &str, phrases: Phrases) -> Self {
        if phrases.is_empty() {
            return self;
        }
        self.and(Clause::field(field, phrases))
    }

    /// Append a `NOT` clause over one or more fields when `phrases` is non-empty.
    #[must_use]
    pub fn and_not(self, fields: &[&str], phrases: Phrases) -> Self {
        if phrases.is_empty() {
            return self;
        }
        self.and(Clause::any_field(fields, &phrases).negate())
    }

    /// Append every clause of another expression.
    #[must_use]
    pub fn and_expr(mut self, other: &QueryExpression) -> Self {
        self.clauses.extend(other.clauses.iter().cloned());
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Render to the query-language string sent to the engine.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for QueryExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.clauses.iter().map(ToString::to_string).collect();
        write!(f, "{}", rendered.join(" AND "))
    }
}
