//! Errors and warnings produced by every stage.
//!
//! No stage aborts on bad input: each returns its model together with a
//! [`Diagnostics`] list, and callers decide whether errors block the next stage.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Issue {
    // Syntax
    #[error("unknown block keyword `{keyword}`")]
    UnknownKeyword { keyword: String },

    #[error("block header `{header}` has no name")]
    MissingName { header: String },

    #[error("block `{keyword} {name}` is never closed")]
    UnterminatedBlock { keyword: String, name: String },

    #[error("unexpected text outside of a block: `{text}`")]
    StrayText { text: String },

    #[error("malformed item `{text}`")]
    MalformedItem { text: String },

    #[error("relation `{relation}` has invalid cardinality `{value}`")]
    InvalidCardinality { relation: String, value: String },

    #[error("unknown inheritance strategy `{value}`")]
    UnknownStrategy { value: String },

    #[error("inheritance group `{group}` has no PARENT")]
    MissingParent { group: String },

    #[error("inheritance group `{group}` has no CHILDREN")]
    MissingChildren { group: String },

    #[error("associative entity `{name}` must be declared `ON <relation>`")]
    MissingAssociation { name: String },

    #[error("column `{column}` has no SQL type")]
    MissingType { column: String },

    #[error("column `{column}` is declared twice in `{table}`")]
    DuplicateColumn { table: String, column: String },

    // Structure
    #[error("`{owner}` has no primary key")]
    MissingPrimaryKey { owner: String },

    #[error("entity `{entity}` has {count} primary keys, expected exactly one")]
    MultiplePrimaryKeys { entity: String, count: usize },

    #[error("`{name}` is declared more than once")]
    DuplicateName { name: String },

    #[error("relation `{relation}` binds {count} participant(s), at least 2 required")]
    TooFewParticipants { relation: String, count: usize },

    #[error("`{from}` refers to unknown `{target}`")]
    UnknownReference { from: String, target: String },

    #[error("column `{column}` has an empty SQL type")]
    EmptyType { column: String },

    #[error("`{column}` references `{parent}`, which was flattened away")]
    FlattenedReference { column: String, parent: String },

    // Warnings
    #[error("entity `{entity}` takes part in no relation or inheritance")]
    OrphanEntity { entity: String },

    #[error("foreign-key cycle: {}", .path.join(" -> "))]
    ForeignKeyCycle { path: Vec<String> },

    #[error("unrecognized referential action `{action}` left unset")]
    UnknownReferentialAction { action: String },

    #[error("`{column}` is typed `{found}` but references a `{expected}` column")]
    ForeignKeyTypeMismatch { column: String, found: String, expected: String },
}

impl Issue {
    pub fn severity(&self) -> Severity {
        match self {
            Self::OrphanEntity { .. }
            | Self::ForeignKeyCycle { .. }
            | Self::UnknownReferentialAction { .. }
            | Self::ForeignKeyTypeMismatch { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// An issue scoped to the block (or model element) it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub scope: Option<String>,
    pub issue: Issue,
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        self.issue.severity()
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity() {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.scope {
            Some(scope) => write!(f, "{level} [{scope}]: {}", self.issue),
            None => write!(f, "{level}: {}", self.issue),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, scope: Option<&str>, issue: Issue) {
        self.0.push(Diagnostic {
            scope: scope.map(str::to_string),
            issue,
        });
    }

    pub fn scoped(&mut self, scope: &str, issue: Issue) {
        self.push(Some(scope), issue);
    }

    /// Append `other`, skipping diagnostics already present.
    pub fn merge(&mut self, other: Diagnostics) {
        for d in other.0 {
            if !self.0.contains(&d) {
                self.0.push(d);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| !d.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any diagnostic matches the predicate.
    pub fn any(&self, f: impl Fn(&Issue) -> bool) -> bool {
        self.0.iter().any(|d| f(&d.issue))
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.0 {
            writeln!(f, "{d}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A stage result: the produced value plus everything noticed on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    pub model: T,
    pub diagnostics: Diagnostics,
}

impl<T> Outcome<T> {
    pub fn new(model: T, diagnostics: Diagnostics) -> Self {
        Self { model, diagnostics }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_split() {
        let mut diags = Diagnostics::new();
        diags.scoped("CLIENT", Issue::OrphanEntity { entity: "CLIENT".into() });
        assert!(!diags.has_errors());

        diags.scoped("passe", Issue::TooFewParticipants { relation: "passe".into(), count: 1 });
        assert!(diags.has_errors());
        assert_eq!(diags.errors().count(), 1);
        assert_eq!(diags.warnings().count(), 1);
    }

    #[test]
    fn test_display() {
        let mut diags = Diagnostics::new();
        diags.push(None, Issue::ForeignKeyCycle {
            path: vec!["A".into(), "B".into(), "A".into()],
        });
        assert_eq!(diags.to_string(), "warning: foreign-key cycle: A -> B -> A\n");
    }
}
