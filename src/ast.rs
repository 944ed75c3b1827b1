//! Model types for the three abstraction levels.
//!
//! A conceptual model (entities, relations, inheritance) is converted into a
//! logical model (tables, columns, foreign keys), which is typed into a
//! physical model (SQL types and constraints).

use std::collections::HashSet;
use std::fmt;

use crate::config::InheritanceStrategy;

// Conceptual level

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConceptualModel {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
    pub inheritances: Vec<Inheritance>,
    pub associatives: Vec<AssociativeEntity>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub name: String,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub is_primary_key: bool,
    pub is_derived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub name: String,
    pub participants: Vec<Participant>,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub entity: String,
    pub cardinality: Cardinality,
}

/// Allowed (min,max) participation pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    ZeroOne,  // 0,1
    OneOne,   // 1,1
    ZeroMany, // 0,n
    OneMany,  // 1,n
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inheritance {
    pub name: String,
    pub parent: String,
    pub children: Vec<String>,
    pub strategy: Option<InheritanceStrategy>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociativeEntity {
    pub name: String,
    pub relation: String,
    pub attributes: Vec<Attribute>,
}

impl Attribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_primary_key: false,
            is_derived: false,
        }
    }

    pub fn primary_key(name: impl Into<String>) -> Self {
        Self {
            is_primary_key: true,
            ..Self::new(name)
        }
    }
}

impl Entity {
    /// The first primary-key attribute, if any.
    pub fn primary_key(&self) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.is_primary_key)
    }
}

impl Cardinality {
    /// Parse a `(min,max)` tuple body such as `0,n`.
    pub fn from_pair(min: &str, max: &str) -> Option<Self> {
        match (min.trim(), max.trim().to_ascii_lowercase().as_str()) {
            ("0", "1") => Some(Self::ZeroOne),
            ("1", "1") => Some(Self::OneOne),
            ("0", "n") => Some(Self::ZeroMany),
            ("1", "n") => Some(Self::OneMany),
            _ => None,
        }
    }

    pub fn is_many(self) -> bool {
        matches!(self, Self::ZeroMany | Self::OneMany)
    }

    pub fn is_mandatory(self) -> bool {
        matches!(self, Self::OneOne | Self::OneMany)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ZeroOne => "(0,1)",
            Self::OneOne => "(1,1)",
            Self::ZeroMany => "(0,n)",
            Self::OneMany => "(1,n)",
        };
        f.write_str(s)
    }
}

impl ConceptualModel {
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Entities never mentioned by a relation participant or an inheritance group.
    pub fn orphans(&self) -> Vec<&str> {
        let mut referenced: HashSet<&str> = HashSet::new();
        for rel in &self.relations {
            referenced.extend(rel.participants.iter().map(|p| p.entity.as_str()));
        }
        for inh in &self.inheritances {
            referenced.insert(inh.parent.as_str());
            referenced.extend(inh.children.iter().map(|c| c.as_str()));
        }

        self.entities
            .iter()
            .map(|e| e.name.as_str())
            .filter(|name| !referenced.contains(name))
            .collect()
    }

    /// Whether the entity is a child in some inheritance group.
    pub fn is_inheritance_child(&self, name: &str) -> bool {
        self.inheritances
            .iter()
            .any(|inh| inh.children.iter().any(|c| c == name))
    }
}

// Logical level

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogicalModel {
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub is_primary_key: bool,
    pub foreign_key: Option<ForeignKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub source_column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    NoAction,
}

impl ReferentialAction {
    pub fn from_str(s: &str) -> Option<Self> {
        let normalized: Vec<String> =
            s.split_whitespace().map(|w| w.to_ascii_uppercase()).collect();
        match normalized.join(" ").as_str() {
            "CASCADE" => Some(Self::Cascade),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            "RESTRICT" => Some(Self::Restrict),
            "NO ACTION" => Some(Self::NoAction),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl ForeignKey {
    pub fn new(
        source_column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            source_column: source_column.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
            on_delete: None,
            on_update: None,
        }
    }
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_primary_key: false,
            foreign_key: None,
        }
    }

    pub fn primary_key(name: impl Into<String>) -> Self {
        Self {
            is_primary_key: true,
            ..Self::new(name)
        }
    }

    /// A column that is both part of the primary key and a foreign key.
    pub fn key_reference(name: impl Into<String>, table: &str, column: &str) -> Self {
        let name = name.into();
        Self {
            foreign_key: Some(ForeignKey::new(name.clone(), table, column)),
            is_primary_key: true,
            name,
        }
    }

    pub fn reference(name: impl Into<String>, table: &str, column: &str) -> Self {
        let name = name.into();
        Self {
            foreign_key: Some(ForeignKey::new(name.clone(), table, column)),
            is_primary_key: false,
            name,
        }
    }
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_primary_key)
    }
}

impl LogicalModel {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}

// Physical level

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhysicalModel {
    pub tables: Vec<PhysicalTable>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalTable {
    pub name: String,
    pub columns: Vec<PhysicalColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalColumn {
    pub name: String,
    pub sql_type: String,
    pub is_primary_key: bool,
    pub foreign_key: Option<ForeignKey>,
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constraint {
    NotNull,
    Unique,
    Check(String),
}

impl Constraint {
    /// Rank used to keep constraint lists in NOT NULL, UNIQUE, CHECK order.
    pub fn rank(&self) -> u8 {
        match self {
            Self::NotNull => 0,
            Self::Unique => 1,
            Self::Check(_) => 2,
        }
    }
}

impl PhysicalColumn {
    pub fn has_constraint(&self, constraint: &Constraint) -> bool {
        self.constraints.contains(constraint)
    }
}

impl PhysicalTable {
    pub fn column(&self, name: &str) -> Option<&PhysicalColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl PhysicalModel {
    pub fn table(&self, name: &str) -> Option<&PhysicalTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Drop types and constraints, keeping the relational shape.
    pub fn to_logical(&self) -> LogicalModel {
        LogicalModel {
            tables: self
                .tables
                .iter()
                .map(|t| Table {
                    name: t.name.clone(),
                    columns: t
                        .columns
                        .iter()
                        .map(|c| Column {
                            name: c.name.clone(),
                            is_primary_key: c.is_primary_key,
                            foreign_key: c.foreign_key.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_from_pair() {
        assert_eq!(Cardinality::from_pair("0", "n"), Some(Cardinality::ZeroMany));
        assert_eq!(Cardinality::from_pair(" 1 ", "N"), Some(Cardinality::OneMany));
        assert_eq!(Cardinality::from_pair("1", "1"), Some(Cardinality::OneOne));
        assert_eq!(Cardinality::from_pair("2", "n"), None);
        assert_eq!(Cardinality::from_pair("0", "0"), None);
    }

    #[test]
    fn test_referential_action_words() {
        assert_eq!(ReferentialAction::from_str("set   null"), Some(ReferentialAction::SetNull));
        assert_eq!(ReferentialAction::from_str("NO ACTION"), Some(ReferentialAction::NoAction));
        assert_eq!(ReferentialAction::from_str("DETACH"), None);
    }

    #[test]
    fn test_orphans() {
        let model = ConceptualModel {
            entities: vec![
                Entity { name: "A".into(), attributes: vec![Attribute::primary_key("id_a")] },
                Entity { name: "B".into(), attributes: vec![Attribute::primary_key("id_b")] },
                Entity { name: "C".into(), attributes: vec![Attribute::primary_key("id_c")] },
            ],
            relations: vec![Relation {
                name: "r".into(),
                participants: vec![
                    Participant { entity: "A".into(), cardinality: Cardinality::ZeroMany },
                    Participant { entity: "B".into(), cardinality: Cardinality::OneOne },
                ],
                attributes: vec![],
            }],
            inheritances: vec![],
            associatives: vec![],
        };

        assert_eq!(model.orphans(), vec!["C"]);
    }
}
