//! Name-pattern type inference rules.
//!
//! Rules are plain data evaluated in order; the first whose predicate holds
//! decides the column's type. Anything unmatched becomes variable-length text.

use crate::sql::Dialect;
use crate::sql::dialect::SERIAL;

/// Facts a rule may look at.
#[derive(Debug, Clone)]
pub struct ColumnFacts<'a> {
    pub name: &'a str,
    pub lower: String,
    pub is_primary_key: bool,
}

impl<'a> ColumnFacts<'a> {
    pub fn new(name: &'a str, is_primary_key: bool) -> Self {
        Self {
            name,
            lower: name.to_lowercase(),
            is_primary_key,
        }
    }
}

/// Dialect-neutral type category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Auto-increment integer key.
    Serial,
    Integer,
    /// Short codes and business references.
    Reference,
    Timestamp,
    Date,
    Money,
    Float,
    Boolean,
    LongText,
    Discriminator,
    /// Variable-length text of the configured default length.
    Text,
}

impl TypeKind {
    pub fn sql(self, dialect: Dialect, text_length: u32) -> String {
        match self {
            Self::Serial => SERIAL.to_string(),
            Self::Integer => dialect.integer_type().to_string(),
            Self::Reference => "VARCHAR(20)".to_string(),
            Self::Timestamp => "TIMESTAMP".to_string(),
            Self::Date => "DATE".to_string(),
            Self::Money => "DECIMAL(10,2)".to_string(),
            Self::Float => "DOUBLE".to_string(),
            Self::Boolean => "BOOLEAN".to_string(),
            Self::LongText => "TEXT".to_string(),
            Self::Discriminator => "VARCHAR(50)".to_string(),
            Self::Text => format!("VARCHAR({text_length})"),
        }
    }
}

pub struct TypeRule {
    pub name: &'static str,
    pub applies: fn(&ColumnFacts<'_>) -> bool,
    pub kind: TypeKind,
}

impl std::fmt::Debug for TypeRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRule")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

pub const DEFAULT_RULES: &[TypeRule] = &[
    TypeRule {
        name: "identifier key",
        applies: |c| c.is_primary_key && is_id_name(c),
        kind: TypeKind::Serial,
    },
    TypeRule {
        name: "identifier",
        applies: is_id_name,
        kind: TypeKind::Integer,
    },
    TypeRule {
        name: "reference",
        applies: |c| c.lower.starts_with("ref_") || c.lower.ends_with("_ref"),
        kind: TypeKind::Reference,
    },
    TypeRule {
        name: "timestamp",
        applies: |c| {
            c.lower.contains("time")
                || c.lower.contains("heure")
                || c.lower.starts_with("horodatage")
                || c.lower.ends_with("_at")
        },
        kind: TypeKind::Timestamp,
    },
    TypeRule {
        name: "date",
        applies: |c| c.lower.starts_with("date") || c.lower.ends_with("_date"),
        kind: TypeKind::Date,
    },
    TypeRule {
        name: "money",
        applies: |c| {
            has_stem(
                c,
                &[
                    "prix", "montant", "cout", "coût", "tarif", "salaire", "price", "amount",
                    "cost",
                ],
            )
        },
        kind: TypeKind::Money,
    },
    TypeRule {
        name: "quantity",
        applies: |c| {
            has_stem(c, &["quantite", "quantité", "qte", "nb", "nombre", "quantity", "count"])
        },
        kind: TypeKind::Integer,
    },
    TypeRule {
        name: "ratio",
        applies: |c| has_stem(c, &["taux", "ratio", "rate"]),
        kind: TypeKind::Float,
    },
    TypeRule {
        name: "flag",
        applies: |c| ["est_", "is_", "has_", "can_"].iter().any(|p| c.lower.starts_with(p)),
        kind: TypeKind::Boolean,
    },
    TypeRule {
        name: "long text",
        applies: |c| {
            ["description", "comment", "contenu", "content", "texte", "notes", "remarque"]
                .iter()
                .any(|w| c.lower.contains(w))
        },
        kind: TypeKind::LongText,
    },
    TypeRule {
        name: "discriminator",
        applies: |c| c.lower == crate::convert::DISCRIMINATOR,
        kind: TypeKind::Discriminator,
    },
];

/// `id`, `id_*`, `*_id`, or camel-cased `idClient`.
pub fn is_id_name(c: &ColumnFacts<'_>) -> bool {
    let camel = c
        .name
        .strip_prefix("id")
        .and_then(|rest| rest.chars().next())
        .is_some_and(char::is_uppercase);
    c.lower == "id" || c.lower.starts_with("id_") || c.lower.ends_with("_id") || camel
}

/// The name is one of `stems`, or starts with one followed by `_` or an
/// upper-case letter (`prixUnitaire`).
fn has_stem(c: &ColumnFacts<'_>, stems: &[&str]) -> bool {
    stems.iter().any(|stem| {
        if !c.lower.starts_with(stem) {
            return false;
        }
        match c.name.chars().nth(stem.chars().count()) {
            None => true,
            Some(next) => next == '_' || next.is_uppercase(),
        }
    })
}

/// First matching rule's type, or [`TypeKind::Text`].
pub fn infer(rules: &[TypeRule], facts: &ColumnFacts<'_>) -> TypeKind {
    rules
        .iter()
        .find(|rule| (rule.applies)(facts))
        .map_or(TypeKind::Text, |rule| rule.kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(name: &str, pk: bool) -> TypeKind {
        infer(DEFAULT_RULES, &ColumnFacts::new(name, pk))
    }

    #[test]
    fn test_identifier_rules() {
        assert_eq!(kind("id_client", true), TypeKind::Serial);
        assert_eq!(kind("client_id", true), TypeKind::Serial);
        assert_eq!(kind("idClient", true), TypeKind::Serial);
        assert_eq!(kind("id_client", false), TypeKind::Integer);
        assert_eq!(kind("identite", false), TypeKind::Text);
    }

    #[test]
    fn test_reference_is_short_text_even_as_key() {
        assert_eq!(kind("ref_article", true), TypeKind::Reference);
        assert_eq!(kind("article_ref", false), TypeKind::Reference);
    }

    #[test]
    fn test_temporal_rules() {
        assert_eq!(kind("date_naissance", false), TypeKind::Date);
        assert_eq!(kind("date_heure_rdv", false), TypeKind::Timestamp);
        assert_eq!(kind("created_at", false), TypeKind::Timestamp);
        assert_eq!(kind("livraison_date", false), TypeKind::Date);
    }

    #[test]
    fn test_value_rules() {
        assert_eq!(kind("prix_unitaire", false), TypeKind::Money);
        assert_eq!(kind("montant", false), TypeKind::Money);
        assert_eq!(kind("couteau", false), TypeKind::Text);
        assert_eq!(kind("country", false), TypeKind::Text);
        assert_eq!(kind("quantite", false), TypeKind::Integer);
        assert_eq!(kind("nb_places", false), TypeKind::Integer);
        assert_eq!(kind("taux_tva", false), TypeKind::Float);
        assert_eq!(kind("est_actif", false), TypeKind::Boolean);
        assert_eq!(kind("description", false), TypeKind::LongText);
        assert_eq!(kind("type_discriminator", false), TypeKind::Discriminator);
        assert_eq!(kind("nom", false), TypeKind::Text);
    }

    #[test]
    fn test_camel_case_stems() {
        assert_eq!(kind("prixUnitaire", false), TypeKind::Money);
        assert_eq!(kind("montantTTC", false), TypeKind::Money);
        assert_eq!(kind("coûtTotal", false), TypeKind::Money);
        assert_eq!(kind("quantiteStock", false), TypeKind::Integer);
        assert_eq!(kind("nbPlaces", false), TypeKind::Integer);
        assert_eq!(kind("tauxRemise", false), TypeKind::Float);
        // Lower-case run-ons have no boundary.
        assert_eq!(kind("nbplaces", false), TypeKind::Text);
        assert_eq!(kind("tauxremise", false), TypeKind::Text);
    }

    #[test]
    fn test_first_match_wins() {
        // Matches both the identifier and the date predicates.
        assert_eq!(kind("id_date", false), TypeKind::Integer);
    }

    #[test]
    fn test_custom_rule_set() {
        const RULES: &[TypeRule] = &[TypeRule {
            name: "everything is a flag",
            applies: |_| true,
            kind: TypeKind::Boolean,
        }];
        assert_eq!(infer(RULES, &ColumnFacts::new("nom", false)), TypeKind::Boolean);
        assert_eq!(infer(&[], &ColumnFacts::new("id", true)), TypeKind::Text);
    }

    #[test]
    fn test_sql_names() {
        assert_eq!(TypeKind::Integer.sql(Dialect::MySql, 255), "INT");
        assert_eq!(TypeKind::Integer.sql(Dialect::PostgreSql, 255), "INTEGER");
        assert_eq!(TypeKind::Text.sql(Dialect::MySql, 100), "VARCHAR(100)");
        assert_eq!(TypeKind::Serial.sql(Dialect::MariaDb, 255), "SERIAL");
    }
}
