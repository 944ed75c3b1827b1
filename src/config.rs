//! Conversion configuration passed explicitly into every conversion call.

use serde::{Deserialize, Serialize};

use crate::sql::Dialect;

/// How inheritance groups are flattened into tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InheritanceStrategy {
    /// Every child keeps its table and references the parent by primary key.
    #[default]
    TablePerClass,
    /// Children are folded into the parent table behind a discriminator.
    SingleTable,
    /// The parent table disappears; children receive copies of its columns.
    TablePerSubclass,
}

impl InheritanceStrategy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table_per_class" => Some(Self::TablePerClass),
            "single_table" => Some(Self::SingleTable),
            "table_per_subclass" => Some(Self::TablePerSubclass),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TablePerClass => "table_per_class",
            Self::SingleTable => "single_table",
            Self::TablePerSubclass => "table_per_subclass",
        }
    }
}

pub const DEFAULT_TEXT_LENGTH: u32 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Strategy for inheritance groups without their own `STRATEGY`.
    pub inheritance: InheritanceStrategy,
    pub dialect: Dialect,
    /// Length of the `VARCHAR` given to columns no naming rule recognizes.
    pub text_length: u32,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            inheritance: InheritanceStrategy::default(),
            dialect: Dialect::default(),
            text_length: DEFAULT_TEXT_LENGTH,
        }
    }
}

impl ConversionConfig {
    pub fn with_dialect(self, dialect: Dialect) -> Self {
        Self { dialect, ..self }
    }

    pub fn with_inheritance(self, inheritance: InheritanceStrategy) -> Self {
        Self { inheritance, ..self }
    }

    pub fn with_text_length(self, text_length: u32) -> Self {
        Self { text_length, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_names() {
        assert_eq!(
            InheritanceStrategy::from_str("Single_Table"),
            Some(InheritanceStrategy::SingleTable)
        );
        assert_eq!(InheritanceStrategy::from_str("joined"), None);
        assert_eq!(InheritanceStrategy::TablePerSubclass.as_str(), "table_per_subclass");
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: ConversionConfig =
            serde_json::from_str(r#"{ "inheritance": "single_table", "dialect": "postgresql" }"#)
                .unwrap();
        assert_eq!(config.inheritance, InheritanceStrategy::SingleTable);
        assert_eq!(config.dialect, Dialect::PostgreSql);
        assert_eq!(config.text_length, DEFAULT_TEXT_LENGTH);
    }
}
