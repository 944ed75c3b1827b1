//! Logical to physical conversion: type resolution and column constraints.

use std::collections::{HashMap, HashSet};

use crate::ast::{
    Column, Constraint, ForeignKey, LogicalModel, PhysicalColumn, PhysicalModel, PhysicalTable,
    ReferentialAction,
};
use crate::config::ConversionConfig;
use crate::diagnostics::{Diagnostics, Issue, Outcome};
use crate::sql::dialect::{is_serial, serial_base};

use super::rules::{ColumnFacts, DEFAULT_RULES, TypeRule, infer};

type ColumnKey<'a> = (&'a str, &'a str);

/// Assign SQL types and constraints using the default rule table.
pub fn to_physical(model: &LogicalModel, config: &ConversionConfig) -> Outcome<PhysicalModel> {
    to_physical_with(model, config, DEFAULT_RULES)
}

/// Assign SQL types and constraints using a caller-supplied rule table.
///
/// Non-reference columns are typed first. A reference column then takes the
/// type of the column it points at (following chains of references), with
/// auto-increment placeholders downgraded to their plain integer type.
pub fn to_physical_with(
    model: &LogicalModel,
    config: &ConversionConfig,
    rules: &[TypeRule],
) -> Outcome<PhysicalModel> {
    let mut resolver = Resolver {
        config,
        rules,
        columns: HashMap::new(),
        types: HashMap::new(),
        diagnostics: Diagnostics::new(),
    };

    for table in &model.tables {
        for column in &table.columns {
            resolver.columns.insert((table.name.as_str(), column.name.as_str()), column);
        }
    }

    for table in &model.tables {
        for column in table.columns.iter().filter(|c| c.foreign_key.is_none()) {
            let sql_type = resolver.infer(column);
            resolver.types.insert((table.name.as_str(), column.name.as_str()), sql_type);
        }
    }

    let mut physical = PhysicalModel::default();
    for table in &model.tables {
        let mut columns = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            let key = (table.name.as_str(), column.name.as_str());
            let sql_type = match &column.foreign_key {
                Some(fk) => resolver.reference_type(&table.name, column, fk),
                None => resolver.types.get(&key).cloned().unwrap_or_default(),
            };
            columns.push(physical_column(column, sql_type));
        }
        physical.tables.push(PhysicalTable {
            name: table.name.clone(),
            columns,
        });
    }

    tracing::debug!(tables = physical.tables.len(), "resolved physical model");
    Outcome::new(physical, resolver.diagnostics)
}

struct Resolver<'a> {
    config: &'a ConversionConfig,
    rules: &'a [TypeRule],
    columns: HashMap<ColumnKey<'a>, &'a Column>,
    types: HashMap<ColumnKey<'a>, String>,
    diagnostics: Diagnostics,
}

impl<'a> Resolver<'a> {
    fn infer(&self, column: &Column) -> String {
        infer(self.rules, &ColumnFacts::new(&column.name, column.is_primary_key))
            .sql(self.config.dialect, self.config.text_length)
    }

    fn reference_type(&mut self, table: &str, column: &Column, fk: &ForeignKey) -> String {
        let mut visited = HashSet::new();
        visited.insert((table.to_string(), column.name.clone()));

        let sql_type = match self.follow(fk, &mut visited) {
            Some(sql_type) => sql_type,
            None => {
                let target = (fk.referenced_table.as_str(), fk.referenced_column.as_str());
                if !self.columns.contains_key(&target) {
                    self.diagnostics.scoped(
                        table,
                        Issue::UnknownReference {
                            from: format!("{table}.{}", column.name),
                            target: format!("{}.{}", fk.referenced_table, fk.referenced_column),
                        },
                    );
                }
                tracing::debug!(
                    table,
                    column = %column.name,
                    "falling back to name rules for reference"
                );
                self.infer(column)
            }
        };

        if is_serial(&sql_type) {
            serial_base(&sql_type, self.config.dialect)
        } else {
            sql_type
        }
    }

    /// Type of the column `fk` points at, if it can be found.
    fn follow(&self, fk: &ForeignKey, visited: &mut HashSet<(String, String)>) -> Option<String> {
        let key = (fk.referenced_table.as_str(), fk.referenced_column.as_str());
        if let Some(sql_type) = self.types.get(&key) {
            return Some(sql_type.clone());
        }

        let target = self.columns.get(&key)?;
        let next = target.foreign_key.as_ref()?;
        if !visited.insert((key.0.to_string(), key.1.to_string())) {
            return None;
        }
        self.follow(next, visited)
    }
}

fn physical_column(column: &Column, sql_type: String) -> PhysicalColumn {
    let mut constraints = Vec::new();
    if column.is_primary_key || column.foreign_key.is_some() {
        constraints.push(Constraint::NotNull);
    }
    if column.name.to_lowercase().contains("email") {
        constraints.push(Constraint::Unique);
    }

    let foreign_key = column.foreign_key.clone().map(|fk| ForeignKey {
        on_delete: fk.on_delete.or(Some(ReferentialAction::Cascade)),
        on_update: fk.on_update.or(Some(ReferentialAction::Cascade)),
        ..fk
    });

    PhysicalColumn {
        name: column.name.clone(),
        sql_type,
        is_primary_key: column.is_primary_key,
        foreign_key,
        constraints,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Table;
    use crate::convert::rules::TypeKind;
    use crate::sql::Dialect;

    fn table(name: &str, columns: Vec<Column>) -> Table {
        Table {
            name: name.to_string(),
            columns,
        }
    }

    fn sql_type<'m>(model: &'m PhysicalModel, table: &str, column: &str) -> &'m str {
        &model.table(table).unwrap().column(column).unwrap().sql_type
    }

    #[test]
    fn test_chained_foreign_keys_resolve_to_integer() {
        let model = LogicalModel {
            tables: vec![
                table("COMMANDE", vec![Column::primary_key("id_commande")]),
                table(
                    "livraison",
                    vec![Column::key_reference("id_commande", "COMMANDE", "id_commande")],
                ),
                table(
                    "facturation",
                    vec![Column::key_reference("id_commande", "livraison", "id_commande")],
                ),
            ],
        };
        let outcome = to_physical(&model, &ConversionConfig::default());
        assert!(outcome.diagnostics.is_empty(), "{}", outcome.diagnostics);

        assert_eq!(sql_type(&outcome.model, "COMMANDE", "id_commande"), "SERIAL");
        assert_eq!(sql_type(&outcome.model, "livraison", "id_commande"), "INT");
        assert_eq!(sql_type(&outcome.model, "facturation", "id_commande"), "INT");
    }

    #[test]
    fn test_association_columns() {
        let model = LogicalModel {
            tables: vec![
                table("COMMANDE", vec![Column::primary_key("id_commande")]),
                table("ARTICLE", vec![Column::primary_key("ref_article")]),
                table(
                    "contient",
                    vec![
                        Column::key_reference("id_commande", "COMMANDE", "id_commande"),
                        Column::key_reference("ref_article", "ARTICLE", "ref_article"),
                        Column::new("quantite"),
                    ],
                ),
            ],
        };
        let outcome = to_physical(&model, &ConversionConfig::default());
        let contient = outcome.model.table("contient").unwrap();

        assert_eq!(contient.column("id_commande").unwrap().sql_type, "INT");
        assert_eq!(contient.column("ref_article").unwrap().sql_type, "VARCHAR(20)");
        assert_eq!(contient.column("quantite").unwrap().sql_type, "INT");

        let fk = contient.column("ref_article").unwrap().foreign_key.as_ref().unwrap();
        assert_eq!(fk.on_delete, Some(ReferentialAction::Cascade));
        assert_eq!(fk.on_update, Some(ReferentialAction::Cascade));
        assert_eq!(contient.column("id_commande").unwrap().constraints, vec![Constraint::NotNull]);
        assert!(contient.column("quantite").unwrap().constraints.is_empty());
    }

    #[test]
    fn test_reference_type_follows_target_not_own_name() {
        let model = LogicalModel {
            tables: vec![
                table("CLIENT", vec![Column::primary_key("code")]),
                table("COMMANDE", vec![Column::reference("id_client", "CLIENT", "code")]),
            ],
        };
        let outcome = to_physical(&model, &ConversionConfig::default().with_text_length(40));
        assert_eq!(sql_type(&outcome.model, "COMMANDE", "id_client"), "VARCHAR(40)");
    }

    #[test]
    fn test_declared_actions_kept() {
        let mut column = Column::reference("id_client", "CLIENT", "id_client");
        if let Some(fk) = column.foreign_key.as_mut() {
            fk.on_delete = Some(ReferentialAction::SetNull);
        }
        let model = LogicalModel {
            tables: vec![
                table("CLIENT", vec![Column::primary_key("id_client")]),
                table("COMMANDE", vec![column]),
            ],
        };
        let outcome = to_physical(&model, &ConversionConfig::default());
        let fk = outcome.model.tables[1].columns[0].foreign_key.clone().unwrap();
        assert_eq!(fk.on_delete, Some(ReferentialAction::SetNull));
        assert_eq!(fk.on_update, Some(ReferentialAction::Cascade));
    }

    #[test]
    fn test_dangling_reference_falls_back_to_rules() {
        let model = LogicalModel {
            tables: vec![table(
                "COMMANDE",
                vec![Column::reference("id_client", "CLIENT", "id_client")],
            )],
        };
        let config = ConversionConfig::default().with_dialect(Dialect::PostgreSql);
        let outcome = to_physical(&model, &config);
        assert_eq!(sql_type(&outcome.model, "COMMANDE", "id_client"), "INTEGER");
        assert!(outcome.diagnostics.any(|i| matches!(i, Issue::UnknownReference { .. })));
    }

    #[test]
    fn test_reference_cycle_terminates() {
        let model = LogicalModel {
            tables: vec![
                table("A", vec![Column::key_reference("id_b", "B", "id_b")]),
                table("B", vec![Column::key_reference("id_b", "A", "id_b")]),
            ],
        };
        let outcome = to_physical(&model, &ConversionConfig::default());
        assert_eq!(sql_type(&outcome.model, "A", "id_b"), "INT");
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_email_is_unique() {
        let model = LogicalModel {
            tables: vec![table(
                "CLIENT",
                vec![Column::primary_key("id_client"), Column::new("Email")],
            )],
        };
        let outcome = to_physical(&model, &ConversionConfig::default());
        let email = outcome.model.tables[0].column("Email").unwrap();
        assert_eq!(email.constraints, vec![Constraint::Unique]);
    }

    #[test]
    fn test_custom_rules() {
        const RULES: &[TypeRule] = &[TypeRule {
            name: "flags",
            applies: |c| c.lower.starts_with("actif"),
            kind: TypeKind::Boolean,
        }];
        let model = LogicalModel {
            tables: vec![table("T", vec![Column::primary_key("id"), Column::new("actif")])],
        };
        let outcome = to_physical_with(&model, &ConversionConfig::default(), RULES);
        assert_eq!(sql_type(&outcome.model, "T", "actif"), "BOOLEAN");
        assert_eq!(sql_type(&outcome.model, "T", "id"), "VARCHAR(255)");
    }
}
