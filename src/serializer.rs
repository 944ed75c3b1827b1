//! Serializer for writing logical and physical models back to block notation.

use crate::ast::{Column, Constraint, ForeignKey, LogicalModel, PhysicalColumn, PhysicalModel};

/// Serialize a logical model to `TABLE name { ... }` blocks.
pub fn serialize_logical(model: &LogicalModel) -> String {
    let mut output = String::new();

    for (i, table) in model.tables.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        output.push_str(&format!("TABLE {} {{\n", table.name));
        for column in &table.columns {
            serialize_column(&mut output, column);
        }
        output.push_str("}\n");
    }

    output
}

/// Serialize a physical model to `TABLE name { ... }` blocks with types.
pub fn serialize_physical(model: &PhysicalModel) -> String {
    let mut output = String::new();

    for (i, table) in model.tables.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        output.push_str(&format!("TABLE {} {{\n", table.name));
        for column in &table.columns {
            serialize_physical_column(&mut output, column);
        }
        output.push_str("}\n");
    }

    output
}

fn serialize_column(output: &mut String, column: &Column) {
    output.push_str(&format!("    {}", column.name));
    push_keys(output, column.is_primary_key, column.foreign_key.as_ref());
    output.push('\n');
}

fn serialize_physical_column(output: &mut String, column: &PhysicalColumn) {
    output.push_str(&format!("    {} {}", column.name, column.sql_type));
    push_keys(output, column.is_primary_key, column.foreign_key.as_ref());

    // Flags in order: not null, unique, check
    for constraint in &column.constraints {
        match constraint {
            Constraint::NotNull => output.push_str(" [NOT NULL]"),
            Constraint::Unique => output.push_str(" [UNIQUE]"),
            Constraint::Check(expr) => output.push_str(&format!(" [CHECK({expr})]")),
        }
    }

    output.push('\n');
}

fn push_keys(output: &mut String, is_primary_key: bool, foreign_key: Option<&ForeignKey>) {
    if is_primary_key {
        output.push_str(" [PK]");
    }
    if let Some(fk) = foreign_key {
        output.push_str(&format!(" [FK -> {}.{}", fk.referenced_table, fk.referenced_column));
        if let Some(action) = fk.on_delete {
            output.push_str(&format!(" ON DELETE {action}"));
        }
        if let Some(action) = fk.on_update {
            output.push_str(&format!(" ON UPDATE {action}"));
        }
        output.push(']');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{PhysicalTable, ReferentialAction, Table};
    use crate::parser::{parse_logical, parse_physical};

    fn logical() -> LogicalModel {
        let mut reference = Column::reference("id_client", "CLIENT", "id_client");
        if let Some(fk) = reference.foreign_key.as_mut() {
            fk.on_delete = Some(ReferentialAction::SetNull);
        }
        LogicalModel {
            tables: vec![
                Table {
                    name: "CLIENT".into(),
                    columns: vec![Column::primary_key("id_client"), Column::new("nom")],
                },
                Table {
                    name: "COMMANDE".into(),
                    columns: vec![Column::primary_key("id_commande"), reference],
                },
            ],
        }
    }

    #[test]
    fn test_serialize_logical() {
        let output = serialize_logical(&logical());
        let expected = "\
TABLE CLIENT {
    id_client [PK]
    nom
}

TABLE COMMANDE {
    id_commande [PK]
    id_client [FK -> CLIENT.id_client ON DELETE SET NULL]
}
";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_logical_reparses_to_same_model() {
        let model = logical();
        let outcome = parse_logical(&serialize_logical(&model));
        assert!(outcome.diagnostics.is_empty(), "{}", outcome.diagnostics);
        assert_eq!(outcome.model, model);
    }

    #[test]
    fn test_serialize_physical_flag_order() {
        let mut fk = ForeignKey::new("id_commande", "COMMANDE", "id_commande");
        fk.on_delete = Some(ReferentialAction::Cascade);
        fk.on_update = Some(ReferentialAction::Restrict);
        let model = PhysicalModel {
            tables: vec![PhysicalTable {
                name: "contient".into(),
                columns: vec![
                    PhysicalColumn {
                        name: "id_commande".into(),
                        sql_type: "INT".into(),
                        is_primary_key: true,
                        foreign_key: Some(fk),
                        constraints: vec![Constraint::NotNull],
                    },
                    PhysicalColumn {
                        name: "quantite".into(),
                        sql_type: "DECIMAL(10,2)".into(),
                        is_primary_key: false,
                        foreign_key: None,
                        constraints: vec![
                            Constraint::NotNull,
                            Constraint::Unique,
                            Constraint::Check("quantite > 0".into()),
                        ],
                    },
                ],
            }],
        };

        let output = serialize_physical(&model);
        assert!(output.contains(
            "    id_commande INT [PK] [FK -> COMMANDE.id_commande ON DELETE CASCADE ON UPDATE RESTRICT] [NOT NULL]\n"
        ));
        assert!(
            output.contains("    quantite DECIMAL(10,2) [NOT NULL] [UNIQUE] [CHECK(quantite > 0)]\n")
        );

        let outcome = parse_physical(&output);
        assert!(outcome.diagnostics.is_empty(), "{}", outcome.diagnostics);
        assert_eq!(outcome.model, model);
    }
}
