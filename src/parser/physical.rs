use crate::ast::{Constraint, PhysicalColumn, PhysicalModel, PhysicalTable};
use crate::blocks::{Block, extract_blocks};
use crate::diagnostics::{Diagnostics, Issue, Outcome};

use super::items::{Flag, is_identifier, parse_flag, split_flags};

/// Parse a physical document: `TABLE name { col TYPE [flags...] }` blocks.
///
/// Flags are order-insensitive; constraints are stored as NOT NULL, UNIQUE,
/// then CHECK.
pub fn parse_physical(text: &str) -> Outcome<PhysicalModel> {
    let Outcome { model: blocks, mut diagnostics } = extract_blocks(text);
    let mut model = PhysicalModel::default();

    for block in &blocks {
        if block.is("TABLE") {
            block.reject_extra(&mut diagnostics);
            model.tables.push(parse_table(block, &mut diagnostics));
        } else {
            diagnostics.scoped(
                &block.name,
                Issue::UnknownKeyword { keyword: block.keyword.clone() },
            );
        }
    }

    tracing::debug!(tables = model.tables.len(), "parsed physical model");
    Outcome::new(model, diagnostics)
}

fn parse_table(block: &Block, diagnostics: &mut Diagnostics) -> PhysicalTable {
    let mut table = PhysicalTable {
        name: block.name.clone(),
        columns: Vec::new(),
    };

    for item in block.items() {
        let Some(column) = parse_column(block, &item, diagnostics) else { continue };
        if table.column(&column.name).is_some() {
            diagnostics.scoped(
                &block.name,
                Issue::DuplicateColumn { table: block.name.clone(), column: column.name },
            );
            continue;
        }
        table.columns.push(column);
    }

    table
}

fn parse_column(
    block: &Block,
    item: &str,
    diagnostics: &mut Diagnostics,
) -> Option<PhysicalColumn> {
    let malformed = |diagnostics: &mut Diagnostics| {
        diagnostics.scoped(&block.name, Issue::MalformedItem { text: item.to_string() })
    };

    let Some(parts) = split_flags(item) else {
        malformed(diagnostics);
        return None;
    };
    let (name, sql_type) = match parts.head.split_once(char::is_whitespace) {
        Some((name, sql_type)) => (name, sql_type.trim()),
        None => (parts.head.as_str(), ""),
    };
    if !is_identifier(name) {
        malformed(diagnostics);
        return None;
    }
    if sql_type.is_empty() {
        diagnostics.scoped(&block.name, Issue::MissingType { column: name.to_string() });
        return None;
    }

    let mut column = PhysicalColumn {
        name: name.to_string(),
        sql_type: sql_type.to_string(),
        is_primary_key: false,
        foreign_key: None,
        constraints: Vec::new(),
    };

    for text in &parts.flags {
        let mut warnings = Vec::new();
        let constraint = match parse_flag(&column.name, text, &mut warnings) {
            Ok(Flag::PrimaryKey) => {
                column.is_primary_key = true;
                None
            }
            Ok(Flag::ForeignKey(fk)) => {
                column.foreign_key = Some(fk);
                None
            }
            Ok(Flag::NotNull) => Some(Constraint::NotNull),
            Ok(Flag::Unique) => Some(Constraint::Unique),
            Ok(Flag::Check(expr)) => Some(Constraint::Check(expr)),
            Ok(Flag::Derived | Flag::Other(_)) => None,
            Err(issue) => {
                diagnostics.scoped(&block.name, issue);
                None
            }
        };
        for warning in warnings {
            diagnostics.scoped(&block.name, warning);
        }
        if let Some(constraint) = constraint {
            if !column.constraints.contains(&constraint) {
                column.constraints.push(constraint);
            }
        }
    }
    column.constraints.sort_by_key(Constraint::rank);

    Some(column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_physical_column() {
        let input = r#"
            TABLE ARTICLE {
                ref_article VARCHAR(20) [PK] [NOT NULL]
                prix DECIMAL(10,2) [CHECK(prix >= 0)] [NOT NULL]
                email VARCHAR(255) [UNIQUE]
            }
        "#;
        let outcome = parse_physical(input);
        assert!(outcome.diagnostics.is_empty(), "{}", outcome.diagnostics);

        let table = outcome.model.table("ARTICLE").unwrap();
        let reference = table.column("ref_article").unwrap();
        assert_eq!(reference.sql_type, "VARCHAR(20)");
        assert!(reference.is_primary_key);

        let prix = table.column("prix").unwrap();
        assert_eq!(prix.sql_type, "DECIMAL(10,2)");
        assert_eq!(
            prix.constraints,
            vec![Constraint::NotNull, Constraint::Check("prix >= 0".into())]
        );

        assert!(table.column("email").unwrap().has_constraint(&Constraint::Unique));
    }

    #[test]
    fn test_missing_type() {
        let outcome = parse_physical("TABLE T { id [PK] }");
        assert!(outcome.model.tables[0].columns.is_empty());
        assert!(outcome.diagnostics.any(|i| matches!(
            i,
            Issue::MissingType { column } if column == "id"
        )));
    }

    #[test]
    fn test_foreign_key_with_actions() {
        let input = "TABLE COMMANDE { id_client INT [FK -> CLIENT.id_client ON DELETE SET NULL ON UPDATE CASCADE] [NOT NULL] }";
        let outcome = parse_physical(input);
        let column = &outcome.model.tables[0].columns[0];
        let fk = column.foreign_key.as_ref().unwrap();
        assert_eq!(fk.on_delete, Some(crate::ast::ReferentialAction::SetNull));
        assert_eq!(fk.on_update, Some(crate::ast::ReferentialAction::Cascade));
        assert_eq!(column.constraints, vec![Constraint::NotNull]);
    }
}
