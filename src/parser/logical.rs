use crate::ast::{Column, LogicalModel, Table};
use crate::blocks::{Block, extract_blocks};
use crate::diagnostics::{Diagnostics, Issue, Outcome};

use super::items::{Flag, is_identifier, parse_flag, split_flags};

/// Parse a logical document: `TABLE name { col [PK] [FK -> Table.col] }` blocks.
pub fn parse_logical(text: &str) -> Outcome<LogicalModel> {
    let Outcome { model: blocks, mut diagnostics } = extract_blocks(text);
    let mut model = LogicalModel::default();

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

    tracing::debug!(tables = model.tables.len(), "parsed logical model");
    Outcome::new(model, diagnostics)
}

fn parse_table(block: &Block, diagnostics: &mut Diagnostics) -> Table {
    let mut table = Table::new(block.name.clone());

    for item in block.items() {
        let Some(column) = parse_column(block, &item, diagnostics) else { continue };
        if table.has_column(&column.name) {
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

fn parse_column(block: &Block, item: &str, diagnostics: &mut Diagnostics) -> Option<Column> {
    let Some(parts) = split_flags(item).filter(|p| is_identifier(&p.head)) else {
        diagnostics.scoped(&block.name, Issue::MalformedItem { text: item.to_string() });
        return None;
    };

    let mut column = Column::new(parts.head);
    for text in &parts.flags {
        let mut warnings = Vec::new();
        match parse_flag(&column.name, text, &mut warnings) {
            Ok(Flag::PrimaryKey) => column.is_primary_key = true,
            Ok(Flag::ForeignKey(fk)) => column.foreign_key = Some(fk),
            Ok(_) => {}
            Err(issue) => diagnostics.scoped(&block.name, issue),
        }
        for warning in warnings {
            diagnostics.scoped(&block.name, warning);
        }
    }
    Some(column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ForeignKey, ReferentialAction};

    #[test]
    fn test_parse_tables() {
        let input = r#"
            TABLE CLIENT {
                id_client [PK]
                nom
            }
            TABLE COMMANDE {
                id_commande [PK]
                id_client [FK -> CLIENT.id_client ON DELETE RESTRICT]
            }
        "#;
        let outcome = parse_logical(input);
        assert!(outcome.diagnostics.is_empty(), "{}", outcome.diagnostics);

        let commande = outcome.model.table("COMMANDE").unwrap();
        assert_eq!(commande.columns.len(), 2);
        assert!(commande.columns[0].is_primary_key);
        let fk = commande.columns[1].foreign_key.as_ref().unwrap();
        assert_eq!(fk, &ForeignKey {
            source_column: "id_client".into(),
            referenced_table: "CLIENT".into(),
            referenced_column: "id_client".into(),
            on_delete: Some(ReferentialAction::Restrict),
            on_update: None,
        });
    }

    #[test]
    fn test_primary_and_foreign_key_together() {
        let outcome =
            parse_logical("TABLE contient { id_commande [PK] [FK -> COMMANDE.id_commande] }");
        let column = &outcome.model.tables[0].columns[0];
        assert!(column.is_primary_key);
        assert_eq!(column.foreign_key.as_ref().unwrap().referenced_table, "COMMANDE");
    }

    #[test]
    fn test_duplicate_column() {
        let outcome = parse_logical("TABLE T { a [PK]\n a }");
        assert_eq!(outcome.model.tables[0].columns.len(), 1);
        assert!(outcome.diagnostics.any(|i| matches!(i, Issue::DuplicateColumn { .. })));
    }

    #[test]
    fn test_unknown_keyword() {
        let outcome = parse_logical("ENTITY A { id [PK] }");
        assert!(outcome.model.tables.is_empty());
        assert!(outcome.diagnostics.has_errors());
    }

    #[test]
    fn test_unknown_action_is_warning() {
        let outcome = parse_logical("TABLE T { a [PK]\n b [FK -> T.a ON UPDATE WHATEVER] }");
        assert!(!outcome.diagnostics.has_errors());
        assert_eq!(outcome.diagnostics.warnings().count(), 1);
        let fk = outcome.model.tables[0].columns[1].foreign_key.as_ref().unwrap();
        assert_eq!(fk.on_update, None);
    }

    #[test]
    fn test_trailing_header_text_rejected() {
        let outcome = parse_logical("TABLE T AS copy { a [PK] }");
        assert!(outcome.diagnostics.any(|i| matches!(
            i,
            Issue::MalformedItem { text } if text == "TABLE T AS copy"
        )));
    }
}
