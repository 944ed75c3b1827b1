//! DDL emission.

use unicode_width::UnicodeWidthStr;

use crate::ast::{Constraint, ForeignKey, PhysicalModel, PhysicalTable, PhysicalColumn};
use crate::convert::rules::{ColumnFacts, is_id_name};

use super::Dialect;
use super::dialect::{BIGSERIAL, SERIAL, is_serial};
use super::order::dependency_order;
use super::types::map_type;

const INDENT: &str = "    ";

/// Generate `CREATE TABLE` statements for every table, referenced tables first.
pub fn generate_sql(model: &PhysicalModel, dialect: Dialect) -> String {
    SqlGenerator::new(dialect).generate(model)
}

pub struct SqlGenerator {
    dialect: Dialect,
}

impl SqlGenerator {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn generate(&self, model: &PhysicalModel) -> String {
        let mut sql = String::new();
        sql.push_str("-- Generated by merise\n");
        sql.push_str(&format!("-- Dialect: {}\n", self.dialect.name()));

        let ordered = dependency_order(model);
        tracing::debug!(
            order = ?ordered.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            dialect = self.dialect.name(),
            "generating DDL"
        );

        for table in ordered {
            sql.push('\n');
            sql.push_str(&self.create_table(table));
            sql.push('\n');
        }
        sql
    }

    fn create_table(&self, table: &PhysicalTable) -> String {
        let quoted: Vec<String> =
            table.columns.iter().map(|c| self.dialect.quote(&c.name)).collect();
        let width = quoted.iter().map(|q| q.width()).max().unwrap_or(0);

        let mut lines: Vec<String> = table
            .columns
            .iter()
            .zip(&quoted)
            .map(|(column, name)| {
                let padding = " ".repeat(width - name.width());
                format!("{INDENT}{name}{padding} {}", self.column_tail(column))
            })
            .collect();

        let keys: Vec<String> = table
            .columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| self.dialect.quote(&c.name))
            .collect();
        if !keys.is_empty() {
            lines.push(format!("{INDENT}PRIMARY KEY ({})", keys.join(", ")));
        }

        for column in &table.columns {
            if let Some(fk) = &column.foreign_key {
                lines.push(format!("{INDENT}{}", self.foreign_key(&table.name, column, fk)));
            }
        }

        format!(
            "CREATE TABLE {} (\n{}\n){};",
            self.dialect.quote(&table.name),
            lines.join(",\n"),
            self.dialect.table_trailer()
        )
    }

    /// Type and inline constraints of a column definition.
    fn column_tail(&self, column: &PhysicalColumn) -> String {
        let auto_increment = is_auto_increment(column);

        let mut sql_type = map_type(&column.sql_type, self.dialect);
        if auto_increment && !self.dialect.is_backtick_family() {
            sql_type = if is_wide(&column.sql_type) { BIGSERIAL } else { SERIAL }.to_string();
        }

        let mut parts = vec![sql_type];
        for constraint in &column.constraints {
            parts.push(match constraint {
                Constraint::NotNull => "NOT NULL".to_string(),
                Constraint::Unique => "UNIQUE".to_string(),
                Constraint::Check(expr) => format!("CHECK ({expr})"),
            });
        }
        if auto_increment && self.dialect.is_backtick_family() {
            parts.push("AUTO_INCREMENT".to_string());
        }
        parts.join(" ")
    }

    fn foreign_key(&self, table: &str, column: &PhysicalColumn, fk: &ForeignKey) -> String {
        let mut clause = String::new();
        if self.dialect.is_backtick_family() {
            let name = format!("fk_{}_{}", table, column.name).to_lowercase();
            clause.push_str(&format!("CONSTRAINT {} ", self.dialect.quote(&name)));
        }
        clause.push_str(&format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            self.dialect.quote(&column.name),
            self.dialect.quote(&fk.referenced_table),
            self.dialect.quote(&fk.referenced_column)
        ));
        if let Some(action) = fk.on_delete {
            clause.push_str(&format!(" ON DELETE {action}"));
        }
        if let Some(action) = fk.on_update {
            clause.push_str(&format!(" ON UPDATE {action}"));
        }
        clause
    }
}

/// Auto-increment applies to integer primary keys that are not references,
/// either declared with a serial type or following the `id` naming convention.
fn is_auto_increment(column: &PhysicalColumn) -> bool {
    if !column.is_primary_key || column.foreign_key.is_some() {
        return false;
    }
    is_serial(&column.sql_type)
        || (is_integer(&column.sql_type) && is_id_name(&ColumnFacts::new(&column.name, true)))
}

fn base_type(sql_type: &str) -> String {
    let base = sql_type.split('(').next().unwrap_or(sql_type);
    base.trim().to_ascii_uppercase()
}

fn is_integer(sql_type: &str) -> bool {
    matches!(base_type(sql_type).as_str(), "INT" | "INTEGER" | "BIGINT" | "SERIAL" | "BIGSERIAL")
}

fn is_wide(sql_type: &str) -> bool {
    matches!(base_type(sql_type).as_str(), "BIGINT" | "BIGSERIAL")
}
