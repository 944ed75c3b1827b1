//! Target SQL dialects.

use serde::{Deserialize, Serialize};

/// SQL dialect variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dialect {
    /// MySQL (backtick family)
    #[default]
    #[serde(rename = "mysql")]
    MySql,
    /// MariaDB (backtick family)
    #[serde(rename = "mariadb")]
    MariaDb,
    /// PostgreSQL (double-quote family)
    #[serde(rename = "postgresql", alias = "postgres")]
    PostgreSql,
}

impl Dialect {
    /// Parse dialect from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mysql" => Some(Self::MySql),
            "mariadb" => Some(Self::MariaDb),
            "postgres" | "postgresql" => Some(Self::PostgreSql),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::MariaDb => "MariaDB",
            Self::PostgreSql => "PostgreSQL",
        }
    }

    /// Backtick-quoting family: named constraints and an engine trailer.
    pub fn is_backtick_family(self) -> bool {
        matches!(self, Self::MySql | Self::MariaDb)
    }

    pub fn quote(self, ident: &str) -> String {
        if self.is_backtick_family() {
            format!("`{}`", ident.replace('`', "``"))
        } else {
            format!("\"{}\"", ident.replace('"', "\"\""))
        }
    }

    /// Plain integer type name.
    pub fn integer_type(self) -> &'static str {
        if self.is_backtick_family() { "INT" } else { "INTEGER" }
    }

    /// Text appended after the closing parenthesis of `CREATE TABLE`.
    pub fn table_trailer(self) -> &'static str {
        if self.is_backtick_family() {
            " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
        } else {
            ""
        }
    }
}

/// Placeholder type for auto-increment integer keys.
pub const SERIAL: &str = "SERIAL";
/// Wide variant of [`SERIAL`].
pub const BIGSERIAL: &str = "BIGSERIAL";

/// Whether a type is an auto-increment placeholder.
pub fn is_serial(sql_type: &str) -> bool {
    let upper = sql_type.trim().to_ascii_uppercase();
    upper == SERIAL || upper == BIGSERIAL
}

/// The plain integer type an auto-increment placeholder stands for.
pub fn serial_base(sql_type: &str, dialect: Dialect) -> String {
    if sql_type.trim().eq_ignore_ascii_case(BIGSERIAL) {
        "BIGINT".to_string()
    } else {
        dialect.integer_type().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dialect() {
        assert_eq!(Dialect::from_str("Postgres"), Some(Dialect::PostgreSql));
        assert_eq!(Dialect::from_str("MARIADB"), Some(Dialect::MariaDb));
        assert_eq!(Dialect::from_str("oracle"), None);
    }

    #[test]
    fn test_quoting() {
        assert_eq!(Dialect::MySql.quote("CLIENT"), "`CLIENT`");
        assert_eq!(Dialect::PostgreSql.quote("CLIENT"), "\"CLIENT\"");
        assert_eq!(Dialect::PostgreSql.quote("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_serial_downgrade() {
        assert!(is_serial("serial"));
        assert!(!is_serial("INT"));
        assert_eq!(serial_base("SERIAL", Dialect::MySql), "INT");
        assert_eq!(serial_base("SERIAL", Dialect::PostgreSql), "INTEGER");
        assert_eq!(serial_base("BIGSERIAL", Dialect::MariaDb), "BIGINT");
    }
}
