//! Dialect type substitution.

use super::Dialect;

/// Rewrite a physical type into the spelling the dialect expects.
///
/// Only the base name is substituted; parameters such as `(10,2)` are kept
/// as written. Unknown types pass through unchanged.
pub fn map_type(sql_type: &str, dialect: Dialect) -> String {
    let trimmed = sql_type.trim();
    let upper = trimmed.to_ascii_uppercase();

    // Parameterized spellings that are themselves aliases.
    if !dialect.is_backtick_family() && upper == "TINYINT(1)" {
        return "BOOLEAN".to_string();
    }

    let (base, params) = match trimmed.find('(') {
        Some(at) => (upper[..at].trim(), &trimmed[at..]),
        None => (upper.as_str(), ""),
    };

    let mapped = if dialect.is_backtick_family() {
        map_backtick(base)
    } else {
        map_quote(base)
    };

    match mapped {
        Some(name) => format!("{name}{params}"),
        None => trimmed.to_string(),
    }
}

fn map_backtick(base: &str) -> Option<&'static str> {
    match base {
        "BOOLEAN" | "BOOL" => Some("TINYINT(1)"),
        "TIMESTAMP" => Some("DATETIME"),
        "SERIAL" => Some("INT"),
        "BIGSERIAL" => Some("BIGINT"),
        "INTEGER" => Some("INT"),
        "DOUBLE PRECISION" => Some("DOUBLE"),
        _ => None,
    }
}

fn map_quote(base: &str) -> Option<&'static str> {
    match base {
        "DOUBLE" => Some("DOUBLE PRECISION"),
        "DATETIME" => Some("TIMESTAMP"),
        "INT" => Some("INTEGER"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backtick_types() {
        assert_eq!(map_type("BOOLEAN", Dialect::MySql), "TINYINT(1)");
        assert_eq!(map_type("TIMESTAMP", Dialect::MariaDb), "DATETIME");
        assert_eq!(map_type("integer", Dialect::MySql), "INT");
        assert_eq!(map_type("SERIAL", Dialect::MySql), "INT");
        assert_eq!(map_type("DOUBLE PRECISION", Dialect::MySql), "DOUBLE");
    }

    #[test]
    fn test_quote_types() {
        assert_eq!(map_type("DOUBLE", Dialect::PostgreSql), "DOUBLE PRECISION");
        assert_eq!(map_type("DATETIME", Dialect::PostgreSql), "TIMESTAMP");
        assert_eq!(map_type("TINYINT(1)", Dialect::PostgreSql), "BOOLEAN");
        assert_eq!(map_type("INT", Dialect::PostgreSql), "INTEGER");
        assert_eq!(map_type("SERIAL", Dialect::PostgreSql), "SERIAL");
    }

    #[test]
    fn test_parameters_preserved() {
        assert_eq!(map_type("DECIMAL(10,2)", Dialect::PostgreSql), "DECIMAL(10,2)");
        assert_eq!(map_type("VARCHAR(50)", Dialect::MySql), "VARCHAR(50)");
    }
}
