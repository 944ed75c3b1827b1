//! Read-only structural checks for each model level.

use std::collections::{HashMap, HashSet};

use crate::ast::{ConceptualModel, LogicalModel, PhysicalModel};
use crate::diagnostics::{Diagnostics, Issue};
use crate::sql::Dialect;
use crate::sql::dialect::{is_serial, serial_base};

/// Check a conceptual model.
pub fn validate_conceptual(model: &ConceptualModel) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    let mut seen = HashSet::new();
    for entity in &model.entities {
        if !seen.insert(entity.name.as_str()) {
            diagnostics.scoped(&entity.name, Issue::DuplicateName { name: entity.name.clone() });
        }

        let keys = entity.attributes.iter().filter(|a| a.is_primary_key).count();
        if keys == 0 && !model.is_inheritance_child(&entity.name) {
            diagnostics.scoped(
                &entity.name,
                Issue::MissingPrimaryKey { owner: entity.name.clone() },
            );
        } else if keys > 1 {
            diagnostics.scoped(
                &entity.name,
                Issue::MultiplePrimaryKeys { entity: entity.name.clone(), count: keys },
            );
        }
    }

    let mut seen = HashSet::new();
    for relation in &model.relations {
        if !seen.insert(relation.name.as_str()) {
            diagnostics.scoped(
                &relation.name,
                Issue::DuplicateName { name: relation.name.clone() },
            );
        }
        if relation.participants.len() < 2 {
            diagnostics.scoped(
                &relation.name,
                Issue::TooFewParticipants {
                    relation: relation.name.clone(),
                    count: relation.participants.len(),
                },
            );
        }
        for participant in &relation.participants {
            if model.entity(&participant.entity).is_none() {
                diagnostics.scoped(
                    &relation.name,
                    Issue::UnknownReference {
                        from: relation.name.clone(),
                        target: participant.entity.clone(),
                    },
                );
            }
        }
    }

    for group in &model.inheritances {
        for member in std::iter::once(&group.parent).chain(&group.children) {
            if model.entity(member).is_none() {
                diagnostics.scoped(
                    &group.name,
                    Issue::UnknownReference { from: group.name.clone(), target: member.clone() },
                );
            }
        }
    }

    for associative in &model.associatives {
        if model.relation(&associative.relation).is_none() {
            diagnostics.scoped(
                &associative.name,
                Issue::UnknownReference {
                    from: associative.name.clone(),
                    target: associative.relation.clone(),
                },
            );
        }
    }

    for orphan in model.orphans() {
        diagnostics.scoped(orphan, Issue::OrphanEntity { entity: orphan.to_string() });
    }

    diagnostics
}

/// Check a logical model: keys, references and foreign-key cycles.
pub fn validate_logical(model: &LogicalModel) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    let mut seen = HashSet::new();
    for table in &model.tables {
        if !seen.insert(table.name.as_str()) {
            diagnostics.scoped(&table.name, Issue::DuplicateName { name: table.name.clone() });
        }
        if table.primary_keys().next().is_none() {
            diagnostics.scoped(&table.name, Issue::MissingPrimaryKey { owner: table.name.clone() });
        }

        for column in &table.columns {
            let Some(fk) = &column.foreign_key else { continue };
            let target = match model.table(&fk.referenced_table) {
                None => Some(fk.referenced_table.clone()),
                Some(t) if !t.has_column(&fk.referenced_column) => {
                    Some(format!("{}.{}", fk.referenced_table, fk.referenced_column))
                }
                Some(_) => None,
            };
            if let Some(target) = target {
                diagnostics.scoped(
                    &table.name,
                    Issue::UnknownReference {
                        from: format!("{}.{}", table.name, column.name),
                        target,
                    },
                );
            }
        }
    }

    for path in find_cycles(model) {
        let scope = path.first().cloned().unwrap_or_default();
        diagnostics.scoped(&scope, Issue::ForeignKeyCycle { path });
    }

    diagnostics
}

/// Check a physical model: everything [`validate_logical`] checks, plus types.
pub fn validate_physical(model: &PhysicalModel) -> Diagnostics {
    let mut diagnostics = validate_logical(&model.to_logical());

    for table in &model.tables {
        for column in &table.columns {
            let qualified = format!("{}.{}", table.name, column.name);
            if column.sql_type.trim().is_empty() {
                diagnostics.scoped(&table.name, Issue::EmptyType { column: qualified.clone() });
                continue;
            }

            let Some(fk) = &column.foreign_key else { continue };
            let Some(target) = model
                .table(&fk.referenced_table)
                .and_then(|t| t.column(&fk.referenced_column))
            else {
                continue;
            };
            if !types_compatible(&column.sql_type, &target.sql_type) {
                diagnostics.scoped(
                    &table.name,
                    Issue::ForeignKeyTypeMismatch {
                        column: qualified,
                        found: column.sql_type.clone(),
                        expected: target.sql_type.clone(),
                    },
                );
            }
        }
    }

    diagnostics
}

/// Whether a reference typed `found` may point at a column typed `expected`.
fn types_compatible(found: &str, expected: &str) -> bool {
    let found = normalize_type(found);
    if found == normalize_type(expected) {
        return true;
    }
    is_serial(expected)
        && [Dialect::MySql, Dialect::PostgreSql]
            .iter()
            .any(|d| normalize_type(&serial_base(expected, *d)) == found)
}

fn normalize_type(sql_type: &str) -> String {
    let compact = sql_type
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase();
    match compact.as_str() {
        "INTEGER" => "INT".to_string(),
        _ => compact,
    }
}

/// Foreign-key cycles between tables, each as a path ending where it started.
///
/// Self-references are not cycles. References to unknown tables are skipped.
pub fn find_cycles(model: &LogicalModel) -> Vec<Vec<String>> {
    let names: HashSet<&str> = model.tables.iter().map(|t| t.name.as_str()).collect();

    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
    for table in &model.tables {
        let edges = graph.entry(table.name.as_str()).or_default();
        for fk in table.columns.iter().filter_map(|c| c.foreign_key.as_ref()) {
            let target = fk.referenced_table.as_str();
            if target != table.name && names.contains(target) && !edges.contains(&target) {
                edges.push(target);
            }
        }
    }

    let mut search = CycleSearch {
        graph: &graph,
        visited: HashSet::new(),
        path: Vec::new(),
        cycles: Vec::new(),
    };
    for table in &model.tables {
        if !search.visited.contains(table.name.as_str()) {
            search.visit(&table.name);
        }
    }
    search.cycles
}

struct CycleSearch<'g, 'a> {
    graph: &'g HashMap<&'a str, Vec<&'a str>>,
    visited: HashSet<&'a str>,
    /// Current recursion stack.
    path: Vec<&'a str>,
    cycles: Vec<Vec<String>>,
}

impl<'g, 'a> CycleSearch<'g, 'a> {
    fn visit(&mut self, node: &'a str) {
        self.visited.insert(node);
        self.path.push(node);

        let graph = self.graph;
        for &next in graph.get(node).into_iter().flatten() {
            if let Some(start) = self.path.iter().position(|n| *n == next) {
                let mut cycle: Vec<String> =
                    self.path[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(next.to_string());
                self.cycles.push(cycle);
            } else if !self.visited.contains(next) {
                self.visit(next);
            }
        }

        self.path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Column, Constraint, PhysicalColumn, PhysicalTable, Table};
    use crate::parser::{parse_conceptual, parse_logical, parse_physical};

    #[test]
    fn test_conceptual_checks() {
        let model = parse_conceptual(
            r#"
            ENTITY CLIENT { id_client [PK] }
            ENTITY DOUBLE { a [PK]
                b [PK] }
            ENTITY SANS { nom }
            RELATION passe { CLIENT (0,n), FANTOME (1,1) }
            RELATION seul { CLIENT (0,n) }
            "#,
        )
        .model;
        let diagnostics = validate_conceptual(&model);

        assert!(diagnostics.any(|i| matches!(i, Issue::MultiplePrimaryKeys { count: 2, .. })));
        assert!(diagnostics.any(|i| matches!(
            i,
            Issue::MissingPrimaryKey { owner } if owner == "SANS"
        )));
        assert!(diagnostics.any(|i| matches!(
            i,
            Issue::UnknownReference { target, .. } if target == "FANTOME"
        )));
        assert!(diagnostics.any(|i| matches!(i, Issue::TooFewParticipants { count: 1, .. })));
        assert!(diagnostics.any(|i| matches!(
            i,
            Issue::OrphanEntity { entity } if entity == "DOUBLE"
        )));
    }

    #[test]
    fn test_inheritance_child_needs_no_key() {
        let model = parse_conceptual(
            r#"
            ENTITY PERSONNE { id_personne [PK] }
            ENTITY ETUDIANT { num_etudiant }
            INHERITANCE roles {
                PARENT PERSONNE
                CHILDREN ETUDIANT, INCONNU
            }
            "#,
        )
        .model;
        let diagnostics = validate_conceptual(&model);
        assert!(!diagnostics.any(|i| matches!(i, Issue::MissingPrimaryKey { .. })));
        assert!(diagnostics.any(|i| matches!(
            i,
            Issue::UnknownReference { target, .. } if target == "INCONNU"
        )));
    }

    #[test]
    fn test_logical_references() {
        let model = parse_logical(
            r#"
            TABLE COMMANDE {
                id_commande [PK]
                id_client [FK -> CLIENT.id_client]
                id_adresse [FK -> ADRESSE.code]
            }
            TABLE ADRESSE { id_adresse [PK] }
            TABLE LIBRE { nom }
            "#,
        )
        .model;
        let diagnostics = validate_logical(&model);
        assert!(diagnostics.any(|i| matches!(
            i,
            Issue::UnknownReference { target, .. } if target == "CLIENT"
        )));
        assert!(diagnostics.any(|i| matches!(
            i,
            Issue::UnknownReference { target, .. } if target == "ADRESSE.code"
        )));
        assert!(diagnostics.any(|i| matches!(
            i,
            Issue::MissingPrimaryKey { owner } if owner == "LIBRE"
        )));
    }

    #[test]
    fn test_cycle_path_is_reported_as_warning() {
        let model = parse_logical(
            r#"
            TABLE A { id_a [PK]
                id_b [FK -> B.id_b] }
            TABLE B { id_b [PK]
                id_c [FK -> C.id_c] }
            TABLE C { id_c [PK]
                id_a [FK -> A.id_a] }
            "#,
        )
        .model;
        assert_eq!(find_cycles(&model), vec![vec!["A", "B", "C", "A"]]);

        let diagnostics = validate_logical(&model);
        assert!(!diagnostics.has_errors());
        assert_eq!(diagnostics.warnings().count(), 1);
        assert_eq!(
            diagnostics.iter().next().unwrap().to_string(),
            "warning [A]: foreign-key cycle: A -> B -> C -> A"
        );
    }

    #[test]
    fn test_self_reference_is_not_a_cycle() {
        let model = LogicalModel {
            tables: vec![Table {
                name: "EMPLOYE".into(),
                columns: vec![
                    Column::primary_key("id_employe"),
                    Column::reference("id_manager", "EMPLOYE", "id_employe"),
                ],
            }],
        };
        assert!(find_cycles(&model).is_empty());
        assert!(validate_logical(&model).is_empty());
    }

    #[test]
    fn test_physical_types() {
        let model = parse_physical(
            r#"
            TABLE CLIENT { id_client SERIAL [PK] }
            TABLE COMMANDE {
                id_commande SERIAL [PK]
                id_client INTEGER [FK -> CLIENT.id_client]
            }
            TABLE FACTURE {
                id_facture SERIAL [PK]
                id_client VARCHAR(20) [FK -> CLIENT.id_client]
            }
            "#,
        )
        .model;
        let diagnostics = validate_physical(&model);
        assert!(!diagnostics.has_errors(), "{diagnostics}");
        assert_eq!(diagnostics.warnings().count(), 1);
        assert!(diagnostics.any(|i| matches!(
            i,
            Issue::ForeignKeyTypeMismatch { column, .. } if column == "FACTURE.id_client"
        )));
    }

    #[test]
    fn test_empty_type() {
        let model = PhysicalModel {
            tables: vec![PhysicalTable {
                name: "T".into(),
                columns: vec![PhysicalColumn {
                    name: "id".into(),
                    sql_type: " ".into(),
                    is_primary_key: true,
                    foreign_key: None,
                    constraints: vec![Constraint::NotNull],
                }],
            }],
        };
        assert!(validate_physical(&model).any(|i| matches!(i, Issue::EmptyType { .. })));
    }
}
