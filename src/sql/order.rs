//! Table creation order.

use std::collections::{HashMap, HashSet};

use crate::ast::{PhysicalModel, PhysicalTable};

/// Order tables so every table comes after the tables it references.
///
/// Works in rounds: each round emits, in model order, every table whose
/// referenced tables have all been emitted. Self-references and references
/// to tables outside the model are ignored. When a round makes no progress
/// the remaining tables form a cycle and are appended in model order.
pub fn dependency_order(model: &PhysicalModel) -> Vec<&PhysicalTable> {
    let names: HashSet<&str> = model.tables.iter().map(|t| t.name.as_str()).collect();

    let parents: HashMap<&str, HashSet<&str>> = model
        .tables
        .iter()
        .map(|table| {
            let deps = table
                .columns
                .iter()
                .filter_map(|c| c.foreign_key.as_ref())
                .map(|fk| fk.referenced_table.as_str())
                .filter(|target| *target != table.name && names.contains(target))
                .collect();
            (table.name.as_str(), deps)
        })
        .collect();

    let mut ordered: Vec<&PhysicalTable> = Vec::with_capacity(model.tables.len());
    let mut emitted: HashSet<&str> = HashSet::new();

    while ordered.len() < model.tables.len() {
        let ready: Vec<&PhysicalTable> = model
            .tables
            .iter()
            .filter(|t| !emitted.contains(t.name.as_str()))
            .filter(|t| {
                parents
                    .get(t.name.as_str())
                    .is_none_or(|deps| deps.iter().all(|d| emitted.contains(d)))
            })
            .collect();

        if ready.is_empty() {
            let remaining: Vec<&PhysicalTable> = model
                .tables
                .iter()
                .filter(|t| !emitted.contains(t.name.as_str()))
                .collect();
            tracing::warn!(
                tables = ?remaining.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
                "circular foreign keys, emitting remaining tables in declaration order"
            );
            ordered.extend(remaining);
            break;
        }

        for table in ready {
            emitted.insert(table.name.as_str());
            ordered.push(table);
        }
    }

    ordered
}
