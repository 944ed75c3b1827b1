//! Conceptual to logical conversion.
//!
//! Entities become tables, binary relations become foreign keys or
//! associative tables depending on their cardinalities, n-ary relations
//! always become associative tables, and inheritance groups are flattened
//! according to their strategy.

use std::collections::{HashMap, HashSet};

use crate::ast::{
    Attribute, Column, ConceptualModel, LogicalModel, Participant, Relation, Table,
};
use crate::config::{ConversionConfig, InheritanceStrategy};
use crate::diagnostics::{Diagnostics, Issue, Outcome};

/// Column added to the parent table by single-table flattening.
pub const DISCRIMINATOR: &str = "type_discriminator";

/// Convert a conceptual model into a fresh logical model.
pub fn to_logical(model: &ConceptualModel, config: &ConversionConfig) -> Outcome<LogicalModel> {
    let mut converter = Converter::new(model, config);
    converter.entity_tables();
    converter.relations();
    converter.inheritance();
    converter.associatives();
    converter.finish()
}

/// Tables keyed by name, preserving insertion order.
#[derive(Debug, Default)]
struct TableSet {
    tables: Vec<Table>,
    index: HashMap<String, usize>,
}

impl TableSet {
    fn from_vec(tables: Vec<Table>) -> Self {
        let index = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
        Self { tables, index }
    }

    fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<&Table> {
        self.index.get(name).map(|&i| &self.tables[i])
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.index.get(name).map(|&i| &mut self.tables[i])
    }

    fn push(&mut self, table: Table) {
        self.index.insert(table.name.clone(), self.tables.len());
        self.tables.push(table);
    }

    /// A new set without the named tables.
    fn without(self, removed: &HashSet<String>) -> Self {
        Self::from_vec(
            self.tables
                .into_iter()
                .filter(|t| !removed.contains(&t.name))
                .collect(),
        )
    }

    fn rename(self, from: &str, to: &str) -> Self {
        let tables = self
            .tables
            .into_iter()
            .map(|mut t| {
                if t.name == from {
                    t.name = to.to_string();
                }
                for column in &mut t.columns {
                    let fk = column.foreign_key.as_mut();
                    if let Some(fk) = fk.filter(|fk| fk.referenced_table == from) {
                        fk.referenced_table = to.to_string();
                    }
                }
                t
            })
            .collect();
        Self::from_vec(tables)
    }

    fn columns_mut(&mut self) -> impl Iterator<Item = &mut Column> {
        self.tables.iter_mut().flat_map(|t| t.columns.iter_mut())
    }
}

struct Converter<'a> {
    model: &'a ConceptualModel,
    config: &'a ConversionConfig,
    tables: TableSet,
    /// Relation name → table that represents it.
    relation_tables: HashMap<String, String>,
    /// Child table → (parent table, parent key) for single-table flattening.
    merged_into: HashMap<String, (String, String)>,
    /// Parents removed by table-per-subclass flattening.
    dissolved: HashSet<String>,
    diagnostics: Diagnostics,
}

impl<'a> Converter<'a> {
    fn new(model: &'a ConceptualModel, config: &'a ConversionConfig) -> Self {
        Self {
            model,
            config,
            tables: TableSet::default(),
            relation_tables: HashMap::new(),
            merged_into: HashMap::new(),
            dissolved: HashSet::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    fn entity_tables(&mut self) {
        let model = self.model;
        for entity in &model.entities {
            if self.tables.contains(&entity.name) {
                self.diagnostics.scoped(
                    &entity.name,
                    Issue::DuplicateName { name: entity.name.clone() },
                );
                continue;
            }
            let mut table = Table::new(entity.name.clone());
            table.columns = attribute_columns(&entity.attributes);
            self.tables.push(table);
        }
    }

    /// Key column of an entity. Inheritance children without their own key
    /// are identified by their parent's.
    fn primary_key_of(&self, entity: &str) -> Option<String> {
        let mut current = entity;
        let mut seen = HashSet::new();
        while seen.insert(current) {
            let found = self.model.entity(current)?;
            if let Some(pk) = found.primary_key() {
                return Some(pk.name.clone());
            }
            current = self
                .model
                .inheritances
                .iter()
                .find(|g| g.children.iter().any(|c| c == current))
                .map(|g| g.parent.as_str())?;
        }
        None
    }

    /// Key of a relation participant, reporting why it is unusable.
    fn participant_key(&mut self, relation: &str, entity: &str) -> Option<String> {
        if !self.tables.contains(entity) {
            self.diagnostics.scoped(
                relation,
                Issue::UnknownReference { from: relation.to_string(), target: entity.to_string() },
            );
            return None;
        }
        let key = self.primary_key_of(entity);
        if key.is_none() {
            self.diagnostics.scoped(
                relation,
                Issue::MissingPrimaryKey { owner: entity.to_string() },
            );
        }
        key
    }

    fn relations(&mut self) {
        let model = self.model;
        let mut pair_counts: HashMap<(&str, &str), usize> = HashMap::new();
        for rel in &model.relations {
            if let [a, b] = rel.participants.as_slice() {
                *pair_counts.entry(pair_key(&a.entity, &b.entity)).or_default() += 1;
            }
        }

        for rel in &model.relations {
            match rel.participants.as_slice() {
                [a, b] => {
                    let qualified = pair_counts
                        .get(&pair_key(&a.entity, &b.entity))
                        .is_some_and(|&n| n > 1);
                    self.binary_relation(rel, a, b, qualified);
                }
                [_, _, _, ..] => self.associative_relation(rel),
                _ => self.diagnostics.scoped(
                    &rel.name,
                    Issue::TooFewParticipants {
                        relation: rel.name.clone(),
                        count: rel.participants.len(),
                    },
                ),
            }
        }
    }

    fn binary_relation(
        &mut self,
        rel: &Relation,
        a: &Participant,
        b: &Participant,
        qualified: bool,
    ) {
        match (a.cardinality.is_many(), b.cardinality.is_many()) {
            (false, true) => self.place_foreign_key(rel, a, b, qualified),
            (true, false) => self.place_foreign_key(rel, b, a, qualified),
            (false, false) => {
                // First-declared participant wins unless only the second is (1,1).
                let (holder, target) =
                    if b.cardinality.is_mandatory() && !a.cardinality.is_mandatory() {
                        (b, a)
                    } else {
                        (a, b)
                    };
                self.place_foreign_key(rel, holder, target, qualified);
            }
            (true, true) => self.associative_relation(rel),
        }
    }

    /// Add to `holder`'s table a foreign key to `target`'s key, plus the
    /// relation's own attributes.
    fn place_foreign_key(
        &mut self,
        rel: &Relation,
        holder: &Participant,
        target: &Participant,
        qualified: bool,
    ) {
        let Some(target_key) = self.participant_key(&rel.name, &target.entity) else { return };
        let Some(table) = self.tables.get_mut(&holder.entity) else {
            self.diagnostics.scoped(
                &rel.name,
                Issue::UnknownReference { from: rel.name.clone(), target: holder.entity.clone() },
            );
            return;
        };

        let suffix = role_suffix(&rel.name);
        let base = if qualified {
            format!("{target_key}_{suffix}")
        } else {
            target_key.clone()
        };
        let name = fresh_name(table, &base, Some(&suffix));
        tracing::debug!(
            relation = %rel.name,
            table = %table.name,
            column = %name,
            "placed foreign key"
        );

        table.columns.push(Column::reference(name, &target.entity, &target_key));
        append_attributes(table, &rel.attributes);
    }

    fn associative_relation(&mut self, rel: &Relation) {
        if self.tables.contains(&rel.name) {
            self.diagnostics.scoped(&rel.name, Issue::DuplicateName { name: rel.name.clone() });
            return;
        }
        let Some(mut table) = self.keyed_table(&rel.name, rel) else { return };
        append_attributes(&mut table, &rel.attributes);

        tracing::debug!(
            relation = %rel.name,
            columns = table.columns.len(),
            "built associative table"
        );
        self.relation_tables.insert(rel.name.clone(), table.name.clone());
        self.tables.push(table);
    }

    /// A table whose composite key references every participant's key.
    fn keyed_table(&mut self, name: &str, rel: &Relation) -> Option<Table> {
        let mut keys = Vec::new();
        for participant in &rel.participants {
            keys.push((participant, self.participant_key(&rel.name, &participant.entity)));
        }
        let keys: Vec<(&Participant, String)> = keys
            .into_iter()
            .map(|(p, key)| key.map(|k| (p, k)))
            .collect::<Option<_>>()?;

        let mut table = Table::new(name);
        for (participant, key) in &keys {
            let shared = keys.iter().filter(|(_, other)| other == key).count() > 1;
            let base = if shared {
                format!("{key}_{}", participant.entity.to_lowercase())
            } else {
                key.clone()
            };
            let column = fresh_name(&table, &base, None);
            table
                .columns
                .push(Column::key_reference(column, &participant.entity, key));
        }
        Some(table)
    }

    fn inheritance(&mut self) {
        let model = self.model;
        for group in &model.inheritances {
            let strategy = group.strategy.unwrap_or(self.config.inheritance);

            let Some(parent_key) = self.tables.get(&group.parent).and_then(|t| {
                t.primary_keys().next().map(|c| c.name.clone())
            }) else {
                let issue = if self.tables.contains(&group.parent) {
                    Issue::MissingPrimaryKey { owner: group.parent.clone() }
                } else {
                    Issue::UnknownReference {
                        from: group.name.clone(),
                        target: group.parent.clone(),
                    }
                };
                self.diagnostics.scoped(&group.name, issue);
                continue;
            };

            let mut children = Vec::new();
            for child in &group.children {
                if self.tables.contains(child) {
                    children.push(child.as_str());
                } else {
                    self.diagnostics.scoped(
                        &group.name,
                        Issue::UnknownReference { from: group.name.clone(), target: child.clone() },
                    );
                }
            }

            tracing::debug!(
                group = %group.name,
                strategy = strategy.as_str(),
                "flattening inheritance"
            );
            match strategy {
                InheritanceStrategy::TablePerClass => {
                    self.table_per_class(&group.parent, &parent_key, &children)
                }
                InheritanceStrategy::SingleTable => {
                    self.single_table(&group.parent, &parent_key, &children)
                }
                InheritanceStrategy::TablePerSubclass => {
                    self.table_per_subclass(&group.parent, &children)
                }
            }
        }
    }

    fn table_per_class(&mut self, parent: &str, parent_key: &str, children: &[&str]) {
        for child in children {
            let Some(table) = self.tables.get_mut(child) else { continue };
            table
                .columns
                .retain(|c| !(c.name == parent_key && c.is_primary_key && c.foreign_key.is_none()));
            let name = fresh_name(table, parent_key, Some(&parent.to_lowercase()));
            table
                .columns
                .insert(0, Column::key_reference(name, parent, parent_key));
        }
    }

    fn single_table(&mut self, parent: &str, parent_key: &str, children: &[&str]) {
        let Some(parent_table) = self.tables.get(parent) else { return };

        let mut merged: Vec<Column> = Vec::new();
        if !parent_table.has_column(DISCRIMINATOR) {
            merged.push(Column::new(DISCRIMINATOR));
        }
        for child in children {
            let Some(table) = self.tables.get(child) else { continue };
            for column in table.columns.iter().filter(|c| !c.is_primary_key) {
                let known = parent_table.has_column(&column.name)
                    || merged.iter().any(|m| m.name == column.name);
                if !known {
                    merged.push(column.clone());
                }
            }
        }

        if let Some(parent_table) = self.tables.get_mut(parent) {
            parent_table.columns.extend(merged);
        }

        let removed: HashSet<String> = children.iter().map(|c| c.to_string()).collect();
        for child in &removed {
            self.merged_into
                .insert(child.clone(), (parent.to_string(), parent_key.to_string()));
        }
        self.tables = std::mem::take(&mut self.tables).without(&removed);
    }

    fn table_per_subclass(&mut self, parent: &str, children: &[&str]) {
        let Some(parent_columns) = self.tables.get(parent).map(|t| t.columns.clone()) else {
            return;
        };

        for child in children {
            let Some(table) = self.tables.get_mut(child) else { continue };
            let own = std::mem::take(&mut table.columns);
            table.columns = parent_columns.clone();
            let inherited = |c: &Column| parent_columns.iter().any(|p| p.name == c.name);
            table.columns.extend(own.into_iter().filter(|c| !inherited(c)));
        }

        self.dissolved.insert(parent.to_string());
        let removed = HashSet::from([parent.to_string()]);
        self.tables = std::mem::take(&mut self.tables).without(&removed);
    }

    fn associatives(&mut self) {
        let model = self.model;
        for assoc in &model.associatives {
            let Some(rel) = model.relation(&assoc.relation) else {
                self.diagnostics.scoped(
                    &assoc.name,
                    Issue::UnknownReference {
                        from: assoc.name.clone(),
                        target: assoc.relation.clone(),
                    },
                );
                continue;
            };

            let existing = self
                .relation_tables
                .get(&rel.name)
                .filter(|t| self.tables.contains(t.as_str()))
                .cloned();

            let table_name = match existing {
                Some(existing) if existing == assoc.name => existing,
                Some(existing) if self.tables.contains(&assoc.name) => {
                    self.diagnostics.scoped(
                        &assoc.name,
                        Issue::DuplicateName { name: assoc.name.clone() },
                    );
                    existing
                }
                Some(existing) => {
                    self.tables = std::mem::take(&mut self.tables).rename(&existing, &assoc.name);
                    assoc.name.clone()
                }
                None if self.tables.contains(&assoc.name) => {
                    self.diagnostics.scoped(
                        &assoc.name,
                        Issue::DuplicateName { name: assoc.name.clone() },
                    );
                    continue;
                }
                None => {
                    let Some(table) = self.keyed_table(&assoc.name, rel) else { continue };
                    self.tables.push(table);
                    assoc.name.clone()
                }
            };

            if let Some(table) = self.tables.get_mut(&table_name) {
                append_attributes(table, &assoc.attributes);
            }
            tracing::debug!(associative = %assoc.name, table = %table_name, "promoted relation");
            self.relation_tables.insert(rel.name.clone(), table_name);
        }
    }

    fn finish(mut self) -> Outcome<LogicalModel> {
        for column in self.tables.columns_mut() {
            let Some(fk) = column.foreign_key.as_mut() else { continue };
            if let Some((parent, key)) = self.merged_into.get(&fk.referenced_table) {
                fk.referenced_table = parent.clone();
                fk.referenced_column = key.clone();
            }
        }

        for table in &self.tables.tables {
            for column in &table.columns {
                let Some(fk) = &column.foreign_key else { continue };
                if self.dissolved.contains(&fk.referenced_table) {
                    self.diagnostics.scoped(
                        &table.name,
                        Issue::FlattenedReference {
                            column: format!("{}.{}", table.name, column.name),
                            parent: fk.referenced_table.clone(),
                        },
                    );
                }
            }
        }

        tracing::debug!(tables = self.tables.tables.len(), "converted to logical model");
        Outcome::new(
            LogicalModel { tables: self.tables.tables },
            self.diagnostics,
        )
    }
}

fn pair_key<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

fn role_suffix(relation: &str) -> String {
    relation.to_lowercase()
}

fn attribute_columns(attributes: &[Attribute]) -> Vec<Column> {
    attributes
        .iter()
        .filter(|a| !a.is_derived)
        .map(|a| Column {
            name: a.name.clone(),
            is_primary_key: a.is_primary_key,
            foreign_key: None,
        })
        .collect()
}

/// Append plain columns for the non-derived attributes the table lacks.
fn append_attributes(table: &mut Table, attributes: &[Attribute]) {
    for attr in attributes.iter().filter(|a| !a.is_derived) {
        if !table.has_column(&attr.name) {
            table.columns.push(Column::new(attr.name.clone()));
        }
    }
}

/// A column name unused in `table`: `base`, then `base_<qualifier>`, then a
/// numeric suffix.
fn fresh_name(table: &Table, base: &str, qualifier: Option<&str>) -> String {
    if !table.has_column(base) {
        return base.to_string();
    }

    let stem = match qualifier {
        Some(q) if !base.ends_with(&format!("_{q}")) => {
            let qualified = format!("{base}_{q}");
            if !table.has_column(&qualified) {
                return qualified;
            }
            qualified
        }
        _ => base.to_string(),
    };

    let mut n = 2;
    loop {
        let candidate = format!("{stem}_{n}");
        if !table.has_column(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
