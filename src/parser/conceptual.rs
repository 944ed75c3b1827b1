use crate::ast::{
    AssociativeEntity, Attribute, Cardinality, ConceptualModel, Entity, Inheritance, Participant,
    Relation,
};
use crate::blocks::{Block, extract_blocks};
use crate::config::InheritanceStrategy;
use crate::diagnostics::{Diagnostics, Issue, Outcome};

use super::items::{Flag, is_identifier, parse_flag, split_flags};

/// Parse a conceptual document made of `ENTITY`, `RELATION`, `INHERITANCE`
/// and `ASSOCIATIVE` blocks.
///
/// Entities that no relation or inheritance group mentions are reported as
/// orphan warnings.
pub fn parse_conceptual(text: &str) -> Outcome<ConceptualModel> {
    let Outcome { model: blocks, mut diagnostics } = extract_blocks(text);
    let mut model = ConceptualModel::default();

    for block in &blocks {
        if !block.is("ASSOCIATIVE") {
            block.reject_extra(&mut diagnostics);
        }
        if block.is("ENTITY") {
            model.entities.push(parse_entity(block, &mut diagnostics));
        } else if block.is("RELATION") {
            model.relations.push(parse_relation(block, &mut diagnostics));
        } else if block.is("INHERITANCE") {
            if let Some(group) = parse_inheritance(block, &mut diagnostics) {
                model.inheritances.push(group);
            }
        } else if block.is("ASSOCIATIVE") {
            if let Some(assoc) = parse_associative(block, &mut diagnostics) {
                model.associatives.push(assoc);
            }
        } else {
            diagnostics.scoped(
                &block.name,
                Issue::UnknownKeyword { keyword: block.keyword.clone() },
            );
        }
    }

    for orphan in model.orphans() {
        diagnostics.scoped(orphan, Issue::OrphanEntity { entity: orphan.to_string() });
    }

    tracing::debug!(
        entities = model.entities.len(),
        relations = model.relations.len(),
        inheritances = model.inheritances.len(),
        associatives = model.associatives.len(),
        "parsed conceptual model"
    );
    Outcome::new(model, diagnostics)
}

fn parse_entity(block: &Block, diagnostics: &mut Diagnostics) -> Entity {
    Entity {
        name: block.name.clone(),
        attributes: parse_attributes(block, &block.items(), diagnostics),
    }
}

fn parse_attributes(
    block: &Block,
    items: &[String],
    diagnostics: &mut Diagnostics,
) -> Vec<Attribute> {
    let mut attributes: Vec<Attribute> = Vec::new();
    for item in items {
        let Some(attr) = parse_attribute(block, item, diagnostics) else { continue };
        if attributes.iter().any(|a| a.name == attr.name) {
            diagnostics.scoped(
                &block.name,
                Issue::DuplicateColumn { table: block.name.clone(), column: attr.name },
            );
            continue;
        }
        attributes.push(attr);
    }
    attributes
}

/// `name [FLAG]*` where the recognized flags are `PK` and `DERIVED`.
fn parse_attribute(block: &Block, item: &str, diagnostics: &mut Diagnostics) -> Option<Attribute> {
    let parts = split_flags(item).filter(|p| is_identifier(&p.head));
    let Some(parts) = parts else {
        diagnostics.scoped(&block.name, Issue::MalformedItem { text: item.to_string() });
        return None;
    };

    let mut attr = Attribute::new(parts.head);
    for text in &parts.flags {
        let mut warnings = Vec::new();
        match parse_flag(&attr.name, text, &mut warnings) {
            Ok(Flag::PrimaryKey) => attr.is_primary_key = true,
            Ok(Flag::Derived) => attr.is_derived = true,
            // Other flags carry no meaning at this level.
            Ok(_) | Err(_) => {}
        }
    }
    Some(attr)
}

fn parse_relation(block: &Block, diagnostics: &mut Diagnostics) -> Relation {
    let mut relation = Relation {
        name: block.name.clone(),
        participants: Vec::new(),
        attributes: Vec::new(),
    };

    let mut attribute_items = Vec::new();
    for item in block.items() {
        match participant_parts(&item) {
            Some((entity, tuple)) => {
                let cardinality = tuple
                    .split_once(',')
                    .and_then(|(min, max)| Cardinality::from_pair(min, max));
                match cardinality {
                    Some(cardinality) => relation.participants.push(Participant {
                        entity: entity.to_string(),
                        cardinality,
                    }),
                    None => diagnostics.scoped(
                        &block.name,
                        Issue::InvalidCardinality {
                            relation: block.name.clone(),
                            value: format!("({tuple})"),
                        },
                    ),
                }
            }
            None => attribute_items.push(item),
        }
    }

    relation.attributes = parse_attributes(block, &attribute_items, diagnostics);
    relation
}

/// Split `Entity (min,max)` into the entity name and the tuple body.
fn participant_parts(item: &str) -> Option<(&str, &str)> {
    let open = item.find('(')?;
    let entity = item[..open].trim();
    let tuple = item[open + 1..].strip_suffix(')')?;
    (is_identifier(entity) && !tuple.contains(['(', ')'])).then_some((entity, tuple))
}

#[derive(Clone, Copy, PartialEq)]
enum Directive {
    None,
    Children,
}

fn parse_inheritance(block: &Block, diagnostics: &mut Diagnostics) -> Option<Inheritance> {
    let mut parent = None;
    let mut children = Vec::new();
    let mut strategy = None;
    let mut directive = Directive::None;
    let malformed = |diagnostics: &mut Diagnostics, item: &str| {
        diagnostics.scoped(&block.name, Issue::MalformedItem { text: item.to_string() })
    };

    for item in block.items() {
        let (word, rest) = match item.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (item.as_str(), ""),
        };

        match word.to_ascii_uppercase().as_str() {
            "PARENT" => {
                directive = Directive::None;
                if is_identifier(rest) {
                    parent = Some(rest.to_string());
                } else {
                    malformed(diagnostics, &item);
                }
            }
            "CHILDREN" => {
                directive = Directive::Children;
                if is_identifier(rest) {
                    children.push(rest.to_string());
                } else if !rest.is_empty() {
                    malformed(diagnostics, &item);
                }
            }
            "STRATEGY" => {
                directive = Directive::None;
                match InheritanceStrategy::from_str(rest) {
                    Some(s) => strategy = Some(s),
                    None => diagnostics.scoped(
                        &block.name,
                        Issue::UnknownStrategy { value: rest.to_string() },
                    ),
                }
            }
            _ if directive == Directive::Children && is_identifier(&item) => {
                children.push(item.clone());
            }
            _ => malformed(diagnostics, &item),
        }
    }

    if children.is_empty() {
        diagnostics.scoped(&block.name, Issue::MissingChildren { group: block.name.clone() });
    }
    let Some(parent) = parent else {
        diagnostics.scoped(&block.name, Issue::MissingParent { group: block.name.clone() });
        return None;
    };
    if children.is_empty() {
        return None;
    }

    Some(Inheritance {
        name: block.name.clone(),
        parent,
        children,
        strategy,
    })
}

fn parse_associative(block: &Block, diagnostics: &mut Diagnostics) -> Option<AssociativeEntity> {
    let relation = match block.extra.split_whitespace().collect::<Vec<_>>().as_slice() {
        [on, relation] if on.eq_ignore_ascii_case("ON") && is_identifier(relation) => {
            relation.to_string()
        }
        _ => {
            diagnostics.scoped(
                &block.name,
                Issue::MissingAssociation { name: block.name.clone() },
            );
            return None;
        }
    };

    Some(AssociativeEntity {
        name: block.name.clone(),
        relation,
        attributes: parse_attributes(block, &block.items(), diagnostics),
    })
}
