//! Parsers for the three document levels.
//!
//! Each parser walks the blocks of one document, turning every known block
//! into a model record. Syntax errors are scoped to their block and never stop
//! sibling blocks from being parsed.

mod conceptual;
pub mod items;
mod logical;
mod physical;

pub use conceptual::parse_conceptual;
pub use logical::parse_logical;
pub use physical::parse_physical;
