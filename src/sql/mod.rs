//! SQL DDL generation.

pub mod dialect;
mod generator;
mod order;
mod types;

pub use dialect::Dialect;
pub use generator::{SqlGenerator, generate_sql};
pub use order::dependency_order;
pub use types::map_type;
