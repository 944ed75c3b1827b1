//! Model-to-model conversions.

mod logical;
mod physical;
pub mod rules;

pub use logical::{DISCRIMINATOR, to_logical};
pub use physical::{to_physical, to_physical_with};
