pub mod ast;
pub mod blocks;
pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod parser;
pub mod pipeline;
pub mod serializer;
pub mod sql;
pub mod validate;

use wasm_bindgen::prelude::*;

use config::{ConversionConfig, InheritanceStrategy};
use pipeline::PipelineError;
use serializer::{serialize_logical, serialize_physical};
use sql::Dialect;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Compile a conceptual model to SQL DDL
#[wasm_bindgen(js_name = "merToSql")]
pub fn mer_to_sql(
    source: &str,
    dialect: Option<String>,
    strategy: Option<String>,
) -> Result<String, String> {
    let config = build_config(dialect.as_deref(), strategy.as_deref())?;
    let staged = pipeline::conceptual_to_sql(source, &config).map_err(rejected)?;
    Ok(staged.model)
}

/// Convert a conceptual model to the logical `TABLE` notation
#[wasm_bindgen(js_name = "merToLogical")]
pub fn mer_to_logical(source: &str, strategy: Option<String>) -> Result<String, String> {
    let config = build_config(None, strategy.as_deref())?;
    let staged = pipeline::conceptual_to_logical(source, &config).map_err(rejected)?;
    Ok(serialize_logical(&staged.model))
}

/// Convert a conceptual model to the typed physical `TABLE` notation
#[wasm_bindgen(js_name = "merToPhysical")]
pub fn mer_to_physical(
    source: &str,
    dialect: Option<String>,
    strategy: Option<String>,
) -> Result<String, String> {
    let config = build_config(dialect.as_deref(), strategy.as_deref())?;
    let staged = pipeline::conceptual_to_physical(source, &config).map_err(rejected)?;
    Ok(serialize_physical(&staged.model))
}

/// Validate a model; `level` is `conceptual` (default), `logical` or `physical`.
/// Returns the warnings, one per line, or the full report on errors.
#[wasm_bindgen(js_name = "merValidate")]
pub fn mer_validate(source: &str, level: Option<String>) -> Result<String, String> {
    let staged = match level.as_deref().unwrap_or("conceptual") {
        "conceptual" => pipeline::check_conceptual(source),
        "logical" => pipeline::check_logical(source),
        "physical" => pipeline::check_physical(source),
        other => return Err(format!("unknown model level `{other}`")),
    }
    .map_err(rejected)?;
    Ok(staged.diagnostics.to_string())
}

fn build_config(dialect: Option<&str>, strategy: Option<&str>) -> Result<ConversionConfig, String> {
    let mut config = ConversionConfig::default();
    if let Some(name) = dialect {
        let dialect = Dialect::from_str(name).ok_or_else(|| format!("unknown dialect `{name}`"))?;
        config = config.with_dialect(dialect);
    }
    if let Some(name) = strategy {
        let strategy = InheritanceStrategy::from_str(name)
            .ok_or_else(|| format!("unknown inheritance strategy `{name}`"))?;
        config = config.with_inheritance(strategy);
    }
    Ok(config)
}

fn rejected(e: PipelineError) -> String {
    format!("{e}\n{}", e.diagnostics())
}
