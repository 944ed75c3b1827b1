//! Text-to-text entry points that chain parsing, validation and conversion.
//!
//! Every stage runs to completion and collects its diagnostics. A stage whose
//! diagnostics contain an error stops the pipeline with
//! [`PipelineError::Rejected`]; warnings travel with the result.

use std::fmt;

use thiserror::Error;

use crate::ast::{LogicalModel, PhysicalModel};
use crate::config::ConversionConfig;
use crate::convert::{to_logical, to_physical};
use crate::diagnostics::{Diagnostics, Outcome};
use crate::parser::{parse_conceptual, parse_logical, parse_physical};
use crate::sql::generate_sql;
use crate::validate::{validate_conceptual, validate_logical, validate_physical};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ParseConceptual,
    ParseLogical,
    ParsePhysical,
    ToLogical,
    ToPhysical,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ParseConceptual => "conceptual model",
            Self::ParseLogical => "logical model",
            Self::ParsePhysical => "physical model",
            Self::ToLogical => "logical conversion",
            Self::ToPhysical => "physical conversion",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} rejected with {} error(s)", .diagnostics.errors().count())]
    Rejected { stage: Stage, diagnostics: Diagnostics },
}

impl PipelineError {
    pub fn diagnostics(&self) -> &Diagnostics {
        match self {
            Self::Rejected { diagnostics, .. } => diagnostics,
        }
    }
}

/// A successful stage: its output and the warnings gathered so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staged<T> {
    pub model: T,
    pub diagnostics: Diagnostics,
}

/// Accumulates diagnostics across stages.
struct Run {
    diagnostics: Diagnostics,
}

impl Run {
    fn new() -> Self {
        Self { diagnostics: Diagnostics::new() }
    }

    fn accept<T>(&mut self, stage: Stage, outcome: Outcome<T>) -> Result<T, PipelineError> {
        self.diagnostics.merge(outcome.diagnostics);
        if self.diagnostics.has_errors() {
            tracing::debug!(%stage, "stage rejected");
            return Err(PipelineError::Rejected {
                stage,
                diagnostics: std::mem::take(&mut self.diagnostics),
            });
        }
        Ok(outcome.model)
    }

    fn finish<T>(self, model: T) -> Staged<T> {
        Staged { model, diagnostics: self.diagnostics }
    }
}

fn conceptual_stage(
    run: &mut Run,
    text: &str,
    config: &ConversionConfig,
) -> Result<LogicalModel, PipelineError> {
    let model = run.accept(Stage::ParseConceptual, parse_conceptual(text))?;
    let diagnostics = validate_conceptual(&model);
    let model = run.accept(Stage::ParseConceptual, Outcome::new(model, diagnostics))?;

    let logical = run.accept(Stage::ToLogical, to_logical(&model, config))?;
    let diagnostics = validate_logical(&logical);
    run.accept(Stage::ToLogical, Outcome::new(logical, diagnostics))
}

fn logical_stage(
    run: &mut Run,
    logical: &LogicalModel,
    config: &ConversionConfig,
) -> Result<PhysicalModel, PipelineError> {
    let physical = run.accept(Stage::ToPhysical, to_physical(logical, config))?;
    let diagnostics = validate_physical(&physical);
    run.accept(Stage::ToPhysical, Outcome::new(physical, diagnostics))
}

pub fn conceptual_to_logical(
    text: &str,
    config: &ConversionConfig,
) -> Result<Staged<LogicalModel>, PipelineError> {
    let mut run = Run::new();
    let logical = conceptual_stage(&mut run, text, config)?;
    Ok(run.finish(logical))
}

pub fn logical_to_physical(
    text: &str,
    config: &ConversionConfig,
) -> Result<Staged<PhysicalModel>, PipelineError> {
    let mut run = Run::new();
    let logical = run.accept(Stage::ParseLogical, parse_logical(text))?;
    let diagnostics = validate_logical(&logical);
    let logical = run.accept(Stage::ParseLogical, Outcome::new(logical, diagnostics))?;
    let physical = logical_stage(&mut run, &logical, config)?;
    Ok(run.finish(physical))
}

/// Generate DDL from a physical document. Only the dialect of `config` is used.
pub fn physical_to_sql(
    text: &str,
    config: &ConversionConfig,
) -> Result<Staged<String>, PipelineError> {
    let mut run = Run::new();
    let physical = run.accept(Stage::ParsePhysical, parse_physical(text))?;
    let diagnostics = validate_physical(&physical);
    let physical = run.accept(Stage::ParsePhysical, Outcome::new(physical, diagnostics))?;
    Ok(run.finish(generate_sql(&physical, config.dialect)))
}

pub fn conceptual_to_physical(
    text: &str,
    config: &ConversionConfig,
) -> Result<Staged<PhysicalModel>, PipelineError> {
    let mut run = Run::new();
    let logical = conceptual_stage(&mut run, text, config)?;
    let physical = logical_stage(&mut run, &logical, config)?;
    Ok(run.finish(physical))
}

pub fn conceptual_to_sql(
    text: &str,
    config: &ConversionConfig,
) -> Result<Staged<String>, PipelineError> {
    let Staged { model, diagnostics } = conceptual_to_physical(text, config)?;
    Ok(Staged {
        model: generate_sql(&model, config.dialect),
        diagnostics,
    })
}

/// Parse and validate a conceptual document.
pub fn check_conceptual(text: &str) -> Result<Staged<()>, PipelineError> {
    let mut run = Run::new();
    let model = run.accept(Stage::ParseConceptual, parse_conceptual(text))?;
    let diagnostics = validate_conceptual(&model);
    run.accept(Stage::ParseConceptual, Outcome::new((), diagnostics))?;
    Ok(run.finish(()))
}

/// Parse and validate a logical document.
pub fn check_logical(text: &str) -> Result<Staged<()>, PipelineError> {
    let mut run = Run::new();
    let logical = run.accept(Stage::ParseLogical, parse_logical(text))?;
    let diagnostics = validate_logical(&logical);
    run.accept(Stage::ParseLogical, Outcome::new((), diagnostics))?;
    Ok(run.finish(()))
}

/// Parse and validate a physical document.
pub fn check_physical(text: &str) -> Result<Staged<()>, PipelineError> {
    let mut run = Run::new();
    let physical = run.accept(Stage::ParsePhysical, parse_physical(text))?;
    let diagnostics = validate_physical(&physical);
    run.accept(Stage::ParsePhysical, Outcome::new((), diagnostics))?;
    Ok(run.finish(()))
}
