//! CLI entry point for `merise`.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use merise::config::{ConversionConfig, InheritanceStrategy};
use merise::diagnostics::Diagnostics;
use merise::pipeline::{self, PipelineError, Staged};
use merise::serializer::{serialize_logical, serialize_physical};
use merise::sql::{Dialect, generate_sql};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Level {
    Conceptual,
    Logical,
    Physical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Target {
    Logical,
    Physical,
    Sql,
    /// Validate only
    Check,
}

#[derive(Parser)]
#[command(name = "merise", about = "Compile Merise models to relational schemas and SQL DDL")]
struct Cli {
    /// Input model file
    input: PathBuf,

    /// Level of the input document
    #[arg(long, value_enum, default_value = "conceptual")]
    from: Level,

    /// What to produce
    #[arg(long, value_enum, default_value = "sql")]
    to: Target,

    /// SQL dialect: mysql, mariadb or postgresql
    #[arg(long, value_parser = parse_dialect)]
    dialect: Option<Dialect>,

    /// Inheritance strategy: table_per_class, single_table or table_per_subclass
    #[arg(long, value_parser = parse_strategy)]
    strategy: Option<InheritanceStrategy>,

    /// Default VARCHAR length for untyped text columns
    #[arg(long)]
    text_length: Option<u32>,

    /// JSON conversion config; flags override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log debug events to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn parse_dialect(s: &str) -> Result<Dialect, String> {
    Dialect::from_str(s).ok_or_else(|| format!("unknown dialect `{s}`"))
}

fn parse_strategy(s: &str) -> Result<InheritanceStrategy, String> {
    InheritanceStrategy::from_str(s).ok_or_else(|| format!("unknown inheritance strategy `{s}`"))
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            process::exit(2);
        }
    };

    let input = match fs::read_to_string(&cli.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {}: {e}", cli.input.display());
            process::exit(2);
        }
    };

    let result = match run(cli.from, cli.to, &input, &config) {
        Ok(result) => result,
        Err(Failure::Unsupported) => {
            eprintln!("Cannot produce {:?} from a {:?} model", cli.to, cli.from);
            process::exit(2);
        }
        Err(Failure::Rejected(e)) => {
            report(e.diagnostics());
            eprintln!("{e}");
            process::exit(1);
        }
    };

    report(&result.diagnostics);

    match &cli.output {
        Some(path) => {
            if let Err(e) = fs::write(path, &result.model) {
                eprintln!("Failed to write {}: {e}", path.display());
                process::exit(2);
            }
        }
        None => print!("{}", result.model),
    }
}

enum Failure {
    Unsupported,
    Rejected(PipelineError),
}

impl From<PipelineError> for Failure {
    fn from(e: PipelineError) -> Self {
        Self::Rejected(e)
    }
}

fn load_config(cli: &Cli) -> Result<ConversionConfig, String> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
            serde_json::from_str(&text)
                .map_err(|e| format!("Invalid config {}: {e}", path.display()))?
        }
        None => ConversionConfig::default(),
    };

    if let Some(dialect) = cli.dialect {
        config = config.with_dialect(dialect);
    }
    if let Some(strategy) = cli.strategy {
        config = config.with_inheritance(strategy);
    }
    if let Some(length) = cli.text_length {
        config = config.with_text_length(length);
    }
    Ok(config)
}

fn run(
    from: Level,
    to: Target,
    input: &str,
    config: &ConversionConfig,
) -> Result<Staged<String>, Failure> {
    let staged = match (from, to) {
        (Level::Conceptual, Target::Logical) => {
            render(pipeline::conceptual_to_logical(input, config)?, serialize_logical)
        }
        (Level::Conceptual, Target::Physical) => {
            render(pipeline::conceptual_to_physical(input, config)?, serialize_physical)
        }
        (Level::Conceptual, Target::Sql) => pipeline::conceptual_to_sql(input, config)?,
        (Level::Conceptual, Target::Check) => checked(pipeline::check_conceptual(input)?),
        (Level::Logical, Target::Physical) => {
            render(pipeline::logical_to_physical(input, config)?, serialize_physical)
        }
        (Level::Logical, Target::Sql) => {
            let staged = pipeline::logical_to_physical(input, config)?;
            render(staged, |m| generate_sql(m, config.dialect))
        }
        (Level::Logical, Target::Check) => checked(pipeline::check_logical(input)?),
        (Level::Physical, Target::Sql) => pipeline::physical_to_sql(input, config)?,
        (Level::Physical, Target::Check) => checked(pipeline::check_physical(input)?),
        (Level::Logical, Target::Logical)
        | (Level::Physical, Target::Logical | Target::Physical) => return Err(Failure::Unsupported),
    };
    Ok(staged)
}

fn render<T>(staged: Staged<T>, f: impl Fn(&T) -> String) -> Staged<String> {
    Staged {
        model: f(&staged.model),
        diagnostics: staged.diagnostics,
    }
}

fn checked(staged: Staged<()>) -> Staged<String> {
    Staged {
        model: String::new(),
        diagnostics: staged.diagnostics,
    }
}

fn report(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics {
        eprintln!("{diagnostic}");
    }
}
