//! Versioning Audit CLI
//!
//! Canonicalizes versions, resolves constraints and audits compatibility
//! matrix snapshots.

use anyhow::Context;
use clap::{Parser, Subcommand};
use familiar_versioning::{
    resolve_version, CompatibilityMatrix, Version, VersionConstraint, VersioningConfig,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "version-audit")]
#[command(about = "Inspect versions, constraints and compatibility snapshots")]
struct Cli {
    /// Explicit configuration file, layered over the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse versions and print them canonicalized, lowest first
    Parse {
        /// Version strings
        #[arg(required = true)]
        versions: Vec<String>,
    },

    /// Pick the highest candidate satisfying every constraint
    Resolve {
        /// Constraint such as ">=1.2.0" or "^2.0.0" (repeatable)
        #[arg(short = 'C', long = "constraint", required = true)]
        constraints: Vec<String>,
        /// Candidate versions
        #[arg(required = true)]
        candidates: Vec<String>,
    },

    /// Validate a compatibility matrix snapshot (JSON)
    Matrix {
        /// Snapshot file
        file: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() {
    let cli = Cli::parse();

    let config = match VersioningConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli.command, &config) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the command ran but found problems
fn run(command: Commands, config: &VersioningConfig) -> anyhow::Result<bool> {
    match command {
        Commands::Parse { versions } => {
            let mut parsed = versions
                .iter()
                .map(|text| Version::parse(text))
                .collect::<Result<Vec<_>, _>>()?;
            parsed.sort();
            for version in parsed {
                println!("{}", version);
            }
            Ok(true)
        }

        Commands::Resolve {
            constraints,
            candidates,
        } => {
            let constraints = constraints
                .iter()
                .map(|text| VersionConstraint::parse(text))
                .collect::<Result<Vec<_>, _>>()?;
            let candidates = candidates
                .iter()
                .map(|text| Version::parse(text))
                .collect::<Result<Vec<_>, _>>()?;

            let chosen = resolve_version(&candidates, &constraints)?;
            println!("{}", chosen);
            Ok(true)
        }

        Commands::Matrix { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let matrix = CompatibilityMatrix::from_json(&json)
                .with_context(|| format!("failed to load snapshot {}", file.display()))?;

            let report = matrix.validate();
            let components = matrix.components();
            println!("🔍 Matrix {}: {} component(s)", file.display(), components.len());
            for component in components {
                let versions: Vec<String> = matrix
                    .versions(component)
                    .into_iter()
                    .map(Version::to_string)
                    .collect();
                println!("  {} [{}]", component, versions.join(", "));
            }

            if report.is_valid() {
                println!("✅ No symmetry errors or rule violations");
                return Ok(true);
            }
            for issue in report.issues() {
                println!("  ❌ {}", issue);
            }
            println!(
                "❌ {} symmetry error(s), {} rule violation(s)",
                report.symmetry_errors.len(),
                report.rule_violations.len()
            );
            Ok(false)
        }

        Commands::Config => {
            let rendered =
                toml::to_string_pretty(config).context("failed to render configuration")?;
            print!("{}", rendered);
            Ok(true)
        }
    }
}
