//! Settings Type Generator CLI
//!
//! Usage:
//!   settingsgen generate --input settings.yaml --output src/settings_types.rs
//!   settingsgen check --diff
//!   settingsgen init
//!   settingsgen config --save settingsgen.toml
//!   settingsgen graph > records.dot

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use settingsgen::codegen::generate_records;
use settingsgen::config::{LogMode, SettingsgenConfig};
use settingsgen::diff::unified_text_diff;
use settingsgen::document::{write_default_document, Document};
use settingsgen::{GenerationOutcome, Generator};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "settingsgen")]
#[command(about = "Generate typed Rust settings structs from a YAML settings document")]
struct Cli {
    /// Explicit configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate the types when the document's structure changed
    Generate {
        /// Settings document
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Generated Rust file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Name of the top-level struct
        #[arg(long)]
        root_name: Option<String>,

        /// Do not write or trust the signature manifest
        #[arg(long)]
        no_manifest: bool,
    },

    /// Report pending changes without writing (exit code 1 if any)
    Check {
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also print a unified diff of the source text
        #[arg(long)]
        diff: bool,
    },

    /// Create a default settings document if none exists
    Init {
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config {
        /// Save it to this path instead
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Print the record dependency graph as DOT
    Graph {
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match SettingsgenConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(config.logging.mode);

    if let Err(e) = run(cli.command, config) {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(mode: LogMode) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(mode.default_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands, mut config: SettingsgenConfig) -> anyhow::Result<()> {
    match command {
        Commands::Generate {
            input,
            output,
            root_name,
            no_manifest,
        } => {
            if let Some(input) = input {
                config.generator.input = input;
            }
            if let Some(output) = output {
                config.generator.output = output;
            }
            if let Some(root_name) = root_name {
                config.generator.root_name = root_name;
            }
            if no_manifest {
                config.generator.manifest = false;
            }

            let outcome = Generator::new(config.generator_config()).run()?;
            if outcome.changed {
                println!(
                    "✅ Updated {} ({} records, {})",
                    outcome.output.display(),
                    outcome.record_count,
                    outcome.diff.summary()
                );
            } else {
                println!("✅ {} is up to date", outcome.output.display());
            }
            Ok(())
        }

        Commands::Check { input, output, diff } => {
            if let Some(input) = input {
                config.generator.input = input;
            }
            if let Some(output) = output {
                config.generator.output = output;
            }

            let outcome = Generator::new(config.generator_config()).check()?;
            print_check_report(&outcome, diff);

            if outcome.changed {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Init { input } => {
            let path = input.unwrap_or(config.generator.input);
            if write_default_document(&path)? {
                println!("✅ Created {}", path.display());
            } else {
                println!("{} already exists", path.display());
            }
            Ok(())
        }

        Commands::Config { save } => {
            match save {
                Some(path) => {
                    config.save(&path)?;
                    println!("✅ Saved configuration to {}", path.display());
                }
                None => print!("{}", config.to_toml()?),
            }
            Ok(())
        }

        Commands::Graph { input } => {
            let path = input.unwrap_or(config.generator.input);
            let document = Document::load(&path)
                .with_context(|| format!("loading {}", path.display()))?;
            let records =
                generate_records(&document.root, &config.generator.root_name, &config.naming);
            print!("{}", records.graph().to_dot());
            Ok(())
        }
    }
}

fn print_check_report(outcome: &GenerationOutcome, show_text_diff: bool) {
    if !outcome.changed {
        println!("✅ {} is up to date", outcome.output.display());
        return;
    }

    if outcome.diff.initial {
        println!("📗 {} does not exist yet ({} records)", outcome.output.display(), outcome.record_count);
    } else {
        println!("📝 {} ({}):", outcome.output.display(), outcome.diff.summary());
        for change in &outcome.diff.changes {
            println!("   {}", change);
        }
    }

    if show_text_diff {
        let previous = outcome.previous.as_deref().unwrap_or_default();
        let label = outcome.output.display().to_string();
        println!();
        print!("{}", unified_text_diff(previous, &outcome.code, &label, &format!("{label} (generated)")));
    }
}
