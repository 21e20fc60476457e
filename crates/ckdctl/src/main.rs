//! ckdctl - CLI for the chronic kidney disease classifier
//!
//! Collects clinical field values, runs them through the configured model
//! and prints the predicted label.

use anyhow::Result;
use ckd_common::{CkdConfig, SchemaVariant};
use ckdctl::commands;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// Version is embedded at build time
const VERSION: &str = env!("CKD_VERSION");

#[derive(Parser)]
#[command(name = "ckdctl")]
#[command(about = "Chronic kidney disease classifier", long_about = None)]
#[command(version = VERSION)]
struct Cli {
    /// Configuration file (default: $CKD_CONFIG, ~/.config/ckd/config.toml, /etc/ckd/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict CKD for one patient record
    Predict {
        /// Model name from the configuration (default: default_model)
        #[arg(long)]
        model: Option<String>,

        /// JSON object of field values ("-" for stdin)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Set a field value (name=value), repeatable
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,

        /// Print a JSON report
        #[arg(long)]
        json: bool,

        /// Show the reconciled feature vector
        #[arg(long)]
        show_features: bool,
    },

    /// List the fields a model expects
    Fields {
        #[arg(long)]
        model: Option<String>,

        /// Show a schema variant (reduced, full) without loading a model
        #[arg(long)]
        variant: Option<SchemaVariant>,
    },

    /// Load a model and show its schema
    Inspect {
        #[arg(long)]
        model: Option<String>,
    },

    /// List configured models
    Models,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a configuration file (--config path, else ~/.config/ckd/config.toml)
    Init {
        /// Model location (name=path or name=url), repeatable; defaults when omitted
        #[arg(long = "model", value_name = "NAME=LOCATION")]
        models: Vec<String>,

        /// Pin a model's artifact digest (name=sha256), repeatable
        #[arg(long = "pin", value_name = "NAME=SHA256")]
        pins: Vec<String>,

        /// Default model name
        #[arg(long)]
        default: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.as_deref();
    let load = || CkdConfig::load(config_path);

    match cli.command {
        Commands::Predict {
            model,
            input,
            set,
            json,
            show_features,
        } => commands::predict(
            &load()?,
            model.as_deref(),
            input.as_deref(),
            &set,
            json,
            show_features,
        ),
        Commands::Fields { model, variant } => {
            commands::fields(&load()?, model.as_deref(), variant)
        }
        Commands::Inspect { model } => commands::inspect(&load()?, model.as_deref()),
        Commands::Models => commands::models(&load()?),
        Commands::Config {
            action:
                ConfigAction::Init {
                    models,
                    pins,
                    default,
                    force,
                },
        } => commands::config_init(config_path, &models, &pins, default.as_deref(), force),
    }
}
