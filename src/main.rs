//! pathgen CLI
//!
//! Usage:
//!   pathgen [OPTIONS] <CONFIG>
//!
//! Options:
//!   -t, --templates <DIR>  Directory with peer.hbs, global.hbs, ui.hbs and vrrp.hbs
//!   -n, --dry-run          Print rendered files instead of writing them
//!       --keep-going       Keep rendering after a template fails
//!   -v, --verbose          Enable debug logging
//!   -h, --help             Print help

use std::io;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pathgen::{generate_from_file, output, FailurePolicy, GenerateOptions, TemplateBundle};

#[derive(Parser)]
#[command(name = "pathgen")]
#[command(about = "Render BIRD and keepalived configuration from a declarative peering config")]
struct Cli {
    /// Configuration file (TOML format)
    config: PathBuf,

    /// Directory with peer.hbs, global.hbs, ui.hbs and vrrp.hbs (embedded templates if not provided)
    #[arg(short, long)]
    templates: Option<PathBuf>,

    /// Print rendered files instead of writing them
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Keep rendering after a template fails; exit non-zero at the end
    #[arg(long)]
    keep_going: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Load templates
    let templates = match &cli.templates {
        Some(dir) => match TemplateBundle::from_dir(dir) {
            Ok(bundle) => bundle,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => TemplateBundle::embedded(),
    };

    let policy = if cli.keep_going {
        FailurePolicy::Continue
    } else {
        FailurePolicy::Abort
    };
    let options = GenerateOptions::new()
        .with_templates(templates)
        .with_failure_policy(policy);

    let generated = match generate_from_file(&cli.config, &options) {
        Ok(generated) => generated,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if cli.dry_run {
        if let Err(e) = output::print_artifacts(&generated.artifacts, &mut io::stdout().lock()) {
            eprintln!("Error writing to stdout: {}", e);
            std::process::exit(1);
        }
    } else if let Err(e) = generated.write() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if !generated.failures.is_empty() {
        for failure in &generated.failures {
            error!("{}", failure);
        }
        std::process::exit(1);
    }

    info!(artifacts = generated.artifacts.len(), "generation complete");
}
