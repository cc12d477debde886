//! Offline renderer
//!
//! Usage:
//!   subgen-render [--input <file>] [--seed <n>] [config options]
//!
//! Reads `address[#label]` lines from a file (or stdin) and prints the
//! document the server would produce for them.

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::io::Read;
use std::path::PathBuf;
use subgen::{logging, parse_entries, random_port, render_document, split_lines, ConfigArgs, DEFAULT_PORTS};
use tracing::info;

/// Render a Clash configuration from a local address list
#[derive(Parser, Debug)]
#[command(name = "subgen-render")]
#[command(author = "Subgen Contributors")]
#[command(version)]
#[command(about = "Render a Clash configuration from a local address list")]
struct Args {
    /// Address list file; stdin when omitted
    #[arg(short = 'i', long)]
    input: Option<PathBuf>,

    /// Seed for default port selection, for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(flatten)]
    generator: ConfigArgs,
}

fn read_input(input: Option<&PathBuf>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    logging::init(&args.log_level, true);

    let config = args.generator.resolve().context("Invalid configuration")?;
    let lines = split_lines(&read_input(args.input.as_ref())?);

    let entries = match args.seed {
        Some(seed) => {
            let mut rng = StdRng::seed_from_u64(seed);
            parse_entries(&lines, &config.default_ports, |ports: &[u16]| {
                ports.choose(&mut rng).copied().unwrap_or(DEFAULT_PORTS[0])
            })
        }
        None => parse_entries(&lines, &config.default_ports, random_port),
    };

    info!("Rendering {} proxies", entries.len());
    let document = render_document(&entries, &config.render_params()).context("Failed to render document")?;
    print!("{}", document);

    Ok(())
}
