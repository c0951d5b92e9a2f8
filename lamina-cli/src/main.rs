//! Lamina CLI: inspect and exercise configured cache chains.
//!
//! ```bash
//! lamina describe --config lamina.toml
//! lamina simulate --config lamina.toml --namespace users --ops 100000 --seed 7
//! ```
//!
//! See `lamina --help` for all available commands and options.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lamina", about = "Lamina cache chain tool", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the decorator chain of every configured cache
    Describe {
        /// TOML configuration file
        #[arg(long, short)]
        config: PathBuf,
    },

    /// Run a seeded read-through workload against one cache
    Simulate {
        /// TOML configuration file
        #[arg(long, short)]
        config: PathBuf,

        /// Cache namespace to exercise
        #[arg(long, short)]
        namespace: String,

        /// Number of lookups
        #[arg(long, default_value_t = 10_000)]
        ops: usize,

        /// Number of distinct keys
        #[arg(long, default_value_t = 256)]
        keys: usize,

        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Lookups per transaction
        #[arg(long, default_value_t = 16)]
        tx_size: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Describe { config } => commands::describe::run(&config),
        Commands::Simulate { config, namespace, ops, keys, seed, tx_size } => {
            let options = commands::simulate::SimulationOptions { ops, keys, seed, tx_size };
            commands::simulate::run(&config, &namespace, &options)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
