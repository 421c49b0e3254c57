use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(about, name = "car-tools", version)]
pub struct Args {
    /// Path to a toml configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Increases the level of verbosity (the max level is -vvv).
    #[arg(short, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract the blocks of an IPFS path from a CAR into a new CAR.
    Extract {
        /// Path to extract, as `<root-cid>/path/to/entry`.
        path: String,
        /// The CAR to read from.
        car: PathBuf,
        /// Output path for the CAR. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the CIDs of a CAR as a tree.
    Tree {
        /// The CAR to print.
        car: PathBuf,
    },
    /// Export a UnixFS file from a CAR.
    Export {
        /// Path of the file, as `<root-cid>/path/to/file`.
        path: String,
        /// The CAR to read from.
        car: PathBuf,
        /// Output path for the file. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
