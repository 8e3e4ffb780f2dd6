//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "packet-replay")]
#[command(author, version, about = "Replay captured conversations against a live server")]
pub struct Args {
    /// Rewrite rule, repeatable (`SRC_ADDR[:SRC_PORT[:TEST_ADDR[:TEST_PORT]]]`).
    #[arg(long = "target-server", global = true)]
    pub target_server: Vec<String>,

    /// External validator spec for UDP replay (`python:<file>.py:<func>`).
    /// Absent means the built-in byte-exact validator is used.
    #[arg(long, global = true)]
    pub validator: Option<String>,

    /// Raises the tracing log level; repeat for more verbosity.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read a pcap/pcapng capture and reconstruct its conversations.
    Capture {
        /// Path to the capture file.
        file: PathBuf,

        /// Write each reconstructed conversation as a script file here
        /// instead of printing a summary.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Replay one or more conversation script files.
    Replay {
        /// Script files to replay, in order.
        scripts: Vec<PathBuf>,
    },
}
