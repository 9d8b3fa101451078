use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Remote Code Launcher - run remote commands over SSH and bootstrap a
/// port-forwarded code-server
#[derive(Parser, Debug)]
#[command(name = "remote-code-launcher")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single command on the remote host
    Exec {
        /// SSH host
        #[arg(short = 'H', long)]
        host: String,

        /// SSH port
        #[arg(short, long, default_value = "22")]
        port: u16,

        /// SSH username
        #[arg(short, long)]
        username: String,

        /// SSH private key path (password auth when omitted)
        #[arg(short, long)]
        key: Option<PathBuf>,

        /// Command timeout in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,

        /// Command to run on the remote host
        command: String,
    },

    /// Install and start a remote code-server, then forward a local port to it
    Bootstrap {
        /// SSH host
        #[arg(short = 'H', long)]
        host: String,

        /// SSH port
        #[arg(short, long, default_value = "22")]
        port: u16,

        /// SSH username
        #[arg(short, long)]
        username: String,

        /// SSH private key path (password auth when omitted)
        #[arg(short, long)]
        key: Option<PathBuf>,

        /// code-server build commit id
        #[arg(long)]
        commit_id: Option<String>,

        /// Remote architecture (e.g. x64, arm64)
        #[arg(long)]
        arch: Option<String>,

        /// Remote install directory
        #[arg(long)]
        install_path: Option<String>,

        /// Local port to forward to the server
        #[arg(short, long)]
        local_port: Option<u16>,
    },
}
