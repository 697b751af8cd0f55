//! Interactive clients for the Relaybox chat relay and file server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin relaybox-client -- chat
//! cargo run --bin relaybox-client -- chat --host 192.168.1.10 --port 9000
//! cargo run --bin relaybox-client -- files --output downloads
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use relaybox_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "relaybox-client")]
#[command(about = "Interactive client for the Relaybox chat relay and file server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Join the chat relay
    Chat {
        /// Server host
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Server port
        #[arg(short = 'p', long, default_value = "9000")]
        port: u16,
    },
    /// Browse and download files
    Files {
        /// Server host
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Server port
        #[arg(short = 'p', long, default_value = "9001")]
        port: u16,

        /// Directory downloads are saved to
        #[arg(short = 'o', long, default_value = "downloads")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { host, port } => {
            relaybox_client::run_chat_client(format!("{}:{}", host, port)).await
        }
        Command::Files { host, port, output } => {
            relaybox_client::run_file_client(format!("{}:{}", host, port), output).await
        }
    };

    if let Err(e) = result {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
