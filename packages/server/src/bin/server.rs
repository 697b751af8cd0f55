//! Relaybox servers: broadcast chat relay and file download server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin relaybox-server -- chat
//! cargo run --bin relaybox-server -- chat --host 127.0.0.1 --port 9000
//! cargo run --bin relaybox-server -- files --dir shared_files --seed-samples
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::{Args, Parser, Subcommand};
use relaybox_server::{
    ChatServer, ConnectionAcceptor, FileServer, FileServerConfig, ServerConfig, ServerError,
    SessionHandler,
    config::{
        DEFAULT_BACKLOG, DEFAULT_CHAT_PORT, DEFAULT_FILE_PORT, DEFAULT_HOST, DEFAULT_SHARED_DIR,
    },
    files::FileCatalog,
    signal::shutdown_signal,
};
use relaybox_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "relaybox-server")]
#[command(about = "Multi-client TCP chat relay and file server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Relay chat lines between all connected clients
    Chat {
        #[command(flatten)]
        listen: ListenArgs,
    },
    /// Serve the files of a shared directory
    Files {
        #[command(flatten)]
        listen: ListenArgs,

        /// Directory whose files are listed and served
        #[arg(short = 'd', long, default_value = DEFAULT_SHARED_DIR)]
        dir: PathBuf,

        /// Write the demo files into the shared directory before serving
        #[arg(long)]
        seed_samples: bool,
    },
}

#[derive(Args, Debug)]
struct ListenArgs {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port number to bind the server to (defaults to 9000 for chat, 9001 for files)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Listen backlog
    #[arg(long, default_value_t = DEFAULT_BACKLOG)]
    backlog: u32,
}

impl ListenArgs {
    fn into_config(self, default_port: u16) -> ServerConfig {
        ServerConfig::new(self.host, self.port.unwrap_or(default_port)).with_backlog(self.backlog)
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { listen } => run_chat(listen.into_config(DEFAULT_CHAT_PORT)).await,
        Command::Files {
            listen,
            dir,
            seed_samples,
        } => {
            let config = FileServerConfig::new(listen.into_config(DEFAULT_FILE_PORT), dir);
            run_files(config, seed_samples).await
        }
    };

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run_chat(config: ServerConfig) -> Result<(), ServerError> {
    serve(&config, ChatServer::new(), "Chat server").await
}

async fn run_files(config: FileServerConfig, seed_samples: bool) -> Result<(), ServerError> {
    let catalog = FileCatalog::new(&config.shared_dir);
    if seed_samples {
        catalog.seed_samples().await?;
    } else {
        catalog.ensure_root().await?;
    }
    tracing::info!("Shared directory: {}", catalog.root().display());

    serve(&config.server, FileServer::new(catalog), "File server").await
}

async fn serve<H: SessionHandler>(
    config: &ServerConfig,
    handler: H,
    label: &str,
) -> Result<(), ServerError> {
    let acceptor = ConnectionAcceptor::bind(config).await?;
    tracing::info!("{} listening on {}", label, acceptor.local_addr()?);
    tracing::info!("Press Ctrl+C to stop");

    acceptor.run(Arc::new(handler), shutdown_signal()).await?;

    tracing::info!("{} stopped", label);
    Ok(())
}
