//! File-listing/download server.
//!
//! Sessions share only the read-only [`FileCatalog`]; every connection
//! streams file bodies on its own socket.

mod catalog;
mod command;
mod session;

use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use tokio::{io::BufReader, net::TcpStream};

use crate::acceptor::SessionHandler;

pub use catalog::{CatalogEntry, FileCatalog, ResolvedFile};
pub use command::FileCommand;
pub use session::{FileSession, FileTransferSession, MENU_BANNER, render_listing};

/// File server state shared by all file sessions
pub struct FileServer {
    catalog: Arc<FileCatalog>,
}

impl FileServer {
    pub fn new(catalog: FileCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }

    pub fn catalog(&self) -> &FileCatalog {
        &self.catalog
    }
}

#[async_trait]
impl SessionHandler for FileServer {
    async fn handle(&self, stream: TcpStream, peer: SocketAddr) {
        let (read_half, write_half) = stream.into_split();
        FileSession::new(
            BufReader::new(read_half),
            write_half,
            peer,
            self.catalog.clone(),
        )
        .run()
        .await;
    }
}
