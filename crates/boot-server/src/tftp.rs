//! TFTP bootloader server
//!
//! Serves boot-stage binaries by literal path, read-only, from the
//! configured bootloader root. The bootloader stage is host-independent,
//! so there is no lease lookup here.

use crate::error::BootError;
use async_tftp::server::TftpServerBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

/// Bind and serve the read-only TFTP file server.
///
/// Returning an error here (bind failure included) tears down the whole
/// boot service through the caller's `try_join`.
pub async fn serve(addr: SocketAddr, root: PathBuf) -> Result<(), BootError> {
    let tftpd = TftpServerBuilder::with_dir_ro(&root)
        .map_err(|e| BootError::Tftp(format!("invalid bootloader root {}: {e}", root.display())))?
        .bind(addr)
        .build()
        .await
        .map_err(|e| BootError::Tftp(format!("failed to bind {addr}: {e}")))?;

    info!(%addr, root = %root.display(), "TFTP bootloader server listening");

    tftpd
        .serve()
        .await
        .map_err(|e| BootError::Tftp(e.to_string()))
}
