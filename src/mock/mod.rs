//! Local stand-ins for the remote services, for integration tests.

pub mod ssm;

use crate::utils::error::Result;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub use ssm::{router as ssm_router, ParameterTable};

/// Fixed address the standalone mock listens on.
pub const DEFAULT_SSM_MOCK_ADDR: &str = "0.0.0.0:8001";

/// A running SSM mock bound to a local port.
pub struct SsmMockServer {
    addr: SocketAddr,
    table: ParameterTable,
    handle: tokio::task::JoinHandle<()>,
}

impl SsmMockServer {
    /// Binds `addr` (use port 0 for an ephemeral port) and serves in the background.
    pub async fn start(addr: &str, table: ParameterTable) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let app = ssm_router(table.clone());

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("SSM mock server stopped: {}", e);
            }
        });

        tracing::info!("Starting AWS SSM HTTP mocking server on {}", addr);
        Ok(Self { addr, table, handle })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn table(&self) -> &ParameterTable {
        &self.table
    }
}

impl Drop for SsmMockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serves the mock on `addr` until the process is stopped.
pub async fn serve_ssm(addr: &str, table: ParameterTable) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Starting AWS SSM HTTP mocking server on {}", listener.local_addr()?);
    axum::serve(listener, ssm_router(table)).await?;
    Ok(())
}
