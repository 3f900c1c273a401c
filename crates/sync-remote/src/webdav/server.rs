//! Local WebDAV endpoint.
//!
//! Serves a directory (or an in-memory tree) over WebDAV so a deployment can
//! be exercised against a real protocol peer without a remote store.

use dav_server::{fakels::FakeLs, localfs::LocalFs, memfs::MemFs, DavHandler};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use log::{debug, error, info};
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;

/// Handle to a running endpoint. Dropping it stops the accept loop.
pub struct SnapshotDavServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl SnapshotDavServer {
    /// Get the server's listen address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL of the endpoint, with a trailing `/`.
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Shutdown the server.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for SnapshotDavServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Start a WebDAV endpoint in the background on `127.0.0.1:port` (0 picks a
/// free port).
///
/// With `root = Some(dir)` the endpoint serves `dir`; with `None` it serves
/// an empty in-memory tree.
pub async fn serve_background(root: Option<PathBuf>, port: u16) -> io::Result<SnapshotDavServer> {
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();

    let builder = DavHandler::builder().locksystem(FakeLs::new());
    let dav_server = match root {
        Some(dir) => {
            info!("Serving {} over WebDAV", dir.display());
            builder.filesystem(LocalFs::new(dir, false, false, false))
        }
        None => builder.filesystem(MemFs::new()),
    }
    .build_handler();

    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    info!("WebDAV endpoint started on http://{}", local_addr);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            debug!("Connection from {}", remote_addr);
                            let dav_server = dav_server.clone();
                            let io = TokioIo::new(stream);

                            tokio::spawn(async move {
                                if let Err(err) = http1::Builder::new()
                                    .serve_connection(
                                        io,
                                        service_fn(move |req| {
                                            let dav_server = dav_server.clone();
                                            async move {
                                                Ok::<_, Infallible>(dav_server.handle(req).await)
                                            }
                                        }),
                                    )
                                    .await
                                {
                                    error!("Connection error: {:?}", err);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {:?}", e);
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    info!("WebDAV endpoint shutting down");
                    break;
                }
            }
        }
    });

    Ok(SnapshotDavServer {
        addr: local_addr,
        shutdown_tx: Some(shutdown_tx),
    })
}

/// A [`SnapshotDavServer`] with its own runtime, for blocking callers.
pub struct LocalEndpoint {
    server: SnapshotDavServer,
    _runtime: Runtime,
}

impl LocalEndpoint {
    /// Start an endpoint on a free port. See [`serve_background`].
    pub fn start(root: Option<PathBuf>) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let server = runtime.block_on(serve_background(root, 0))?;
        Ok(Self {
            server,
            _runtime: runtime,
        })
    }

    /// Base URL of the endpoint, with a trailing `/`.
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Listen address of the endpoint.
    pub fn addr(&self) -> SocketAddr {
        self.server.addr()
    }

    /// Stop accepting connections and tear down the runtime.
    pub fn shutdown(self) {
        self.server.shutdown();
    }
}
