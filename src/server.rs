//! HTTP/1.1 server loop.
//!
//! Accepts TCP connections, serves each one on its own tokio task with hyper, and hands
//! every request to the shared [`Dispatcher`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use perch::{Dispatcher, resolver::Registry, serve, table::RouteTable};
//! use tokio::net::TcpListener;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let listener = TcpListener::bind("127.0.0.1:8080").await?;
//! let dispatcher = Dispatcher::new(RouteTable::new(), Arc::new(Registry::new()));
//! serve(listener, dispatcher).await?;
//! # Ok(())
//! # }
//! ```

use std::{convert::Infallible, sync::Arc};

use hyper::{Request, body::Incoming, server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::{body::PerchBody, dispatcher::Dispatcher, types::BoxError};

/// Serves `dispatcher` on `listener` until accepting a connection fails.
pub async fn serve(listener: TcpListener, dispatcher: Dispatcher) -> Result<(), BoxError> {
    #[cfg(feature = "perch-tracing")]
    crate::tracing::init_tracing();

    let dispatcher = Arc::new(dispatcher);
    tracing::info!(addr = %listener.local_addr()?, "perch listening");

    loop {
        let (stream, addr) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let dispatcher = dispatcher.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req: Request<Incoming>| {
                let dispatcher = dispatcher.clone();
                async move {
                    let mut req = req.map(PerchBody::new);
                    req.extensions_mut().insert(addr);
                    Ok::<_, Infallible>(dispatcher.dispatch(req).await)
                }
            });

            let mut http = http1::Builder::new();
            http.keep_alive(true);

            if let Err(err) = http.serve_connection(io, svc).await {
                tracing::debug!(%addr, error = %err, "error serving connection");
            }
        });
    }
}
