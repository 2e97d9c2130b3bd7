//! Server lifecycle: bind, serve, shut down.

use std::future::IntoFuture;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use gateway_config::ServerSettings;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::{routes::create_router, state::AppState};

/// HTTP server for the gateway
pub struct Server {
    settings: ServerSettings,
    state: AppState,
}

impl Server {
    /// Create a server from settings and prepared state
    #[must_use]
    pub fn new(settings: ServerSettings, state: AppState) -> Self {
        Self { settings, state }
    }

    /// Bind and serve until a shutdown signal arrives.
    ///
    /// Open streams get `shutdown_timeout` to finish after the signal;
    /// whatever is still running then is dropped.
    pub async fn run(self) -> io::Result<()> {
        let address = self.settings.bind_address();
        let listener = TcpListener::bind(&address).await?;
        info!(address = %listener.local_addr()?, "Gateway listening");

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let grace = self.settings.shutdown_timeout;
        let draining = Arc::new(Notify::new());
        let notify = draining.clone();

        let server = axum::serve(listener, create_router(self.state))
            .with_graceful_shutdown(async move {
                shutdown.await;
                notify.notify_one();
            })
            .into_future();

        tokio::select! {
            result = server => result?,
            () = drain_deadline(draining, grace) => {
                warn!(timeout = ?grace, "Open streams did not finish in time, shutting down");
            }
        }

        info!("Gateway stopped");
        Ok(())
    }
}

async fn drain_deadline(draining: Arc<Notify>, grace: Duration) {
    draining.notified().await;
    tokio::time::sleep(grace).await;
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        "ctrl+c"
    };

    #[cfg(unix)]
    let sigterm = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
        "sigterm"
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<&str>();

    let signal_name = tokio::select! {
        name = ctrl_c => name,
        name = sigterm => name,
    };

    info!(signal = signal_name, "Received shutdown signal");
}
