use std::sync::Arc;

use tandem::prelude::*;
use tracing_subscriber::EnvFilter;

mod http;

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_HTTP_BIND: &str = "0.0.0.0:8081";

/// The relay and its HTTP companion, bound but not yet running.
///
/// Both share one issuer: the relay only admits credentials that
/// `POST /v1/auth/anonymous` handed out.
struct Demo {
    server: TandemServer<Arc<AnonymousIssuer>, Passthrough>,
    http: tokio::net::TcpListener,
    app: axum::Router,
}

impl Demo {
    async fn bind(ws_addr: &str, http_addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let issuer = Arc::new(AnonymousIssuer::default());
        let server = TandemServerBuilder::new()
            .bind(ws_addr)
            .build(Arc::clone(&issuer), Passthrough)
            .await?;
        let app = http::router(http::AppState {
            issuer,
            relay: server.relay(),
        });
        let http = tokio::net::TcpListener::bind(http_addr).await?;
        Ok(Self { server, http, app })
    }

    async fn run(self) -> Result<(), TandemError> {
        let Demo { server, http, app } = self;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(http, app).await {
                tracing::error!(error = %e, "http server stopped");
            }
        });
        server.run().await
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind = std::env::var("TANDEM_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let http_bind =
        std::env::var("TANDEM_HTTP_BIND").unwrap_or_else(|_| DEFAULT_HTTP_BIND.to_string());

    let demo = Demo::bind(&bind, &http_bind).await?;
    tracing::info!(
        ws = %demo.server.local_addr()?,
        http = %demo.http.local_addr()?,
        "tandem server listening"
    );

    demo.run().await?;
    Ok(())
}
