//! Entry point for the build engine server.
//!
//! Running this binary starts an HTTP server exposing the configuration
//! API.  The directory of profile JSON files may be set with the
//! `PCBUILD_PROFILE_DIR` environment variable and the bind address with
//! `PCBUILD_BIND_ADDR`; see [`pcbuild_engine::config::Settings`].  Log
//! output is filtered through `RUST_LOG`.

use pcbuild_engine::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pcbuild_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env();
    if let Err(err) = pcbuild_engine::api::serve(&settings).await {
        tracing::error!(error = %err, "server stopped");
        return Err(err);
    }
    Ok(())
}
