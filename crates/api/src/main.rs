use std::sync::Arc;

use anyhow::Context;

use gatekeep_api::app::{build_app, users::StaticUsers};
use gatekeep_api::session::{DEFAULT_SESSION_IDLE, SessionRegistry};
use gatekeep_auth::{AuthSettings, EnvConfig, parse_duration};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gatekeep_observability::init();

    let settings = AuthSettings::from_source(&EnvConfig).context("loading gate settings")?;

    let users = std::env::var("GATEKEEP_USERS").unwrap_or_default();
    let users = StaticUsers::parse(&users).context("parsing GATEKEEP_USERS")?;
    if users.is_empty() {
        tracing::warn!("GATEKEEP_USERS is empty; nobody can log in");
    }

    let idle = match std::env::var("GATEKEEP_SESSION_IDLE") {
        Ok(raw) => parse_duration(&raw).context("parsing GATEKEEP_SESSION_IDLE")?,
        Err(_) => DEFAULT_SESSION_IDLE,
    };

    let app = build_app(&settings, Arc::new(users), SessionRegistry::with_idle_timeout(idle))?;

    let bind = std::env::var("GATEKEEP_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
