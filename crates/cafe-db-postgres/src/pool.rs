//! Connection pool construction.

use sqlx_core::pool::PoolOptions;
use sqlx_postgres::{PgPool, Postgres};
use tracing::{debug, info, instrument};

use crate::config::PostgresConfig;
use crate::error::{PostgresError, Result};

#[instrument(skip(config), fields(url = %redact_url(&config.url)))]
pub async fn create_pool(config: &PostgresConfig) -> Result<PgPool> {
    config.validate().map_err(PostgresError::config)?;

    info!(
        pool_size = config.pool_size,
        min_connections = config.min_connections(),
        "Opening PostgreSQL pool"
    );

    let mut options = PoolOptions::<Postgres>::new()
        .max_connections(config.pool_size)
        .min_connections(config.min_connections())
        .acquire_timeout(config.connect_timeout());
    if let Some(idle) = config.idle_timeout() {
        options = options.idle_timeout(idle);
    }

    let pool = options.connect(&config.url).await?;
    debug!("PostgreSQL pool ready");
    Ok(pool)
}

/// Hides the password part of a connection URL so it can be logged.
pub(crate) fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://").map(|p| p + 3) else {
        return url.to_string();
    };
    let Some(at) = url[scheme_end..].find('@').map(|p| p + scheme_end) else {
        return url.to_string();
    };
    match url[scheme_end..at].find(':') {
        Some(colon) => format!("{}:***{}", &url[..scheme_end + colon], &url[at..]),
        None => url.to_string(),
    }
}
