//! JSON admin console over every table.

pub mod grids;
pub mod handlers;

use sqlx::PgPool;
use tracing::info;

use crate::auth::password::hash_password;
use crate::config::Config;

/// Creates the configured superuser once, when both credentials are set.
pub async fn bootstrap_superuser(db: &PgPool, config: &Config) -> anyhow::Result<()> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };

    let hash = hash_password(password).map_err(|e| anyhow::anyhow!("{e}"))?;
    let inserted = sqlx::query(
        r#"
        INSERT INTO admin_users (username, password, is_superuser)
        VALUES ($1, $2, TRUE)
        ON CONFLICT (username) DO NOTHING
        "#,
    )
    .bind(username)
    .bind(hash)
    .execute(db)
    .await?
    .rows_affected();

    if inserted > 0 {
        info!("Created superuser '{}'", username);
    }
    Ok(())
}
