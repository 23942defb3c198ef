use crate::{models::User, prelude::*};

use sqlx::{postgres::PgPoolOptions, PgPool};

pub async fn init_pg_pool(cfg: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_max_connections)
        .connect(&cfg.db_connection_url)
        .await?;

    sqlx::migrate!().run(&pool).await?;

    tracing::info!("Database migrations completed");

    return Ok(pool);
}

pub async fn init_bootstrap_admin(cfg: &Config, db: &PgPool) -> Result {
    let Some(admin) = &cfg.bootstrap_admin else {
        return Ok(());
    };

    User::ensure_staff(db, &admin.username, &admin.password).await?;

    return Ok(());
}
