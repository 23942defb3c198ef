use crate::prelude::*;

use std::time::Duration;

use sqlx::PgPool;
use tower_sessions::{CachingSessionStore, ExpiredDeletion, MokaStore, PostgresStore};

const SESSION_CACHE_CAPACITY: u64 = 2000;
const EXPIRED_SESSION_SWEEP_PERIOD: Duration = Duration::from_secs(60 * 60);

pub async fn init_session_store(db: PgPool) -> Result<CachingSessionStore<MokaStore, PostgresStore>> {
    let db_session_store = PostgresStore::new(db);
    db_session_store.migrate().await?;

    spawn_expired_session_sweep(db_session_store.clone());

    let mem_session_store = MokaStore::new(Some(SESSION_CACHE_CAPACITY));

    return Ok(CachingSessionStore::new(
        mem_session_store,
        db_session_store,
    ));
}

fn spawn_expired_session_sweep(store: PostgresStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(EXPIRED_SESSION_SWEEP_PERIOD);

        loop {
            interval.tick().await;

            if let Err(e) = store.delete_expired().await {
                tracing::warn!("Failed to delete expired sessions: {e}");
            }
        }
    });
}
