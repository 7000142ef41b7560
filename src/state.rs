use std::{
    ops::{Deref, DerefMut},
    sync::{Arc, Mutex as StdMutex},
};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::Key;
use diesel::{
    SqliteConnection,
    connection::TransactionManager,
    r2d2::{ConnectionManager, Pool, PooledConnection},
};
use diesel_migrations::MigrationHarness;
use tokio::task::spawn_blocking;

use crate::{MIGRATIONS, msg::Live, util_resp::FailureResponse};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

type PooledConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Everything the handlers need access to. Individual parts are extracted
/// through [`FromRef`].
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub key: Key,
    pub live: Live,
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

impl FromRef<AppState> for Live {
    fn from_ref(state: &AppState) -> Self {
        state.live.clone()
    }
}

pub fn run_migrations(pool: &DbPool) -> Result<(), String> {
    let mut conn = pool.get().map_err(|e| e.to_string())?;
    conn.run_pending_migrations(MIGRATIONS)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Slot through which an extractor hands its open transaction to
/// [`commit_transactions`].
#[derive(Clone, Default)]
struct OpenTransaction(Arc<StdMutex<Option<Arc<tokio::sync::Mutex<PooledConn>>>>>);

impl OpenTransaction {
    fn set(&self, conn: Arc<tokio::sync::Mutex<PooledConn>>) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(conn);
        }
    }

    fn take(&self) -> Option<Arc<tokio::sync::Mutex<PooledConn>>> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// This middleware commits opened transactions after each request has been
/// handled (or rolls them back if the handler did not succeed).
pub async fn commit_transactions(mut req: Request, next: Next) -> Response {
    let open = OpenTransaction::default();
    req.extensions_mut().insert(open.clone());

    let res = next.run(req).await;

    let Some(conn) = open.take() else {
        return res;
    };
    let mut conn = conn.lock().await;

    let status = res.status();
    let outcome = if status.is_success()
        || status.is_redirection()
        || status.is_informational()
    {
        <PooledConn as diesel::Connection>::TransactionManager::commit_transaction(
            &mut *conn,
        )
    } else {
        <PooledConn as diesel::Connection>::TransactionManager::rollback_transaction(
            &mut *conn,
        )
    };

    match outcome {
        Ok(()) => res,
        Err(e) => {
            tracing::error!("failed to finish transaction: {e}");
            FailureResponse::ServerError(()).into_response()
        }
    }
}

/// A database connection shared between all the extractors of one request.
///
/// `TX` selects whether a transaction is opened when the connection is first
/// taken from the pool.
#[derive(Clone)]
pub struct ThreadSafeConn<const TX: bool> {
    pub inner: Arc<tokio::sync::Mutex<PooledConn>>,
}

#[async_trait]
impl<S, const TX: bool> FromRequestParts<S> for ThreadSafeConn<TX>
where
    S: Send + Sync,
    DbPool: FromRef<S>,
{
    type Rejection = FailureResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        if let Some(conn) = parts.extensions.get::<ThreadSafeConn<TX>>() {
            return Ok(conn.clone());
        }

        let pool = DbPool::from_ref(state);
        let mut conn = spawn_blocking(move || pool.get())
            .await
            .map_err(|e| {
                tracing::error!("connection task failed: {e}");
                FailureResponse::ServerError(())
            })??;

        if TX {
            <PooledConn as diesel::Connection>::TransactionManager::begin_transaction(
                &mut conn,
            )?;
        }

        let conn = ThreadSafeConn {
            inner: Arc::new(tokio::sync::Mutex::new(conn)),
        };

        if TX {
            match parts.extensions.get::<OpenTransaction>() {
                Some(open) => open.set(conn.inner.clone()),
                None => tracing::warn!(
                    "transaction opened outside of the commit middleware"
                ),
            }
        }

        parts.extensions.insert(conn.clone());

        Ok(conn)
    }
}

pub struct Conn<const TX: bool> {
    inner: tokio::sync::OwnedMutexGuard<PooledConn>,
}

impl<const TX: bool> Deref for Conn<TX> {
    type Target = PooledConn;

    fn deref(&self) -> &Self::Target {
        self.inner.deref()
    }
}

impl<const TX: bool> DerefMut for Conn<TX> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.deref_mut()
    }
}

#[async_trait]
impl<S, const TX: bool> FromRequestParts<S> for Conn<TX>
where
    S: Send + Sync,
    DbPool: FromRef<S>,
{
    type Rejection = FailureResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let conn = ThreadSafeConn::<TX>::from_request_parts(parts, state).await?;

        // Extractors which only need the connection briefly (e.g. `User`)
        // release it before the handler runs, so it must be free here.
        let inner = conn.inner.try_lock_owned().map_err(|_| {
            tracing::error!("request connection is already locked");
            FailureResponse::ServerError(())
        })?;

        Ok(Conn { inner })
    }
}
