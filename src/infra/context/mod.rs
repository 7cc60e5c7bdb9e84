//! Database contexts.
//!
//! A [`DbContext`] is the per-scope session over one bounded context: it owns
//! the pooled connection handle, the ambient transaction slot and the unit of
//! work that repositories stage their changes into.

use std::sync::{Arc, Mutex, PoisonError};

use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, DatabaseTransaction, EntityTrait,
    Schema, Statement, TransactionTrait,
};

use crate::errors::{AppError, AppResult};
use crate::infra::unit_of_work::UnitOfWork;

mod factory;
mod model;
mod resolver;

pub use factory::{DbContextFactory, PooledContextFactory};
pub use model::{EntityDescriptor, SchemaModel, SchemaModelBuilder};
pub use resolver::{ContextRegistry, ContextRegistryBuilder, DbContextResolver};

#[cfg(any(test, feature = "test-utils"))]
pub use factory::MockDbContextFactory;

/// Run `$body` against the context's ambient transaction when one is open,
/// otherwise against the pooled connection.
macro_rules! on_connection {
    ($ctx:expr, |$db:ident| $body:expr) => {{
        match $ctx.ambient_transaction() {
            Some(txn) => {
                let $db: &::sea_orm::DatabaseTransaction = &txn;
                $body
            }
            None => {
                let $db: &::sea_orm::DatabaseConnection = $ctx.connection();
                $body
            }
        }
    }};
}

pub(crate) use on_connection;

/// Session over one bounded context.
pub struct DbContext {
    model: Arc<SchemaModel>,
    connection: DatabaseConnection,
    transaction: Mutex<Option<Arc<DatabaseTransaction>>>,
    changes: tokio::sync::Mutex<UnitOfWork>,
}

impl std::fmt::Debug for DbContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbContext")
            .field("name", &self.model.name())
            .field("schema", &self.model.schema())
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

impl DbContext {
    pub fn new(connection: DatabaseConnection, model: Arc<SchemaModel>) -> Self {
        Self {
            model,
            connection,
            transaction: Mutex::new(None),
            changes: tokio::sync::Mutex::new(UnitOfWork::new()),
        }
    }

    pub fn name(&self) -> &str {
        self.model.name()
    }

    pub fn schema(&self) -> &str {
        self.model.schema()
    }

    pub fn model(&self) -> &Arc<SchemaModel> {
        &self.model
    }

    pub(crate) fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    /// Whether this context declares the entity type `E`.
    pub fn owns<E: EntityTrait>(&self) -> bool {
        self.model.contains::<E>()
    }

    /// Unit of work of this context
    pub(crate) fn changes(&self) -> &tokio::sync::Mutex<UnitOfWork> {
        &self.changes
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    pub(crate) fn ambient_transaction(&self) -> Option<Arc<DatabaseTransaction>> {
        self.transaction
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Open the ambient transaction every following call of this context runs in.
    pub async fn begin_transaction(&self) -> AppResult<()> {
        if self.in_transaction() {
            return Err(AppError::internal(format!(
                "context `{}` already has an open transaction",
                self.name()
            )));
        }

        let txn = self.connection.begin().await?;
        *self
            .transaction
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(txn));
        tracing::debug!(context = self.name(), "Transaction started");
        Ok(())
    }

    fn take_transaction(&self) -> AppResult<DatabaseTransaction> {
        let mut slot = self
            .transaction
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let shared = slot.take().ok_or_else(|| {
            AppError::internal(format!("context `{}` has no open transaction", self.name()))
        })?;

        Arc::try_unwrap(shared).map_err(|shared| {
            *slot = Some(shared);
            AppError::internal(format!(
                "transaction of context `{}` is still in use",
                self.name()
            ))
        })
    }

    pub async fn commit_transaction(&self) -> AppResult<()> {
        let txn = self.take_transaction()?;
        txn.commit().await?;
        tracing::debug!(context = self.name(), "Transaction committed");
        Ok(())
    }

    pub async fn rollback_transaction(&self) -> AppResult<()> {
        let txn = self.take_transaction()?;
        txn.rollback().await?;
        tracing::debug!(context = self.name(), "Transaction rolled back");
        Ok(())
    }

    // ========================================================================
    // Change tracking
    // ========================================================================

    /// Flush all staged changes in one transaction and return the number of
    /// entries written. A savepoint is used when an ambient transaction is open.
    ///
    /// On failure nothing is written and the staged changes are kept.
    pub async fn save_changes(&self) -> AppResult<usize> {
        let mut changes = self.changes.lock().await;
        if changes.is_empty() {
            return Ok(0);
        }
        changes.check_conflicts()?;

        let ambient = self.ambient_transaction();
        let txn = match &ambient {
            Some(outer) => outer.begin().await?,
            None => self.connection.begin().await?,
        };

        let stats = match changes.flush(&txn).await {
            Ok(stats) => stats,
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Rollback of staged changes failed: {}", rollback_err);
                }
                tracing::warn!(context = self.name(), error = %e, "Saving changes failed");
                return Err(e);
            }
        };
        txn.commit().await?;
        changes.clear();

        tracing::debug!(
            context = self.name(),
            written = stats.written(),
            skipped = stats.skipped,
            "Changes saved"
        );
        Ok(stats.written())
    }

    /// Drop every staged change without writing it.
    pub async fn discard_changes(&self) {
        self.changes.lock().await.clear();
    }

    pub async fn has_changes(&self) -> bool {
        !self.changes.lock().await.is_empty()
    }

    // ========================================================================
    // Schema
    // ========================================================================

    /// Create the context's schema and the tables of every owned entity if missing.
    pub async fn ensure_created(&self) -> AppResult<()> {
        let backend = self.connection.get_database_backend();

        if backend == DatabaseBackend::Postgres {
            self.connection
                .execute(Statement::from_string(
                    backend,
                    format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", self.schema()),
                ))
                .await?;
        }

        let schema = Schema::new(backend);
        for entity in self.model.entities() {
            let mut statement = entity.create_table_statement(&schema);
            statement.if_not_exists();
            self.connection.execute(backend.build(&statement)).await?;
            tracing::debug!(
                context = self.name(),
                table = entity.table_name(),
                "Table ensured"
            );
        }

        Ok(())
    }
}
