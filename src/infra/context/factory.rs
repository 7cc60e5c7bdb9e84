//! Factories that hand out database contexts for one bounded context.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use super::{DbContext, SchemaModel};
use crate::config::DatabaseSettings;
use crate::errors::AppResult;
use crate::infra::db::Database;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Creates [`DbContext`]s for one bounded context.
///
/// Registered once per bounded context in a
/// [`ContextRegistry`](super::ContextRegistry).
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait DbContextFactory: Send + Sync {
    /// Entity types owned by the contexts this factory creates
    fn model(&self) -> Arc<SchemaModel>;

    /// Fresh context with its own unit of work and transaction slot
    fn create_context(&self) -> Arc<DbContext>;
}

/// Factory sharing one connection pool between every context it creates.
#[derive(Debug, Clone)]
pub struct PooledContextFactory {
    connection: DatabaseConnection,
    model: Arc<SchemaModel>,
}

impl PooledContextFactory {
    pub fn new(connection: DatabaseConnection, model: SchemaModel) -> Self {
        Self {
            connection,
            model: Arc::new(model),
        }
    }

    /// Open the pool described by `settings` for `model`.
    pub async fn connect(settings: &DatabaseSettings, model: SchemaModel) -> AppResult<Self> {
        let database = Database::connect(settings).await?;
        Ok(Self::new(database.get_connection(), model))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }
}

impl DbContextFactory for PooledContextFactory {
    fn model(&self) -> Arc<SchemaModel> {
        self.model.clone()
    }

    fn create_context(&self) -> Arc<DbContext> {
        Arc::new(DbContext::new(self.connection.clone(), self.model.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::repositories::entities::user;

    #[test]
    fn test_every_context_gets_its_own_session() {
        let model = SchemaModel::builder("users")
            .entity::<user::Entity>()
            .build();
        let factory = PooledContextFactory::new(DatabaseConnection::Disconnected, model);

        let first = factory.create_context();
        let second = factory.create_context();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(first.model(), second.model()));
        assert!(first.owns::<user::Entity>());
    }
}
