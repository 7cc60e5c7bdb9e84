//! Database connection and initialization.

use std::time::Duration;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseBackend, DatabaseConnection,
    DbErr, Statement,
};
use sea_orm_migration::MigratorTrait;

use crate::config::DatabaseSettings;

pub mod migrations;

pub use migrations::Migrator;

/// Database wrapper for connection management
#[derive(Clone)]
pub struct Database {
    connection: DatabaseConnection,
}

impl Database {
    /// Open the connection pool of one bounded context.
    ///
    /// On PostgreSQL the context schema is created if missing and placed on
    /// the `search_path`.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, DbErr> {
        let mut options = ConnectOptions::new(settings.url.clone());
        options
            .max_connections(settings.max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .sqlx_logging(settings.sqlx_logging);

        if !settings.is_sqlite() {
            options.set_schema_search_path(settings.schema.clone());
        }

        let connection = SeaDatabase::connect(options).await?;
        let database = Self { connection };
        database.ensure_schema(&settings.schema).await?;

        tracing::info!(
            context = %settings.context_name,
            schema = %settings.schema,
            "Database connected"
        );
        Ok(database)
    }

    /// Connect and apply pending migrations.
    pub async fn connect_and_migrate(settings: &DatabaseSettings) -> Result<Self, DbErr> {
        let database = Self::connect(settings).await?;
        database.run_migrations().await?;
        tracing::info!("Migrations applied");
        Ok(database)
    }

    async fn ensure_schema(&self, schema: &str) -> Result<(), DbErr> {
        let backend = self.connection.get_database_backend();
        if backend != DatabaseBackend::Postgres {
            return Ok(());
        }
        self.connection
            .execute(Statement::from_string(
                backend,
                format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", schema),
            ))
            .await?;
        Ok(())
    }

    /// Get a reference to the database connection.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    /// Get a clone of the database connection.
    pub fn get_connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }

    /// Run pending migrations.
    pub async fn run_migrations(&self) -> Result<(), DbErr> {
        Migrator::up(&self.connection, None).await
    }

    /// Rollback the last migration.
    pub async fn rollback_migration(&self) -> Result<(), DbErr> {
        Migrator::down(&self.connection, Some(1)).await
    }

    /// Get migration status (list all migrations with applied status).
    pub async fn migration_status(&self) -> Result<Vec<(String, bool)>, DbErr> {
        use sea_orm::{EntityTrait, QueryOrder};
        use sea_orm_migration::seaql_migrations;

        let applied: std::collections::HashSet<String> = seaql_migrations::Entity::find()
            .order_by_asc(seaql_migrations::Column::Version)
            .all(&self.connection)
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect();

        let migrations: Vec<(String, bool)> = Migrator::migrations()
            .iter()
            .map(|m| {
                let name = m.name().to_string();
                let is_applied = applied.contains(&name);
                (name, is_applied)
            })
            .collect();

        Ok(migrations)
    }

    /// Reset database and run all migrations fresh.
    pub async fn fresh_migrations(&self) -> Result<(), DbErr> {
        Migrator::fresh(&self.connection).await
    }

    /// Check database connectivity by executing a simple query.
    pub async fn ping(&self) -> Result<(), DbErr> {
        self.connection
            .execute(Statement::from_string(
                self.connection.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite() -> DatabaseSettings {
        DatabaseSettings::new("users", "sqlite::memory:").with_max_connections(1)
    }

    #[tokio::test]
    async fn test_migrations_apply_and_report_status() {
        let db = Database::connect_and_migrate(&sqlite()).await.unwrap();
        db.ping().await.unwrap();

        let status = db.migration_status().await.unwrap();
        assert_eq!(status.len(), 2);
        assert!(status.iter().all(|(_, applied)| *applied));

        db.rollback_migration().await.unwrap();
        let status = db.migration_status().await.unwrap();
        assert_eq!(status.iter().filter(|(_, applied)| *applied).count(), 1);
    }
}
