//! Migrate command - schema migrations of the users context.

use crate::cli::args::{MigrateAction, MigrateArgs};
use crate::config::Config;
use crate::errors::AppResult;
use crate::infra::Database;

/// Execute the migrate command against the configured context's schema
pub async fn execute(args: MigrateArgs, config: Config) -> AppResult<()> {
    let settings = &config.database;
    let db = Database::connect(settings).await?;
    let context = settings.context_name.as_str();

    match args.action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            tracing::info!(context, schema = %settings.schema, "Pending migrations applied");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            tracing::info!(context, "Last migration rolled back");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            let pending = status.iter().filter(|(_, applied)| !applied).count();
            for (name, applied) in status {
                println!("{:<48} {}", name, if applied { "applied" } else { "pending" });
            }
            tracing::info!(context, pending, "Migration status listed");
        }
        MigrateAction::Fresh => {
            tracing::warn!(context, "Dropping every table of the context and re-running all migrations");
            db.fresh_migrations().await?;
            tracing::info!(context, schema = %settings.schema, "Schema recreated");
        }
    }

    Ok(())
}
