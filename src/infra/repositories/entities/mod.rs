//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

use crate::config::{DatabaseSettings, USERS_CONTEXT_NAME};
use crate::infra::context::SchemaModel;

pub mod user;

// Re-exports for public API convenience
pub use user::{ActiveModel as UserActiveModel, Entity as UserEntity, Model as UserModel};

/// Schema model of the users bounded context.
pub fn users_model(settings: &DatabaseSettings) -> SchemaModel {
    SchemaModel::builder(USERS_CONTEXT_NAME)
        .schema(settings.schema.clone())
        .entity::<user::Entity>()
        .build()
}
