//! User database entity for SeaORM.

use sea_orm::entity::prelude::*;
use sea_orm::Set;

use crate::domain::User;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub display_name: String,
    #[sea_orm(unique)]
    pub email: Option<String>,
    #[sea_orm(unique)]
    pub phone_number: Option<String>,
    pub created_on: DateTimeUtc,
    pub updated_on: DateTimeUtc,
    pub deleted_on: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

/// Missing timestamps are stamped on insert; `updated_on` is refreshed on every update.
#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now();
        if insert {
            // keep timestamps assigned by the domain
            if !self.created_on.is_set() {
                self.created_on = Set(now);
            }
            if !self.updated_on.is_set() {
                self.updated_on = Set(now);
            }
        } else {
            self.updated_on = Set(now);
        }
        Ok(self)
    }
}

/// Convert database model to domain entity
impl From<Model> for User {
    fn from(model: Model) -> Self {
        User {
            id: model.id,
            display_name: model.display_name,
            email: model.email,
            phone_number: model.phone_number,
            created_on: model.created_on,
            updated_on: model.updated_on,
            deleted_on: model.deleted_on,
        }
    }
}

impl From<User> for Model {
    fn from(user: User) -> Self {
        Model {
            id: user.id,
            display_name: user.display_name,
            email: user.email,
            phone_number: user.phone_number,
            created_on: user.created_on,
            updated_on: user.updated_on,
            deleted_on: user.deleted_on,
        }
    }
}
