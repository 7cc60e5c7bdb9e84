//! Shared fixtures: two bounded contexts on separate in-memory SQLite databases.
#![allow(dead_code)]

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use uuid::Uuid;

use sportnest::infra::{ContextRegistry, PooledContextFactory, Repository, SchemaModel};
use sportnest::services::{RequestScope, Services};

pub mod user_db {
    pub mod user {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "users")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub id: Uuid,
            pub firstname: Option<String>,
            pub lastname: Option<String>,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {
            #[sea_orm(has_many = "super::order::Entity")]
            Orders,
        }

        impl Related<super::order::Entity> for Entity {
            fn to() -> RelationDef {
                Relation::Orders.def()
            }
        }

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod order {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "orders")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub id: Uuid,
            pub customer_id: Uuid,
            pub description: String,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {
            #[sea_orm(
                belongs_to = "super::user::Entity",
                from = "Column::CustomerId",
                to = "super::user::Column::Id"
            )]
            Customer,
        }

        impl Related<super::user::Entity> for Entity {
            fn to() -> RelationDef {
                Relation::Customer.def()
            }
        }

        impl ActiveModelBehavior for ActiveModel {}
    }
}

pub mod employee_db {
    pub mod user {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "users")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub id: Uuid,
            pub firstname: String,
            pub lastname: String,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod employee {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "employees")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub id: Uuid,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }
}

pub type Users = user_db::user::Entity;
pub type Orders = user_db::order::Entity;

pub fn user_db_model() -> SchemaModel {
    SchemaModel::builder("user_db")
        .schema("user_db")
        .entity::<user_db::user::Entity>()
        .entity::<user_db::order::Entity>()
        .build()
}

pub fn employee_db_model() -> SchemaModel {
    SchemaModel::builder("employee_db")
        .schema("employee_db")
        .entity::<employee_db::user::Entity>()
        .entity::<employee_db::employee::Entity>()
        .build()
}

/// Single-connection pool so every query sees the same in-memory database
pub async fn sqlite() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    Database::connect(options).await.unwrap()
}

/// Both test contexts registered and their tables created.
pub async fn services() -> Services {
    let registry = ContextRegistry::builder()
        .register(PooledContextFactory::new(sqlite().await, user_db_model()))
        .register(PooledContextFactory::new(sqlite().await, employee_db_model()))
        .build();
    let services = Services::new(registry);
    services.ensure_created().await.unwrap();
    services
}

/// A fresh scope and the `user_db` users repository inside it
pub async fn users() -> (Services, RequestScope, Repository<Users>) {
    let services = services().await;
    let scope = services.scope();
    let repo = scope.repository::<Users>().unwrap();
    (services, scope, repo)
}

pub fn user(firstname: &str, lastname: &str) -> user_db::user::Model {
    user_db::user::Model {
        id: Uuid::new_v4(),
        firstname: Some(firstname.to_string()),
        lastname: Some(lastname.to_string()),
    }
}

pub fn order(customer: &user_db::user::Model, description: &str) -> user_db::order::Model {
    user_db::order::Model {
        id: Uuid::new_v4(),
        customer_id: customer.id,
        description: description.to_string(),
    }
}

/// `count` users named `User{i}` with zero-padded indices, saved.
pub async fn seed_users(repo: &Repository<Users>, count: usize) -> Vec<user_db::user::Model> {
    let users: Vec<_> = (0..count)
        .map(|i| user(&format!("User{:02}", i), "Seed"))
        .collect();
    repo.add(users.clone()).await.unwrap();
    repo.save_changes().await.unwrap();
    users
}
