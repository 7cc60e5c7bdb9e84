//! Resolving the database context that owns an entity type.

mod common;

use std::sync::Arc;

use sea_orm_migration::seaql_migrations;

use common::{employee_db, employee_db_model, services, sqlite, user_db, user_db_model, Users};
use sportnest::errors::AppError;
use sportnest::infra::{ContextRegistry, PooledContextFactory, SchemaModel};
use sportnest::services::Services;

#[tokio::test]
async fn test_same_table_name_resolves_per_entity_type() {
    let services = services().await;
    let scope = services.scope();

    let users = scope.context::<user_db::user::Entity>().unwrap();
    let employee_users = scope.context::<employee_db::user::Entity>().unwrap();
    let employees = scope.context::<employee_db::employee::Entity>().unwrap();

    assert_eq!(users.name(), "user_db");
    assert_eq!(employee_users.name(), "employee_db");
    assert!(Arc::ptr_eq(&employee_users, &employees));
    assert!(!Arc::ptr_eq(&users, &employee_users));
}

#[tokio::test]
async fn test_unregistered_entity_is_a_configuration_error() {
    let services = services().await;
    let scope = services.scope();

    match scope.context::<seaql_migrations::Entity>() {
        Err(AppError::Configuration(message)) => assert!(message.contains("seaql_migrations")),
        other => panic!("expected configuration error, got {:?}", other),
    }
    assert!(matches!(
        scope.repository::<seaql_migrations::Entity>(),
        Err(AppError::Configuration(_))
    ));
}

#[tokio::test]
async fn test_contexts_are_cached_per_scope() {
    let services = services().await;

    let scope = services.scope();
    let first = scope.context::<Users>().unwrap();
    let again = scope.context::<user_db::order::Entity>().unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(scope.resolver().opened().len(), 1);

    let other_scope = services.scope();
    let other = other_scope.context::<Users>().unwrap();
    assert!(!Arc::ptr_eq(&first, &other));
}

#[tokio::test]
async fn test_first_registration_owns_entity() {
    let shadow = SchemaModel::builder("shadow")
        .entity::<user_db::user::Entity>()
        .build();
    let registry = ContextRegistry::builder()
        .register(PooledContextFactory::new(sqlite().await, user_db_model()))
        .register(PooledContextFactory::new(sqlite().await, shadow))
        .register(PooledContextFactory::new(sqlite().await, employee_db_model()))
        .build();
    let services = Services::new(registry);

    let context = services.scope().context::<Users>().unwrap();
    assert_eq!(context.name(), "user_db");
}

#[tokio::test]
async fn test_staged_changes_stay_in_their_scope() {
    let services = services().await;

    let scope = services.scope();
    let repo = scope.repository::<Users>().unwrap();
    repo.add([common::user("Max", "A")]).await.unwrap();

    let other = services.scope().repository::<Users>().unwrap();
    assert!(repo.context().has_changes().await);
    assert!(!other.context().has_changes().await);
    assert_eq!(other.save_changes().await.unwrap(), 0);
}
