//! Member registration, lookup and search against the migrated schema.

use uuid::Uuid;

use sportnest::config::DatabaseSettings;
use sportnest::errors::AppError;
use sportnest::infra::repositories::entities::users_model;
use sportnest::infra::{ContextRegistry, Database, PooledContextFactory};
use sportnest::services::users::{GetUserById, RegisterUser, SearchUsersByName};
use sportnest::services::Services;
use sportnest::types::PaginationParams;

async fn setup() -> Services {
    let settings = DatabaseSettings::new("users", "sqlite::memory:").with_max_connections(1);
    let db = Database::connect_and_migrate(&settings).await.unwrap();
    let registry = ContextRegistry::builder()
        .register(PooledContextFactory::new(
            db.get_connection(),
            users_model(&settings),
        ))
        .build();
    Services::new(registry)
}

fn register(display_name: &str, email: Option<&str>, phone_number: Option<&str>) -> RegisterUser {
    RegisterUser {
        display_name: display_name.to_string(),
        email: email.map(str::to_string),
        phone_number: phone_number.map(str::to_string),
    }
}

#[tokio::test]
async fn test_register_then_get() {
    let services = setup().await;

    let registered = services
        .send(register("Max Mustermann", Some("max@example.com"), None))
        .await
        .unwrap();
    assert_eq!(registered.display_name, "Max Mustermann");
    assert_eq!(registered.email.as_deref(), Some("max@example.com"));
    assert!(registered.phone_number.is_none());

    let loaded = services
        .send(GetUserById { id: registered.id })
        .await
        .unwrap();
    assert_eq!(loaded.id, registered.id);
    assert_eq!(loaded.display_name, "Max Mustermann");
}

#[tokio::test]
async fn test_registered_user_matches_stored_row() {
    let services = setup().await;

    let registered = services
        .send(register("Anna", Some("anna@example.com"), None))
        .await
        .unwrap();
    let loaded = services
        .send(GetUserById { id: registered.id })
        .await
        .unwrap();

    assert_eq!(loaded.created_on, registered.created_on);
    assert_eq!(loaded, registered);
}

#[tokio::test]
async fn test_register_with_phone_only() {
    let services = setup().await;

    let registered = services
        .send(register("Anna", None, Some("+49 170 1234567")))
        .await
        .unwrap();
    assert_eq!(registered.phone_number.as_deref(), Some("+49 170 1234567"));
}

#[tokio::test]
async fn test_duplicate_contact_is_a_conflict() {
    let services = setup().await;
    services
        .send(register("Max", Some("max@example.com"), Some("0170-123")))
        .await
        .unwrap();

    let same_email = services
        .send(register("Other", Some("max@example.com"), None))
        .await;
    match same_email {
        Err(AppError::Conflict(message)) => assert_eq!(message, "Email already in use."),
        other => panic!("expected conflict, got {:?}", other),
    }

    let same_phone = services.send(register("Other", None, Some("0170-123"))).await;
    match same_phone {
        Err(AppError::Conflict(message)) => assert_eq!(message, "PhoneNumber already in use."),
        other => panic!("expected conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn test_register_validation() {
    let services = setup().await;

    let no_contact = services.send(register("Max", None, None)).await;
    match no_contact {
        Err(AppError::Validation(message)) => {
            assert!(message.contains("Email or PhoneNumber must be provided."))
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    let bad_phone = services.send(register("Max", None, Some("call me"))).await;
    assert!(matches!(bad_phone, Err(AppError::Validation(_))));

    let bad_email = services.send(register("Max", Some("not-an-email"), None)).await;
    assert!(matches!(bad_email, Err(AppError::Validation(_))));

    let no_name = services.send(register("", Some("max@example.com"), None)).await;
    assert!(matches!(no_name, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_get_unknown_user_is_not_found() {
    let services = setup().await;
    let result = services.send(GetUserById { id: Uuid::new_v4() }).await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_search_is_case_insensitive_and_paged() {
    let services = setup().await;
    for (name, email) in [
        ("Max Mustermann", "max@example.com"),
        ("maxi", "maxi@example.com"),
        ("Anna", "anna@example.com"),
    ] {
        services.send(register(name, Some(email), None)).await.unwrap();
    }

    let page = services
        .send(SearchUsersByName::new("MAX", PaginationParams::new(1, 10)))
        .await
        .unwrap();
    let names: Vec<_> = page.items().iter().map(|u| u.display_name.as_str()).collect();
    assert_eq!(names, vec!["Max Mustermann", "maxi"]);
    assert_eq!(page.total_items(), 2);

    let first = services
        .send(SearchUsersByName::new("max", PaginationParams::new(1, 1)))
        .await
        .unwrap();
    assert_eq!(first.total_pages(), 2);
    assert_eq!(first.next_page(), 2);
    assert_eq!(first.items().len(), 1);
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let services = setup().await;
    services
        .send(register("Max", Some("max@example.com"), None))
        .await
        .unwrap();

    let page = services
        .send(SearchUsersByName::new("%", PaginationParams::new(1, 10)))
        .await
        .unwrap();
    assert_eq!(page.total_items(), 0);
    assert!(page.items().is_empty());
}
