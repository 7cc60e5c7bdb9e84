//! Staging inserts and saving them.

mod common;

use sea_orm::{ColumnTrait, Condition};

use common::{order, user, user_db, users, Orders};
use sportnest::errors::AppError;

#[tokio::test]
async fn test_add_single_entity() {
    let (_services, _scope, repo) = users().await;
    let max = user("Max", "Mustermann");

    assert_eq!(repo.add([max.clone()]).await.unwrap(), 1);
    assert!(repo.get_by_id(max.id).await.unwrap().is_none());

    assert_eq!(repo.save_changes().await.unwrap(), 1);
    assert_eq!(repo.get_by_id(max.id).await.unwrap(), Some(max));
}

#[tokio::test]
async fn test_add_many_entities() {
    let (_services, _scope, repo) = users().await;
    let batch = vec![user("Max", "A"), user("Anna", "B"), user("Luisa", "C")];

    repo.add(batch).await.unwrap();
    assert_eq!(repo.save_changes().await.unwrap(), 3);
    assert_eq!(repo.count(None, None).await.unwrap(), 3);
}

#[tokio::test]
async fn test_add_nothing_is_a_no_op() {
    let (_services, _scope, repo) = users().await;

    assert_eq!(repo.add(Vec::<user_db::user::Model>::new()).await.unwrap(), 0);
    assert_eq!(repo.save_changes().await.unwrap(), 0);
    assert_eq!(repo.count(None, None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_duplicate_identity_in_batch_is_a_conflict() {
    let (_services, _scope, repo) = users().await;
    let max = user("Max", "A");
    let twin = user_db::user::Model {
        firstname: Some("Anna".into()),
        ..max.clone()
    };

    repo.add([max, twin]).await.unwrap();
    let result = repo.save_changes().await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(repo.count(None, None).await.unwrap(), 0);

    // Staged changes survive the failed save until discarded
    assert!(repo.context().has_changes().await);
    repo.context().discard_changes().await;
    assert_eq!(repo.save_changes().await.unwrap(), 0);
}

#[tokio::test]
async fn test_existing_identity_conflicts_and_rolls_back_batch() {
    let (_services, _scope, repo) = users().await;
    let max = user("Max", "A");
    repo.add([max.clone()]).await.unwrap();
    repo.save_changes().await.unwrap();

    let anna = user("Anna", "B");
    repo.add([anna.clone(), max]).await.unwrap();
    let result = repo.save_changes().await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert!(repo.get_by_id(anna.id).await.unwrap().is_none());
    assert_eq!(repo.count(None, None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_added_entities_are_queryable_after_save() {
    let (_services, _scope, repo) = users().await;
    repo.add([user("Max", "A"), user("Max", "B")]).await.unwrap();
    repo.save_changes().await.unwrap();

    let named_max = Condition::all().add(user_db::user::Column::Firstname.eq("Max"));
    assert!(repo.exist(named_max.clone()).await.unwrap());
    assert_eq!(repo.list_all(Some(named_max)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_dependent_staged_before_principal() {
    let (_services, scope, repo) = users().await;
    let orders = scope.repository::<Orders>().unwrap();
    let max = user("Max", "Mustermann");
    let book = order(&max, "book");

    orders.add([book.clone()]).await.unwrap();
    repo.add([max.clone()]).await.unwrap();

    assert_eq!(repo.save_changes().await.unwrap(), 2);
    assert_eq!(repo.get_by_id(max.id).await.unwrap(), Some(max));
    assert_eq!(orders.get_by_id(book.id).await.unwrap(), Some(book));
}
