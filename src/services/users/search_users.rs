//! Search members by display name.

use async_trait::async_trait;
use serde::Deserialize;
use validator::Validate;

use super::SearchUsersSpecification;
use crate::domain::{User, UserDto};
use crate::errors::AppResult;
use crate::infra::repositories::entities::user;
use crate::infra::Repository;
use crate::services::container::{Dispatch, RequestScope};
use crate::services::pipeline::{
    Request, RequestHandler, RequestKind, TransactionBehavior, ValidationBehavior,
};
use crate::types::{Page, PaginationParams};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SearchUsersByName {
    #[validate(length(min = 1, message = "Name must not be empty."))]
    pub name: String,
    #[serde(flatten, default)]
    pub pagination: PaginationParams,
}

impl SearchUsersByName {
    pub fn new(name: impl Into<String>, pagination: PaginationParams) -> Self {
        Self {
            name: name.into(),
            pagination,
        }
    }
}

impl Request for SearchUsersByName {
    type Response = Page<UserDto>;
    const KIND: RequestKind = RequestKind::Query;
}

pub struct SearchUsersByNameHandler {
    users: Repository<user::Entity>,
}

#[async_trait]
impl RequestHandler<SearchUsersByName> for SearchUsersByNameHandler {
    async fn handle(&self, request: SearchUsersByName) -> AppResult<Page<UserDto>> {
        let page = SearchUsersSpecification::by_name(&request.name)
            .execute_paged(
                &self.users,
                request.pagination.page(),
                request.pagination.limit(),
            )
            .await?;
        Ok(page.map(|model| UserDto::from(User::from(model))))
    }
}

impl Dispatch for SearchUsersByName {
    type Handler = ValidationBehavior<TransactionBehavior<SearchUsersByNameHandler>>;

    fn handler(scope: &RequestScope) -> AppResult<Self::Handler> {
        let users = scope.repository::<user::Entity>()?;
        let context = users.context().clone();
        Ok(ValidationBehavior::new(TransactionBehavior::new(
            SearchUsersByNameHandler { users },
            context,
        )))
    }
}
