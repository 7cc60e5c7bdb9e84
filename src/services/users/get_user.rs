//! Look up a member by id.

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{User, UserDto};
use crate::errors::{AppResult, OptionExt};
use crate::infra::repositories::entities::user;
use crate::infra::Repository;
use crate::services::container::{Dispatch, RequestScope};
use crate::services::pipeline::{
    Request, RequestHandler, RequestKind, TransactionBehavior, ValidationBehavior,
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GetUserById {
    pub id: Uuid,
}

impl Request for GetUserById {
    type Response = UserDto;
    const KIND: RequestKind = RequestKind::Query;
}

pub struct GetUserByIdHandler {
    users: Repository<user::Entity>,
}

#[async_trait]
impl RequestHandler<GetUserById> for GetUserByIdHandler {
    async fn handle(&self, request: GetUserById) -> AppResult<UserDto> {
        let model = self.users.get_by_id(request.id).await?.ok_or_not_found()?;
        Ok(User::from(model).into())
    }
}

impl Dispatch for GetUserById {
    type Handler = ValidationBehavior<TransactionBehavior<GetUserByIdHandler>>;

    fn handler(scope: &RequestScope) -> AppResult<Self::Handler> {
        let users = scope.repository::<user::Entity>()?;
        let context = users.context().clone();
        Ok(ValidationBehavior::new(TransactionBehavior::new(
            GetUserByIdHandler { users },
            context,
        )))
    }
}
