//! Register a new member.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, Condition};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::domain::{User, UserDto};
use crate::errors::{AppError, AppResult};
use crate::infra::repositories::entities::user;
use crate::infra::Repository;
use crate::services::container::{Dispatch, RequestScope};
use crate::services::pipeline::{
    Request, RequestHandler, RequestKind, TransactionBehavior, ValidationBehavior,
};

use super::PHONE_NUMBER;

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "contact_provided", skip_on_field_errors = false))]
pub struct RegisterUser {
    #[validate(length(min = 1, message = "DisplayName must not be empty."))]
    pub display_name: String,
    #[validate(email(message = "Email is not a valid address."), length(max = 255))]
    pub email: Option<String>,
    #[validate(regex(path = *PHONE_NUMBER, message = "PhoneNumber is not valid."))]
    pub phone_number: Option<String>,
}

fn contact_provided(command: &RegisterUser) -> Result<(), ValidationError> {
    let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
    if present(&command.email) || present(&command.phone_number) {
        return Ok(());
    }
    let mut error = ValidationError::new("contact_required");
    error.message = Some("Email or PhoneNumber must be provided.".into());
    Err(error)
}

impl Request for RegisterUser {
    type Response = UserDto;
    const KIND: RequestKind = RequestKind::Command;
}

pub struct RegisterUserHandler {
    users: Repository<user::Entity>,
}

impl RegisterUserHandler {
    pub fn new(users: Repository<user::Entity>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl RequestHandler<RegisterUser> for RegisterUserHandler {
    async fn handle(&self, request: RegisterUser) -> AppResult<UserDto> {
        if let Some(email) = &request.email {
            let taken = self
                .users
                .exist(Condition::all().add(user::Column::Email.eq(email.as_str())))
                .await?;
            if taken {
                return Err(AppError::conflict("Email already in use."));
            }
        }

        if let Some(phone_number) = &request.phone_number {
            let taken = self
                .users
                .exist(Condition::all().add(user::Column::PhoneNumber.eq(phone_number.as_str())))
                .await?;
            if taken {
                return Err(AppError::conflict("PhoneNumber already in use."));
            }
        }

        let user = User::register(request.display_name, request.email, request.phone_number);
        self.users.add([user::Model::from(user.clone())]).await?;
        self.users.save_changes().await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user.into())
    }
}

impl Dispatch for RegisterUser {
    type Handler = ValidationBehavior<TransactionBehavior<RegisterUserHandler>>;

    fn handler(scope: &RequestScope) -> AppResult<Self::Handler> {
        let users = scope.repository::<user::Entity>()?;
        let context = users.context().clone();
        Ok(ValidationBehavior::new(TransactionBehavior::new(
            RegisterUserHandler::new(users),
            context,
        )))
    }
}
