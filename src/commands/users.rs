//! Users command - runs user use cases and prints the result as JSON.

use serde::Serialize;

use crate::cli::args::{UsersAction, UsersArgs};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::services::users::{GetUserById, RegisterUser, SearchUsersByName};
use crate::services::Services;
use crate::types::PaginationParams;

/// Execute the users command
pub async fn execute(args: UsersArgs, config: Config) -> AppResult<()> {
    let services = Services::connect(&config).await?;

    match args.action {
        UsersAction::Register {
            display_name,
            email,
            phone_number,
        } => {
            let user = services
                .send(RegisterUser {
                    display_name,
                    email,
                    phone_number,
                })
                .await?;
            print_json(&user)
        }
        UsersAction::Get { id } => {
            let user = services.send(GetUserById { id }).await?;
            print_json(&user)
        }
        UsersAction::Search {
            name,
            page,
            page_size,
        } => {
            let pagination =
                PaginationParams::new(page, page_size.unwrap_or(config.default_page_size));
            let page = services
                .send(SearchUsersByName::new(name, pagination))
                .await?;
            print_json(&page)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::internal(format!("Failed to render output: {}", e)))?;
    println!("{}", json);
    Ok(())
}
