//! User use cases.

use once_cell::sync::Lazy;
use regex::Regex;

mod get_user;
mod register_user;
mod search_users;
mod specifications;

pub use get_user::{GetUserById, GetUserByIdHandler};
pub use register_user::{RegisterUser, RegisterUserHandler};
pub use search_users::{SearchUsersByName, SearchUsersByNameHandler};
pub use specifications::SearchUsersSpecification;

/// Digits with optional leading `+` and single spaces, dashes or slashes between groups
static PHONE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]+(?:[ \-/][0-9]+)*$").expect("static regex compile"));
