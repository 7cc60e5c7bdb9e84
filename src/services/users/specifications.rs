//! Reusable user queries.

use sea_orm::sea_query::{Expr, Func, LikeExpr};

use crate::infra::repositories::entities::user;
use crate::infra::{SortDirection, Specification};

pub struct SearchUsersSpecification;

impl SearchUsersSpecification {
    /// Users whose display name contains `name`, ignoring case, sorted by display name.
    pub fn by_name(name: &str) -> Specification<user::Entity> {
        let pattern = format!("%{}%", escape_like(&name.to_lowercase()));
        let display_name = Expr::col((user::Entity, user::Column::DisplayName));

        Specification::with_criteria(
            Expr::expr(Func::lower(display_name)).like(LikeExpr::new(pattern).escape('\\')),
        )
        .order_by(user::Column::DisplayName, SortDirection::Ascending)
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
