//! Application services layer - Use cases and business logic.
//!
//! Use cases are requests dispatched through a pipeline of behaviors
//! (validation, transactions) to their handlers. Handlers reach the database
//! only through generic repositories resolved from the request scope.

pub mod container;
pub mod pipeline;
pub mod users;

pub use container::{Dispatch, RequestScope, Services};
pub use pipeline::{
    Request, RequestHandler, RequestKind, TransactionBehavior, ValidationBehavior,
};
