//! Repository layer - Data access abstraction
//!
//! A single generic [`Repository`] serves every entity type. Queries are
//! composed from SeaORM conditions or from reusable [`Specification`]s.

pub mod entities;
mod evaluator;
mod repository;
mod specification;

pub use evaluator::SpecificationEvaluator;
pub use repository::{Repository, SetExpression};
pub use specification::{Include, SortDirection, Specification};
