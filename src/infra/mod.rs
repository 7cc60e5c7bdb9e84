//! Infrastructure layer - External systems integration
//!
//! - Database connections, migrations and bounded-context sessions
//! - Generic repositories and specifications
//! - Unit of Work for staged changes

pub mod context;
pub mod db;
pub mod repositories;
pub mod unit_of_work;

pub use context::{
    ContextRegistry, DbContext, DbContextFactory, DbContextResolver, PooledContextFactory,
    SchemaModel,
};
pub use db::{Database, Migrator};
pub use repositories::{Repository, SetExpression, SortDirection, Specification};
pub use unit_of_work::{EntryState, FlushStats, UnitOfWork};

#[cfg(any(test, feature = "test-utils"))]
pub use context::MockDbContextFactory;
