//! SportNest - user backend on a generic repository layer
//!
//! A generic repository, specification and pagination layer over SeaORM,
//! with a resolver that routes every entity type to the database context
//! (bounded context) that owns it.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Core business entities
//! - **services**: Use cases, request pipeline and composition root
//! - **infra**: Database contexts, repositories, specifications, migrations
//! - **types**: Shared types (pages, pagination)
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Run migrations
//! cargo run -- migrate up
//!
//! # Register and search users
//! cargo run -- users register --display-name "Max" --email max@example.com
//! cargo run -- users search max --page 1 --page-size 20
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use config::Config;
pub use domain::{User, UserDto};
pub use errors::{AppError, AppResult};
pub use infra::{Repository, Specification};
pub use services::Services;
pub use types::Page;
