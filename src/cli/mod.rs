//! CLI module - Command-line interface for the application.
//!
//! Provides commands for:
//! - `migrate` - Database migrations
//! - `users` - User registration, lookup and search

pub mod args;

pub use args::{Cli, Commands};
