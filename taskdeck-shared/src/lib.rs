//! # taskdeck-shared
//!
//! Shared domain layer for the taskdeck task-tracking service:
//!
//! - [`auth`]: password hashing, bearer token service, authorization gate
//! - [`db`]: PostgreSQL connection pool
//! - [`error`]: the domain error taxonomy
//! - [`models`]: account directory, credential store, task repository, watch set
//! - [`query`]: search parameter compiler (filters, sorts, pagination)

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod query;
