//! # taskdeck API Server
//!
//! HTTP boundary of the taskdeck task-tracking service. Routes, DTO
//! validation and error-to-status mapping live here; domain logic lives in
//! `taskdeck-shared`.
//!
//! ## Architecture
//!
//! - `config` - environment-driven configuration, validated at startup
//! - `app` - application state and the Axum router
//! - `error` - the single DomainError → HTTP status mapping
//! - `routes` - one handler module per resource

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
