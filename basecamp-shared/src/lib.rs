//! # Basecamp Shared Library
//!
//! This crate contains the domain types and the authenticated-request pipeline
//! shared by the Basecamp API server and its tests.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their sqlx queries
//! - `store`: Relational store seam (`Store` trait, Postgres and in-memory backends)
//! - `auth`: Identity verification, local user resolution and the auth gate
//! - `db`: Connection pooling and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod store;

/// Current version of the Basecamp shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
