//! # Profits API
//!
//! A small REST service that stores profit records (amount, name, year) in a
//! document store and exposes create, read, update and delete over HTTP.
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: Record and identifier types shared by every layer
//! - [`models`]: Request bodies and their validation rules
//! - [`db`]: Repository pattern, storage backends and the service layer
//! - [`config`]: Server settings from the environment
//! - [`http`]: Axum-based HTTP server and request handlers
//!
//! ## Storage backends
//!
//! - `local-repo`: in-memory store, used by default and in tests
//! - `postgres-repo`: Diesel + r2d2 store with embedded migrations

// RepositoryError carries rich context for debugging.
#![allow(clippy::result_large_err)]

pub mod api;
pub mod config;
pub mod db;
pub mod models;

#[cfg(feature = "http-server")]
pub mod http;
