//! # BuildNotBurn API Server Library
//!
//! - `app`: application state and router
//! - `billing`: hosted checkout with Stripe and Lemon Squeezy
//! - `config`: environment configuration
//! - `error`: error type and HTTP mapping
//! - `middleware`: bearer auth and security headers
//! - `routes`: route handlers

pub mod app;
pub mod billing;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
