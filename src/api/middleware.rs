//! Middleware modules for the API
//!
//! This module contains middleware for request correlation, logging, and other
//! cross-cutting concerns.

pub mod logging;
