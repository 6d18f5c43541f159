//! Test utilities and helpers
//!
//! This module provides common utilities for tests to avoid duplication
//! and prevent issues like multiple tracing initializations.

use once_cell::sync::Lazy;

/// Tracing setup shared by every test in the process
static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "error");
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter("error")
        .with_test_writer()
        .try_init();
});

/// Initialize the test environment once for all tests
pub fn init_test_env() {
    Lazy::force(&TRACING);
}
