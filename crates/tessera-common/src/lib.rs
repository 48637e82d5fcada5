//! Common utilities for tessera
//!
//! This crate provides the error type shared by the condition compiler,
//! the value codec and the statement builder.

pub mod error;

pub use error::{TesseraError, Result};
