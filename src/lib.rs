//! groq-relay - Minimal chat completion relay for the Groq API
//!
//! This library provides the core functionality for the groq-relay proxy:
//! configuration loading, error mapping, and the buffered/streaming relay.

pub mod config;
pub mod error;
pub mod proxy;

pub use config::Config;
pub use error::{Error, Result};
