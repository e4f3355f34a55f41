//! Utility functions for code generation, URL validation, and request handling.
//!
//! - [`code_generator`] - Random short code generation
//! - [`url_validator`] - Absolute URL validation
//! - [`extract_host`] - Host and scheme extraction from HTTP headers

pub mod code_generator;
pub mod extract_host;
pub mod url_validator;
