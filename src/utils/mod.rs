//! Small shared helpers.

pub mod http;
