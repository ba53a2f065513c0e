//! CLI command implementations
//!
//! `search` and `spec` work purely from local data, `convert` holds the
//! file tools, and `session` runs everything that talks to the programmer.

pub mod convert;
pub mod search;
pub mod session;
pub mod spec;
