//! Built-in grammars.
//!
//! Each grammar is plain Rust that builds a [`crate::Language`] through the
//! public builders; nothing here is privileged. The CLI and the top-level
//! [`crate::parse`] functions run against [`sample`].

#[path = "grammars/sample/mod.rs"]
pub mod sample;
