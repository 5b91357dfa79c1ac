//! # Container host migration tool
//!
//! This crate implements `atomic-migrate`, which captures the persistent
//! state of a container engine host (images, containers and volumes) into
//! a directory so that it can be archived or moved to another host.

// See https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![forbid(unused_must_use)]
#![deny(unsafe_code)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::todo)]

mod archive;
pub mod cli;
mod config;
mod engine;
mod error;
mod export;
mod prompt;
mod utils;

#[cfg(test)]
mod fixture;
