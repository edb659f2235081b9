//! Admin client for the Free Shops marketplace API.
//!
//! [`admin::AdminClient`] is the entry point: resource reads are served from
//! an in-memory query cache and writes invalidate what they affect. The
//! `fsadmin` binary wraps it in a command-line interface.

pub mod admin;
pub mod api;
pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod db;
pub mod logging;
pub mod output;
pub mod session;
