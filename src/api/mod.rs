//! Free Shops admin API: transport, resource catalog and response shapes.

pub mod client;
pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod resources;
pub mod service;
pub mod types;

pub use client::HttpClient;
