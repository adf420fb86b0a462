//! Configuration module for the procurelens client.

// Can all be private now because we have a public re-export.
mod backend;
mod client;
mod debug;
mod persistence;
mod stream;

pub use backend::{BACKEND, routes};
pub use client::{ClientConfig, StreamSettings};
pub use debug::DF;
pub use persistence::{PERSISTENCE, storage_key};
pub use stream::STREAM;
