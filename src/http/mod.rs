//! Hand-rolled HTTP/1.1 transport exposing the cache over TCP.

pub mod server;

pub use server::Server;
