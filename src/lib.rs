//! Pure Rust implementation of RADIUS Protocol/Client/Server
//!
//! If you want to see how to build RADIUS Server or Client, a good starting point is to look
//! inside `demos/` and `tests/`


#![deny(
    missing_docs,
    rust_2018_idioms,
    unused_imports,
    dead_code
)]


pub mod client;
pub mod server;
pub mod protocol;
pub mod tools;
