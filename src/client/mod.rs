//! RADIUS Client implementation
//!
//! Client binds a fresh UDP socket on each *send_packet()* call and reuses it across retries of
//! that request


pub mod client;
pub use client::Client;
