//! RADIUS Server implementation
//!
//! Server is built on top of `mio`: it polls Auth & Acct (and optionally CoA) sockets and passes
//! verified requests to user's [RequestHandler](server::RequestHandler)


pub mod server;
pub use server::{ run_server, RemoteHost, RequestHandler, Server };
