//! Protocol implementation
//!
//! `dictionary` module - represents RADIUS dictionary, that holds all attributes, values & vendors
//! which are to be used by RADIUS Client & Server
//! `codec` module - converts typed attribute values to wire bytes and back
//! `auth` module - password hiding, authenticators & Message-Authenticator
//! `radius_packet` module - represents an actual RADIUS packet, that is to be sent from RADIUS
//! Client to RADIUS Server and/or RADIUS Server to RADIUS Client
//! `host`  module - represents Host structure, that contains shared code for RADIUS Client &
//! Server
//! `error` module - represents custom errors defined for `radkit` crate


pub mod auth;
pub mod codec;
pub mod dictionary;
pub mod error;
pub mod host;
pub mod radius_packet;
