//! An example on how to use RADIUS Server
//!
//! To try it out, run
//! ```bash
//! cargo run --example simple_radius_server
//! ```


use radkit::protocol::codec::AttributeValue;
use radkit::protocol::dictionary::Dictionary;
use radkit::protocol::error::RadiusError;
use radkit::protocol::radius_packet::{ RadiusMsgType, RadiusPacket, TypeCode };
use radkit::server::{ run_server, RemoteHost, RequestHandler, Server };

use log::{ debug, info, LevelFilter };
use simple_logger::SimpleLogger;
use std::net::{ IpAddr, Ipv4Addr };


// Define your own RADIUS packet handler
//
// Returned packet is sent back to RADIUS client; in case of an error request is dropped and client
// would retry
struct Handler;

impl RequestHandler for Handler {
    fn handle_auth_request(&self, request: &RadiusPacket) -> Result<RadiusPacket, RadiusError> {
        let user_name = request.get("User-Name")?;
        let password  = request.get("User-Password")?;
        info!("Access-Request for {:?}", user_name);

        if password != Some(AttributeValue::from("fooPassword")) {
            let mut reply = request.create_reply(TypeCode::AccessReject);
            reply.add("Reply-Message", "Invalid credentials")?;
            return Ok(reply);
        }

        let mut reply = request.create_reply(TypeCode::AccessAccept);
        reply.add("Service-Type",       "Framed-User")?;
        reply.add("Framed-IP-Address",  "192.168.0.1")?;
        reply.add("Framed-IPv6-Prefix", "fc66::1/64")?;
        if request.has_message_authenticator() {
            reply.add_message_authenticator()?;
        }
        Ok(reply)
    }

    fn handle_acct_request(&self, request: &RadiusPacket) -> Result<RadiusPacket, RadiusError> {
        info!("Accounting {:?} for session {:?}", request.get("Acct-Status-Type")?, request.get("Acct-Session-Id")?);
        Ok(request.create_reply(TypeCode::AccountingResponse))
    }

    fn handle_coa_request(&self, request: &RadiusPacket) -> Result<RadiusPacket, RadiusError> {
        let mut reply = request.create_reply(TypeCode::CoAACK);
        reply.add("State", "testing")?;
        Ok(reply)
    }
}
// ------------------------

fn main() -> Result<(), RadiusError> {
    SimpleLogger::new().with_level(LevelFilter::Debug).init().unwrap();
    debug!("RADIUS Server started");

    let dictionary   = Dictionary::from_file("./dict_examples/dictionary")?;
    let remote_hosts = vec![
        RemoteHost::new(IpAddr::V4(Ipv4Addr::LOCALHOST), String::from("secret"), String::from("localhost"))
    ];

    let mut server = Server::with_dictionary(dictionary)?
        .set_server(String::from("127.0.0.1"))
        .set_port(RadiusMsgType::AUTH, 1812)
        .set_port(RadiusMsgType::ACCT, 1813)
        .set_port(RadiusMsgType::COA,  3799)
        .set_remote_hosts(remote_hosts)
        .build_server()?;

    run_server(&mut server, &Handler)?;
    debug!("RADIUS Server stopped");

    Ok(())
}
