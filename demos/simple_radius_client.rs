//! An example on how to use RADIUS Client
//!
//! Start `simple_radius_server` first, then run
//! ```bash
//! cargo run --example simple_radius_client
//! ```


use radkit::client::Client;
use radkit::protocol::dictionary::Dictionary;
use radkit::protocol::error::RadiusError;

use log::{ info, LevelFilter };
use simple_logger::SimpleLogger;
use std::time::Duration;


fn main() -> Result<(), RadiusError> {
    SimpleLogger::new().with_level(LevelFilter::Debug).init().unwrap();

    let dictionary = Dictionary::from_file("./dict_examples/dictionary")?;
    let client     = Client::with_dictionary(dictionary)
        .set_server(String::from("127.0.0.1"))
        .set_secret(String::from("secret"))
        .set_retries(1)
        .set_timeout(Duration::from_secs(2));

    let mut auth_packet = client.create_auth_packet();
    auth_packet.add("User-Name",          "testing")?;
    auth_packet.add("User-Password",      "fooPassword")?;
    auth_packet.add("NAS-IP-Address",     "192.168.1.10")?;
    auth_packet.add("NAS-Port-Id",        "0")?;
    auth_packet.add("Service-Type",       "Framed-User")?;
    auth_packet.add("NAS-Identifier",     "trillian")?;
    auth_packet.add("Called-Station-Id",  "00-04-5F-00-0F-D1")?;
    auth_packet.add("Calling-Station-Id", "00-01-24-80-B3-9C")?;
    auth_packet.add("Framed-IP-Address",  "10.0.0.100")?;
    auth_packet.add_message_authenticator()?;

    let reply = client.send_packet(&mut auth_packet)?;
    info!("{:?} received", reply.code());
    for attribute in reply.attributes() {
        info!("  {} = {:?}", attribute.name(), reply.get(attribute.name())?);
    }

    let mut acct_packet = client.create_acct_packet();
    acct_packet.add("User-Name",        "testing")?;
    acct_packet.add("Acct-Status-Type", "Start")?;
    acct_packet.add("Acct-Session-Id",  "trillian-0001")?;
    acct_packet.add("NAS-IP-Address",   "192.168.1.10")?;

    let reply = client.send_packet(&mut acct_packet)?;
    info!("{:?} received", reply.code());

    Ok(())
}
