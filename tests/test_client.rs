use radkit::client::Client;
use radkit::protocol::codec::AttributeValue;
use radkit::protocol::dictionary::Dictionary;
use radkit::protocol::error::RadiusError;
use radkit::protocol::radius_packet::{ RadiusMsgType, RadiusPacket, TypeCode };
use radkit::server::{ RemoteHost, RequestHandler, Server };

use std::net::{ IpAddr, Ipv4Addr, UdpSocket };
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;
use std::thread;
use std::time::{ Duration, Instant };


struct TestHandler;

impl RequestHandler for TestHandler {
    fn handle_auth_request(&self, request: &RadiusPacket) -> Result<RadiusPacket, RadiusError> {
        let accepted = request.get("User-Password")? == Some(AttributeValue::from("fooPassword"));
        let mut reply = request.create_reply(if accepted { TypeCode::AccessAccept } else { TypeCode::AccessReject });
        if accepted {
            reply.add("Reply-Message", "Welcome")?;
        }
        Ok(reply)
    }

    fn handle_acct_request(&self, request: &RadiusPacket) -> Result<RadiusPacket, RadiusError> {
        Ok(request.create_reply(TypeCode::AccountingResponse))
    }
}

struct RunningServer {
    auth_port: u16,
    acct_port: u16,
    stop:      Arc<AtomicBool>,
    handle:    Option<thread::JoinHandle<()>>
}

impl RunningServer {
    fn start(dictionary: Arc<Dictionary>) -> RunningServer {
        let mut server = Server::with_dictionary(dictionary).unwrap()
            .set_server(String::from("127.0.0.1"))
            .set_port(RadiusMsgType::AUTH, 0)
            .set_port(RadiusMsgType::ACCT, 0)
            .set_remote_hosts(vec![RemoteHost::new(IpAddr::V4(Ipv4Addr::LOCALHOST), String::from("secret"), String::from("localhost"))])
            .build_server().unwrap();

        let auth_port = server.local_addr(RadiusMsgType::AUTH).unwrap().port();
        let acct_port = server.local_addr(RadiusMsgType::ACCT).unwrap().port();
        let stop      = Arc::new(AtomicBool::new(false));

        let thread_stop = Arc::clone(&stop);
        let handle      = thread::spawn(move || {
            while !thread_stop.load(Ordering::SeqCst) {
                server.process_events(&TestHandler, Some(Duration::from_millis(100))).unwrap();
            }
        });

        RunningServer { auth_port, acct_port, stop, handle: Some(handle) }
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn dictionary() -> Arc<Dictionary> {
    Arc::new(Dictionary::from_file("./dict_examples/dictionary").unwrap())
}

fn client(dictionary: &Arc<Dictionary>, server: &RunningServer) -> Client {
    Client::with_dictionary(Arc::clone(dictionary))
        .set_server(String::from("127.0.0.1"))
        .set_secret(String::from("secret"))
        .set_port(RadiusMsgType::AUTH, server.auth_port)
        .set_port(RadiusMsgType::ACCT, server.acct_port)
        .set_retries(2)
        .set_timeout(Duration::from_secs(2))
}


// Test RADIUS Client against RADIUS Server
#[test]
#[cfg_attr(miri, ignore)]
fn test_client_auth_request_is_accepted() {
    let dictionary = dictionary();
    let server     = RunningServer::start(Arc::clone(&dictionary));
    let client     = client(&dictionary, &server);

    let mut packet = client.create_auth_packet();
    packet.add("User-Name",      "testing").unwrap();
    packet.add("User-Password",  "fooPassword").unwrap();
    packet.add("NAS-IP-Address", "192.168.1.10").unwrap();
    packet.add("Service-Type",   "Login-User").unwrap();

    let reply = client.send_packet(&mut packet).unwrap();
    assert_eq!(TypeCode::AccessAccept,                  *reply.code());
    assert_eq!(packet.id(),                             reply.id());
    assert_eq!(Some(AttributeValue::from("Welcome")),   reply.get("Reply-Message").unwrap());
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_client_auth_request_is_rejected() {
    let dictionary = dictionary();
    let server     = RunningServer::start(Arc::clone(&dictionary));
    let client     = client(&dictionary, &server);

    let mut packet = client.create_auth_packet();
    packet.add("User-Name",     "testing").unwrap();
    packet.add("User-Password", "barPassword").unwrap();
    packet.add_message_authenticator().unwrap();

    let reply = client.send_packet(&mut packet).unwrap();
    assert_eq!(TypeCode::AccessReject, *reply.code());
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_client_acct_request() {
    let dictionary = dictionary();
    let server     = RunningServer::start(Arc::clone(&dictionary));
    let client     = client(&dictionary, &server);

    let mut packet = client.create_acct_packet();
    packet.add("User-Name",        "testing").unwrap();
    packet.add("Acct-Status-Type", "Start").unwrap();
    packet.add("Acct-Session-Id",  "session-1").unwrap();
    packet.add("NAS-Port",         0u32).unwrap();

    let reply = client.send_packet(&mut packet).unwrap();
    assert_eq!(TypeCode::AccountingResponse, *reply.code());
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_client_with_wrong_secret_times_out() {
    let dictionary = dictionary();
    let server     = RunningServer::start(Arc::clone(&dictionary));
    let client     = client(&dictionary, &server)
        .set_secret(String::from("wrong"))
        .set_retries(1)
        .set_timeout(Duration::from_millis(300));

    let mut packet = client.create_acct_packet();
    packet.add("Acct-Status-Type", "Stop").unwrap();

    match client.send_packet(&mut packet) {
        Err(RadiusError::TimeoutError { retries }) => assert_eq!(1, retries),
        other                                      => panic!("unexpected result: {:?}", other)
    }
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_client_retries_silent_server() {
    let dictionary  = dictionary();
    let silent      = UdpSocket::bind("127.0.0.1:0").unwrap();
    let silent_port = silent.local_addr().unwrap().port();

    let client = Client::with_dictionary(Arc::clone(&dictionary))
        .set_server(String::from("127.0.0.1"))
        .set_secret(String::from("secret"))
        .set_port(RadiusMsgType::ACCT, silent_port)
        .set_retries(3)
        .set_timeout(Duration::from_millis(100));

    let mut packet = client.create_acct_packet();
    packet.add("Acct-Status-Type", "Interim-Update").unwrap();
    packet.add("Acct-Delay-Time",  0u32).unwrap();

    let started = Instant::now();
    match client.send_packet(&mut packet) {
        Err(RadiusError::TimeoutError { retries }) => assert_eq!(3, retries),
        other                                      => panic!("unexpected result: {:?}", other)
    }
    assert!(started.elapsed() >= Duration::from_millis(300));

    silent.set_nonblocking(true).unwrap();
    let mut buffer = [0u8; 4096];
    let mut delays = Vec::new();
    while let Ok(amount) = silent.recv(&mut buffer) {
        let request = RadiusPacket::from_bytes(Arc::clone(&dictionary), "secret", &buffer[..amount]).unwrap();
        assert!(request.verify_acct_request().is_ok());
        delays.push(request.get("Acct-Delay-Time").unwrap());
    }

    let expected: Vec<Option<AttributeValue>> = vec![0, 1, 2].into_iter().map(|delay| Some(AttributeValue::Integer(delay))).collect();
    assert_eq!(expected, delays);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_client_skips_stray_replies() {
    let dictionary = dictionary();
    let nas_facing = UdpSocket::bind("127.0.0.1:0").unwrap();
    let foreign    = UdpSocket::bind("127.0.0.1:0").unwrap();
    let auth_port  = nas_facing.local_addr().unwrap().port();
    nas_facing.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

    let server_dictionary = Arc::clone(&dictionary);
    let responder         = thread::spawn(move || {
        let mut buffer          = [0u8; 4096];
        let (amount, requester) = nas_facing.recv_from(&mut buffer).unwrap();
        let request             = RadiusPacket::from_bytes(Arc::clone(&server_dictionary), "secret", &buffer[..amount]).unwrap();

        let mut wrong_id = request.create_reply(TypeCode::AccessAccept);
        wrong_id.override_id(request.id().wrapping_add(1));
        nas_facing.send_to(&wrong_id.reply_packet().unwrap(), requester).unwrap();

        let mut forged = request.create_reply(TypeCode::AccessAccept).reply_packet().unwrap();
        forged[4] ^= 0xff;
        nas_facing.send_to(&forged, requester).unwrap();

        foreign.send_to(&request.create_reply(TypeCode::AccessAccept).reply_packet().unwrap(), requester).unwrap();

        let mut genuine = request.create_reply(TypeCode::AccessReject);
        genuine.add("Reply-Message", "Go away").unwrap();
        nas_facing.send_to(&genuine.reply_packet().unwrap(), requester).unwrap();
    });

    let client = Client::with_dictionary(Arc::clone(&dictionary))
        .set_server(String::from("127.0.0.1"))
        .set_secret(String::from("secret"))
        .set_port(RadiusMsgType::AUTH, auth_port)
        .set_retries(1)
        .set_timeout(Duration::from_secs(2));

    let mut packet = client.create_auth_packet();
    packet.add("User-Name",     "testing").unwrap();
    packet.add("User-Password", "fooPassword").unwrap();

    let reply = client.send_packet(&mut packet).unwrap();
    responder.join().unwrap();

    assert_eq!(TypeCode::AccessReject,                 *reply.code());
    assert_eq!(packet.id(),                            reply.id());
    assert_eq!(Some(AttributeValue::from("Go away")),  reply.get("Reply-Message").unwrap());
}

#[test]
fn test_client_without_port_for_code() {
    let client     = Client::with_dictionary(dictionary()).set_server(String::from("127.0.0.1"));
    let mut packet = client.create_packet(TypeCode::AccessAccept);

    assert!(matches!(client.send_packet(&mut packet), Err(RadiusError::MalformedPacketError { .. })));
}
