//! RADIUS Generic Server implementation


use crate::protocol::dictionary::Dictionary;
use crate::protocol::error::RadiusError;
use crate::protocol::host::Host;
use crate::protocol::radius_packet::{ RadiusMsgType, RadiusPacket, TypeCode, MAX_PACKET_LENGTH };

use log::{ debug, info, warn };
use mio::net::UdpSocket;
use mio::{ Events, Interest, Poll, Token };
use std::any::Any;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{ IpAddr, SocketAddr, ToSocketAddrs };
use std::panic::{ self, AssertUnwindSafe };
use std::sync::Arc;
use std::time::Duration;


const EVENTS_CAPACITY: usize = 1024;


#[derive(Debug, Clone, PartialEq)]
/// Represents RADIUS client (NAS), that server accepts requests from
pub struct RemoteHost {
    address: IpAddr,
    secret:  String,
    name:    String
}

impl RemoteHost {
    /// Creates remote host entry
    pub fn new(address: IpAddr, secret: String, name: String) -> RemoteHost {
        RemoteHost { address, secret, name }
    }

    /// Returns IP address of remote host
    pub fn address(&self) -> &IpAddr {
        &self.address
    }

    /// Returns secret shared with remote host
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Returns name of remote host
    pub fn name(&self) -> &str {
        &self.name
    }
}


/// This trait is to be implemented by user, to resolve AUTH, ACCT or CoA RADIUS requests
///
/// Request is already decoded and verified; returned packet is encoded with
/// [RadiusPacket::reply_packet] and sent back to the requester. Returned error or panic drops the
/// request; server keeps serving other requests.
pub trait RequestHandler {
    /// Function is responsible for resolving Access-Request (and Status-Server)
    ///
    /// For example see `demos/simple_radius_server.rs`
    fn handle_auth_request(&self, request: &RadiusPacket) -> Result<RadiusPacket, RadiusError>;

    /// Function is responsible for resolving Accounting-Request
    ///
    /// For example see `demos/simple_radius_server.rs`
    fn handle_acct_request(&self, request: &RadiusPacket) -> Result<RadiusPacket, RadiusError>;

    /// Function is responsible for resolving CoA-Request & Disconnect-Request
    fn handle_coa_request(&self, request: &RadiusPacket) -> Result<RadiusPacket, RadiusError> {
        Err(RadiusError::ValidationError { error: format!("{:?} is not supported by this server", request.code()) })
    }
}


#[derive(Debug)]
/// Represents RADIUS Generic Server instance
pub struct Server {
    host:         Host,
    server:       String,
    remote_hosts: HashMap<IpAddr, RemoteHost>,
    coa_enabled:  bool,
    socket_poll:  Poll,
    sockets:      HashMap<RadiusMsgType, UdpSocket>
}

impl Server {
    /// Exists to allow mapping between AUTH socket and AUTH requests processing
    pub const AUTH_SOCKET: Token = Token(1);
    /// Exists to allow mapping between ACCT socket and ACCT requests processing
    pub const ACCT_SOCKET: Token = Token(2);
    /// Exists to allow mapping between CoA socket and CoA requests processing
    pub const COA_SOCKET:  Token = Token(3);

    // === Builder for Server ===
    /// Initialise Server instance with dictionary (other fields would be set to default values)
    ///
    /// To be called **first** when creating RADIUS Server instance
    pub fn with_dictionary<D: Into<Arc<Dictionary>>>(dictionary: D) -> Result<Server, RadiusError> {
        Ok(Server {
            host:         Host::with_dictionary(dictionary),
            server:       String::from("0.0.0.0"),
            remote_hosts: HashMap::new(),
            coa_enabled:  false,
            socket_poll:  Poll::new()?,
            sockets:      HashMap::with_capacity(3)
        })
    }

    /// **Optional**
    ///
    /// Sets address to which server would bind, otherwise `0.0.0.0` is used
    pub fn set_server(mut self, server: String) -> Server {
        self.server = server;
        self
    }

    /// **Optional**
    ///
    /// Sets port, that server listens on for specific RADIUS Message Type; setting CoA port also
    /// enables CoA socket, which is not bound otherwise
    pub fn set_port(mut self, msg_type: RadiusMsgType, port: u16) -> Server {
        if msg_type == RadiusMsgType::COA {
            self.coa_enabled = true;
        }
        self.host.set_port(msg_type, port);
        self
    }

    /// **Required**
    ///
    /// Sets remote hosts, from where Server would be allowed to accept RADIUS requests
    pub fn set_remote_hosts(mut self, remote_hosts: Vec<RemoteHost>) -> Server {
        self.remote_hosts = remote_hosts.into_iter().map(|host| (host.address, host)).collect();
        self
    }

    /// **Required**
    ///
    /// Binds sockets and registers them for polling
    pub fn build_server(mut self) -> Result<Server, RadiusError> {
        self.bind_socket(RadiusMsgType::AUTH, Server::AUTH_SOCKET)?;
        self.bind_socket(RadiusMsgType::ACCT, Server::ACCT_SOCKET)?;
        if self.coa_enabled {
            self.bind_socket(RadiusMsgType::COA, Server::COA_SOCKET)?;
        }
        Ok(self)
    }
    // ===================

    /// Adds (or replaces) remote host, that server accepts requests from
    pub fn add_remote_host(&mut self, remote_host: RemoteHost) {
        self.remote_hosts.insert(remote_host.address, remote_host);
    }

    /// Returns remote hosts
    pub fn remote_hosts(&self) -> &HashMap<IpAddr, RemoteHost> {
        &self.remote_hosts
    }

    /// Returns address, that server binds to
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Returns port, that server listens on for given request code
    pub fn port(&self, code: &TypeCode) -> Option<u16> {
        self.host.port(code)
    }

    /// Returns server's dictionary
    pub fn dictionary(&self) -> &Arc<Dictionary> {
        self.host.dictionary()
    }

    /// Returns local address of bound socket (handy when server was configured with port 0)
    pub fn local_addr(&self, msg_type: RadiusMsgType) -> Option<SocketAddr> {
        self.sockets.get(&msg_type).and_then(|socket| socket.local_addr().ok())
    }

    /// Main function, that keeps server running
    pub fn run<H: RequestHandler>(&mut self, handler: &H) -> Result<(), RadiusError> {
        info!("RADIUS server is running");
        loop {
            self.process_events(handler, None)?;
        }
    }

    /// Waits up to `timeout` (forever if `None`) for incoming datagrams and processes all of them;
    /// returns number of received datagrams
    ///
    /// Handy for driving the server from the outside, for example from tests
    pub fn process_events<H: RequestHandler>(&mut self, handler: &H, timeout: Option<Duration>) -> Result<usize, RadiusError> {
        let mut events = Events::with_capacity(EVENTS_CAPACITY);

        match self.socket_poll.poll(&mut events, timeout) {
            Err(error) if error.kind() == ErrorKind::Interrupted => return Ok(0),
            Err(error)                                           => return Err(error.into()),
            Ok(())                                               => {}
        }

        let mut processed = 0;
        for event in events.iter() {
            let msg_type = match event.token() {
                Server::AUTH_SOCKET => RadiusMsgType::AUTH,
                Server::ACCT_SOCKET => RadiusMsgType::ACCT,
                Server::COA_SOCKET  => RadiusMsgType::COA,
                _                   => return Err(RadiusError::SocketInvalidConnectionError { error: format!("Non-supported UDP request: {:?}", event) })
            };
            processed += self.drain_socket(msg_type, handler)?;
        }
        Ok(processed)
    }

    /// Processes single datagram received on socket of given message type
    ///
    /// Returns encoded reply or `None`, if request was dropped (unknown source, malformed packet,
    /// failed verification, handler error or handler panic); reason of the drop is logged
    pub fn handle_request<H: RequestHandler>(&self, msg_type: RadiusMsgType, data: &[u8], source: SocketAddr, handler: &H) -> Option<Vec<u8>> {
        let remote_host = match self.find_remote_host(&source.ip()) {
            Some(remote_host) => remote_host,
            None              => {
                warn!("Dropping {} request from unknown host {}", msg_type, source);
                return None;
            }
        };

        match self.process_request(msg_type, data, remote_host, handler) {
            Ok(reply)  => Some(reply),
            Err(error) => {
                warn!("Dropping {} request from {} ({}): {}", msg_type, source, remote_host.name(), error);
                None
            }
        }
    }

    // -----------------------------------------

    fn bind_socket(&mut self, msg_type: RadiusMsgType, token: Token) -> Result<(), RadiusError> {
        let port      = self.host.msg_type_port(msg_type);
        let bind_addr = (self.server.as_str(), port).to_socket_addrs()
            .map_err(|error| RadiusError::SocketAddrParseError { error: format!("{}: {}", self.server, error) })?
            .next()
            .ok_or_else(|| RadiusError::SocketAddrParseError { error: format!("{} does not resolve to any address", self.server) })?;

        let mut socket = UdpSocket::bind(bind_addr)?;
        info!("{} is initialised to accept RADIUS packets on {}", msg_type, socket.local_addr()?);
        self.socket_poll.registry().register(&mut socket, token, Interest::READABLE)?;
        self.sockets.insert(msg_type, socket);
        Ok(())
    }

    fn drain_socket<H: RequestHandler>(&self, msg_type: RadiusMsgType, handler: &H) -> Result<usize, RadiusError> {
        let socket = match self.sockets.get(&msg_type) {
            Some(socket) => socket,
            None         => return Ok(0)
        };

        let mut buffer    = [0u8; MAX_PACKET_LENGTH];
        let mut processed = 0;
        loop {
            match socket.recv_from(&mut buffer) {
                Ok((amount, source)) => {
                    processed += 1;
                    if let Some(reply) = self.handle_request(msg_type, &buffer[..amount], source, handler) {
                        if let Err(error) = socket.send_to(&reply, source) {
                            warn!("Failed to send {} reply to {}: {}", msg_type, source, error);
                        }
                    }
                },
                Err(error) if error.kind() == ErrorKind::WouldBlock  => return Ok(processed),
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error)                                            => warn!("Failed to receive on {} socket: {}", msg_type, error)
            }
        }
    }

    fn process_request<H: RequestHandler>(&self, msg_type: RadiusMsgType, data: &[u8], remote_host: &RemoteHost, handler: &H) -> Result<Vec<u8>, RadiusError> {
        let request = self.host.packet_from_bytes(remote_host.secret(), data)?;
        debug!("Received {:?} (ID {}) from {}: {:?}", request.code(), request.id(), remote_host.name(), data);

        if RadiusMsgType::from_code(request.code()) != Some(msg_type) {
            return Err(RadiusError::MalformedPacketError { error: format!("{:?} is not accepted on {} socket", request.code(), msg_type) });
        }
        if request.code().has_calculated_authenticator() {
            request.verify_acct_request()?;
        }
        if request.has_message_authenticator() {
            request.verify_message_authenticator()?;
        }

        let handled = panic::catch_unwind(AssertUnwindSafe(|| match msg_type {
            RadiusMsgType::AUTH => handler.handle_auth_request(&request),
            RadiusMsgType::ACCT => handler.handle_acct_request(&request),
            RadiusMsgType::COA  => handler.handle_coa_request(&request)
        }));
        let reply = match handled {
            Ok(reply)  => reply?,
            Err(cause) => return Err(RadiusError::ValidationError { error: format!("{} handler panicked: {}", msg_type, panic_message(cause.as_ref())) })
        };

        let reply_bytes = reply.reply_packet()?;
        debug!("Replying {:?} (ID {}) to {}", reply.code(), reply.id(), remote_host.name());
        Ok(reply_bytes)
    }

    fn find_remote_host(&self, address: &IpAddr) -> Option<&RemoteHost> {
        self.remote_hosts.get(address).or_else(|| match address {
            IpAddr::V6(address) => address.to_ipv4().and_then(|address| self.remote_hosts.get(&IpAddr::V4(address))),
            IpAddr::V4(_)       => None
        })
    }
}


fn panic_message(cause: &(dyn Any + Send)) -> &str {
    match (cause.downcast_ref::<&str>(), cause.downcast_ref::<String>()) {
        (Some(message), _) => *message,
        (_, Some(message)) => message.as_str(),
        _                  => "unknown cause"
    }
}

/// Main function, that starts and keeps server running
pub fn run_server<H: RequestHandler>(server: &mut Server, handler: &H) -> Result<(), RadiusError> {
    server.run(handler)
}
