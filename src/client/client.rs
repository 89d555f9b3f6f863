//! RADIUS Generic Client implementation


use crate::protocol::dictionary::Dictionary;
use crate::protocol::error::RadiusError;
use crate::protocol::host::Host;
use crate::protocol::codec::AttributeValue;
use crate::protocol::radius_packet::{ RadiusPacket, RadiusMsgType, TypeCode, MAX_PACKET_LENGTH };

use log::debug;
use mio::{ Events, Interest, Poll, Token };
use mio::net::UdpSocket;
use std::io::ErrorKind;
use std::net::{ SocketAddr, ToSocketAddrs };
use std::sync::Arc;
use std::time::{ Duration, Instant };


const SOCKET_TOKEN:    Token = Token(0);
const ACCT_DELAY_TIME: &str  = "Acct-Delay-Time";
const DEFAULT_RETRIES: u16   = 3;
const DEFAULT_TIMEOUT: u64   = 5;


#[derive(Debug)]
/// Represents RADIUS Generic Client instance
pub struct Client {
    host:         Host,
    server:       String,
    secret:       String,
    retries:      u16,
    timeout:      Duration,
    bind_address: SocketAddr
}

impl Client {
    // === Builder for Client ===
    /// Initialise Client instance with dictionary (other fields would be set to default values)
    ///
    /// To be called **first** when creating RADIUS Client instance
    pub fn with_dictionary<D: Into<Arc<Dictionary>>>(dictionary: D) -> Client {
        Client {
            host:         Host::with_dictionary(dictionary),
            server:       String::from(""),
            secret:       String::from(""),
            retries:      DEFAULT_RETRIES,
            timeout:      Duration::from_secs(DEFAULT_TIMEOUT),
            bind_address: SocketAddr::from(([0, 0, 0, 0], 0))
        }
    }

    /// **Required**
    ///
    /// Sets hostname to which client would attempt to send RADIUS packets
    pub fn set_server(mut self, server: String) -> Client {
        self.server = server;
        self
    }

    /// **Required**
    ///
    /// Sets secret which is used to encode/decode RADIUS packet
    pub fn set_secret(mut self, secret: String) -> Client {
        self.secret = secret;
        self
    }

    /// **Optional**
    ///
    /// Sets remote port, that responsible for specific RADIUS Message Type, otherwise 1812, 1813
    /// & 3799 are used
    pub fn set_port(mut self, msg_type: RadiusMsgType, port: u16) -> Client {
        self.host.set_port(msg_type, port);
        self
    }

    /// **Optional**
    ///
    /// Sets number of send attempts, otherwise you would have a default value of 3
    pub fn set_retries(mut self, retries: u16) -> Client {
        self.retries = retries;
        self
    }

    /// **Optional**
    ///
    /// Sets per attempt timeout, otherwise you would have a default value of 5 seconds
    pub fn set_timeout(mut self, timeout: Duration) -> Client {
        self.timeout = timeout;
        self
    }

    /// **Optional**
    ///
    /// Sets local address, that client socket is bound to, otherwise you would have a default
    /// value of `0.0.0.0:0`
    pub fn set_bind_address(mut self, bind_address: SocketAddr) -> Client {
        self.bind_address = bind_address;
        self
    }
    // ===================

    /// Returns port of RADIUS server, that receives given type of RADIUS message/packet
    pub fn port(&self, code: &TypeCode) -> Option<u16> {
        self.host.port(code)
    }

    /// Returns hostname/FQDN of RADIUS Server
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Returns secret
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Returns retries
    pub fn retries(&self) -> u16 {
        self.retries
    }

    /// Returns timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns client's dictionary
    pub fn dictionary(&self) -> &Arc<Dictionary> {
        self.host.dictionary()
    }

    /// Creates RADIUS packet with any TypeCode without attributes, bound to client's secret
    pub fn create_packet(&self, code: TypeCode) -> RadiusPacket {
        self.host.create_packet(code, &self.secret)
    }

    /// Creates RADIUS Access Request packet without attributes
    ///
    /// # Examples
    ///
    /// ```
    /// use radkit::client::Client;
    /// use radkit::protocol::dictionary::Dictionary;
    ///
    /// let dictionary = Dictionary::from_file("./dict_examples/dictionary").unwrap();
    /// let client     = Client::with_dictionary(dictionary)
    ///     .set_server(String::from("127.0.0.1"))
    ///     .set_secret(String::from("secret"));
    ///
    /// let mut packet = client.create_auth_packet();
    /// packet.add("User-Name",     "wichert").unwrap();
    /// packet.add("User-Password", "fooPassword").unwrap();
    /// ```
    pub fn create_auth_packet(&self) -> RadiusPacket {
        self.host.create_auth_packet(&self.secret)
    }

    /// Creates RADIUS Accounting Request packet without attributes
    pub fn create_acct_packet(&self) -> RadiusPacket {
        self.host.create_acct_packet(&self.secret)
    }

    /// Creates RADIUS CoA Request packet without attributes
    pub fn create_coa_packet(&self) -> RadiusPacket {
        self.host.create_coa_packet(&self.secret)
    }

    /// Sends request to RADIUS server and waits for verified reply
    ///
    /// Request is sent up to `retries` times, each attempt waits up to `timeout` for a reply.
    /// Datagrams from other sources, with wrong ID or wrong authenticator are discarded and the
    /// wait continues. Retried Accounting-Request gets its Acct-Delay-Time increased by timeout
    /// (in whole seconds) and its authenticator recalculated.
    pub fn send_packet(&self, packet: &mut RadiusPacket) -> Result<RadiusPacket, RadiusError> {
        let remote_port = self.host.port(packet.code()).ok_or_else(|| RadiusError::MalformedPacketError { error: format!("There is no port match for packet code {:?}", packet.code()) })?;
        let remote      = self.resolve_server(remote_port)?;

        let mut socket      = UdpSocket::bind(self.bind_address)?;
        let mut socket_poll = Poll::new()?;
        socket_poll.registry().register(&mut socket, SOCKET_TOKEN, Interest::READABLE)?;

        let mut events = Events::with_capacity(16);
        let mut buffer = [0u8; MAX_PACKET_LENGTH];

        for attempt in 0..self.retries {
            if attempt > 0 && *packet.code() == TypeCode::AccountingRequest {
                self.bump_acct_delay_time(packet)?;
            }

            let request = packet.request_packet()?;
            debug!("Sending {:?} (ID {}) to {}, attempt {}/{}: {:?}", packet.code(), packet.id(), remote, attempt + 1, self.retries, &request);
            socket.send_to(&request, remote)?;

            let deadline = Instant::now() + self.timeout;
            loop {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }

                match socket_poll.poll(&mut events, Some(deadline - now)) {
                    Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                    Err(error)                                           => return Err(error.into()),
                    Ok(())                                               => {}
                }

                for event in events.iter() {
                    if event.token() != SOCKET_TOKEN {
                        return Err(RadiusError::SocketInvalidConnectionError { error: String::from("Received data from invalid Token") });
                    }
                }

                if let Some(reply) = self.receive_reply(&socket, packet, remote, &mut buffer)? {
                    return Ok(reply);
                }
            }
            debug!("No reply for {:?} (ID {}) from {} within {:?}", packet.code(), packet.id(), remote, self.timeout);
        }

        Err(RadiusError::TimeoutError { retries: self.retries })
    }

    // -----------------------------------------

    fn receive_reply(&self, socket: &UdpSocket, request: &RadiusPacket, remote: SocketAddr, buffer: &mut [u8]) -> Result<Option<RadiusPacket>, RadiusError> {
        loop {
            let (amount, source) = match socket.recv_from(buffer) {
                Ok(received)                                          => received,
                Err(error) if error.kind() == ErrorKind::WouldBlock  => return Ok(None),
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error)                                            => return Err(error.into())
            };

            if source != remote {
                debug!("Discarding datagram from unexpected source {}", source);
                continue;
            }

            let reply = &buffer[..amount];
            debug!("Received reply from {}: {:?}", source, reply);

            match request.verify_reply(reply).and_then(|_| request.parse_reply(reply)) {
                Ok(packet) => return Ok(Some(packet)),
                Err(error) => debug!("Discarding reply from {}: {}", source, error)
            }
        }
    }

    fn resolve_server(&self, port: u16) -> Result<SocketAddr, RadiusError> {
        let addresses: Vec<SocketAddr> = (self.server.as_str(), port).to_socket_addrs()
            .map_err(|error| RadiusError::SocketAddrParseError { error: format!("{}: {}", self.server, error) })?
            .collect();

        addresses.iter()
            .find(|address| address.is_ipv4() == self.bind_address.is_ipv4())
            .or_else(|| addresses.first())
            .copied()
            .ok_or_else(|| RadiusError::SocketAddrParseError { error: format!("{} does not resolve to any address", self.server) })
    }

    fn bump_acct_delay_time(&self, packet: &mut RadiusPacket) -> Result<(), RadiusError> {
        if !self.dictionary().has_attribute(ACCT_DELAY_TIME) {
            return Ok(());
        }

        let delay = match packet.get(ACCT_DELAY_TIME)? {
            Some(AttributeValue::Integer(delay)) => delay,
            _                                    => 0
        };
        let timeout_secs = self.timeout.as_secs() + if self.timeout.subsec_nanos() > 0 { 1 } else { 0 };

        packet.set(ACCT_DELAY_TIME, delay + timeout_secs as i64)
    }
}

impl Default for Client {
    fn default() -> Client {
        Client::with_dictionary(Dictionary::default())
    }
}
