//! RADIUS packet: header, attribute multimap and wire encoding/decoding


use super::auth::{ accounting_authenticator, calculate_authenticator, create_authenticator, create_id, decrypt_password, encrypt_password, message_authenticator };
use super::codec::{ decode_tlvs, decode_value, encode_tlv, encode_value, AttributeValue };
use super::dictionary::Dictionary;
use super::error::RadiusError;

use std::fmt;
use std::sync::Arc;


/// Shortest valid RADIUS packet (header only)
pub const MIN_PACKET_LENGTH: usize = 20;
/// Longest valid RADIUS packet
pub const MAX_PACKET_LENGTH: usize = 4096;

const MESSAGE_AUTHENTICATOR_CODE: u8 = 80;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// RADIUS packet code
pub enum TypeCode {
    /// AccessRequest      = 1
    AccessRequest,
    /// AccessAccept       = 2
    AccessAccept,
    /// AccessReject       = 3
    AccessReject,
    /// AccountingRequest  = 4
    AccountingRequest,
    /// AccountingResponse = 5
    AccountingResponse,
    /// AccessChallenge    = 11
    AccessChallenge,
    /// StatusServer       = 12
    StatusServer,
    /// StatusClient       = 13
    StatusClient,
    /// DisconnectRequest  = 40
    DisconnectRequest,
    /// DisconnectACK      = 41
    DisconnectACK,
    /// DisconnectNAK      = 42
    DisconnectNAK,
    /// CoARequest         = 43
    CoARequest,
    /// CoAACK             = 44
    CoAACK,
    /// CoANAK             = 45
    CoANAK
}

impl TypeCode {
    /// Convert integer(u8) value into corresponding TypeCode enum
    pub fn from_u8(code: u8) -> Result<TypeCode, RadiusError> {
        match code {
            1u8  => Ok(TypeCode::AccessRequest),
            2u8  => Ok(TypeCode::AccessAccept),
            3u8  => Ok(TypeCode::AccessReject),
            4u8  => Ok(TypeCode::AccountingRequest),
            5u8  => Ok(TypeCode::AccountingResponse),
            11u8 => Ok(TypeCode::AccessChallenge),
            12u8 => Ok(TypeCode::StatusServer),
            13u8 => Ok(TypeCode::StatusClient),
            40u8 => Ok(TypeCode::DisconnectRequest),
            41u8 => Ok(TypeCode::DisconnectACK),
            42u8 => Ok(TypeCode::DisconnectNAK),
            43u8 => Ok(TypeCode::CoARequest),
            44u8 => Ok(TypeCode::CoAACK),
            45u8 => Ok(TypeCode::CoANAK),
            _    => Err(RadiusError::MalformedPacketError { error: format!("Unknown RADIUS code {}", code) })
        }
    }

    /// Convert TypeCode enum value into corresponding integer(u8)
    pub fn to_u8(&self) -> u8 {
        match self {
            TypeCode::AccessRequest      => 1u8,
            TypeCode::AccessAccept       => 2u8,
            TypeCode::AccessReject       => 3u8,
            TypeCode::AccountingRequest  => 4u8,
            TypeCode::AccountingResponse => 5u8,
            TypeCode::AccessChallenge    => 11u8,
            TypeCode::StatusServer       => 12u8,
            TypeCode::StatusClient       => 13u8,
            TypeCode::DisconnectRequest  => 40u8,
            TypeCode::DisconnectACK      => 41u8,
            TypeCode::DisconnectNAK      => 42u8,
            TypeCode::CoARequest         => 43u8,
            TypeCode::CoAACK             => 44u8,
            TypeCode::CoANAK             => 45u8
        }
    }

    /// True for request codes, whose Request Authenticator is calculated over zeroed
    /// Authenticator field instead of being random
    pub fn has_calculated_authenticator(&self) -> bool {
        matches!(self, TypeCode::AccountingRequest | TypeCode::DisconnectRequest | TypeCode::CoARequest)
    }

    /// True for codes, that are sent by RADIUS Client
    pub fn is_request(&self) -> bool {
        matches!(self,
            TypeCode::AccessRequest     | TypeCode::AccountingRequest | TypeCode::StatusServer |
            TypeCode::StatusClient      | TypeCode::DisconnectRequest | TypeCode::CoARequest)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Allowed types of RADIUS messages/packets
///
/// Mainly used in RADIUS Server implementation to distinguish between sockets and functions, that
/// should process RADIUS packets
pub enum RadiusMsgType {
    /// Authentication packet
    AUTH,
    /// Accounting packet
    ACCT,
    /// Change of Authorisation packet
    COA
}

impl RadiusMsgType {
    /// Returns message type, that given request code is served by
    pub fn from_code(code: &TypeCode) -> Option<RadiusMsgType> {
        match code {
            TypeCode::AccessRequest     | TypeCode::StatusServer => Some(RadiusMsgType::AUTH),
            TypeCode::AccountingRequest                          => Some(RadiusMsgType::ACCT),
            TypeCode::CoARequest        | TypeCode::DisconnectRequest => Some(RadiusMsgType::COA),
            _                                                    => None
        }
    }
}

impl fmt::Display for RadiusMsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadiusMsgType::AUTH => f.write_str("Auth"),
            RadiusMsgType::ACCT => f.write_str("Acct"),
            RadiusMsgType::COA  => f.write_str("CoA"),
        }
    }
}


#[derive(Debug, Clone, PartialEq)]
/// Represents an attribute, which would be sent to RADIUS Server/client as a part of RadiusPacket
///
/// Value is kept in its wire form, except for password attributes, which are kept in plain text
/// and are hidden only when packet is encoded
pub struct RadiusAttribute {
    name:      String,
    vendor_id: Option<u32>,
    code:      u32,
    value:     Vec<u8>
}

impl RadiusAttribute {
    /// Returns attribute name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns attribute code (vendor-type for vendor specific attributes)
    pub fn code(&self) -> u32 {
        self.code
    }

    /// Returns ID of the vendor, that attribute belongs to
    pub fn vendor_id(&self) -> Option<u32> {
        self.vendor_id
    }

    /// Returns attribute value bytes
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    fn is_message_authenticator(&self) -> bool {
        self.vendor_id.is_none() && self.code == u32::from(MESSAGE_AUTHENTICATOR_CODE)
    }
}


#[derive(Debug, Clone)]
/// Represents RADIUS packet
///
/// Attributes form an ordered multimap: the same attribute could be added several times and wire
/// order follows insertion order
pub struct RadiusPacket {
    id:            u8,
    code:          TypeCode,
    authenticator: [u8; 16],
    secret:        Vec<u8>,
    attributes:    Vec<RadiusAttribute>,
    dictionary:    Arc<Dictionary>,
    raw:           Option<Vec<u8>>
}

impl RadiusPacket {
    /// Initialises RADIUS packet with random ID and random Authenticator
    pub fn new<S: AsRef<[u8]>>(code: TypeCode, secret: S, dictionary: Arc<Dictionary>) -> RadiusPacket {
        RadiusPacket {
            id:            create_id(),
            code,
            authenticator: create_authenticator(),
            secret:        secret.as_ref().to_vec(),
            attributes:    Vec::new(),
            dictionary,
            raw:           None
        }
    }

    /// Decodes RADIUS packet from bytes
    ///
    /// Hidden password attributes of Access-Request are revealed with given secret; octets after
    /// the declared packet length are ignored
    pub fn from_bytes<S: AsRef<[u8]>>(dictionary: Arc<Dictionary>, secret: S, bytes: &[u8]) -> Result<RadiusPacket, RadiusError> {
        let length  = declared_length(bytes)?;
        let bytes   = &bytes[..length];
        let secret  = secret.as_ref().to_vec();
        let code    = TypeCode::from_u8(bytes[0])?;
        let id      = bytes[1];

        let mut authenticator = [0u8; 16];
        authenticator.copy_from_slice(&bytes[4..20]);

        let mut attributes = Vec::new();
        for (dict_attr, value) in decode_tlvs(&dictionary, &bytes[20..])? {
            let value = if code == TypeCode::AccessRequest && dict_attr.is_password() {
                decrypt_password(&value, &secret, &authenticator)?
            } else {
                value
            };

            attributes.push(RadiusAttribute {
                name:      dict_attr.name().to_string(),
                vendor_id: dict_attr.vendor_id(),
                code:      dict_attr.code(),
                value
            });
        }

        Ok(RadiusPacket {
            id,
            code,
            authenticator,
            secret,
            attributes,
            dictionary,
            raw: Some(bytes.to_vec())
        })
    }

    /// Appends attribute to the packet; attribute name is checked against dictionary and value is
    /// encoded according to attribute's data type
    pub fn add<V: Into<AttributeValue>>(&mut self, name: &str, value: V) -> Result<(), RadiusError> {
        let attribute = self.encode_attribute(name, &value.into())?;
        self.attributes.push(attribute);
        Ok(())
    }

    /// Replaces all occurrences of attribute with a single new value
    pub fn set<V: Into<AttributeValue>>(&mut self, name: &str, value: V) -> Result<(), RadiusError> {
        let attribute = self.encode_attribute(name, &value.into())?;
        self.remove(name);
        self.attributes.push(attribute);
        Ok(())
    }

    /// Adds raw attribute value bytes without any type checks
    pub fn add_raw(&mut self, name: &str, value: Vec<u8>) -> Result<(), RadiusError> {
        let dict_attr = self.dictionary.attribute(name)?;
        let attribute = RadiusAttribute {
            name:      dict_attr.name().to_string(),
            vendor_id: dict_attr.vendor_id(),
            code:      dict_attr.code(),
            value
        };

        self.attributes.push(attribute);
        Ok(())
    }

    /// Removes all occurrences of attribute; returns number of removed values
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.attributes.len();
        self.attributes.retain(|attr| attr.name() != name);
        before - self.attributes.len()
    }

    /// Returns first value of attribute, decoded according to attribute's data type
    pub fn get(&self, name: &str) -> Result<Option<AttributeValue>, RadiusError> {
        match self.attribute_by_name(name) {
            Some(attribute) => self.decode_attribute(attribute).map(Some),
            None            => Ok(None)
        }
    }

    /// Returns all values of attribute in wire order
    pub fn get_all(&self, name: &str) -> Result<Vec<AttributeValue>, RadiusError> {
        self.attributes.iter()
            .filter(|attr| attr.name() == name)
            .map(|attr| self.decode_attribute(attr))
            .collect()
    }

    /// Returns first attribute with given name
    pub fn attribute_by_name(&self, name: &str) -> Option<&RadiusAttribute> {
        self.attributes.iter().find(|attr| attr.name() == name)
    }

    /// Returns distinct attribute names in order of first appearance
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for attribute in self.attributes.iter() {
            if !keys.contains(&attribute.name()) {
                keys.push(attribute.name());
            }
        }
        keys
    }

    /// Checks if packet carries given attribute
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|attr| attr.name() == name)
    }

    /// Checks if packet carries Message-Authenticator
    pub fn has_message_authenticator(&self) -> bool {
        self.attributes.iter().any(|attr| attr.is_message_authenticator())
    }

    /// Returns all attributes of the packet in wire order
    pub fn attributes(&self) -> &[RadiusAttribute] {
        &self.attributes
    }

    /// Returns packet identifier
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Returns packet code
    pub fn code(&self) -> &TypeCode {
        &self.code
    }

    /// Returns packet authenticator
    ///
    /// For Accounting, CoA & Disconnect requests it becomes meaningful only after
    /// [RadiusPacket::request_packet] was called
    pub fn authenticator(&self) -> &[u8; 16] {
        &self.authenticator
    }

    /// Returns shared secret the packet is bound to
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Returns dictionary the packet is bound to
    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.dictionary
    }

    /// Returns bytes, that packet was decoded from
    pub fn raw(&self) -> Option<&[u8]> {
        self.raw.as_deref()
    }

    /// Overrides packet identifier
    pub fn override_id(&mut self, new_id: u8) {
        self.id = new_id
    }

    /// Overrides packet authenticator
    pub fn override_authenticator(&mut self, new_authenticator: [u8; 16]) {
        self.authenticator = new_authenticator
    }

    /// Adds Message-Authenticator placeholder; actual HMAC-MD5 value is calculated when packet is
    /// encoded
    pub fn add_message_authenticator(&mut self) -> Result<(), RadiusError> {
        let name = self.dictionary.attribute_by_code(u32::from(MESSAGE_AUTHENTICATOR_CODE), None)?.name().to_string();
        self.remove(&name);
        self.add_raw(&name, vec![0u8; 16])
    }

    /// Encodes request packet for transmission
    ///
    /// Passwords of Access-Request are hidden using packet's authenticator. Accounting, CoA &
    /// Disconnect requests get their Request Authenticator calculated and stored in the packet.
    pub fn request_packet(&mut self) -> Result<Vec<u8>, RadiusError> {
        if !self.code.is_request() {
            return Err(RadiusError::MalformedPacketError { error: format!("{:?} is not a request code", self.code) });
        }

        if self.code.has_calculated_authenticator() {
            let mut bytes = self.encode(&[0u8; 16], false)?;
            self.fill_message_authenticator(&mut bytes)?;

            let authenticator = accounting_authenticator(&bytes, &self.secret)?;
            bytes[4..20].copy_from_slice(&authenticator);
            self.authenticator = authenticator;
            Ok(bytes)
        } else {
            let authenticator = self.authenticator;
            let mut bytes     = self.encode(&authenticator, self.code == TypeCode::AccessRequest)?;
            self.fill_message_authenticator(&mut bytes)?;
            Ok(bytes)
        }
    }

    /// Encodes reply packet for transmission; packet's authenticator must be the one of the
    /// request being answered (which is the case for packets built with
    /// [RadiusPacket::create_reply])
    pub fn reply_packet(&self) -> Result<Vec<u8>, RadiusError> {
        let mut bytes = self.encode(&self.authenticator, false)?;
        self.fill_message_authenticator(&mut bytes)?;

        let authenticator = calculate_authenticator(&bytes, &self.authenticator, &self.secret)?;
        bytes[4..20].copy_from_slice(&authenticator);
        Ok(bytes)
    }

    /// Creates reply packet with the same ID, authenticator, secret & dictionary and no attributes
    pub fn create_reply(&self, code: TypeCode) -> RadiusPacket {
        RadiusPacket {
            id:            self.id,
            code,
            authenticator: self.authenticator,
            secret:        self.secret.clone(),
            attributes:    Vec::new(),
            dictionary:    Arc::clone(&self.dictionary),
            raw:           None
        }
    }

    /// Decodes reply to this packet
    pub fn parse_reply(&self, raw_reply: &[u8]) -> Result<RadiusPacket, RadiusError> {
        RadiusPacket::from_bytes(Arc::clone(&self.dictionary), &self.secret, raw_reply)
    }

    /// Verifies that raw reply answers this request: identifiers match, Response Authenticator is
    /// correct and Message-Authenticator (if present) is correct
    pub fn verify_reply(&self, raw_reply: &[u8]) -> Result<(), RadiusError> {
        let length    = declared_length(raw_reply)?;
        let raw_reply = &raw_reply[..length];

        if raw_reply[1] != self.id {
            return Err(RadiusError::ValidationError { error: format!("reply ID {} does not match request ID {}", raw_reply[1], self.id) });
        }

        let expected = calculate_authenticator(raw_reply, &self.authenticator, &self.secret)?;
        if raw_reply[4..20] != expected[..] {
            return Err(RadiusError::ValidationError { error: String::from("Response Authenticator mismatch") });
        }

        if let Some(offset) = message_authenticator_offset(raw_reply)? {
            verify_message_authenticator(raw_reply, offset, &self.authenticator, &self.secret)?;
        }
        Ok(())
    }

    /// Verifies Request Authenticator of received Accounting, CoA or Disconnect request
    pub fn verify_acct_request(&self) -> Result<(), RadiusError> {
        let raw = self.raw_bytes()?;

        let expected = accounting_authenticator(raw, &self.secret)?;
        if raw[4..20] != expected[..] {
            return Err(RadiusError::ValidationError { error: format!("{:?} authenticator mismatch", self.code) });
        }
        Ok(())
    }

    /// Verifies Message-Authenticator of received request
    pub fn verify_message_authenticator(&self) -> Result<(), RadiusError> {
        let raw    = self.raw_bytes()?;
        let offset = message_authenticator_offset(raw)?
            .ok_or_else(|| RadiusError::MalformedPacketError { error: String::from("Message-Authenticator attribute not found in packet") })?;

        let authenticator = if self.code.has_calculated_authenticator() { [0u8; 16] } else { self.authenticator };
        verify_message_authenticator(raw, offset, &authenticator, &self.secret)
    }

    // -----------------------------------------

    fn encode_attribute(&self, name: &str, value: &AttributeValue) -> Result<RadiusAttribute, RadiusError> {
        let dict_attr = self.dictionary.attribute(name)?;
        let encoded   = encode_value(&self.dictionary, dict_attr, value)?;
        encode_tlv(&self.dictionary, dict_attr, &encoded)?;

        Ok(RadiusAttribute {
            name:      dict_attr.name().to_string(),
            vendor_id: dict_attr.vendor_id(),
            code:      dict_attr.code(),
            value:     encoded
        })
    }

    fn decode_attribute(&self, attribute: &RadiusAttribute) -> Result<AttributeValue, RadiusError> {
        let dict_attr = self.dictionary.attribute_by_code(attribute.code(), attribute.vendor_id())?;
        decode_value(dict_attr, attribute.value())
    }

    fn raw_bytes(&self) -> Result<&[u8], RadiusError> {
        self.raw.as_deref().ok_or_else(|| RadiusError::ValidationError { error: String::from("packet was not received from the network") })
    }

    fn encode(&self, authenticator: &[u8; 16], hide_passwords: bool) -> Result<Vec<u8>, RadiusError> {
        /*
         *          0               1               2         3
            0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
           +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
           |     Code      |  Identifier   |            Length             |
           +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
           |                                                               |
           |                         Authenticator                         |
           |                                                               |
           |                                                               |
           +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
           |  Attributes ...
           +-+-+-+-+-+-+-+-+-+-+-+-+-
         * Taken from https://tools.ietf.org/html/rfc2865#page-14
         */
        let mut packet_attr = Vec::new();

        for attribute in self.attributes.iter() {
            let dict_attr = self.dictionary.attribute_by_code(attribute.code(), attribute.vendor_id())?;

            let tlv = if hide_passwords && dict_attr.is_password() {
                encode_tlv(&self.dictionary, dict_attr, &encrypt_password(attribute.value(), &self.secret, authenticator)?)?
            } else if attribute.is_message_authenticator() {
                encode_tlv(&self.dictionary, dict_attr, &[0u8; 16])?
            } else {
                encode_tlv(&self.dictionary, dict_attr, attribute.value())?
            };
            packet_attr.extend(tlv);
        }

        let length = MIN_PACKET_LENGTH + packet_attr.len();
        if length > MAX_PACKET_LENGTH {
            return Err(RadiusError::MalformedPacketError { error: format!("packet is {} octets long, limit is {}", length, MAX_PACKET_LENGTH) });
        }

        let mut packet_bytes = Vec::with_capacity(length);
        packet_bytes.push(self.code.to_u8());
        packet_bytes.push(self.id);
        packet_bytes.extend_from_slice(&(length as u16).to_be_bytes());
        packet_bytes.extend_from_slice(authenticator);
        packet_bytes.append(&mut packet_attr);

        Ok(packet_bytes)
    }

    fn fill_message_authenticator(&self, bytes: &mut [u8]) -> Result<(), RadiusError> {
        if let Some(offset) = message_authenticator_offset(bytes)? {
            let hmac = message_authenticator(bytes, &self.secret)?;
            bytes[offset..offset + 16].copy_from_slice(&hmac);
        }
        Ok(())
    }
}


fn declared_length(bytes: &[u8]) -> Result<usize, RadiusError> {
    if bytes.len() < MIN_PACKET_LENGTH {
        return Err(RadiusError::MalformedPacketError { error: format!("packet is {} octets long, shorter than RADIUS header", bytes.len()) });
    }

    let length = usize::from(u16::from_be_bytes([bytes[2], bytes[3]]));
    if length < MIN_PACKET_LENGTH || length > MAX_PACKET_LENGTH || length > bytes.len() {
        return Err(RadiusError::MalformedPacketError { error: format!("packet declares invalid length {} ({} octets received)", length, bytes.len()) });
    }
    Ok(length)
}

/// Finds offset of Message-Authenticator value inside encoded packet
fn message_authenticator_offset(bytes: &[u8]) -> Result<Option<usize>, RadiusError> {
    let mut offset = MIN_PACKET_LENGTH;

    while offset + 2 <= bytes.len() {
        let attr_id     = bytes[offset];
        let attr_length = usize::from(bytes[offset + 1]);
        if attr_length < 2 || offset + attr_length > bytes.len() {
            return Err(RadiusError::MalformedPacketError { error: format!("attribute with ID: {} at offset {} declares invalid length {}", attr_id, offset, attr_length) });
        }

        if attr_id == MESSAGE_AUTHENTICATOR_CODE {
            if attr_length != 18 {
                return Err(RadiusError::MalformedPacketError { error: format!("Message-Authenticator must be 18 octets long, got {}", attr_length) });
            }
            return Ok(Some(offset + 2));
        }
        offset += attr_length;
    }
    Ok(None)
}

fn verify_message_authenticator(bytes: &[u8], offset: usize, authenticator: &[u8; 16], secret: &[u8]) -> Result<(), RadiusError> {
    let mut zeroed = bytes.to_vec();
    zeroed[4..20].copy_from_slice(authenticator);
    zeroed[offset..offset + 16].copy_from_slice(&[0u8; 16]);

    if message_authenticator(&zeroed, secret)?[..] == bytes[offset..offset + 16] {
        Ok(())
    } else {
        Err(RadiusError::ValidationError { error: String::from("Packet Message-Authenticator mismatch") })
    }
}
