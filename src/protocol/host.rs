//! Shared base for RADIUS Client & Server implementations


use super::dictionary::{ Dictionary, DictionaryAttribute, DictionaryValue };
use super::error::RadiusError;
use super::radius_packet::{ RadiusMsgType, RadiusPacket, TypeCode };

use std::sync::Arc;


/// Default port of RADIUS authentication service
pub const DEFAULT_AUTH_PORT: u16 = 1812;
/// Default port of RADIUS accounting service
pub const DEFAULT_ACCT_PORT: u16 = 1813;
/// Default port of RADIUS Dynamic Authorization (CoA & Disconnect) service
pub const DEFAULT_COA_PORT:  u16 = 3799;


#[derive(Debug, Clone)]
/// Generic struct that holds Server & Client common functions and attributes
pub struct Host {
    auth_port:  u16,
    acct_port:  u16,
    coa_port:   u16,
    dictionary: Arc<Dictionary>
}

impl Host {
    /// Initialises host instance only with Dictionary; ports default to 1812, 1813 & 3799 and
    /// could be changed through *set_port()*
    pub fn with_dictionary<D: Into<Arc<Dictionary>>>(dictionary: D) -> Host {
        Host {
            auth_port:  DEFAULT_AUTH_PORT,
            acct_port:  DEFAULT_ACCT_PORT,
            coa_port:   DEFAULT_COA_PORT,
            dictionary: dictionary.into()
        }
    }

    /// Initialises host instance with all required fields
    pub fn initialise_host<D: Into<Arc<Dictionary>>>(auth_port: u16, acct_port: u16, coa_port: u16, dictionary: D) -> Host {
        Host { auth_port, acct_port, coa_port, dictionary: dictionary.into() }
    }

    /// Sets port, that is responsible for specific RADIUS Message Type
    pub fn set_port(&mut self, msg_type: RadiusMsgType, port: u16) {
        match msg_type {
            RadiusMsgType::AUTH => self.auth_port = port,
            RadiusMsgType::ACCT => self.acct_port = port,
            RadiusMsgType::COA  => self.coa_port  = port,
        }
    }

    /// Returns port, that is responsible for specific RADIUS Message Type
    pub fn msg_type_port(&self, msg_type: RadiusMsgType) -> u16 {
        match msg_type {
            RadiusMsgType::AUTH => self.auth_port,
            RadiusMsgType::ACCT => self.acct_port,
            RadiusMsgType::COA  => self.coa_port,
        }
    }

    /// Returns port of RADIUS server, that receives given type of RADIUS message/packet
    pub fn port(&self, code: &TypeCode) -> Option<u16> {
        RadiusMsgType::from_code(code).map(|msg_type| self.msg_type_port(msg_type))
    }

    /// Returns host's dictionary instance
    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.dictionary
    }

    /// Creates empty packet of given code, bound to host's dictionary and given secret
    pub fn create_packet<S: AsRef<[u8]>>(&self, code: TypeCode, secret: S) -> RadiusPacket {
        RadiusPacket::new(code, secret, Arc::clone(&self.dictionary))
    }

    /// Creates empty Access-Request
    pub fn create_auth_packet<S: AsRef<[u8]>>(&self, secret: S) -> RadiusPacket {
        self.create_packet(TypeCode::AccessRequest, secret)
    }

    /// Creates empty Accounting-Request
    pub fn create_acct_packet<S: AsRef<[u8]>>(&self, secret: S) -> RadiusPacket {
        self.create_packet(TypeCode::AccountingRequest, secret)
    }

    /// Creates empty CoA-Request
    pub fn create_coa_packet<S: AsRef<[u8]>>(&self, secret: S) -> RadiusPacket {
        self.create_packet(TypeCode::CoARequest, secret)
    }

    /// Initialises RadiusPacket from bytes
    pub fn packet_from_bytes<S: AsRef<[u8]>>(&self, secret: S, packet: &[u8]) -> Result<RadiusPacket, RadiusError> {
        RadiusPacket::from_bytes(Arc::clone(&self.dictionary), secret, packet)
    }

    /// Returns VALUE from dictionary with given attribute & value name
    pub fn dictionary_value_by_attr_and_value_name(&self, attr_name: &str, value_name: &str) -> Option<&DictionaryValue> {
        self.dictionary.value_by_name(attr_name, value_name)
    }

    /// Returns ATTRIBUTE from dictionary with given code (standard attributes only)
    pub fn dictionary_attribute_by_id(&self, packet_attr_id: u8) -> Option<&DictionaryAttribute> {
        self.dictionary.attribute_by_code(u32::from(packet_attr_id), None).ok()
    }

    /// Returns ATTRIBUTE from dictionary with given name
    pub fn dictionary_attribute_by_name(&self, packet_attr_name: &str) -> Option<&DictionaryAttribute> {
        self.dictionary.attribute(packet_attr_name).ok()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::dictionary::SupportedAttributeTypes;

    fn host() -> Host {
        let dictionary = Dictionary::from_file("./dict_examples/dictionary").unwrap();
        Host::initialise_host(1812, 1813, 3799, dictionary)
    }

    #[test]
    fn test_get_dictionary_value_by_attr_and_value_name() {
        let host       = host();
        let dict_value = host.dictionary_value_by_attr_and_value_name("Service-Type", "Login-User").unwrap();

        assert_eq!("Service-Type", dict_value.attribute_name());
        assert_eq!("Login-User",   dict_value.name());
        assert_eq!(1,              dict_value.value());
    }

    #[test]
    fn test_get_dictionary_value_by_attr_and_value_name_error() {
        let host = host();
        assert_eq!(None, host.dictionary_value_by_attr_and_value_name("Service-Type", "Lin-User"));
    }

    #[test]
    fn test_get_dictionary_attribute_by_id() {
        let host      = host();
        let dict_attr = host.dictionary_attribute_by_id(80).unwrap();

        assert_eq!("Message-Authenticator",            dict_attr.name());
        assert_eq!(80,                                 dict_attr.code());
        assert_eq!(SupportedAttributeTypes::ByteString, dict_attr.code_type());
        assert_eq!(None,                               host.dictionary_attribute_by_id(255));
    }

    #[test]
    fn test_ports() {
        let mut host = Host::with_dictionary(Dictionary::default());

        assert_eq!(Some(1812), host.port(&TypeCode::AccessRequest));
        assert_eq!(Some(1813), host.port(&TypeCode::AccountingRequest));
        assert_eq!(Some(3799), host.port(&TypeCode::DisconnectRequest));
        assert_eq!(None,       host.port(&TypeCode::AccessAccept));

        host.set_port(RadiusMsgType::ACCT, 11813);
        assert_eq!(Some(11813), host.port(&TypeCode::AccountingRequest));
    }

    #[test]
    fn test_create_packets() {
        let host = host();

        assert_eq!(TypeCode::AccessRequest,     *host.create_auth_packet("secret").code());
        assert_eq!(TypeCode::AccountingRequest, *host.create_acct_packet("secret").code());
        assert_eq!(TypeCode::CoARequest,        *host.create_coa_packet("secret").code());
        assert!(Arc::ptr_eq(host.dictionary(), host.create_auth_packet("secret").dictionary()));
    }

    #[test]
    fn test_packet_from_bytes() {
        let host  = host();
        let bytes = [4, 43, 0, 26, 215, 189, 213, 172, 57, 94, 141, 70, 134, 121, 101, 57, 187, 220, 227, 73, 5, 6, 0, 0, 0, 0];

        let packet = host.packet_from_bytes("secret", &bytes).unwrap();
        assert_eq!(TypeCode::AccountingRequest, *packet.code());
        assert!(packet.has_attribute("NAS-Port"));
        assert!(host.packet_from_bytes("secret", &bytes[..25]).is_err());
    }
}
