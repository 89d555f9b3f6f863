//! Attribute codec: converts typed attribute values to RADIUS wire bytes and back, based on the
//! data type of dictionary attribute
//!
//! Value encoding is driven by [SupportedAttributeTypes] of the dictionary attribute, so adding
//! a new type is a compile-time checked change. Vendor-Specific attributes are wrapped/unwrapped
//! here as well.


use super::dictionary::{ Dictionary, DictionaryAttribute, DictionaryVendor, SupportedAttributeTypes };
use super::error::RadiusError;
use crate::tools::{
    bytes_to_ether_string,
    bytes_to_ifid_string,
    bytes_to_integer,
    bytes_to_integer64,
    bytes_to_ipv4,
    bytes_to_ipv6,
    bytes_to_ipv6_prefix,
    bytes_to_timestamp,
    ether_string_to_bytes,
    ifid_string_to_bytes,
    integer64_to_bytes,
    integer_to_bytes,
    ipv4_string_to_bytes,
    ipv6_prefix_to_bytes,
    ipv6_string_to_bytes,
    timestamp_to_bytes
};

use std::convert::TryInto;
use std::fmt;
use std::net::{ Ipv4Addr, Ipv6Addr };


/// Maximum length of attribute value (255 minus Type & Length octets)
pub const MAX_ATTRIBUTE_VALUE_LENGTH: usize = 253;
/// Code of Vendor-Specific attribute
pub const VENDOR_SPECIFIC_TYPE:       u8    = 26;

const MAX_TAGGED_INTEGER: i64 = 0x00ff_ffff;


#[derive(Debug, Clone, PartialEq)]
/// Typed value of RADIUS attribute
pub enum AttributeValue {
    /// Text (`string`); also accepted for numeric attributes as VALUE name and for address types
    /// in their textual form
    Text(String),
    /// Raw bytes (`octets`, `abinary`, `tlv`)
    Octets(Vec<u8>),
    /// `integer`, `short`, `byte` & `signed`
    Integer(i64),
    /// `integer64`
    Integer64(u64),
    /// `ipaddr`
    Ipv4(Ipv4Addr),
    /// `ipv6addr`
    Ipv6(Ipv6Addr),
    /// `ipv6prefix`: address and prefix length
    Ipv6Prefix(Ipv6Addr, u8),
    /// `date`: UNIX timestamp
    Date(u32),
    /// `ether`
    Ether([u8; 6]),
    /// `ifid`
    InterfaceId([u8; 8]),
    /// Value of `*-tag` attribute together with its tag
    Tagged(u8, Box<AttributeValue>)
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(text)                   => write!(f, "{}", text),
            AttributeValue::Octets(bytes)                => {
                write!(f, "0x")?;
                bytes.iter().try_for_each(|byte| write!(f, "{:02x}", byte))
            },
            AttributeValue::Integer(integer)             => write!(f, "{}", integer),
            AttributeValue::Integer64(integer)           => write!(f, "{}", integer),
            AttributeValue::Ipv4(address)                => write!(f, "{}", address),
            AttributeValue::Ipv6(address)                => write!(f, "{}", address),
            AttributeValue::Ipv6Prefix(address, length)  => write!(f, "{}/{}", address, length),
            AttributeValue::Date(timestamp)              => write!(f, "{}", timestamp),
            AttributeValue::Ether(bytes)                 => write!(f, "{}", bytes_to_ether_string(bytes).map_err(|_| fmt::Error)?),
            AttributeValue::InterfaceId(bytes)           => write!(f, "{}", bytes_to_ifid_string(bytes).map_err(|_| fmt::Error)?),
            AttributeValue::Tagged(tag, value)           => write!(f, "{}:{}", tag, value)
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> AttributeValue {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> AttributeValue {
        AttributeValue::Text(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> AttributeValue {
        AttributeValue::Octets(value)
    }
}

impl From<&[u8]> for AttributeValue {
    fn from(value: &[u8]) -> AttributeValue {
        AttributeValue::Octets(value.to_vec())
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> AttributeValue {
        AttributeValue::Integer(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> AttributeValue {
        AttributeValue::Integer(i64::from(value))
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> AttributeValue {
        AttributeValue::Integer(i64::from(value))
    }
}

impl From<u16> for AttributeValue {
    fn from(value: u16) -> AttributeValue {
        AttributeValue::Integer(i64::from(value))
    }
}

impl From<u8> for AttributeValue {
    fn from(value: u8) -> AttributeValue {
        AttributeValue::Integer(i64::from(value))
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> AttributeValue {
        AttributeValue::Integer64(value)
    }
}

impl From<Ipv4Addr> for AttributeValue {
    fn from(value: Ipv4Addr) -> AttributeValue {
        AttributeValue::Ipv4(value)
    }
}

impl From<Ipv6Addr> for AttributeValue {
    fn from(value: Ipv6Addr) -> AttributeValue {
        AttributeValue::Ipv6(value)
    }
}


/// Encodes typed value into attribute value bytes (without Type & Length octets)
///
/// Text given for a numeric attribute is looked up among attribute's VALUEs first
pub fn encode_value(dictionary: &Dictionary, attribute: &DictionaryAttribute, value: &AttributeValue) -> Result<Vec<u8>, RadiusError> {
    let code_type = attribute.code_type();

    let (tag, value) = match (code_type, value) {
        (SupportedAttributeTypes::IntegerTag,    AttributeValue::Tagged(tag, inner)) |
        (SupportedAttributeTypes::Integer64Tag,  AttributeValue::Tagged(tag, inner)) |
        (SupportedAttributeTypes::ByteStringTag, AttributeValue::Tagged(tag, inner)) => (*tag, inner.as_ref()),
        (_,                                      AttributeValue::Tagged(_, _))       => return Err(type_mismatch(attribute, value)),
        (_,                                      value)                             => (0u8, value)
    };

    let resolved;
    let value = if code_type.is_numeric() {
        resolved = resolve_named_value(dictionary, attribute, value)?;
        &resolved
    } else {
        value
    };

    let bytes = match code_type {
        SupportedAttributeTypes::AsciiString => match value {
            AttributeValue::Text(text)    => text.as_bytes().to_vec(),
            AttributeValue::Octets(bytes) => bytes.clone(),
            _                             => return Err(type_mismatch(attribute, value))
        },
        SupportedAttributeTypes::ByteString |
        SupportedAttributeTypes::ABinary    |
        SupportedAttributeTypes::Tlv        => octets(attribute, value)?,
        SupportedAttributeTypes::Integer    => integer_to_bytes(integer_in_range(attribute, value, 0, i64::from(u32::MAX))? as u32),
        SupportedAttributeTypes::Byte       => vec![integer_in_range(attribute, value, 0, i64::from(u8::MAX))? as u8],
        SupportedAttributeTypes::Short      => (integer_in_range(attribute, value, 0, i64::from(u16::MAX))? as u16).to_be_bytes().to_vec(),
        SupportedAttributeTypes::Signed     => (integer_in_range(attribute, value, i64::from(i32::MIN), i64::from(i32::MAX))? as i32).to_be_bytes().to_vec(),
        SupportedAttributeTypes::Integer64  => integer64_to_bytes(integer64(attribute, value)?),
        SupportedAttributeTypes::IPv4Addr   => match value {
            AttributeValue::Ipv4(address) => address.octets().to_vec(),
            AttributeValue::Text(text)    => ipv4_string_to_bytes(text).map_err(|_| type_mismatch(attribute, value))?,
            _                             => return Err(type_mismatch(attribute, value))
        },
        SupportedAttributeTypes::Date       => match value {
            AttributeValue::Date(timestamp) => timestamp_to_bytes(*timestamp),
            _                               => timestamp_to_bytes(integer_in_range(attribute, value, 0, i64::from(u32::MAX))? as u32)
        },
        SupportedAttributeTypes::IPv6Addr   => match value {
            AttributeValue::Ipv6(address) => address.octets().to_vec(),
            AttributeValue::Text(text)    => text.parse::<Ipv6Addr>().map_err(|_| type_mismatch(attribute, value))?.octets().to_vec(),
            _                             => return Err(type_mismatch(attribute, value))
        },
        SupportedAttributeTypes::IPv6Prefix => match value {
            AttributeValue::Ipv6Prefix(address, length) if *length <= 128 => ipv6_prefix_to_bytes(address, *length),
            AttributeValue::Ipv6(address)                                 => ipv6_prefix_to_bytes(address, 128),
            AttributeValue::Text(text)                                    => parse_ipv6_prefix(text).ok_or_else(|| type_mismatch(attribute, value))?,
            _                                                             => return Err(type_mismatch(attribute, value))
        },
        SupportedAttributeTypes::InterfaceId => match value {
            AttributeValue::InterfaceId(bytes)          => bytes.to_vec(),
            AttributeValue::Octets(bytes) if bytes.len() == 8 => bytes.clone(),
            AttributeValue::Text(text)                  => ifid_string_to_bytes(text).map_err(|_| type_mismatch(attribute, value))?.to_vec(),
            _                                           => return Err(type_mismatch(attribute, value))
        },
        SupportedAttributeTypes::Ethernet   => match value {
            AttributeValue::Ether(bytes)                      => bytes.to_vec(),
            AttributeValue::Octets(bytes) if bytes.len() == 6 => bytes.clone(),
            AttributeValue::Text(text)                        => ether_string_to_bytes(text).map_err(|_| type_mismatch(attribute, value))?.to_vec(),
            _                                                 => return Err(type_mismatch(attribute, value))
        },
        SupportedAttributeTypes::IntegerTag => {
            let integer = integer_in_range(attribute, value, 0, MAX_TAGGED_INTEGER)? as u32;
            let mut bytes = integer_to_bytes(integer);
            bytes[0] = tag;
            bytes
        },
        SupportedAttributeTypes::Integer64Tag => {
            let mut bytes = vec![tag];
            bytes.extend(integer64_to_bytes(integer64(attribute, value)?));
            bytes
        },
        SupportedAttributeTypes::ByteStringTag => {
            let mut bytes = vec![tag];
            bytes.extend(octets(attribute, value)?);
            bytes
        }
    };

    if bytes.len() > MAX_ATTRIBUTE_VALUE_LENGTH {
        return Err(RadiusError::MalformedAttributeError {
            error: format!("{}: value is {} octets long, limit is {}", attribute.name(), bytes.len(), MAX_ATTRIBUTE_VALUE_LENGTH)
        });
    }
    Ok(bytes)
}

/// Decodes attribute value bytes (without Type & Length octets) into typed value
///
/// Numeric values are returned as numbers; symbolic names are available through
/// [Dictionary::value_name]
pub fn decode_value(attribute: &DictionaryAttribute, bytes: &[u8]) -> Result<AttributeValue, RadiusError> {
    let value = match attribute.code_type() {
        SupportedAttributeTypes::AsciiString => match String::from_utf8(bytes.to_vec()) {
            Ok(text)   => AttributeValue::Text(text),
            Err(error) => AttributeValue::Octets(error.into_bytes())
        },
        SupportedAttributeTypes::ByteString |
        SupportedAttributeTypes::ABinary    |
        SupportedAttributeTypes::Tlv        => AttributeValue::Octets(bytes.to_vec()),
        SupportedAttributeTypes::Integer    => AttributeValue::Integer(i64::from(bytes_to_integer(bytes).map_err(|error| named(attribute, error))?)),
        SupportedAttributeTypes::Byte       => {
            let byte: [u8; 1] = bytes.try_into().map_err(|_| wrong_width(attribute, bytes))?;
            AttributeValue::Integer(i64::from(byte[0]))
        },
        SupportedAttributeTypes::Short      => {
            let short: [u8; 2] = bytes.try_into().map_err(|_| wrong_width(attribute, bytes))?;
            AttributeValue::Integer(i64::from(u16::from_be_bytes(short)))
        },
        SupportedAttributeTypes::Signed     => {
            let signed: [u8; 4] = bytes.try_into().map_err(|_| wrong_width(attribute, bytes))?;
            AttributeValue::Integer(i64::from(i32::from_be_bytes(signed)))
        },
        SupportedAttributeTypes::Integer64  => AttributeValue::Integer64(bytes_to_integer64(bytes).map_err(|error| named(attribute, error))?),
        SupportedAttributeTypes::IPv4Addr   => AttributeValue::Ipv4(bytes_to_ipv4(bytes).map_err(|error| named(attribute, error))?),
        SupportedAttributeTypes::Date       => AttributeValue::Date(bytes_to_timestamp(bytes).map_err(|error| named(attribute, error))?),
        SupportedAttributeTypes::IPv6Addr   => AttributeValue::Ipv6(bytes_to_ipv6(bytes).map_err(|error| named(attribute, error))?),
        SupportedAttributeTypes::IPv6Prefix => {
            let (address, length) = bytes_to_ipv6_prefix(bytes).map_err(|error| named(attribute, error))?;
            AttributeValue::Ipv6Prefix(address, length)
        },
        SupportedAttributeTypes::InterfaceId => AttributeValue::InterfaceId(bytes.try_into().map_err(|_| wrong_width(attribute, bytes))?),
        SupportedAttributeTypes::Ethernet    => AttributeValue::Ether(bytes.try_into().map_err(|_| wrong_width(attribute, bytes))?),
        SupportedAttributeTypes::IntegerTag  => {
            if bytes.len() != 4 {
                return Err(wrong_width(attribute, bytes));
            }
            let integer = u32::from_be_bytes([0, bytes[1], bytes[2], bytes[3]]);
            AttributeValue::Tagged(bytes[0], Box::new(AttributeValue::Integer(i64::from(integer))))
        },
        SupportedAttributeTypes::Integer64Tag => {
            if bytes.len() != 9 {
                return Err(wrong_width(attribute, bytes));
            }
            let integer = bytes_to_integer64(&bytes[1..]).map_err(|error| named(attribute, error))?;
            AttributeValue::Tagged(bytes[0], Box::new(AttributeValue::Integer64(integer)))
        },
        SupportedAttributeTypes::ByteStringTag => {
            let (tag, rest) = bytes.split_first().ok_or_else(|| wrong_width(attribute, bytes))?;
            AttributeValue::Tagged(*tag, Box::new(AttributeValue::Octets(rest.to_vec())))
        }
    };
    Ok(value)
}

/// Wraps attribute value bytes into TLV; vendor attributes are wrapped into Vendor-Specific envelope
///
/// ```text
/// [Type][Length][Value ...]
/// [26][Length][Vendor-Id:4][Vendor-Type:t][Vendor-Length:l][Value ...]
/// ```
pub fn encode_tlv(dictionary: &Dictionary, attribute: &DictionaryAttribute, value: &[u8]) -> Result<Vec<u8>, RadiusError> {
    let too_long = |length: usize| RadiusError::MalformedAttributeError {
        error: format!("{}: encoded attribute is {} octets long, limit is 255", attribute.name(), length)
    };

    match attribute.vendor_id() {
        None => {
            let length = 2 + value.len();
            if length > 255 {
                return Err(too_long(length));
            }
            let mut bytes = Vec::with_capacity(length);
            bytes.push(attribute.code() as u8);
            bytes.push(length as u8);
            bytes.extend_from_slice(value);
            Ok(bytes)
        },
        Some(vendor_id) => {
            let vendor        = dictionary.vendor_by_id(vendor_id)?;
            let type_octets   = usize::from(vendor.type_octets());
            let length_octets = usize::from(vendor.length_octets());
            let vendor_length = type_octets + length_octets + value.len();
            let length        = 2 + 4 + vendor_length;
            if length > 255 {
                return Err(too_long(length));
            }

            let mut bytes = Vec::with_capacity(length);
            bytes.push(VENDOR_SPECIFIC_TYPE);
            bytes.push(length as u8);
            bytes.extend_from_slice(&vendor_id.to_be_bytes());
            bytes.extend_from_slice(&attribute.code().to_be_bytes()[4 - type_octets..]);
            bytes.extend_from_slice(&(vendor_length as u32).to_be_bytes()[4 - length_octets..]);
            bytes.extend_from_slice(value);
            Ok(bytes)
        }
    }
}

/// Splits attribute section of RADIUS packet into dictionary attributes and their value bytes
///
/// Truncated TLVs, unknown attribute codes and unknown vendors are reported as
/// `MalformedPacketError`
pub fn decode_tlvs<'d>(dictionary: &'d Dictionary, bytes: &[u8]) -> Result<Vec<(&'d DictionaryAttribute, Vec<u8>)>, RadiusError> {
    let mut attributes = Vec::new();
    let mut offset     = 0;

    while offset < bytes.len() {
        if offset + 2 > bytes.len() {
            return Err(malformed_packet(format!("truncated attribute header at offset {}", offset)));
        }

        let attr_id     = bytes[offset];
        let attr_length = usize::from(bytes[offset + 1]);
        if attr_length < 2 || offset + attr_length > bytes.len() {
            return Err(malformed_packet(format!("attribute with ID: {} at offset {} declares invalid length {}", attr_id, offset, attr_length)));
        }
        let attr_value = &bytes[offset + 2..offset + attr_length];

        if attr_id == VENDOR_SPECIFIC_TYPE {
            decode_vendor_specific(dictionary, attr_value, &mut attributes)?;
        } else {
            let attribute = dictionary.attribute_by_code(u32::from(attr_id), None)
                .map_err(|_| malformed_packet(format!("attribute with ID: {} is not found in dictionary", attr_id)))?;
            attributes.push((attribute, attr_value.to_vec()));
        }
        offset += attr_length;
    }

    Ok(attributes)
}

fn decode_vendor_specific<'d>(dictionary: &'d Dictionary, bytes: &[u8], attributes: &mut Vec<(&'d DictionaryAttribute, Vec<u8>)>) -> Result<(), RadiusError> {
    if bytes.len() < 4 {
        return Err(malformed_packet(String::from("Vendor-Specific attribute is too short")));
    }

    let vendor_id = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let vendor    = dictionary.vendor_by_id(vendor_id).map_err(|_| malformed_packet(format!("vendor with ID: {} is not found in dictionary", vendor_id)))?;
    let data      = &bytes[4..];
    let mut offset = 0;

    while offset < data.len() {
        let (code, value, consumed) = read_vendor_attribute(vendor, &data[offset..])?;
        let attribute = dictionary.attribute_by_code(code, Some(vendor_id))
            .map_err(|_| malformed_packet(format!("attribute with ID: {} of vendor {} is not found in dictionary", code, vendor.name())))?;
        attributes.push((attribute, value.to_vec()));
        offset += consumed;
    }
    Ok(())
}

fn read_vendor_attribute<'b>(vendor: &DictionaryVendor, data: &'b [u8]) -> Result<(u32, &'b [u8], usize), RadiusError> {
    let type_octets   = usize::from(vendor.type_octets());
    let length_octets = usize::from(vendor.length_octets());
    let header        = type_octets + length_octets;

    if data.len() < header {
        return Err(malformed_packet(format!("truncated attribute header of vendor {}", vendor.name())));
    }

    let code = read_be(&data[..type_octets]);
    if length_octets == 0 {
        return Ok((code, &data[header..], data.len()));
    }

    let length = read_be(&data[type_octets..header]) as usize;
    if length < header || length > data.len() {
        return Err(malformed_packet(format!("attribute with ID: {} of vendor {} declares invalid length {}", code, vendor.name(), length)));
    }
    Ok((code, &data[header..length], length))
}

fn read_be(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |accumulator, byte| (accumulator << 8) | u32::from(*byte))
}

fn resolve_named_value(dictionary: &Dictionary, attribute: &DictionaryAttribute, value: &AttributeValue) -> Result<AttributeValue, RadiusError> {
    match value {
        AttributeValue::Text(text) => {
            if let Some(dict_value) = dictionary.value_by_name(attribute.name(), text) {
                return Ok(AttributeValue::Integer(dict_value.value()));
            }
            text.trim().parse::<i64>()
                .map(AttributeValue::Integer)
                .map_err(|_| RadiusError::MalformedAttributeError { error: format!("{}: {} is neither a number nor a known VALUE", attribute.name(), text) })
        },
        other => Ok(other.clone())
    }
}

fn octets(attribute: &DictionaryAttribute, value: &AttributeValue) -> Result<Vec<u8>, RadiusError> {
    match value {
        AttributeValue::Octets(bytes) => Ok(bytes.clone()),
        AttributeValue::Text(text)    => Ok(text.as_bytes().to_vec()),
        _                             => Err(type_mismatch(attribute, value))
    }
}

fn integer_in_range(attribute: &DictionaryAttribute, value: &AttributeValue, min: i64, max: i64) -> Result<i64, RadiusError> {
    let integer = match value {
        AttributeValue::Integer(integer)                                => *integer,
        AttributeValue::Integer64(integer) if *integer <= i64::MAX as u64 => *integer as i64,
        AttributeValue::Date(timestamp)                                 => i64::from(*timestamp),
        _                                                               => return Err(type_mismatch(attribute, value))
    };

    if integer < min || integer > max {
        return Err(RadiusError::MalformedAttributeError {
            error: format!("{}: value {} is out of range for type {}", attribute.name(), integer, attribute.code_type().token())
        });
    }
    Ok(integer)
}

fn integer64(attribute: &DictionaryAttribute, value: &AttributeValue) -> Result<u64, RadiusError> {
    match value {
        AttributeValue::Integer64(integer) => Ok(*integer),
        _                                  => integer_in_range(attribute, value, 0, i64::MAX).map(|integer| integer as u64)
    }
}

fn parse_ipv6_prefix(text: &str) -> Option<Vec<u8>> {
    if !text.contains('/') {
        return None;
    }
    ipv6_string_to_bytes(text).ok()
}

fn type_mismatch(attribute: &DictionaryAttribute, value: &AttributeValue) -> RadiusError {
    RadiusError::MalformedAttributeError {
        error: format!("{}: value {} can not be encoded as {}", attribute.name(), value, attribute.code_type().token())
    }
}

fn wrong_width(attribute: &DictionaryAttribute, bytes: &[u8]) -> RadiusError {
    RadiusError::MalformedAttributeError {
        error: format!("{}: {} octets do not match type {}", attribute.name(), bytes.len(), attribute.code_type().token())
    }
}

fn named(attribute: &DictionaryAttribute, error: RadiusError) -> RadiusError {
    match error {
        RadiusError::MalformedAttributeError { error } => RadiusError::MalformedAttributeError { error: format!("{}: {}", attribute.name(), error) },
        other                                          => other
    }
}

fn malformed_packet(error: String) -> RadiusError {
    RadiusError::MalformedPacketError { error }
}
