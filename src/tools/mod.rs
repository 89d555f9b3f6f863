//! Various helper functions, that are used by attribute codec and could be handy for users
//! working with raw attribute values


use crate::protocol::error::RadiusError;

use std::convert::TryInto;
use std::net::{ Ipv4Addr, Ipv6Addr };


/// Converts u32 into 4 big-endian bytes
pub fn integer_to_bytes(integer: u32) -> Vec<u8> {
    integer.to_be_bytes().to_vec()
}

/// Converts 4 big-endian bytes into u32
pub fn bytes_to_integer(integer: &[u8]) -> Result<u32, RadiusError> {
    let integer: [u8; 4] = integer.try_into().map_err(|_| malformed(format!("invalid Integer bytes: {:?}", integer)))?;
    Ok(u32::from_be_bytes(integer))
}

/// Converts u64 into 8 big-endian bytes
pub fn integer64_to_bytes(integer: u64) -> Vec<u8> {
    integer.to_be_bytes().to_vec()
}

/// Converts 8 big-endian bytes into u64
pub fn bytes_to_integer64(integer: &[u8]) -> Result<u64, RadiusError> {
    let integer: [u8; 8] = integer.try_into().map_err(|_| malformed(format!("invalid Integer64 bytes: {:?}", integer)))?;
    Ok(u64::from_be_bytes(integer))
}

/// Converts UNIX timestamp into 4 big-endian bytes
pub fn timestamp_to_bytes(timestamp: u32) -> Vec<u8> {
    timestamp.to_be_bytes().to_vec()
}

/// Converts 4 big-endian bytes into UNIX timestamp
pub fn bytes_to_timestamp(timestamp: &[u8]) -> Result<u32, RadiusError> {
    let timestamp: [u8; 4] = timestamp.try_into().map_err(|_| malformed(format!("invalid Date bytes: {:?}", timestamp)))?;
    Ok(u32::from_be_bytes(timestamp))
}

/// Converts IPv4 dotted-quad string into 4 bytes
pub fn ipv4_string_to_bytes(ipv4: &str) -> Result<Vec<u8>, RadiusError> {
    let address = ipv4.parse::<Ipv4Addr>().map_err(|_| malformed(format!("invalid IPv4 address: {}", ipv4)))?;
    Ok(address.octets().to_vec())
}

/// Converts 4 bytes into IPv4 address
pub fn bytes_to_ipv4(ipv4: &[u8]) -> Result<Ipv4Addr, RadiusError> {
    let octets: [u8; 4] = ipv4.try_into().map_err(|_| malformed(String::from("invalid IPv4 bytes")))?;
    Ok(Ipv4Addr::from(octets))
}

/// Converts 4 bytes into IPv4 dotted-quad string
pub fn bytes_to_ipv4_string(ipv4: &[u8]) -> Result<String, RadiusError> {
    bytes_to_ipv4(ipv4).map(|address| address.to_string())
}

/// Converts IPv6 string into bytes
///
/// Plain address (`fc66::1`) gives 16 bytes; prefix (`fc66::/64`) gives RFC 3162 layout:
/// reserved octet, prefix length octet and 16 bytes of address
pub fn ipv6_string_to_bytes(ipv6: &str) -> Result<Vec<u8>, RadiusError> {
    match ipv6.split_once('/') {
        Some((address, prefix_length)) => {
            let address       = parse_ipv6(address)?;
            let prefix_length = prefix_length.parse::<u8>().ok().filter(|length| *length <= 128).ok_or_else(|| malformed(format!("invalid IPv6 prefix length: {}", ipv6)))?;
            Ok(ipv6_prefix_to_bytes(&address, prefix_length))
        },
        None => Ok(parse_ipv6(ipv6)?.octets().to_vec())
    }
}

/// Converts IPv6 prefix into RFC 3162 layout
pub fn ipv6_prefix_to_bytes(address: &Ipv6Addr, prefix_length: u8) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(18);
    bytes.push(0);
    bytes.push(prefix_length);
    bytes.extend_from_slice(&address.octets());
    bytes
}

/// Converts 16 bytes into IPv6 address
pub fn bytes_to_ipv6(ipv6: &[u8]) -> Result<Ipv6Addr, RadiusError> {
    let octets: [u8; 16] = ipv6.try_into().map_err(|_| malformed(String::from("invalid IPv6 bytes")))?;
    Ok(Ipv6Addr::from(octets))
}

/// Converts RFC 3162 prefix bytes into IPv6 address and prefix length
///
/// Prefix bytes could be shortened on the wire, missing bytes are treated as zeros
pub fn bytes_to_ipv6_prefix(ipv6: &[u8]) -> Result<(Ipv6Addr, u8), RadiusError> {
    if ipv6.len() < 2 || ipv6.len() > 18 || ipv6[1] > 128 {
        return Err(malformed(String::from("invalid IPv6 prefix bytes")));
    }

    let mut octets = [0u8; 16];
    octets[..ipv6.len() - 2].copy_from_slice(&ipv6[2..]);
    Ok((Ipv6Addr::from(octets), ipv6[1]))
}

/// Converts IPv6 bytes into string; handles both plain address and RFC 3162 prefix layouts
pub fn bytes_to_ipv6_string(ipv6: &[u8]) -> Result<String, RadiusError> {
    if ipv6.len() == 16 {
        bytes_to_ipv6(ipv6).map(|address| address.to_string())
    } else {
        bytes_to_ipv6_prefix(ipv6).map(|(address, prefix_length)| format!("{}/{}", address, prefix_length))
    }
}

/// Converts MAC address (`aa:bb:cc:dd:ee:ff` or `aa-bb-cc-dd-ee-ff`) into 6 bytes
pub fn ether_string_to_bytes(ether: &str) -> Result<[u8; 6], RadiusError> {
    let mut bytes = [0u8; 6];
    parse_hex_groups(ether, &[':', '-'], 1, &mut bytes).ok_or_else(|| malformed(format!("invalid Ethernet address: {}", ether)))?;
    Ok(bytes)
}

/// Converts 6 bytes into MAC address string
pub fn bytes_to_ether_string(ether: &[u8]) -> Result<String, RadiusError> {
    if ether.len() != 6 {
        return Err(malformed(String::from("invalid Ethernet bytes")));
    }
    Ok(ether.iter().map(|byte| format!("{:02x}", byte)).collect::<Vec<String>>().join(":"))
}

/// Converts interface id (`0011:2233:4455:6677`) into 8 bytes
pub fn ifid_string_to_bytes(ifid: &str) -> Result<[u8; 8], RadiusError> {
    let mut bytes = [0u8; 8];
    parse_hex_groups(ifid, &[':'], 2, &mut bytes).ok_or_else(|| malformed(format!("invalid interface id: {}", ifid)))?;
    Ok(bytes)
}

/// Converts 8 bytes into interface id string
pub fn bytes_to_ifid_string(ifid: &[u8]) -> Result<String, RadiusError> {
    if ifid.len() != 8 {
        return Err(malformed(String::from("invalid interface id bytes")));
    }
    Ok(ifid.chunks(2).map(|group| format!("{:02x}{:02x}", group[0], group[1])).collect::<Vec<String>>().join(":"))
}
// -----------------------------------------

fn parse_ipv6(ipv6: &str) -> Result<Ipv6Addr, RadiusError> {
    ipv6.parse::<Ipv6Addr>().map_err(|_| malformed(format!("invalid IPv6 address: {}", ipv6)))
}

fn parse_hex_groups(text: &str, separators: &[char], group_octets: usize, output: &mut [u8]) -> Option<()> {
    let groups: Vec<&str> = text.split(|c: char| separators.contains(&c)).collect();
    if groups.len() * group_octets != output.len() {
        return None;
    }

    for (index, group) in groups.iter().enumerate() {
        if group.is_empty() || group.len() > group_octets * 2 {
            return None;
        }
        let value = u16::from_str_radix(group, 16).ok()?;
        for octet in 0..group_octets {
            output[index * group_octets + octet] = (value >> (8 * (group_octets - 1 - octet))) as u8;
        }
    }
    Some(())
}

fn malformed(error: String) -> RadiusError {
    RadiusError::MalformedAttributeError { error }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_to_bytes() {
        assert_eq!(vec![0, 0, 0, 0],         integer_to_bytes(0));
        assert_eq!(vec![127, 255, 255, 255], integer_to_bytes(2147483647));
        assert_eq!(2147483647, bytes_to_integer(&[127, 255, 255, 255]).unwrap());
    }

    #[test]
    fn test_bytes_to_integer_rejects_wrong_width() {
        assert!(bytes_to_integer(&[0, 0, 1]).is_err());
        assert!(bytes_to_integer(&[0, 0, 0, 0, 1]).is_err());
        assert!(bytes_to_integer64(&[0, 0, 0, 1]).is_err());
    }

    #[test]
    fn test_ipv4_string_to_bytes() {
        assert_eq!(vec![192, 168, 1, 10], ipv4_string_to_bytes("192.168.1.10").unwrap());
        assert_eq!("192.168.1.10",        bytes_to_ipv4_string(&[192, 168, 1, 10]).unwrap());
        assert!(ipv4_string_to_bytes("192.168.1").is_err());
        assert!(bytes_to_ipv4_string(&[192, 168, 1]).is_err());
    }

    #[test]
    fn test_ipv6_to_bytes_wo_subnet() {
        let ipv6_bytes = ipv6_string_to_bytes("fc66::1").unwrap();
        assert_eq!(ipv6_bytes, vec![252, 102, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!("fc66::1", bytes_to_ipv6_string(&ipv6_bytes).unwrap());
    }

    #[test]
    fn test_ipv6_to_bytes_w_subnet() {
        let ipv6_bytes = ipv6_string_to_bytes("fc66::1/64").unwrap();
        assert_eq!(ipv6_bytes, vec![0, 64, 252, 102, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!("fc66::1/64", bytes_to_ipv6_string(&ipv6_bytes).unwrap());
    }

    #[test]
    fn test_shortened_ipv6_prefix() {
        let (address, prefix_length) = bytes_to_ipv6_prefix(&[0, 32, 0x20, 0x01, 0x0d, 0xb8]).unwrap();
        assert_eq!("2001:db8::".parse::<Ipv6Addr>().unwrap(), address);
        assert_eq!(32, prefix_length);
        assert!(bytes_to_ipv6_prefix(&[0, 129]).is_err());
    }

    #[test]
    fn test_ether() {
        let bytes = ether_string_to_bytes("00-04-5F-00-0F-D1").unwrap();
        assert_eq!([0x00, 0x04, 0x5f, 0x00, 0x0f, 0xd1], bytes);
        assert_eq!("00:04:5f:00:0f:d1", bytes_to_ether_string(&bytes).unwrap());
        assert!(ether_string_to_bytes("00:04:5f:00:0f").is_err());
    }

    #[test]
    fn test_ifid() {
        let bytes = ifid_string_to_bytes("0011:2233:4455:6677").unwrap();
        assert_eq!([0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77], bytes);
        assert_eq!("0011:2233:4455:6677", bytes_to_ifid_string(&bytes).unwrap());
    }
}
