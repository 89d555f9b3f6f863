//! Authenticator & password hiding primitives (RFC 2865 section 3 & 5.2, RFC 2866 section 3,
//! RFC 2869 section 5.14)


use super::error::RadiusError;

use hmac::{ Hmac, Mac };
use md5::{ Digest, Md5 };
use rand::Rng;


type HmacMd5 = Hmac<Md5>;

/// Longest password, that could be hidden into User-Password attribute
pub const MAX_PASSWORD_LENGTH: usize = 128;

const BLOCK_SIZE: usize = 16;


/// Generates random 16 octets Request Authenticator
pub fn create_authenticator() -> [u8; 16] {
    let mut authenticator = [0u8; 16];
    rand::thread_rng().fill(&mut authenticator);
    authenticator
}

/// Generates random packet identifier
pub fn create_id() -> u8 {
    rand::thread_rng().gen()
}

/// Hides password the way User-Password attribute requires
///
/// Password is padded with NULs to a multiple of 16 octets (empty password becomes 16 NULs),
/// then every block is XORed with `MD5(secret + previous)`, where `previous` is Request
/// Authenticator for the first block and previous ciphertext block afterwards
pub fn encrypt_password(password: &[u8], secret: &[u8], authenticator: &[u8; 16]) -> Result<Vec<u8>, RadiusError> {
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(RadiusError::MalformedAttributeError { error: format!("password is {} octets long, limit is {}", password.len(), MAX_PASSWORD_LENGTH) });
    }

    let padded_length = if password.is_empty() { BLOCK_SIZE } else { (password.len() + BLOCK_SIZE - 1) / BLOCK_SIZE * BLOCK_SIZE };
    let mut padded    = password.to_vec();
    padded.resize(padded_length, 0);

    let mut result   = Vec::with_capacity(padded_length);
    let mut previous = authenticator.to_vec();

    for block in padded.chunks(BLOCK_SIZE) {
        let hash = block_hash(secret, &previous);
        let encrypted: Vec<u8> = block.iter().zip(hash.iter()).map(|(byte, key)| byte ^ key).collect();

        result.extend_from_slice(&encrypted);
        previous = encrypted;
    }

    Ok(result)
}

/// Reveals password hidden with [encrypt_password]; trailing NUL padding is stripped
pub fn decrypt_password(encrypted: &[u8], secret: &[u8], authenticator: &[u8; 16]) -> Result<Vec<u8>, RadiusError> {
    if encrypted.is_empty() || encrypted.len() % BLOCK_SIZE != 0 || encrypted.len() > MAX_PASSWORD_LENGTH {
        return Err(RadiusError::MalformedAttributeError { error: format!("hidden password has invalid length {}", encrypted.len()) });
    }

    let mut result   = Vec::with_capacity(encrypted.len());
    let mut previous = &authenticator[..];

    for block in encrypted.chunks(BLOCK_SIZE) {
        let hash = block_hash(secret, previous);
        result.extend(block.iter().zip(hash.iter()).map(|(byte, key)| byte ^ key));
        previous = block;
    }

    while result.last() == Some(&0) {
        result.pop();
    }
    Ok(result)
}

/// Calculates `MD5(Code + Identifier + Length + authenticator + Attributes + secret)` over
/// encoded packet, substituting packet's Authenticator field with given `authenticator`
///
/// With Request Authenticator it produces Response Authenticator; with 16 zero octets it produces
/// Request Authenticator of Accounting, CoA & Disconnect requests
pub fn calculate_authenticator(packet: &[u8], authenticator: &[u8; 16], secret: &[u8]) -> Result<[u8; 16], RadiusError> {
    if packet.len() < 20 {
        return Err(RadiusError::MalformedPacketError { error: format!("packet is {} octets long, shorter than RADIUS header", packet.len()) });
    }

    let mut md5 = Md5::new();
    md5.update(&packet[0..4]);
    md5.update(authenticator);
    md5.update(&packet[20..]);
    md5.update(secret);

    Ok(to_block(&md5.finalize()))
}

/// Calculates Request Authenticator of Accounting-Request (and of CoA/Disconnect requests)
pub fn accounting_authenticator(packet: &[u8], secret: &[u8]) -> Result<[u8; 16], RadiusError> {
    calculate_authenticator(packet, &[0u8; 16], secret)
}

/// Calculates HMAC-MD5 over encoded packet; Message-Authenticator value inside `packet` is
/// expected to be zeroed already
pub fn message_authenticator(packet: &[u8], secret: &[u8]) -> Result<[u8; 16], RadiusError> {
    let mut hmac = HmacMd5::new_from_slice(secret).map_err(|error| RadiusError::ValidationError { error: error.to_string() })?;
    hmac.update(packet);

    Ok(to_block(&hmac.finalize().into_bytes()))
}

fn block_hash(secret: &[u8], previous: &[u8]) -> [u8; 16] {
    let mut md5 = Md5::new();
    md5.update(secret);
    md5.update(previous);
    to_block(&md5.finalize())
}

fn to_block(digest: &[u8]) -> [u8; 16] {
    let mut block = [0u8; 16];
    block.copy_from_slice(digest);
    block
}
