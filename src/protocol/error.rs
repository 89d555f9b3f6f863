//! Custom errors defined for `radkit` crate


use thiserror::Error;


/// Represents all errors, that could be raised while loading dictionary, encoding/decoding RADIUS
/// packets or talking to a remote RADIUS host
#[derive(Debug, Error)]
pub enum RadiusError {
    /// Dictionary file (or one of its `$INCLUDE`s) could not be parsed
    #[error("Dictionary parse error at {file}:{line}: {error}")]
    DictionaryParseError {
        /// File, in which error was found
        file:  String,
        /// Line number (starting from 1) of the offending line
        line:  usize,
        /// Error description
        error: String
    },
    /// Top level dictionary file could not be opened or read
    #[error("Failed to read dictionary {file}: {error}")]
    DictionaryIoError {
        /// Path to the dictionary
        file:  String,
        /// Underlying IO error
        error: std::io::Error
    },
    /// Attribute is not defined in dictionary
    #[error("Unknown attribute: {attribute}")]
    UnknownAttributeError {
        /// Attribute name or code, that was looked up
        attribute: String
    },
    /// Vendor is not defined in dictionary
    #[error("Unknown vendor: {vendor}")]
    UnknownVendorError {
        /// Vendor name or ID, that was looked up
        vendor: String
    },
    /// Raw bytes do not form a valid RADIUS packet
    #[error("Radius packet is malformed: {error}")]
    MalformedPacketError {
        /// Error description
        error: String
    },
    /// Attribute value does not match the data type of dictionary attribute
    #[error("Attribute in Radius packet is malformed: {error}")]
    MalformedAttributeError {
        /// Error description
        error: String
    },
    /// Packet authenticator, Message-Authenticator or identifier mismatch
    #[error("Verification failed for incoming Radius packet: {error}")]
    ValidationError {
        /// Error description
        error: String
    },
    /// No verified reply was received after all retries were used
    #[error("No valid reply received from RADIUS server after {retries} attempt(s)")]
    TimeoutError {
        /// Number of attempts made
        retries: u16
    },
    /// Socket address could not be parsed or resolved
    #[error("Invalid socket address: {error}")]
    SocketAddrParseError {
        /// Error description
        error: String
    },
    /// Error on socket level (bind, send, receive)
    #[error("Socket connection error: {0}")]
    SocketConnectionError(#[from] std::io::Error),
    /// Socket produced an event, which could not be mapped to RADIUS message type
    #[error("Invalid socket connection: {error}")]
    SocketInvalidConnectionError {
        /// Error description
        error: String
    },
}

impl From<std::net::AddrParseError> for RadiusError {
    fn from(error: std::net::AddrParseError) -> RadiusError {
        RadiusError::SocketAddrParseError { error: error.to_string() }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_parse_error_names_file_and_line() {
        let error = RadiusError::DictionaryParseError {
            file:  String::from("dictionary.test"),
            line:  12,
            error: String::from("unknown type: bogus")
        };

        assert_eq!("Dictionary parse error at dictionary.test:12: unknown type: bogus", error.to_string());
    }

    #[test]
    fn test_addr_parse_error_conversion() {
        let parse_error = "not-an-ip".parse::<std::net::IpAddr>().unwrap_err();

        match RadiusError::from(parse_error) {
            RadiusError::SocketAddrParseError { .. } => {},
            other                                    => panic!("unexpected error: {:?}", other)
        }
    }
}
