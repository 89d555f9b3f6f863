//! RADIUS dictionary: attribute, value and vendor definitions loaded from FreeRADIUS-style
//! dictionary files


use super::error::RadiusError;

use log::debug;
use std::collections::HashMap;
use std::fs::File;
use std::io::{ self, BufRead };
use std::path::{ Path, PathBuf };
use std::str::FromStr;


const COMMENT_PREFIX:    char  = '#';
const MAX_INCLUDE_DEPTH: usize = 32;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Data types, that dictionary attribute could have
pub enum SupportedAttributeTypes {
    /// `string`: UTF-8 text, up to 253 octets
    AsciiString,
    /// `octets`: raw bytes, up to 253 octets
    ByteString,
    /// `integer`: unsigned 32 bit integer
    Integer,
    /// `ipaddr`: IPv4 address
    IPv4Addr,
    /// `date`: 32 bit UNIX timestamp
    Date,
    /// `abinary`: Ascend binary filter, carried as is
    ABinary,
    /// `ipv6addr`: IPv6 address
    IPv6Addr,
    /// `ipv6prefix`: IPv6 prefix (RFC 3162)
    IPv6Prefix,
    /// `byte`: unsigned 8 bit integer
    Byte,
    /// `short`: unsigned 16 bit integer
    Short,
    /// `signed`: signed 32 bit integer
    Signed,
    /// `integer64`: unsigned 64 bit integer
    Integer64,
    /// `tlv`: nested TLV, carried as opaque bytes
    Tlv,
    /// `ifid`: 8 octets interface identifier
    InterfaceId,
    /// `ether`: 6 octets MAC address
    Ethernet,
    /// `integer-tag`: tag octet followed by 24 bit integer (RFC 2868)
    IntegerTag,
    /// `integer64-tag`: tag octet followed by 64 bit integer
    Integer64Tag,
    /// `octets-tag`: tag octet followed by raw bytes (RFC 2868)
    ByteStringTag
}

impl SupportedAttributeTypes {
    /// Maps dictionary type token onto supported type; tokens are case-sensitive
    pub fn from_token(token: &str) -> Option<SupportedAttributeTypes> {
        match token {
            "string"        => Some(SupportedAttributeTypes::AsciiString),
            "octets"        => Some(SupportedAttributeTypes::ByteString),
            "integer"       => Some(SupportedAttributeTypes::Integer),
            "ipaddr"        => Some(SupportedAttributeTypes::IPv4Addr),
            "date"          => Some(SupportedAttributeTypes::Date),
            "abinary"       => Some(SupportedAttributeTypes::ABinary),
            "ipv6addr"      => Some(SupportedAttributeTypes::IPv6Addr),
            "ipv6prefix"    => Some(SupportedAttributeTypes::IPv6Prefix),
            "byte"          => Some(SupportedAttributeTypes::Byte),
            "short"         => Some(SupportedAttributeTypes::Short),
            "signed"        => Some(SupportedAttributeTypes::Signed),
            "integer64"     => Some(SupportedAttributeTypes::Integer64),
            "tlv"           => Some(SupportedAttributeTypes::Tlv),
            "ifid"          => Some(SupportedAttributeTypes::InterfaceId),
            "ether"         => Some(SupportedAttributeTypes::Ethernet),
            "integer-tag"   => Some(SupportedAttributeTypes::IntegerTag),
            "integer64-tag" => Some(SupportedAttributeTypes::Integer64Tag),
            "octets-tag"    => Some(SupportedAttributeTypes::ByteStringTag),
            _               => None
        }
    }

    /// Returns dictionary token for the type
    pub fn token(&self) -> &'static str {
        match self {
            SupportedAttributeTypes::AsciiString   => "string",
            SupportedAttributeTypes::ByteString    => "octets",
            SupportedAttributeTypes::Integer       => "integer",
            SupportedAttributeTypes::IPv4Addr      => "ipaddr",
            SupportedAttributeTypes::Date          => "date",
            SupportedAttributeTypes::ABinary       => "abinary",
            SupportedAttributeTypes::IPv6Addr      => "ipv6addr",
            SupportedAttributeTypes::IPv6Prefix    => "ipv6prefix",
            SupportedAttributeTypes::Byte          => "byte",
            SupportedAttributeTypes::Short         => "short",
            SupportedAttributeTypes::Signed        => "signed",
            SupportedAttributeTypes::Integer64     => "integer64",
            SupportedAttributeTypes::Tlv           => "tlv",
            SupportedAttributeTypes::InterfaceId   => "ifid",
            SupportedAttributeTypes::Ethernet      => "ether",
            SupportedAttributeTypes::IntegerTag    => "integer-tag",
            SupportedAttributeTypes::Integer64Tag  => "integer64-tag",
            SupportedAttributeTypes::ByteStringTag => "octets-tag"
        }
    }

    /// True for types, whose values could be named with VALUE lines
    pub fn is_numeric(&self) -> bool {
        matches!(self,
            SupportedAttributeTypes::Integer   | SupportedAttributeTypes::Byte      |
            SupportedAttributeTypes::Short     | SupportedAttributeTypes::Signed    |
            SupportedAttributeTypes::Integer64 | SupportedAttributeTypes::IntegerTag |
            SupportedAttributeTypes::Integer64Tag)
    }

    fn with_tag(self) -> Option<SupportedAttributeTypes> {
        match self {
            SupportedAttributeTypes::Integer       => Some(SupportedAttributeTypes::IntegerTag),
            SupportedAttributeTypes::Integer64     => Some(SupportedAttributeTypes::Integer64Tag),
            SupportedAttributeTypes::AsciiString   => Some(SupportedAttributeTypes::ByteStringTag),
            SupportedAttributeTypes::ByteString    => Some(SupportedAttributeTypes::ByteStringTag),
            SupportedAttributeTypes::IntegerTag    |
            SupportedAttributeTypes::Integer64Tag  |
            SupportedAttributeTypes::ByteStringTag => Some(self),
            _                                      => None
        }
    }
}


#[derive(Debug, Clone, PartialEq)]
/// Represents ATTRIBUTE line from dictionary file
pub struct DictionaryAttribute {
    name:        String,
    code:        u32,
    code_type:   SupportedAttributeTypes,
    vendor_id:   Option<u32>,
    vendor_name: Option<String>,
    encrypt:     u8
}

impl DictionaryAttribute {
    /// Returns attribute name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns attribute code (vendor-type for vendor specific attributes)
    pub fn code(&self) -> u32 {
        self.code
    }

    /// Returns attribute data type
    pub fn code_type(&self) -> SupportedAttributeTypes {
        self.code_type
    }

    /// Returns ID of the vendor, that attribute belongs to
    pub fn vendor_id(&self) -> Option<u32> {
        self.vendor_id
    }

    /// Returns name of the vendor, that attribute belongs to
    pub fn vendor_name(&self) -> Option<&str> {
        self.vendor_name.as_deref()
    }

    /// Returns `encrypt=` flag value (0 if flag is not set)
    pub fn encrypt(&self) -> u8 {
        self.encrypt
    }

    /// True if attribute value is obscured the same way as User-Password (RFC 2865 5.2)
    pub fn is_password(&self) -> bool {
        self.encrypt == 1 || (self.vendor_id.is_none() && self.code == 2)
    }
}


#[derive(Debug, Clone, PartialEq)]
/// Represents VALUE line from dictionary file
pub struct DictionaryValue {
    attribute_name: String,
    value_name:     String,
    value:          i64
}

impl DictionaryValue {
    /// Returns name of the attribute, that value belongs to
    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    /// Returns symbolic name of the value
    pub fn name(&self) -> &str {
        &self.value_name
    }

    /// Returns numeric value
    pub fn value(&self) -> i64 {
        self.value
    }
}


#[derive(Debug, Clone, PartialEq)]
/// Represents VENDOR line from dictionary file
pub struct DictionaryVendor {
    name:          String,
    id:            u32,
    type_octets:   u8,
    length_octets: u8
}

impl DictionaryVendor {
    /// Returns vendor name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns IANA enterprise number of the vendor
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Returns size of vendor-type field inside Vendor-Specific attribute
    pub fn type_octets(&self) -> u8 {
        self.type_octets
    }

    /// Returns size of vendor-length field inside Vendor-Specific attribute
    pub fn length_octets(&self) -> u8 {
        self.length_octets
    }
}


#[derive(Debug, Default)]
struct ParserState {
    vendor_block: Option<VendorBlock>,
    depth:        usize
}

#[derive(Debug)]
struct VendorBlock {
    vendor: String,
    file:   String,
    line:   usize
}

struct LineContext<'a> {
    file: &'a str,
    line: usize
}

impl<'a> LineContext<'a> {
    fn error(&self, error: String) -> RadiusError {
        RadiusError::DictionaryParseError { file: self.file.to_string(), line: self.line, error }
    }
}


#[derive(Debug, Default, Clone)]
/// Represents RADIUS dictionary
///
/// Dictionary is built once (from one or more files) and is read-only afterwards; Host, Client,
/// Server and RadiusPacket share it through `Arc<Dictionary>`
pub struct Dictionary {
    attributes:      Vec<DictionaryAttribute>,
    attribute_names: HashMap<String, usize>,
    attribute_codes: HashMap<(Option<u32>, u32), usize>,
    values:          Vec<DictionaryValue>,
    value_names:     HashMap<(String, String), usize>,
    value_codes:     HashMap<(String, i64), usize>,
    vendors:         Vec<DictionaryVendor>,
    vendor_names:    HashMap<String, usize>,
    vendor_ids:      HashMap<u32, usize>
}

impl Dictionary {
    /// Loads dictionary from a file; `$INCLUDE`s are resolved relatively to the file's directory
    ///
    /// # Examples
    ///
    /// ```
    /// use radkit::protocol::dictionary::Dictionary;
    ///
    /// let dictionary = Dictionary::from_file("./dict_examples/dictionary").unwrap();
    /// assert_eq!(1, dictionary.attribute("User-Name").unwrap().code());
    /// ```
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> Result<Dictionary, RadiusError> {
        let mut dictionary = Dictionary::default();
        dictionary.load_file(file_path)?;
        Ok(dictionary)
    }

    /// Loads dictionary from several files in sequence; later files extend earlier ones
    pub fn from_files<P: AsRef<Path>>(file_paths: &[P]) -> Result<Dictionary, RadiusError> {
        let mut dictionary = Dictionary::default();
        for file_path in file_paths {
            dictionary.load_file(file_path)?;
        }
        Ok(dictionary)
    }

    /// Loads dictionary from an already opened stream
    ///
    /// Relative `$INCLUDE`s are resolved against the current working directory
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Dictionary, RadiusError> {
        let mut dictionary = Dictionary::default();
        dictionary.load_reader(reader, "<stream>")?;
        Ok(dictionary)
    }

    /// Extends dictionary with definitions from a file
    pub fn load_file<P: AsRef<Path>>(&mut self, file_path: P) -> Result<(), RadiusError> {
        let file_path = file_path.as_ref();
        let file_name = file_path.display().to_string();
        let file      = File::open(file_path).map_err(|error| RadiusError::DictionaryIoError { file: file_name.clone(), error })?;

        let mut state = ParserState::default();
        self.parse_lines(io::BufReader::new(file), &file_name, file_path.parent(), &mut state)?;
        Dictionary::finish(state)
    }

    /// Extends dictionary with definitions from a stream; `name` is used in error messages
    pub fn load_reader<R: BufRead>(&mut self, reader: R, name: &str) -> Result<(), RadiusError> {
        let mut state = ParserState::default();
        self.parse_lines(reader, name, None, &mut state)?;
        Dictionary::finish(state)
    }

    fn finish(state: ParserState) -> Result<(), RadiusError> {
        match state.vendor_block {
            Some(block) => Err(RadiusError::DictionaryParseError { file: block.file, line: block.line, error: format!("BEGIN-VENDOR {} is never closed", block.vendor) }),
            None        => Ok(())
        }
    }

    fn parse_lines<R: BufRead>(&mut self, reader: R, file: &str, base_dir: Option<&Path>, state: &mut ParserState) -> Result<(), RadiusError> {
        for (index, line) in reader.lines().enumerate() {
            let context = LineContext { file, line: index + 1 };
            let line    = line.map_err(|error| context.error(error.to_string()))?;
            let line    = match line.find(COMMENT_PREFIX) {
                Some(position) => &line[..position],
                None           => &line[..]
            };

            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }

            match tokens[0] {
                "ATTRIBUTE"    => self.parse_attribute(&tokens, state, &context)?,
                "VALUE"        => self.parse_value(&tokens, &context)?,
                "VENDOR"       => self.parse_vendor(&tokens, &context)?,
                "BEGIN-VENDOR" => self.parse_begin_vendor(&tokens, state, &context)?,
                "END-VENDOR"   => parse_end_vendor(&tokens, state, &context)?,
                "$INCLUDE"     => self.parse_include(&tokens, base_dir, state, &context)?,
                keyword        => return Err(context.error(format!("unknown keyword: {}", keyword)))
            }
        }
        Ok(())
    }

    fn parse_attribute(&mut self, tokens: &[&str], state: &ParserState, context: &LineContext<'_>) -> Result<(), RadiusError> {
        if tokens.len() != 4 && tokens.len() != 5 {
            return Err(context.error(format!("ATTRIBUTE expects 3 or 4 arguments, got {}", tokens.len() - 1)));
        }

        let name          = tokens[1];
        let code          = parse_number(tokens[2]).ok_or_else(|| context.error(format!("invalid attribute code: {}", tokens[2])))?;
        let mut code_type = SupportedAttributeTypes::from_token(tokens[3]).ok_or_else(|| context.error(format!("unknown attribute type: {}", tokens[3])))?;
        let mut vendor    = state.vendor_block.as_ref().map(|block| block.vendor.clone());
        let mut encrypt   = 0u8;

        if let Some(&extra) = tokens.get(4) {
            if is_flag_list(extra) {
                for flag in extra.split(',') {
                    match flag.split_once('=') {
                        Some(("encrypt", method)) => {
                            encrypt = method.parse::<u8>().ok().filter(|method| *method <= 3).ok_or_else(|| context.error(format!("invalid encrypt method: {}", method)))?;
                        },
                        None if flag == "has_tag" => {
                            code_type = code_type.with_tag().ok_or_else(|| context.error(format!("has_tag is not supported for type {}", code_type.token())))?;
                        },
                        _ => return Err(context.error(format!("unsupported attribute flag: {}", flag)))
                    }
                }
            } else {
                vendor = Some(extra.to_string());
            }
        }

        let vendor_id = match &vendor {
            Some(vendor_name) => {
                let dict_vendor = self.vendor(vendor_name).map_err(|_| context.error(format!("unknown vendor: {}", vendor_name)))?;
                let max_code    = match dict_vendor.type_octets {
                    1 => 0xff,
                    2 => 0xffff,
                    _ => u64::from(u32::MAX)
                };
                if code > max_code {
                    return Err(context.error(format!("attribute code {} does not fit vendor {} type field", code, vendor_name)));
                }
                Some(dict_vendor.id)
            },
            None => {
                if code == 0 || code > 255 {
                    return Err(context.error(format!("attribute code {} is out of range 1-255", code)));
                }
                None
            }
        };

        let attribute = DictionaryAttribute {
            name:        name.to_string(),
            code:        code as u32,
            code_type:   code_type,
            vendor_id:   vendor_id,
            vendor_name: vendor,
            encrypt:     encrypt
        };
        self.add_attribute(attribute).map_err(|error| context.error(error))
    }

    fn add_attribute(&mut self, attribute: DictionaryAttribute) -> Result<(), String> {
        if let Some(&index) = self.attribute_names.get(&attribute.name) {
            if self.attributes[index] == attribute {
                return Ok(());
            }
            return Err(format!("duplicate attribute: {}", attribute.name));
        }

        let key = (attribute.vendor_id, attribute.code);
        if let Some(&index) = self.attribute_codes.get(&key) {
            return Err(format!("attribute code {} is already defined as {}", attribute.code, self.attributes[index].name));
        }

        self.attribute_names.insert(attribute.name.clone(), self.attributes.len());
        self.attribute_codes.insert(key, self.attributes.len());
        self.attributes.push(attribute);
        Ok(())
    }

    fn parse_value(&mut self, tokens: &[&str], context: &LineContext<'_>) -> Result<(), RadiusError> {
        if tokens.len() != 4 {
            return Err(context.error(format!("VALUE expects 3 arguments, got {}", tokens.len() - 1)));
        }

        let attribute_name = tokens[1];
        if !self.attribute_names.contains_key(attribute_name) {
            return Err(context.error(format!("VALUE defined for unknown attribute: {}", attribute_name)));
        }

        let value = parse_signed_number(tokens[3]).ok_or_else(|| context.error(format!("invalid value: {}", tokens[3])))?;
        let dict_value = DictionaryValue {
            attribute_name: attribute_name.to_string(),
            value_name:     tokens[2].to_string(),
            value:          value
        };

        let name_key = (dict_value.attribute_name.clone(), dict_value.value_name.clone());
        if let Some(&index) = self.value_names.get(&name_key) {
            if self.values[index] == dict_value {
                return Ok(());
            }
            return Err(context.error(format!("duplicate value {} for attribute {}", dict_value.value_name, attribute_name)));
        }

        // Several names could share one number; the first one is used when decoding
        self.value_codes.entry((dict_value.attribute_name.clone(), value)).or_insert(self.values.len());
        self.value_names.insert(name_key, self.values.len());
        self.values.push(dict_value);
        Ok(())
    }

    fn parse_vendor(&mut self, tokens: &[&str], context: &LineContext<'_>) -> Result<(), RadiusError> {
        if tokens.len() != 3 && tokens.len() != 4 {
            return Err(context.error(format!("VENDOR expects 2 or 3 arguments, got {}", tokens.len() - 1)));
        }

        let id = parse_number(tokens[2])
            .filter(|id| *id <= u64::from(u32::MAX))
            .ok_or_else(|| context.error(format!("invalid vendor id: {}", tokens[2])))? as u32;

        let (type_octets, length_octets) = match tokens.get(3) {
            Some(format) => parse_vendor_format(format).ok_or_else(|| context.error(format!("invalid vendor format: {}", format)))?,
            None         => (1, 1)
        };

        let vendor = DictionaryVendor { name: tokens[1].to_string(), id, type_octets, length_octets };

        if let Some(&index) = self.vendor_names.get(&vendor.name) {
            if self.vendors[index] == vendor {
                return Ok(());
            }
            return Err(context.error(format!("duplicate vendor: {}", vendor.name)));
        }
        if let Some(&index) = self.vendor_ids.get(&vendor.id) {
            return Err(context.error(format!("vendor id {} is already defined as {}", vendor.id, self.vendors[index].name)));
        }

        self.vendor_names.insert(vendor.name.clone(), self.vendors.len());
        self.vendor_ids.insert(vendor.id, self.vendors.len());
        self.vendors.push(vendor);
        Ok(())
    }

    fn parse_begin_vendor(&self, tokens: &[&str], state: &mut ParserState, context: &LineContext<'_>) -> Result<(), RadiusError> {
        if tokens.len() != 2 {
            return Err(context.error(format!("BEGIN-VENDOR expects 1 argument, got {}", tokens.len() - 1)));
        }
        if let Some(open_block) = &state.vendor_block {
            return Err(context.error(format!("BEGIN-VENDOR {} inside BEGIN-VENDOR {}", tokens[1], open_block.vendor)));
        }
        if !self.vendor_names.contains_key(tokens[1]) {
            return Err(context.error(format!("BEGIN-VENDOR for unknown vendor: {}", tokens[1])));
        }

        state.vendor_block = Some(VendorBlock { vendor: tokens[1].to_string(), file: context.file.to_string(), line: context.line });
        Ok(())
    }

    fn parse_include(&mut self, tokens: &[&str], base_dir: Option<&Path>, state: &mut ParserState, context: &LineContext<'_>) -> Result<(), RadiusError> {
        if tokens.len() != 2 {
            return Err(context.error(format!("$INCLUDE expects 1 argument, got {}", tokens.len() - 1)));
        }
        if state.depth >= MAX_INCLUDE_DEPTH {
            return Err(context.error(format!("$INCLUDE nested deeper than {} levels", MAX_INCLUDE_DEPTH)));
        }

        let include_path: PathBuf = match base_dir {
            Some(base_dir) if Path::new(tokens[1]).is_relative() => base_dir.join(tokens[1]),
            _                                                    => PathBuf::from(tokens[1])
        };
        let include_name = include_path.display().to_string();
        let file         = File::open(&include_path).map_err(|error| context.error(format!("cannot open included file {}: {}", include_name, error)))?;

        debug!("Including dictionary {} from {}:{}", include_name, context.file, context.line);

        state.depth += 1;
        self.parse_lines(io::BufReader::new(file), &include_name, include_path.parent(), state)?;
        state.depth -= 1;
        Ok(())
    }

    // === Lookups ===
    /// Returns all attributes in definition order
    pub fn attributes(&self) -> &[DictionaryAttribute] {
        &self.attributes
    }

    /// Returns all values in definition order
    pub fn values(&self) -> &[DictionaryValue] {
        &self.values
    }

    /// Returns all vendors in definition order
    pub fn vendors(&self) -> &[DictionaryVendor] {
        &self.vendors
    }

    /// Returns attribute with given name
    pub fn attribute(&self, name: &str) -> Result<&DictionaryAttribute, RadiusError> {
        self.attribute_names.get(name)
            .map(|&index| &self.attributes[index])
            .ok_or_else(|| RadiusError::UnknownAttributeError { attribute: name.to_string() })
    }

    /// Returns attribute with given code; `vendor_id` is `None` for standard attributes
    pub fn attribute_by_code(&self, code: u32, vendor_id: Option<u32>) -> Result<&DictionaryAttribute, RadiusError> {
        self.attribute_codes.get(&(vendor_id, code))
            .map(|&index| &self.attributes[index])
            .ok_or_else(|| RadiusError::UnknownAttributeError {
                attribute: match vendor_id {
                    Some(vendor_id) => format!("{} (vendor {})", code, vendor_id),
                    None            => code.to_string()
                }
            })
    }

    /// Checks whether attribute with given name is defined
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute_names.contains_key(name)
    }

    /// Returns vendor with given name
    pub fn vendor(&self, name: &str) -> Result<&DictionaryVendor, RadiusError> {
        self.vendor_names.get(name)
            .map(|&index| &self.vendors[index])
            .ok_or_else(|| RadiusError::UnknownVendorError { vendor: name.to_string() })
    }

    /// Returns vendor with given ID
    pub fn vendor_by_id(&self, id: u32) -> Result<&DictionaryVendor, RadiusError> {
        self.vendor_ids.get(&id)
            .map(|&index| &self.vendors[index])
            .ok_or_else(|| RadiusError::UnknownVendorError { vendor: id.to_string() })
    }

    /// Returns VALUE with given attribute & value name
    pub fn value_by_name(&self, attribute_name: &str, value_name: &str) -> Option<&DictionaryValue> {
        self.value_names.get(&(attribute_name.to_string(), value_name.to_string()))
            .map(|&index| &self.values[index])
    }

    /// Returns symbolic name for attribute's numeric value
    pub fn value_name(&self, attribute_name: &str, value: i64) -> Option<&str> {
        self.value_codes.get(&(attribute_name.to_string(), value))
            .map(|&index| self.values[index].name())
    }
}

impl FromStr for Dictionary {
    type Err = RadiusError;

    fn from_str(dictionary_str: &str) -> Result<Dictionary, RadiusError> {
        let mut dictionary = Dictionary::default();
        dictionary.load_reader(dictionary_str.as_bytes(), "<string>")?;
        Ok(dictionary)
    }
}


fn parse_end_vendor(tokens: &[&str], state: &mut ParserState, context: &LineContext<'_>) -> Result<(), RadiusError> {
    if tokens.len() != 2 {
        return Err(context.error(format!("END-VENDOR expects 1 argument, got {}", tokens.len() - 1)));
    }
    match &state.vendor_block {
        Some(open_block) if open_block.vendor == tokens[1] => {
            state.vendor_block = None;
            Ok(())
        },
        Some(open_block) => Err(context.error(format!("END-VENDOR {} does not match BEGIN-VENDOR {}", tokens[1], open_block.vendor))),
        None              => Err(context.error(format!("END-VENDOR {} without BEGIN-VENDOR", tokens[1])))
    }
}

fn is_flag_list(token: &str) -> bool {
    token.contains('=') || token.split(',').any(|flag| flag == "has_tag")
}

fn parse_number(token: &str) -> Option<u64> {
    match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None      => token.parse::<u64>().ok()
    }
}

fn parse_signed_number(token: &str) -> Option<i64> {
    match token.strip_prefix('-') {
        Some(positive) => parse_number(positive).filter(|value| *value <= i64::MAX as u64).map(|value| -(value as i64)),
        None           => parse_number(token).map(|value| value as i64)
    }
}

fn parse_vendor_format(format: &str) -> Option<(u8, u8)> {
    let (type_octets, length_octets) = format.strip_prefix("format=")?.split_once(',')?;
    let type_octets   = type_octets.parse::<u8>().ok().filter(|octets| matches!(octets, 1 | 2 | 4))?;
    let length_octets = length_octets.parse::<u8>().ok().filter(|octets| matches!(octets, 0 | 1 | 2))?;
    Some((type_octets, length_octets))
}


#[cfg(test)]
mod tests {
    use super::*;

    fn parse_error_line(error: RadiusError) -> (String, usize, String) {
        match error {
            RadiusError::DictionaryParseError { file, line, error } => (file, line, error),
            other                                                   => panic!("unexpected error: {:?}", other)
        }
    }

    #[test]
    fn test_from_file() {
        let dict = Dictionary::from_file("./dict_examples/dictionary").unwrap();

        let user_name = dict.attribute("User-Name").unwrap();
        assert_eq!(1,                                    user_name.code());
        assert_eq!(SupportedAttributeTypes::AsciiString, user_name.code_type());
        assert_eq!(None,                                 user_name.vendor_id());

        let nas_ip = dict.attribute_by_code(4, None).unwrap();
        assert_eq!("NAS-IP-Address",                  nas_ip.name());
        assert_eq!(SupportedAttributeTypes::IPv4Addr, nas_ip.code_type());

        assert!(dict.attribute("User-Password").unwrap().is_password());
    }

    #[test]
    fn test_include_is_resolved_relatively_to_including_file() {
        let dict = Dictionary::from_file("./dict_examples/include/dictionary.main").unwrap();

        assert_eq!(1,  dict.attribute("User-Name").unwrap().code());
        assert_eq!(241, dict.attribute("Sub-Attribute").unwrap().code());
        assert_eq!(240, dict.attribute("Leaf-Attribute").unwrap().code());
        assert_eq!(Some(1), dict.value_by_name("Leaf-Attribute", "Leaf-One").map(|value| value.value()));
    }

    #[test]
    fn test_missing_include_names_offending_line() {
        let error = Dictionary::from_file("./dict_examples/broken/missing_include").unwrap_err();
        let (file, line, message) = parse_error_line(error);

        assert!(file.ends_with("missing_include"));
        assert_eq!(3, line);
        assert!(message.contains("does_not_exist"));
    }

    #[test]
    fn test_values_lookup_both_ways() {
        let dict = Dictionary::from_file("./dict_examples/dictionary").unwrap();

        let value = dict.value_by_name("Service-Type", "Login-User").unwrap();
        assert_eq!("Service-Type", value.attribute_name());
        assert_eq!("Login-User",   value.name());
        assert_eq!(1,              value.value());

        assert_eq!(Some("Framed-User"), dict.value_name("Service-Type", 2));
        assert_eq!(None,                dict.value_name("Service-Type", 9999));
        assert_eq!(None,                dict.value_by_name("Service-Type", "Lin-User"));
    }

    #[test]
    fn test_vendor_block() {
        let dict = Dictionary::from_str("
            VENDOR       Somevendor 10
            VENDOR       Widevendor 0x20 format=2,2
            BEGIN-VENDOR Somevendor
            ATTRIBUTE    Somevendor-Name   1 string
            ATTRIBUTE    Somevendor-Number 2 integer
            END-VENDOR   Somevendor
            ATTRIBUTE    Wide-Attribute 300 octets Widevendor
            ATTRIBUTE    User-Name 1 string
        ").unwrap();

        let vendor = dict.vendor("Somevendor").unwrap();
        assert_eq!(10, vendor.id());
        assert_eq!(1,  vendor.type_octets());
        assert_eq!(1,  vendor.length_octets());

        let wide = dict.vendor_by_id(32).unwrap();
        assert_eq!("Widevendor", wide.name());
        assert_eq!(2,            wide.type_octets());
        assert_eq!(2,            wide.length_octets());

        let number = dict.attribute("Somevendor-Number").unwrap();
        assert_eq!(Some(10),           number.vendor_id());
        assert_eq!(Some("Somevendor"), number.vendor_name());
        assert_eq!(number, dict.attribute_by_code(2, Some(10)).unwrap());

        assert_eq!(Some(32), dict.attribute("Wide-Attribute").unwrap().vendor_id());
        assert_eq!(None,     dict.attribute("User-Name").unwrap().vendor_id());
    }

    #[test]
    fn test_hex_codes_comments_and_flags() {
        let dict = Dictionary::from_str("
            # full line comment
            ATTRIBUTE Tunnel-Type     0x40 integer has_tag   # trailing comment
            ATTRIBUTE Tunnel-Password 69   string  has_tag,encrypt=2
            ATTRIBUTE Secret-Thing    200  string  encrypt=1
            VALUE     Tunnel-Type     VLAN 0x0d
        ").unwrap();

        let tunnel_type = dict.attribute("Tunnel-Type").unwrap();
        assert_eq!(64,                                  tunnel_type.code());
        assert_eq!(SupportedAttributeTypes::IntegerTag, tunnel_type.code_type());
        assert_eq!(13, dict.value_by_name("Tunnel-Type", "VLAN").unwrap().value());

        let tunnel_password = dict.attribute("Tunnel-Password").unwrap();
        assert_eq!(SupportedAttributeTypes::ByteStringTag, tunnel_password.code_type());
        assert_eq!(2, tunnel_password.encrypt());
        assert!(!tunnel_password.is_password());

        assert!(dict.attribute("Secret-Thing").unwrap().is_password());
    }

    #[test]
    fn test_unknown_lookups() {
        let dict = Dictionary::from_str("ATTRIBUTE User-Name 1 string").unwrap();

        match dict.attribute("Nope") {
            Err(RadiusError::UnknownAttributeError { attribute }) => assert_eq!("Nope", attribute),
            other                                                 => panic!("unexpected result: {:?}", other)
        }
        assert!(matches!(dict.attribute_by_code(2, None), Err(RadiusError::UnknownAttributeError { .. })));
        assert!(matches!(dict.vendor("Nobody"),           Err(RadiusError::UnknownVendorError { .. })));
        assert!(matches!(dict.vendor_by_id(99),           Err(RadiusError::UnknownVendorError { .. })));
    }

    #[test]
    fn test_identical_redefinition_is_accepted() {
        let dict = Dictionary::from_str("
            ATTRIBUTE Service-Type 6 integer
            VALUE     Service-Type Login-User 1
            ATTRIBUTE Service-Type 6 integer
            VALUE     Service-Type Login-User 1
        ").unwrap();

        assert_eq!(1, dict.attributes().len());
        assert_eq!(1, dict.values().len());
    }

    #[test]
    fn test_parse_errors_report_line() {
        let cases = vec![
            ("ATTRIBUTE User-Name 1",                                          1, "expects"),
            ("ATTRIBUTE User-Name 1 bogus",                                    1, "unknown attribute type"),
            ("ATTRIBUTE User-Name 1 String",                                   1, "unknown attribute type"),
            ("ATTRIBUTE User-Name one string",                                 1, "invalid attribute code"),
            ("ATTRIBUTE User-Name 256 string",                                 1, "out of range"),
            ("ATTRIBUTE User-Name 1 string\nATTRIBUTE User-Name 2 string",     2, "duplicate attribute"),
            ("ATTRIBUTE User-Name 1 string\nATTRIBUTE Login-Name 1 string",    2, "already defined"),
            ("ATTRIBUTE Vendor-Thing 1 string Acme",                           1, "unknown vendor"),
            ("VALUE Service-Type Login-User 1",                                1, "unknown attribute"),
            ("ATTRIBUTE Service-Type 6 integer\nVALUE Service-Type Login-User 1\nVALUE Service-Type Login-User 2", 3, "duplicate value"),
            ("VENDOR Acme 9 format=3,1",                                       1, "invalid vendor format"),
            ("VENDOR Acme 9\nBEGIN-VENDOR Acme\nEND-VENDOR Other",             3, "does not match"),
            ("END-VENDOR Acme",                                                1, "without BEGIN-VENDOR"),
            ("BEGIN-VENDOR Acme",                                              1, "unknown vendor"),
            ("VENDOR Acme 9\nBEGIN-VENDOR Acme\nATTRIBUTE Acme-Big 256 string", 3, "does not fit"),
            ("ATTRIBUTE Address 8 ipaddr has_tag",                             1, "has_tag is not supported"),
            ("ATTRIBUTE Thing 8 string array",                                 1, "unknown vendor"),
            ("PROTOCOL radius 1",                                              1, "unknown keyword"),
        ];

        for (dictionary, expected_line, expected_message) in cases {
            let (file, line, message) = parse_error_line(Dictionary::from_str(dictionary).unwrap_err());
            assert_eq!("<string>",    file,  "dictionary: {}", dictionary);
            assert_eq!(expected_line, line,  "dictionary: {}", dictionary);
            assert!(message.contains(expected_message), "dictionary: {}, message: {}", dictionary, message);
        }
    }

    #[test]
    fn test_unclosed_vendor_block() {
        let error = Dictionary::from_str("VENDOR Acme 9\n# Acme attributes\nBEGIN-VENDOR Acme\nATTRIBUTE Acme-Name 1 string").unwrap_err();
        let (file, line, message) = parse_error_line(error);
        assert_eq!("<string>", file);
        assert_eq!(3,          line);
        assert!(message.contains("BEGIN-VENDOR Acme is never closed"));
    }

    #[test]
    fn test_from_files_extend_each_other() {
        let dict = Dictionary::from_files(&["./dict_examples/dictionary", "./dict_examples/dictionary.extra"]).unwrap();

        assert!(dict.has_attribute("User-Name"));
        assert!(dict.has_attribute("Extra-Flag"));
        assert_eq!(Some("Enabled"), dict.value_name("Extra-Flag", 1));
    }

    #[test]
    fn test_missing_top_level_file() {
        match Dictionary::from_file("./dict_examples/no_such_dictionary") {
            Err(RadiusError::DictionaryIoError { file, .. }) => assert!(file.ends_with("no_such_dictionary")),
            other                                           => panic!("unexpected result: {:?}", other)
        }
    }
}
