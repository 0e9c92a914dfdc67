use ::base64::{
    engine::{general_purpose::STANDARD, Engine},
    DecodeError,
};

/// Maximum length of an encoded line in a MIME body, RFC 2045 section 6.8
pub(crate) const LINE_LENGTH: usize = 76;

pub(crate) fn encode<T: AsRef<[u8]>>(input: T) -> String {
    STANDARD.encode(input)
}

#[cfg_attr(not(test), allow(dead_code))]
pub(crate) fn decode<T: AsRef<[u8]>>(input: T) -> Result<Vec<u8>, DecodeError> {
    STANDARD.decode(input)
}

/// Encodes `input` and splits the result in lines of at most [`LINE_LENGTH`] characters
pub(crate) fn encode_lines<T: AsRef<[u8]>>(input: T) -> Vec<String> {
    let encoded = encode(input);
    // base64 output is ASCII, so byte chunks are char boundaries
    encoded
        .as_bytes()
        .chunks(LINE_LENGTH)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}
