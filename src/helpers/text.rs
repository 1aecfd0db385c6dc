//! Text decoding for delimited input files.

use crate::error::SweeperError;
use encoding_rs::Encoding;
use encoding_rs::UTF_8;
use std::borrow::Cow;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextError {
    #[error("File content is not valid {0} text")]
    InvalidEncoding(&'static str),
}

/// Decodes raw file bytes to text.
/// A leading byte order mark selects the encoding and is removed; otherwise UTF-8 is assumed.
/// Malformed sequences are an error rather than being replaced.
pub(crate) fn decode(bytes: &[u8]) -> Result<Cow<'_, str>, SweeperError> {
    let (encoding, bom_length) = Encoding::for_bom(bytes).unwrap_or((UTF_8, 0));
    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes[bom_length..])
        .ok_or_else(|| TextError::InvalidEncoding(encoding.name()).into())
}
