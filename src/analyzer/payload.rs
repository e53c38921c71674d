//! Request body decoding
//!
//! Bodies arrive either as raw MP3 bytes or as base64 text. Base64 input is
//! decoded leniently: ASCII whitespace anywhere is ignored (line-wrapped
//! uploads) and trailing `=` padding is optional.

use crate::error::Result;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use std::borrow::Cow;

const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Turn a request body into the byte buffer handed to the frame scanner
pub fn decode_body(body: &[u8], is_base64_encoded: bool) -> Result<Cow<'_, [u8]>> {
    if !is_base64_encoded {
        return Ok(Cow::Borrowed(body));
    }

    let compact: Vec<u8> = body
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    Ok(Cow::Owned(LENIENT_STANDARD.decode(compact)?))
}
