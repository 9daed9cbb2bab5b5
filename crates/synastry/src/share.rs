//! Shareable report links: a [`ReportRequest`] carried as base64 JSON in `?q=`.

use crate::request::ReportRequest;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

/// Query parameter that carries the encoded request.
pub const LINK_PARAM: &str = "q";

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, thiserror::Error)]
pub enum InvalidLinkError {
    #[error("shared link is missing its report parameter")]
    Missing,
    #[error("shared link is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("shared link does not decode to UTF-8 text")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("shared link does not contain a valid report request: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Encodes a request as padded standard base64 of its UTF-8 JSON form.
pub fn encode_link(request: &ReportRequest) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(request)?;
    Ok(STANDARD.encode(json))
}

/// Decodes a `q` value. Accepts missing padding, the URL-safe alphabet, and
/// `+` characters that query decoding turned into spaces.
pub fn decode_link(raw: &str) -> Result<ReportRequest, InvalidLinkError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InvalidLinkError::Missing);
    }

    let canonical: String = trimmed
        .chars()
        .map(|ch| match ch {
            ' ' | '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let bytes = LENIENT.decode(canonical.as_bytes())?;
    let json = String::from_utf8(bytes)?;
    Ok(serde_json::from_str(&json)?)
}

/// Builds a relative report URL for the given request.
pub fn report_path(request: &ReportRequest) -> Result<String, serde_json::Error> {
    let encoded = encode_link(request)?;
    Ok(format!("/report?{LINK_PARAM}={}", urlencoding::encode(&encoded)))
}
