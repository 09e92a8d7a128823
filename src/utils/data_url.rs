//! `data:` URL encoding and decoding for audio payloads.

use crate::{Error, ErrorContext, Result};
use base64::Engine as _;
use bytes::Bytes;

/// A decoded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub data: Bytes,
}

impl DataUrl {
    /// Parse `data:[<mime>][;params][;base64],<payload>`.
    ///
    /// Payloads without the `;base64` marker are taken as literal bytes.
    pub fn parse(url: &str) -> Result<Self> {
        let invalid = |details: &str| {
            Error::validation_with_context(
                "Invalid data URL",
                ErrorContext::new()
                    .with_details(details.to_string())
                    .with_source("data_url"),
            )
        };

        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| invalid("missing `data:` scheme"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| invalid("missing `,` separator"))?;

        let mut parts = header.split(';');
        let mime_type = parts
            .next()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or("text/plain")
            .to_ascii_lowercase();
        let is_base64 = parts.any(|p| p.trim().eq_ignore_ascii_case("base64"));

        let data = if is_base64 {
            base64::engine::general_purpose::STANDARD
                .decode(payload.trim())
                .map_err(|e| invalid(&e.to_string()))?
        } else {
            payload.as_bytes().to_vec()
        };

        Ok(Self {
            mime_type,
            data: Bytes::from(data),
        })
    }

    /// File extension upstream APIs use to sniff the audio container.
    pub fn file_extension(&self) -> &str {
        match self.mime_type.as_str() {
            "audio/mpeg" | "audio/mp3" => "mp3",
            "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
            "audio/ogg" => "ogg",
            "audio/flac" | "audio/x-flac" => "flac",
            "audio/webm" | "video/webm" => "webm",
            other => other
                .split_once('/')
                .map(|(_, sub)| sub)
                .filter(|sub| !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric()))
                .unwrap_or("webm"),
        }
    }
}

/// Encode bytes as a base64 `data:` URL.
pub fn to_data_url(mime_type: &str, data: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base64_audio() {
        let url = to_data_url("audio/webm", b"\x1aE\xdf\xa3 fake webm");
        let parsed = DataUrl::parse(&url).unwrap();
        assert_eq!(parsed.mime_type, "audio/webm");
        assert_eq!(parsed.data.as_ref(), b"\x1aE\xdf\xa3 fake webm");
        assert_eq!(parsed.file_extension(), "webm");
    }

    #[test]
    fn keeps_codec_parameters_out_of_mime() {
        let parsed = DataUrl::parse("data:audio/webm;codecs=opus;base64,AAAA").unwrap();
        assert_eq!(parsed.mime_type, "audio/webm");
        assert_eq!(parsed.data.len(), 3);
    }

    #[test]
    fn literal_payload_without_base64_marker() {
        let parsed = DataUrl::parse("data:,hello").unwrap();
        assert_eq!(parsed.mime_type, "text/plain");
        assert_eq!(parsed.data.as_ref(), b"hello");
    }

    #[test]
    fn rejects_non_data_urls() {
        assert!(matches!(
            DataUrl::parse("https://example.com/a.mp3"),
            Err(Error::Validation { .. })
        ));
        assert!(DataUrl::parse("data:audio/wav;base64").is_err());
        assert!(DataUrl::parse("data:audio/wav;base64,@@@").is_err());
    }

    #[test]
    fn extension_for_unknown_subtype() {
        let parsed = DataUrl::parse("data:audio/aac;base64,AAAA").unwrap();
        assert_eq!(parsed.file_extension(), "aac");
    }
}
