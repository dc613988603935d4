//! RFC 2047 header decoding and subject reconstruction.
//!
//! A Subject line may span several encoded-word segments, each with its
//! own charset. Segments are decoded individually and joined with a
//! single space, so a header like
//! `=?utf-8?B?SGVsbG8=?= World` reconstructs to `"Hello World"`.

use base64::engine::general_purpose::GeneralPurpose;
use base64::engine::{DecodePaddingMode, GeneralPurposeConfig};
use base64::{alphabet, Engine};
use tracing::warn;

/// Reconstruct the decoded Subject of a raw RFC 822 message.
///
/// Returns an empty string when the message carries no Subject header.
pub fn subject_of(raw_message: &[u8]) -> String {
    let text = decode_header_bytes(header_block(raw_message));
    let headers = unfold_headers(&text);
    let raw = get_header(&headers, "subject").unwrap_or_default();
    join_segments(&decode_segments(&raw))
}

/// Everything before the first blank line.
fn header_block(data: &[u8]) -> &[u8] {
    if let Some(pos) = find(data, b"\r\n\r\n") {
        &data[..pos]
    } else if let Some(pos) = find(data, b"\n\n") {
        &data[..pos]
    } else {
        data
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts
/// every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    let bytes = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &bytes[3..]
    } else {
        bytes
    };

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Unfold headers: join continuation lines (starting with space or tab)
/// with the previous header.
///
/// Returns a list of `(lowercase_name, raw_value)` pairs.
fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_lowercase();
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        }
        // Lines without a colon and not a continuation are silently skipped
    }

    result
}

/// Get the first value for a header name (case-insensitive).
fn get_header(headers: &[(String, String)], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
}

/// Split a header value into decoded segments.
///
/// Each RFC 2047 encoded word becomes one segment; runs of plain text
/// between them become segments of their own, trimmed. Tokens that look
/// like encoded words but fail to decode are kept literally.
fn decode_segments(input: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut remaining = input;

    while let Some(start) = remaining.find("=?") {
        let before = remaining[..start].trim();
        if !before.is_empty() {
            segments.push(before.to_string());
        }

        match try_decode_one_word(&remaining[start + 2..]) {
            Some(word) => {
                segments.push(word.text);
                remaining = &remaining[start + 2 + word.consumed..];
            }
            None => {
                segments.push("=?".to_string());
                remaining = &remaining[start + 2..];
            }
        }
    }

    let tail = remaining.trim();
    if !tail.is_empty() {
        segments.push(tail.to_string());
    }
    segments
}

/// Join decoded segments with a single space, without leading whitespace.
fn join_segments(segments: &[String]) -> String {
    segments.join(" ").trim_start().to_string()
}

struct DecodedWord {
    text: String,
    consumed: usize, // bytes consumed from the string *after* the initial "=?"
}

fn try_decode_one_word(s: &str) -> Option<DecodedWord> {
    // Format: charset?encoding?encoded_text?=
    let first_q = s.find('?')?;
    let charset = &s[..first_q];

    let rest = &s[first_q + 1..];
    let second_q = rest.find('?')?;
    let encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let end = rest2.find("?=")?;
    let encoded_text = &rest2[..end];

    let consumed = first_q + 1 + second_q + 1 + end + 2;

    let bytes = match encoding.to_ascii_uppercase().as_str() {
        "B" => {
            let compact: String = encoded_text
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            b64_engine().decode(compact).ok()?
        }
        "Q" => decode_q_encoding(encoded_text),
        _ => return None,
    };

    Some(DecodedWord {
        text: decode_charset(charset, &bytes),
        consumed,
    })
}

/// Standard-alphabet engine that accepts both padded and unpadded input.
fn b64_engine() -> GeneralPurpose {
    GeneralPurpose::new(
        &alphabet::STANDARD,
        GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
    )
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                if let Ok(byte) = u8::from_str_radix(
                    std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("00"),
                    16,
                ) {
                    result.push(byte);
                    i += 3;
                } else {
                    result.push(b'=');
                    i += 1;
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// Decode bytes using a named charset.
fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    let charset_lower = charset.to_lowercase();
    match charset_lower.as_str() {
        "utf-8" | "utf8" => String::from_utf8_lossy(bytes).into_owned(),
        _ => {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = encoding.decode(bytes);
                decoded.into_owned()
            } else {
                warn!(
                    charset = charset,
                    "Unknown charset, falling back to UTF-8 lossy"
                );
                String::from_utf8_lossy(bytes).into_owned()
            }
        }
    }
}
