//! Modified UTF-7 mailbox-name encoding (RFC 3501 §5.1.3).
//!
//! Mailbox names containing non-ASCII characters must be transformed
//! before SELECT; sending raw UTF-8 makes selection fail against
//! international mailbox names on conforming servers.

use base64::alphabet::Alphabet;
use base64::engine::general_purpose::GeneralPurpose;
use base64::engine::GeneralPurposeConfig;
use base64::Engine;

/// RFC 3501 base64 alphabet: standard, with ',' in place of '/'.
const MODIFIED_B64: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+,";

fn engine() -> GeneralPurpose {
    let alphabet = Alphabet::new(MODIFIED_B64).expect("valid alphabet");
    GeneralPurpose::new(
        &alphabet,
        GeneralPurposeConfig::new().with_encode_padding(false),
    )
}

/// Encode a mailbox name as IMAP modified UTF-7.
///
/// Printable US-ASCII passes through unchanged, `&` becomes `&-`, and
/// every other run of characters is emitted as `&<base64 of UTF-16BE>-`.
pub fn encode_mailbox_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending: Vec<u16> = Vec::new();

    for ch in name.chars() {
        if ('\x20'..='\x7e').contains(&ch) {
            flush(&mut out, &mut pending);
            if ch == '&' {
                out.push_str("&-");
            } else {
                out.push(ch);
            }
        } else {
            let mut units = [0u16; 2];
            pending.extend_from_slice(ch.encode_utf16(&mut units));
        }
    }
    flush(&mut out, &mut pending);
    out
}

/// Emit any buffered non-ASCII run as one `&…-` group.
fn flush(out: &mut String, pending: &mut Vec<u16>) {
    if pending.is_empty() {
        return;
    }
    let mut bytes = Vec::with_capacity(pending.len() * 2);
    for unit in pending.iter() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    out.push('&');
    out.push_str(&engine().encode(&bytes));
    out.push('-');
    pending.clear();
}
