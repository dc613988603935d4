//! Attachment extraction: walk a raw message's MIME tree and persist
//! every named part to the target directory.

use std::io;
use std::path::{Path, PathBuf};

use mail_parser::{Message, MessageParser, MimeHeaders, PartType};

use crate::parser::header::subject_of;

/// What happened to one leaf MIME part.
#[derive(Debug)]
pub enum PartOutcome {
    /// The part carried a filename and its payload was written to `path`.
    Saved { path: PathBuf, size: u64 },
    /// The part declared no filename; it is not an attachment.
    NoFilename,
    /// Writing the payload failed.
    SaveError { filename: String, source: io::Error },
}

impl PartOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, PartOutcome::Saved { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PartOutcome::SaveError { .. })
    }
}

/// The result of extracting one message.
#[derive(Debug)]
pub struct Extraction {
    /// Decoded subject text.
    pub subject: String,
    /// One outcome per leaf part, in message order.
    pub outcomes: Vec<PartOutcome>,
}

impl Extraction {
    /// Number of parts written to disk.
    pub fn saved_count(&self) -> u64 {
        self.outcomes.iter().filter(|o| o.is_saved()).count() as u64
    }

    /// True when any part failed to write.
    pub fn has_save_error(&self) -> bool {
        self.outcomes.iter().any(|o| o.is_error())
    }
}

/// Extract every attachment of `raw` into `dir`.
///
/// Walks every part of the message, skipping `multipart/*` containers
/// and recursing into attached messages. Extraction stops at the first
/// failed write; parts already written stay on disk. The caller owns the
/// policy around deletion and halting.
pub fn extract_message(raw: &[u8], dir: &Path, skip_inline: bool) -> Extraction {
    let subject = subject_of(raw);

    let mut outcomes = Vec::new();
    if let Some(message) = MessageParser::default().parse(raw) {
        walk(&message, dir, skip_inline, &mut outcomes);
    }

    Extraction { subject, outcomes }
}

/// Returns `false` when extraction must stop (a write failed).
fn walk(message: &Message<'_>, dir: &Path, skip_inline: bool, outcomes: &mut Vec<PartOutcome>) -> bool {
    for part in &message.parts {
        match &part.body {
            PartType::Multipart(_) => continue,
            PartType::Message(nested) => {
                if !walk(nested, dir, skip_inline, outcomes) {
                    return false;
                }
            }
            _ => {
                if skip_inline && is_inline(part) {
                    continue;
                }

                let Some(name) = part.attachment_name() else {
                    outcomes.push(PartOutcome::NoFilename);
                    continue;
                };

                let filename = sanitize_filename(name);
                let path = unique_path(dir, &filename);
                let payload = part.contents();

                match std::fs::write(&path, payload) {
                    Ok(()) => outcomes.push(PartOutcome::Saved {
                        size: payload.len() as u64,
                        path,
                    }),
                    Err(source) => {
                        outcomes.push(PartOutcome::SaveError { filename, source });
                        return false;
                    }
                }
            }
        }
    }
    true
}

fn is_inline(part: &mail_parser::MessagePart<'_>) -> bool {
    part.content_disposition()
        .is_some_and(|d| d.ctype().eq_ignore_ascii_case("inline"))
}

/// Keep the declared Unicode filename, but strip path separators and
/// control characters so the result stays inside the target directory.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' | '\\' => '_',
            other => other,
        })
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "attachment".to_string()
    } else {
        trimmed.to_string()
    }
}

/// First free path for `filename` inside `dir`.
///
/// Collisions append `(k)` to the stem, keeping everything after the
/// first dot as the extension, and re-check the filesystem for every
/// candidate. Existing files are never overwritten.
fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let first = dir.join(filename);
    if !first.exists() {
        return first;
    }

    let (stem, ext) = match filename.split_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (filename, None),
    };

    let mut k = 1u32;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{stem}({k}).{ext}"),
            None => format!("{stem}({k})"),
        };
        let path = dir.join(candidate);
        if !path.exists() {
            return path;
        }
        k += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_unicode() {
        assert_eq!(sanitize_filename("résumé 2024.pdf"), "résumé 2024.pdf");
        assert_eq!(sanitize_filename("請求書.xlsx"), "請求書.xlsx");
    }

    #[test]
    fn test_sanitize_strips_separators_and_controls() {
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("a\\b\u{7}.txt"), "a_b.txt");
        assert_eq!(sanitize_filename("   "), "attachment");
    }

    #[test]
    fn test_unique_path_counts_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("report(1).pdf"), b"x").unwrap();

        let path = unique_path(dir.path(), "report.pdf");
        assert_eq!(path, dir.path().join("report(2).pdf"));
    }

    #[test]
    fn test_unique_path_preserves_multi_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("logs.tar.gz"), b"x").unwrap();

        let path = unique_path(dir.path(), "logs.tar.gz");
        assert_eq!(path, dir.path().join("logs(1).tar.gz"));
    }

    #[test]
    fn test_unique_path_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README"), b"x").unwrap();

        let path = unique_path(dir.path(), "README");
        assert_eq!(path, dir.path().join("README(1)"));
    }
}
