//! Integration tests for attachment extraction, naming, and subject
//! reconstruction.

use attfetch::extract::{extract_message, PartOutcome};

/// Build a multipart/mixed message: a text body plus `extra_parts`.
fn multipart(subject: &str, extra_parts: &str) -> Vec<u8> {
    format!(
        "From: sender@example.com\r\n\
         To: rcpt@example.com\r\n\
         Subject: {subject}\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/mixed; boundary=\"b42\"\r\n\
         \r\n\
         --b42\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         See attached.\r\n\
         {extra_parts}\
         --b42--\r\n"
    )
    .into_bytes()
}

/// One attachment part. `aGVsbG8gd29ybGQ=` is "hello world".
fn attachment_part(disposition: &str, filename: &str) -> String {
    format!(
        "--b42\r\n\
         Content-Type: application/octet-stream\r\n\
         Content-Disposition: {disposition}; filename=\"{filename}\"\r\n\
         Content-Transfer-Encoding: base64\r\n\
         \r\n\
         aGVsbG8gd29ybGQ=\r\n"
    )
}

#[test]
fn test_saves_attachment_and_decodes_subject() {
    let dir = tempfile::tempdir().unwrap();
    let raw = multipart(
        "=?utf-8?B?SGVsbG8=?= World",
        &attachment_part("attachment", "report.pdf"),
    );

    let extraction = extract_message(&raw, dir.path(), false);

    assert_eq!(extraction.subject, "Hello World");
    assert_eq!(extraction.saved_count(), 1);
    assert!(!extraction.has_save_error());

    let saved: Vec<_> = extraction
        .outcomes
        .iter()
        .filter_map(|o| match o {
            PartOutcome::Saved { path, size } => Some((path.clone(), *size)),
            _ => None,
        })
        .collect();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].0, dir.path().join("report.pdf"));
    assert_eq!(saved[0].1, 11);
    assert_eq!(std::fs::read(&saved[0].0).unwrap(), b"hello world");

    // The text body is a leaf without a filename.
    assert!(extraction
        .outcomes
        .iter()
        .any(|o| matches!(o, PartOutcome::NoFilename)));
}

#[test]
fn test_collisions_get_numbered_names() {
    let dir = tempfile::tempdir().unwrap();
    let raw = multipart("dup", &attachment_part("attachment", "report.pdf"));

    extract_message(&raw, dir.path(), false);
    let second = extract_message(&raw, dir.path(), false);
    let third = extract_message(&raw, dir.path(), false);

    let path_of = |e: &attfetch::extract::Extraction| {
        e.outcomes
            .iter()
            .find_map(|o| match o {
                PartOutcome::Saved { path, .. } => Some(path.clone()),
                _ => None,
            })
            .unwrap()
    };

    assert_eq!(path_of(&second), dir.path().join("report(1).pdf"));
    assert_eq!(path_of(&third), dir.path().join("report(2).pdf"));
    assert!(dir.path().join("report.pdf").exists());
}

#[test]
fn test_collision_preserves_full_extension() {
    let dir = tempfile::tempdir().unwrap();
    let raw = multipart("logs", &attachment_part("attachment", "logs.tar.gz"));

    extract_message(&raw, dir.path(), false);
    let second = extract_message(&raw, dir.path(), false);

    assert!(second
        .outcomes
        .iter()
        .any(|o| matches!(o, PartOutcome::Saved { path, .. }
            if path == &dir.path().join("logs(1).tar.gz"))));
}

#[test]
fn test_inline_part_skipped_only_when_asked() {
    let dir = tempfile::tempdir().unwrap();
    let raw = multipart("inline", &attachment_part("inline", "logo.png"));

    let skipping = extract_message(&raw, dir.path(), true);
    assert_eq!(skipping.saved_count(), 0);
    // The inline part is excluded entirely: no outcome, not even NoFilename.
    assert_eq!(skipping.outcomes.len(), 1);
    assert!(matches!(skipping.outcomes[0], PartOutcome::NoFilename));

    let keeping = extract_message(&raw, dir.path(), false);
    assert_eq!(keeping.saved_count(), 1);
    assert!(dir.path().join("logo.png").exists());
}

#[test]
fn test_plain_message_has_no_attachment() {
    let dir = tempfile::tempdir().unwrap();
    let raw = b"From: a@example.com\r\nSubject: just text\r\n\r\nNothing attached.\r\n";

    let extraction = extract_message(raw, dir.path(), false);

    assert_eq!(extraction.subject, "just text");
    assert_eq!(extraction.saved_count(), 0);
    assert!(extraction
        .outcomes
        .iter()
        .all(|o| matches!(o, PartOutcome::NoFilename)));
}

#[test]
fn test_encoded_filename_is_decoded() {
    let dir = tempfile::tempdir().unwrap();
    // filename = "resume.pdf" as an RFC 2047 encoded word
    let raw = multipart(
        "cv",
        &attachment_part("attachment", "=?utf-8?B?cmVzdW1lLnBkZg==?="),
    );

    let extraction = extract_message(&raw, dir.path(), false);

    assert!(extraction
        .outcomes
        .iter()
        .any(|o| matches!(o, PartOutcome::Saved { path, .. }
            if path == &dir.path().join("resume.pdf"))));
}

#[test]
fn test_save_error_stops_extraction_of_later_parts() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");
    let parts = format!(
        "{}{}",
        attachment_part("attachment", "first.bin"),
        attachment_part("attachment", "second.bin")
    );
    let raw = multipart("two files", &parts);

    let extraction = extract_message(&raw, &missing, false);

    assert!(extraction.has_save_error());
    assert_eq!(extraction.saved_count(), 0);
    // Text part, then the failed first attachment; the second was never reached.
    assert_eq!(extraction.outcomes.len(), 2);
    assert!(matches!(
        extraction.outcomes.last().unwrap(),
        PartOutcome::SaveError { filename, .. } if filename == "first.bin"
    ));
}
