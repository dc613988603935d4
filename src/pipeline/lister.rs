//! One-shot mailbox listing.

use tracing::debug;

use crate::error::Result;
use crate::session::MailboxSession;

/// Select `mailbox` and return the UIDs to process plus the mailbox's
/// total message count.
///
/// The store's native ordering is not guaranteed, so UIDs are sorted in
/// descending numeric order (newest-assigned first) to make truncation
/// under `limit` reproducible.
pub fn list_uids<S: MailboxSession>(
    session: &mut S,
    mailbox: &str,
    limit: Option<usize>,
) -> Result<(Vec<u32>, u32)> {
    let total = session.select(mailbox)?;

    let mut uids = session.list_uids()?;
    uids.sort_unstable_by(|a, b| b.cmp(a));
    if let Some(limit) = limit {
        uids.truncate(limit);
    }

    debug!(total, queued = uids.len(), "listed mailbox");
    Ok((uids, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;

    /// Fixed-answer session, just enough for listing.
    struct FixedSession {
        uids: Vec<u32>,
    }

    impl MailboxSession for FixedSession {
        fn select(&mut self, mailbox: &str) -> Result<u32> {
            if mailbox == "missing" {
                return Err(FetchError::MailboxNotFound("no such mailbox".into()));
            }
            Ok(self.uids.len() as u32)
        }

        fn list_uids(&mut self) -> Result<Vec<u32>> {
            Ok(self.uids.clone())
        }

        fn fetch_raw(&mut self, uid: u32) -> Result<Vec<u8>> {
            Err(FetchError::EmptyFetch(uid))
        }

        fn delete(&mut self, _uid: u32) -> Result<()> {
            Ok(())
        }

        fn logout(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_descending_order_and_truncation() {
        let mut session = FixedSession {
            uids: vec![5, 1, 9, 3],
        };
        let (uids, total) = list_uids(&mut session, "INBOX", Some(2)).unwrap();
        assert_eq!(uids, vec![9, 5]);
        assert_eq!(total, 4);
    }

    #[test]
    fn test_no_limit_returns_everything_newest_first() {
        let mut session = FixedSession {
            uids: vec![2, 7, 4],
        };
        let (uids, _) = list_uids(&mut session, "INBOX", None).unwrap();
        assert_eq!(uids, vec![7, 4, 2]);
    }

    #[test]
    fn test_empty_mailbox_is_not_an_error() {
        let mut session = FixedSession { uids: Vec::new() };
        let (uids, total) = list_uids(&mut session, "INBOX", None).unwrap();
        assert!(uids.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn test_selection_rejection_maps_to_mailbox_not_found() {
        let mut session = FixedSession { uids: vec![1] };
        let err = list_uids(&mut session, "missing", None).unwrap_err();
        assert!(matches!(err, FetchError::MailboxNotFound(_)));
    }
}
