//! Centralized error types for attfetch.

use thiserror::Error;

/// All errors produced by the attfetch library.
///
/// Connection, login and mailbox-selection failures are fatal to the
/// whole run. Attachment write failures are *not* represented here: they
/// travel inside a result batch as a per-part outcome and never cross
/// the worker boundary as an error.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The server could not be reached or the TLS session failed.
    #[error("unable to connect to '{server}': {source}")]
    Connect {
        server: String,
        source: imap::error::Error,
    },

    /// The server rejected the credentials.
    #[error("unable to login as '{login}': {source}")]
    Login {
        login: String,
        source: imap::error::Error,
    },

    /// The requested mailbox could not be selected.
    #[error("cannot select mailbox: {0}")]
    MailboxNotFound(String),

    /// A fetch response carried no content for the message.
    #[error("message {0} has no content")]
    EmptyFetch(u32),

    /// Any other IMAP protocol failure.
    #[error("IMAP protocol error: {0}")]
    Imap(#[from] imap::error::Error),

    /// TLS connector construction failed.
    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),
}

/// Convenience alias for `Result<T, FetchError>`.
pub type Result<T> = std::result::Result<T, FetchError>;
