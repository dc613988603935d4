//! IMAP session plumbing.
//!
//! The pipeline never talks to the `imap` crate directly: the lister and
//! the workers are written against the [`MailboxSession`] capability
//! surface, so the concurrency machinery can be exercised against an
//! in-memory mailbox in tests. [`TlsSessionFactory`] is the production
//! implementation, one TLS connection per session.

pub mod utf7;

use std::net::TcpStream;

use native_tls::{TlsConnector, TlsStream};

use crate::error::{FetchError, Result};

/// One authenticated, stateful connection to the mail store.
///
/// Sessions are session-affine: a value stays on the thread that created
/// it and is never shared.
pub trait MailboxSession {
    /// Select a mailbox (already modified-UTF-7 encoded) and return its
    /// total message count.
    fn select(&mut self, mailbox: &str) -> Result<u32>;

    /// List every message UID in the selected mailbox.
    fn list_uids(&mut self) -> Result<Vec<u32>>;

    /// Fetch the full raw RFC 822 content of one message.
    fn fetch_raw(&mut self, uid: u32) -> Result<Vec<u8>>;

    /// Mark a message `\Deleted` and expunge it.
    fn delete(&mut self, uid: u32) -> Result<()>;

    /// Log out and drop the connection.
    fn logout(&mut self) -> Result<()>;
}

/// Opens authenticated sessions; shared by all worker threads.
pub trait SessionFactory: Send + Sync + 'static {
    type Session: MailboxSession;

    fn connect(&self) -> Result<Self::Session>;
}

/// Production factory: IMAP over TLS with LOGIN authentication.
#[derive(Debug, Clone)]
pub struct TlsSessionFactory {
    server: String,
    port: u16,
    login: String,
    password: String,
}

impl TlsSessionFactory {
    pub fn new(
        server: impl Into<String>,
        port: u16,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            port,
            login: login.into(),
            password: password.into(),
        }
    }
}

impl SessionFactory for TlsSessionFactory {
    type Session = TlsSession;

    fn connect(&self) -> Result<TlsSession> {
        let tls = TlsConnector::builder().build()?;
        let client = imap::connect((self.server.as_str(), self.port), &self.server, &tls)
            .map_err(|source| FetchError::Connect {
                server: self.server.clone(),
                source,
            })?;
        let inner = client
            .login(&self.login, &self.password)
            .map_err(|(source, _)| FetchError::Login {
                login: self.login.clone(),
                source,
            })?;
        Ok(TlsSession { inner })
    }
}

/// A live session backed by the `imap` crate over `native-tls`.
pub struct TlsSession {
    inner: imap::Session<TlsStream<TcpStream>>,
}

impl MailboxSession for TlsSession {
    fn select(&mut self, mailbox: &str) -> Result<u32> {
        match self.inner.select(mailbox) {
            Ok(status) => Ok(status.exists),
            // A NO response means the store rejected the mailbox name.
            Err(imap::error::Error::No(reason)) => Err(FetchError::MailboxNotFound(reason)),
            Err(other) => Err(other.into()),
        }
    }

    fn list_uids(&mut self) -> Result<Vec<u32>> {
        let uids = self.inner.uid_search("ALL")?;
        Ok(uids.into_iter().collect())
    }

    fn fetch_raw(&mut self, uid: u32) -> Result<Vec<u8>> {
        let messages = self.inner.uid_fetch(uid.to_string(), "RFC822")?;
        let body = messages
            .iter()
            .next()
            .and_then(|message| message.body())
            .ok_or(FetchError::EmptyFetch(uid))?;
        Ok(body.to_vec())
    }

    fn delete(&mut self, uid: u32) -> Result<()> {
        self.inner.uid_store(uid.to_string(), "+FLAGS (\\Deleted)")?;
        self.inner.expunge()?;
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        self.inner.logout()?;
        Ok(())
    }
}
