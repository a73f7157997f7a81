//! IMAP over TLS.

use std::net::TcpStream;

use native_tls::{TlsConnector, TlsStream};
use tracing::{debug, info};

use super::{sequence_set, MailSession, RawMessage};
use crate::error::{Result, TidyError};

/// Implicit-TLS IMAP port.
pub const DEFAULT_PORT: u16 = 993;

/// An authenticated IMAP session.
pub struct ImapSession {
    inner: ::imap::Session<TlsStream<TcpStream>>,
}

/// Split `host[:port]`, defaulting to the implicit-TLS port.
pub fn split_server(server: &str) -> Result<(String, u16)> {
    match server.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .map_err(|_| TidyError::Config(format!("invalid port in server '{server}'")))?;
            Ok((host.to_string(), port))
        }
        None => Ok((server.to_string(), DEFAULT_PORT)),
    }
}

impl ImapSession {
    /// Connect over TLS and log in.
    pub fn connect(server: &str, user: &str, password: &str) -> Result<Self> {
        let (host, port) = split_server(server)?;
        let connect_err = |reason: String| TidyError::Connect {
            server: server.to_string(),
            reason,
        };

        info!(server, "Connecting to server");
        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| connect_err(e.to_string()))?;
        let client = ::imap::connect((host.as_str(), port), host.as_str(), &tls)
            .map_err(|e| connect_err(e.to_string()))?;
        info!("Connected");

        let inner = client
            .login(user, password)
            .map_err(|(e, _)| TidyError::Auth {
                user: user.to_string(),
                reason: e.to_string(),
            })?;
        info!(user, "Logged in");

        Ok(Self { inner })
    }
}

impl MailSession for ImapSession {
    fn select(&mut self, mailbox: &str) -> Result<u32> {
        let selected = self
            .inner
            .select(mailbox)
            .map_err(|e| TidyError::MailboxSelect {
                mailbox: mailbox.to_string(),
                reason: e.to_string(),
            })?;
        debug!(mailbox, exists = selected.exists, "Selected mailbox");
        Ok(selected.exists)
    }

    fn fetch_range(&mut self, from: u32, to: u32) -> Result<Vec<RawMessage>> {
        let fetches = self
            .inner
            .fetch(format!("{from}:{to}"), "RFC822")
            .map_err(|e| TidyError::Fetch(e.to_string()))?;

        let mut messages = Vec::with_capacity(fetches.len());
        for fetch in fetches.iter() {
            let data = fetch.body().ok_or_else(|| {
                TidyError::Fetch(format!(
                    "server did not return the body of message {}",
                    fetch.message
                ))
            })?;
            messages.push(RawMessage {
                sequence: fetch.message,
                data: data.to_vec(),
            });
        }
        messages.sort_by_key(|m| m.sequence);
        Ok(messages)
    }

    fn store_deleted(&mut self, sequences: &[u32]) -> Result<()> {
        self.inner
            .store(sequence_set(sequences), "+FLAGS.SILENT (\\Deleted)")
            .map_err(|e| TidyError::Flush {
                step: "store",
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn expunge(&mut self) -> Result<Vec<u32>> {
        self.inner.expunge().map_err(|e| TidyError::Flush {
            step: "expunge",
            reason: e.to_string(),
        })
    }

    fn logout(&mut self) -> Result<()> {
        self.inner
            .logout()
            .map_err(|e| TidyError::Fetch(format!("logout failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_server() {
        assert_eq!(
            split_server("imap.example.com:143").unwrap(),
            ("imap.example.com".to_string(), 143)
        );
        assert_eq!(
            split_server("imap.example.com").unwrap(),
            ("imap.example.com".to_string(), DEFAULT_PORT)
        );
        assert!(split_server("imap.example.com:abc").is_err());
    }
}
