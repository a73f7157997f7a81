//! Persistent set of messages already answered through the RSVP dialog.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ HEADER (64 bytes, fixed)             │
//! │  magic: [u8; 8] = b"MTIDYDB\0"      │
//! │  version: u32                        │
//! │  count: u64                          │
//! │  (padding to 64 bytes)               │
//! ├──────────────────────────────────────┤
//! │ HASHES (variable)                    │
//! │  bincode-serialized Vec<String>      │
//! └──────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{Result, TidyError};
use crate::model::message::Message;

/// Magic bytes identifying a dedup store file.
pub const MAGIC: &[u8; 8] = b"MTIDYDB\0";

/// Current store format version.
pub const VERSION: u32 = 1;

/// Fixed header size in bytes.
pub const HEADER_SIZE: usize = 64;

/// File name of the store inside the cache directory.
pub const STORE_FILE_NAME: &str = "responded.db";

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StoreHeader {
    magic: [u8; 8],
    version: u32,
    count: u64,
}

impl StoreHeader {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.magic != *MAGIC {
            return Err("Invalid magic bytes".into());
        }
        if self.version != VERSION {
            return Err(format!(
                "Incompatible version: expected {VERSION}, found {}",
                self.version
            ));
        }
        Ok(())
    }
}

/// Stable hex digest of the fields that identify a message.
///
/// Covers subject, sender addresses (lowercased, in order), date and the
/// body with all whitespace runs collapsed, each terminated by a NUL.
/// Header order, sequence numbers and attachments do not contribute.
pub fn content_hash(msg: &Message) -> String {
    let mut hasher = Sha256::new();

    hasher.update(msg.subject.as_bytes());
    hasher.update([0]);

    for addr in &msg.from {
        hasher.update(addr.address.to_lowercase().as_bytes());
        hasher.update([b',']);
    }
    hasher.update([0]);

    if let Some(date) = msg.date {
        hasher.update(date.to_rfc3339().as_bytes());
    }
    hasher.update([0]);

    let normalized = msg.body.split_whitespace().collect::<Vec<_>>().join(" ");
    hasher.update(normalized.as_bytes());
    hasher.update([0]);

    format!("{:x}", hasher.finalize())
}

/// Set of content hashes with an optional backing file.
#[derive(Debug, Default)]
pub struct DedupStore {
    path: Option<PathBuf>,
    hashes: BTreeSet<String>,
    dirty: bool,
}

impl DedupStore {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the store at `path`.
    ///
    /// A missing file yields an empty store. A corrupt or incompatible file
    /// is logged and replaced on the next save.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let hashes = if path.exists() {
            match read_hashes(&path)? {
                Some(hashes) => hashes,
                None => {
                    warn!(path = %path.display(), "Ignoring unusable dedup store");
                    BTreeSet::new()
                }
            }
        } else {
            BTreeSet::new()
        };
        debug!(path = %path.display(), count = hashes.len(), "Opened dedup store");
        Ok(Self {
            path: Some(path),
            hashes,
            dirty: false,
        })
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn get_responded(&self, msg: &Message) -> bool {
        self.hashes.contains(&content_hash(msg))
    }

    pub fn add_responded(&mut self, msg: &Message) {
        if self.hashes.insert(content_hash(msg)) {
            self.dirty = true;
        }
    }

    pub fn remove_responded(&mut self, msg: &Message) {
        self.remove_hash(&content_hash(msg));
    }

    /// Drop a marker by its content hash.
    pub fn remove_hash(&mut self, hash: &str) {
        if self.hashes.remove(hash) {
            self.dirty = true;
        }
    }

    /// Write the store back to its file if anything changed.
    pub fn save(&mut self) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }

        let store_err = |reason: String| TidyError::DedupStore {
            path: path.clone(),
            reason,
        };

        let header = StoreHeader {
            magic: *MAGIC,
            version: VERSION,
            count: self.hashes.len() as u64,
        };
        let header_bytes = bincode::serialize(&header).map_err(|e| store_err(e.to_string()))?;
        let hashes: Vec<&String> = self.hashes.iter().collect();
        let body_bytes = bincode::serialize(&hashes).map_err(|e| store_err(e.to_string()))?;

        let mut padded_header = vec![0u8; HEADER_SIZE];
        let copy_len = header_bytes.len().min(HEADER_SIZE);
        padded_header[..copy_len].copy_from_slice(&header_bytes[..copy_len]);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TidyError::io(parent, e))?;
        }
        let mut file = File::create(path).map_err(|e| TidyError::io(path, e))?;
        file.write_all(&padded_header)
            .map_err(|e| TidyError::io(path, e))?;
        file.write_all(&body_bytes)
            .map_err(|e| TidyError::io(path, e))?;
        file.flush().map_err(|e| TidyError::io(path, e))?;

        info!(path = %path.display(), count = self.hashes.len(), "Dedup store written");
        self.dirty = false;
        Ok(())
    }
}

/// Returns `None` when the file is not a valid store.
fn read_hashes(path: &Path) -> Result<Option<BTreeSet<String>>> {
    let data = std::fs::read(path).map_err(|e| TidyError::io(path, e))?;
    if data.len() < HEADER_SIZE {
        debug!("Dedup store too small");
        return Ok(None);
    }

    let Ok(header) = bincode::deserialize::<StoreHeader>(&data[..HEADER_SIZE]) else {
        return Ok(None);
    };
    if let Err(reason) = header.validate() {
        debug!(reason = %reason, "Dedup store header invalid");
        return Ok(None);
    }

    let Ok(hashes) = bincode::deserialize::<Vec<String>>(&data[HEADER_SIZE..]) else {
        return Ok(None);
    };
    if hashes.len() as u64 != header.count {
        debug!("Dedup store count mismatch");
        return Ok(None);
    }
    Ok(Some(hashes.into_iter().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::address::EmailAddress;

    fn invite(body: &str) -> Message {
        Message {
            sequence: 1,
            subject: "Invitation: Standup".into(),
            from: vec![EmailAddress::new("Calendar", "calendar@example.com")],
            body: body.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_hash_ignores_whitespace_and_sequence() {
        let a = invite("<p>Join   us</p>\n");
        let mut b = invite("<p>Join us</p>");
        b.sequence = 42;
        assert_eq!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn test_hash_depends_on_subject_and_sender_case_insensitive() {
        let a = invite("body");
        let mut b = invite("body");
        b.subject = "Invitation: Retro".into();
        assert_ne!(content_hash(&a), content_hash(&b));

        let mut c = invite("body");
        c.from = vec![EmailAddress::new("Calendar", "CALENDAR@example.com")];
        assert_eq!(content_hash(&a), content_hash(&c));
    }

    #[test]
    fn test_add_get_remove() {
        let mut store = DedupStore::in_memory();
        let msg = invite("body");
        assert!(!store.get_responded(&msg));
        store.add_responded(&msg);
        assert!(store.get_responded(&msg));
        store.remove_responded(&msg);
        assert!(!store.get_responded(&msg));
        assert!(store.is_empty());
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORE_FILE_NAME);
        let msg = invite("body");

        let mut store = DedupStore::open(&path).unwrap();
        assert!(store.is_empty());
        store.add_responded(&msg);
        store.save().unwrap();

        let reloaded = DedupStore::open(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.get_responded(&msg));
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORE_FILE_NAME);
        std::fs::write(&path, vec![7u8; 100]).unwrap();
        let store = DedupStore::open(&path).unwrap();
        assert!(store.is_empty());
    }
}
