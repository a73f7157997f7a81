//! `mailtidy` — one interactive pass over an IMAP mailbox.
//!
//! Each message is run through a fixed chain of classifiers that can offer
//! to delete stale notices, import calendar attachments, or answer event
//! invitations. Deletions and deferred links are applied in one batch once
//! the scan is over.

pub mod actions;
pub mod browser;
pub mod calendar;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod error;
pub mod flush;
pub mod model;
pub mod parser;
pub mod scan;
pub mod session;
