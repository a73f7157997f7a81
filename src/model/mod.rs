//! Core data model types for fetched messages, addresses, and attachments.

pub mod address;
pub mod attachment;
pub mod message;
