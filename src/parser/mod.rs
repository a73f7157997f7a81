//! Email parsing: raw RFC 5322 bytes into the [`crate::model::message::Message`] model.

pub mod mime;
