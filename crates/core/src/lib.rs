//! Shared domain types for the docflow upload and progress service.
//!
//! - [`types`]: client session identifiers and common aliases.
//! - [`progress`]: the progress event wire model pushed to clients.
//! - [`storage`]: the file storage collaborator used by uploads.
//! - [`error`]: the domain error taxonomy.

pub mod error;
pub mod progress;
pub mod storage;
pub mod types;
