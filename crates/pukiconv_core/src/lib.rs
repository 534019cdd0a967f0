pub mod config;
pub mod convert;
pub mod error;
pub mod filename;
pub mod layout;
pub mod transcode;
pub mod walker;
