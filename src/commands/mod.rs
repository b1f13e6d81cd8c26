//! Command handlers for the wikiprose binary

pub mod clean;
pub mod extract;
pub mod fetch;
pub mod init;

pub use extract::ExtractOptions;
pub use fetch::FetchOptions;
