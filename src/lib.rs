//! wikiprose: plaintext corpora from Wikipedia XML dumps
//!
//! Streams bzip2-compressed MediaWiki dumps, keeps encyclopedic articles and
//! strips their markup down to prose, featuring:
//! - Multistream bzip2 decoding with bounded memory per page
//! - Redirect, namespace and residue filtering with per-reason statistics
//! - A fixed-order wikitext cleaning pipeline with balanced-delimiter removal
//! - Batched, append-only corpus files, one per archive
//! - Resumable download of published dump archives

pub mod config;
pub mod fetch;
pub mod import;

pub use config::Config;
