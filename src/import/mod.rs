//! Dump extraction
//!
//! Turns compressed Wikipedia XML dumps into plaintext corpus files, one
//! archive at a time and one page at a time.
//!
//! # Example Usage
//!
//! ```no_run
//! use wikiprose::import::{ImportCoordinator, ImportCoordinatorBuilder};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let archives = ImportCoordinator::discover_archives(Path::new("data"))?;
//!
//! let coordinator = ImportCoordinatorBuilder::new("corpus")
//!     .with_batch_size(1000)
//!     .with_max_pages(Some(10_000))
//!     .build()?;
//!
//! let summary = coordinator.run(&archives);
//! println!("Wrote {} documents", summary.documents_written());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Import Coordinator                          │
//! │           (archive discovery, batching, per-archive reports)        │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │ one archive at a time (or rayon)
//!                                    ▼
//! ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────────┐
//! │  ArchiveReader   │──▶│ WikimediaSource  │──▶│     CorpusWriter     │
//! │  bz2 multistream │   │ pull XML events  │   │ append, flush/batch  │
//! └──────────────────┘   │ PageFilter       │   └──────────────────────┘
//!                        │ WikiTextCleaner  │
//!                        │ ResidueGate      │
//!                        └──────────────────┘
//! ```

pub mod archive;
pub mod balanced;
pub mod coordinator;
pub mod filter;
pub mod progress;
pub mod source;
pub mod wikimedia;
pub mod wikitext;
pub mod writer;

// Re-export main types
pub use archive::ArchiveReader;
pub use coordinator::{ArchiveReport, ImportCoordinator, ImportCoordinatorBuilder, RunSummary};
pub use filter::{PageFilter, ResidueGate};
pub use progress::ImportProgress;
pub use source::{
    CleanedDocument, DumpFormat, DumpSource, ImportError, ImportStats, NamespaceClass, RawPage,
    RejectionReason,
};
pub use wikimedia::WikimediaSource;
pub use wikitext::WikiTextCleaner;
pub use writer::{output_path_for, CorpusWriter};
