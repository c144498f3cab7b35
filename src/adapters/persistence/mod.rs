//! Persistence Adapters - File-backed Store
//!
//! Implements the `Repository` port with lightweight file formats:
//! - `ticks`: append-only JSONL price ticks with daily rotation
//! - `orders`: one atomic JSON document per symbol (tmp + rename),
//!   with optimistic versioning for conflicting writers
//! - `trades`: append-only JSONL fill log with daily rotation
//!
//! No database dependency - the formats are optimized for audit trails
//! and crash recovery.

pub mod orders;
pub mod repository_impl;
pub mod ticks;
pub mod trades;

pub use repository_impl::FileRepository;
