//! Reader/writer coordination
//!
//! - **[`lock`]**: the [`RawReaderWriter`] primitive contract and the
//!   [`ReaderWriterLock`] implementation
//! - **[`guard`]**: RAII guards ([`LockReader`], [`LockWriter`]) that acquire
//!   on construction and release exactly once
//!
//! The guards are usable by any component that needs reader/writer
//! coordination, not only the cache store.
//!
//! ```
//! use std::time::Duration;
//!
//! use expiration_cache::sync::{LockReader, LockWriter, ReaderWriterLock};
//!
//! let lock = ReaderWriterLock::new();
//! {
//!     let _a = LockReader::new(&lock)?;
//!     assert_eq!(lock.reader_count(), 1);
//! }
//! let _w = LockWriter::with_timeout(&lock, Some(Duration::from_millis(100)))?;
//! assert!(lock.is_write_locked());
//! # Ok::<(), expiration_cache::error::LockError>(())
//! ```

pub mod guard;
pub mod lock;

pub use guard::{LockReader, LockWriter};
pub use lock::{Acquisition, LockMode, RawReaderWriter, ReaderWriterLock};
