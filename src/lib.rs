#![warn(missing_docs)]
//! Library for reading the encrypted partition contents of Wii disc images.
//!
//! A [`Volume`] wraps a random-access [`BlobReader`] over a raw disc image,
//! walks the partition group table, and exposes a transparently decrypted,
//! byte-addressable view of each partition along with its ticket and title
//! metadata (TMD). Per-sector AES-128-CBC decryption, IV extraction, and
//! caching of the most recently decrypted sector are handled internally;
//! images without a partition table read through unencrypted.
//!
//! # Examples
//!
//! Opening a disc image and reading the start of the game partition:
//!
//! ```no_run
//! use wiivol::{Partition, Volume};
//!
//! let volume = Volume::open("path/to/game.iso").expect("Failed to open disc");
//! let partition = volume.game_partition();
//! if partition != Partition::NONE {
//!     println!("Title ID: {:016X}", volume.title_id(partition).unwrap_or(0));
//!     let mut buf = [0u8; 6];
//!     if volume.read(partition, 0, &mut buf) {
//!         println!("Game ID: {}", String::from_utf8_lossy(&buf));
//!     }
//! }
//! ```

pub use blob::{BlobReader, BlobType, HashBytes, KeyBytes, StreamBlob};
pub use disc::{
    wii::Volume, Partition, PartitionKind, HASHES_SIZE, SECTOR_DATA_SIZE, SECTOR_SIZE,
};
pub use es::{
    is_valid_tmd_size, Content, SignedHeader, Ticket, TicketReader, TicketTimeLimit, TicketView,
    TmdHeader, TmdReader, TICKET_SIZE, TICKET_VIEW_SIZE, TMD_HEADER_SIZE, TMD_MAX_SIZE,
};

mod blob;
mod disc;
mod es;
mod util;

/// Error types for wiivol.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An error for disc format related issues.
    #[error("disc format error: {0}")]
    DiscFormat(String),
    /// A general I/O error.
    #[error("I/O error: {0}")]
    Io(String, #[source] std::io::Error),
    /// An unknown error.
    #[error("error: {0}")]
    Other(String),
}

/// Helper result type for [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Helper trait for adding context to errors.
pub trait ErrorContext {
    /// Adds context to an error.
    fn context(self, context: impl Into<String>) -> Error;
}

impl ErrorContext for std::io::Error {
    #[inline]
    fn context(self, context: impl Into<String>) -> Error { Error::Io(context.into(), self) }
}

/// Helper trait for adding context to result errors.
pub trait ResultContext<T> {
    /// Adds context to a result error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Adds context to a result error using a closure.
    fn with_context<F>(self, f: F) -> Result<T>
    where F: FnOnce() -> String;
}

impl<T, E> ResultContext<T> for Result<T, E>
where E: ErrorContext
{
    #[inline]
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    #[inline]
    fn with_context<F>(self, f: F) -> Result<T>
    where F: FnOnce() -> String {
        self.map_err(|e| e.context(f()))
    }
}
