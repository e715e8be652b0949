//! Versioned binary interchange for volta designs.
//!
//! Design snapshots, solve requests and solve responses are encoded with
//! `bincode` and framed behind a [`Header`] that identifies the format and
//! checksums the payload. [`WireSolver`] pushes every solver round trip
//! through this encoding.
//!
//! # Usage
//!
//! ```ignore
//! write_file(Path::new("build/design.volt"), &Message::design(design))?;
//! let (header, message) = read_file(Path::new("build/design.volt"))?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod header;
pub mod message;
pub mod wire;

pub use error::InterchangeError;
pub use header::{Header, FORMAT_VERSION, MAGIC};
pub use message::{decode, encode, read_file, write_file, Message};
pub use wire::WireSolver;
