//! Object identity for the gitview read-only git library.
//!
//! This crate provides the 20-byte SHA-1 `ObjectId` type, hex
//! encoding/decoding, and a streaming hasher used for content
//! verification throughout gitview.

mod error;
pub mod hasher;
pub mod hex;
mod oid;

pub use error::HashError;
pub use hasher::Hasher;
pub use oid::ObjectId;
