//! NBT tag tree, binary codec, standalone NBT file wrapper, and Region (`.mca`) file container.
//!
//! - [`tag`] — the tagged-sum tag model (`NbtTag`, `NbtCompound`, `NbtList`).
//! - [`raw`] — the stream-based binary codec.
//! - [`file`] — a standalone NBT file (a root compound plus optional gzip framing).
//! - [`region`] — the block-allocated Region container, a 32×32 grid of compressed chunks.
//! - [`error`] — the error types surfaced by every layer above.

pub mod error;
pub mod file;
pub mod raw;
pub mod region;
pub mod tag;

pub use error::{NbtError, RegionError};
pub use file::{FileMode, NbtFile};
pub use region::{Compression, RegionFile};
pub use tag::{MergeMode, NbtCompound, NbtList, NbtTag, QueryValue};
