//! Caching subsystem.
//!
//! Three pieces, leaf-first:
//!
//! - [`key`] — derives the stable, content-addressed identifier for a
//!   `(url, body)` pair. The digest and its truncation are part of the
//!   on-disk format.
//!
//! - [`entry`] — the records one entry is made of: inspectable
//!   [`CacheMeta`], the sidecar-encoded [`ResponseSnapshot`], and the
//!   explicit [`Provenance`] token call sites hand to the store.
//!
//! - [`store`] — [`CacheStore`], the folder-per-entry disk layout with a
//!   shared content-addressed sidecar directory. Reads degrade to misses;
//!   writes propagate failures.
//!
//! Freshness is not judged here: entries carry their capture timestamp and
//! the caller (normally [`CachingClient`](crate::CachingClient)) compares
//! it against its own TTL at read time. Nothing on disk is ever expired or
//! deleted by this module short of an explicit [`CacheStore::clear`].

pub mod entry;
pub mod key;
pub mod store;

pub use entry::{CacheMeta, CachedEntry, Frame, Provenance, ResponseBody, ResponseSnapshot};
pub use key::{KEY_LEN, derive_key, normalize_body};
pub use store::{CacheStats, CacheStore, default_root};
