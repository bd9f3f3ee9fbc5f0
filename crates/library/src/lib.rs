//! The thumbnail cache: turning identifiers into files on disk, deciding when
//! a thumbnail is stale, and bringing whole media trees up to date.
//!
//! [`Engine`] owns every piece of state for one configuration. Nothing in this
//! crate returns an error: a missing file, an unsupported type or a failed
//! render all end up as `None` (or a `failed` count) plus a log line.

mod engine;
mod flight;
mod keying;
mod lookup;
mod resolve;
pub mod scan;
mod thumbnail;

pub use crate::engine::{Engine, EngineHandle, Status};
pub use crate::flight::KeyedLocks;
pub use crate::keying::{THUMBNAIL_EXTENSION, cache_path_for, is_fresh};
pub use crate::resolve::{DEFAULT_ROOT, MEDIA_SOURCE_PREFIX, PathResolver};
pub use crate::scan::{FileOutcome, GenerationStats, ScanEvent};
