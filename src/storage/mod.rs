//! Receipt Object Storage Module
//!
//! Receipts live in a single bucket under two prefixes:
//!
//! ```text
//! bucket/
//! ├── temp/        # staged uploads, expired by a lifecycle rule
//! │   └── purchase/<user>/<expense>/<receipt>
//! └── receipts/    # confirmed receipts; tagged objects are purged later
//!     └── purchase/<user>/<expense>/<receipt>
//! ```
//!
//! - [`ObjectStore`] is the port the reconciliation core talks to
//! - [`InMemoryObjectStore`] is the in-process backend
//! - [`ReceiptPathKeys`] builds the keys above

pub mod memory_store;
pub mod object_store;
pub mod path_keys;

pub use memory_store::{InMemoryObjectStore, StoredObject};
pub use object_store::{ObjectStat, ObjectStore, SourceDestKeyMap};
pub use path_keys::ReceiptPathKeys;
