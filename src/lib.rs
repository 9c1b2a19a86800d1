//! # fieldstore
//!
//! Typed record encoding over sorted byte maps, with:
//! - Deterministic binary key/value layouts derived from field lists
//! - Multi-index fan-out on write (one put, every matching definition)
//! - Structural value decoding without on-disk type tags
//! - Ordered range iteration with cross-partition continuation
//! - A chunked, digest-tracked blob store
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Store (client)                        │
//! │          iterate → iterate_next → ... until Done             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ StorageEngine
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Engine / DiskEngine                         │
//! │   Definitions · KeyRegistry · Entry codec · BlobStore        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ MapProvider
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Memory    │          │    Disk     │
//!   │ SortedTable │          │ SortedTable │
//!   └─────────────┘          │ + table.log │
//!                            └─────────────┘
//! ```
//!
//! ## Example
//! ```
//! use fieldstore::{Definition, Engine, Field, FieldKind, FieldSize, StorageEngine};
//! use uuid::Uuid;
//!
//! let id = Field::new(Uuid::new_v4(), "person.id", FieldKind::Int32);
//! let name = Field::new(Uuid::new_v4(), "person.name", FieldKind::Text(FieldSize::NullTerminated));
//! let person = Definition::named("person", vec![id.clone().into()], vec![name.clone().into()]);
//!
//! let engine = Engine::new(vec![person]).unwrap();
//! engine.put(&[id.value(1), name.value("John")]).unwrap();
//!
//! let entry = engine.get(&[id.value(1)]).unwrap().unwrap();
//! assert_eq!(entry.get(&name).and_then(|v| v.as_str()), Some("John"));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod blob;
pub mod client;
pub mod comparator;
pub mod definition;
pub mod engine;
pub mod entry;
pub mod field;
pub mod key;
pub mod log;
pub mod provider;
pub mod query;
pub mod table;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use blob::{Blob, BlobReader, BlobStore, StreamEncoding};
pub use client::{EntryIteration, Store};
pub use config::{Config, SyncStrategy};
pub use definition::Definition;
pub use engine::{Continuation, DiskEngine, Engine, Entries, MapKeyValue, StorageEngine};
pub use entry::Entry;
pub use error::{Result, StoreError};
pub use field::{Column, Field, FieldKind, FieldRange, FieldSize, FieldValue, Value};
pub use key::TableId;
pub use query::EntriesExt;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of fieldstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
