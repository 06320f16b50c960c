//! Declaration graph module.
//!
//! Provides the snapshot data model, the incremental rebuild engine,
//! snapshot persistence and read-only query projections.

pub mod builder;
pub mod persistence;
pub mod query;
pub mod types;

pub use builder::GraphBuilder;
pub use persistence::SnapshotCache;
pub use query::SnapshotStats;
pub use types::{
    Diagnostic, FileRecord, FileStamp, RebuildStats, Rebuilt, Snapshot, TypeDeclaration, TypeKind,
};
