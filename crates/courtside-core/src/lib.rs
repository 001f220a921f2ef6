//! # courtside-core
//!
//! Core library for the Courtside roster editor.
//!
//! This crate provides:
//! - Offset schema loading (field descriptors, pointer chains, table layouts)
//! - Windows process memory reading and writing
//! - Pointer chain resolution with multi-candidate fallback
//! - Sub-byte field access with read-modify-write discipline
//! - Rating/tendency scale conversions
//! - Layered roster discovery with corruption detection
//!
//! The target process is read and written live; nothing is persisted here.
//! See the module docs on [`roster`] for the concurrency contract.

pub mod codec;
pub mod convert;
pub mod error;
pub mod memory;
pub mod resolve;
pub mod roster;
pub mod schema;

pub use error::{Error, Result};
pub use memory::{AttachProcess, GameProcess, ProcessInfo, ReadMemory, WriteMemory};
pub use resolve::{ResolvedBases, resolve_chain, resolve_first};
pub use roster::{
    ExternalPlayer, FREE_AGENTS, Player, Roster, RosterSource, ScanPolicy, Team,
};
pub use schema::{
    FieldAccess, FieldDescriptor, FieldKind, Hop, NameLayout, PointerChain, Schema, TableKind,
    TableSpec, TextEncoding, TextField, load_schema, parse_schema,
};
