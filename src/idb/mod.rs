//! IDA database binary format parsing.
//!
//! This module contains types and functions for reading the on-disk
//! structures of `.idb` files: the outer section container, the "id0"
//! B-tree key/value index with its navigable cursor, the "id1" per-byte
//! flags map, the "nam" named-address list, and the "til" type-library
//! signature stub.
//!
//! Start with [`container::Idb`] to parse a full file buffer, then use the
//! typed section accessors to query individual sections.

pub mod constants;
pub mod container;
pub mod cursor;
pub mod export;
pub mod flags;
pub mod id0;
pub mod id1;
pub mod nam;
pub mod reader;
pub mod til;
