//! # schemadec: schema-driven binary decoding
//!
//! Record layouts are declared once, as data, and a single decoder walks
//! those declarations to populate records from a big-endian byte stream. No
//! per-format parsing code is written.
//!
//! ## Schema structure
//!
//! - **Records**: named, ordered lists of fields
//! - **Primitives**: `u8`, `u16`, `u32` (unsigned, big-endian)
//! - **Nested records**: a field typed by another record's name
//! - **Sequences**: `list<T>`, whose element count is the value of the field declared
//!   immediately before it; `@one_indexed(n)` subtracts `n` from that count
//! - **Variants**: `variant(tag)`, whose concrete record type is chosen from
//!   already-decoded fields, either by an inline table or by a resolver registered in code
//! - `@skip` and `priv` fields are never decoded and keep their zero value
//!
//! ## Example schema
//!
//! ```text
//! record Entry {
//!   tag: u8;
//!   info: variant(tag) {
//!     1 => Short;
//!     2 | 3 => Wide;
//!   };
//! }
//!
//! record Table {
//!   count: u16;
//!   @one_indexed(1)
//!   entries: list<Entry>;
//! }
//! ```
//!
//! ## Usage
//!
//! Parse with [`parse`], index with [`ResolvedSchema::resolve`], then decode
//! with [`Decoder`] or [`unmarshal`]. The [`classfile`] module applies this to
//! JVM class files.

pub mod ast;
pub mod classfile;
pub mod decoder;
pub mod dump;
pub mod error;
pub mod lint;
pub mod parser;
pub mod primitive;
pub mod resolve;
pub mod value;

pub use ast::{FieldDef, FieldKind, RecordDef, ResolvedSchema, Schema, VariantSpec, Width};
pub use decoder::{decode_with_extent, unmarshal, DecodeOptions, Decoder};
pub use error::{DecodeError, ErrorKind, PathSegment, SchemaError};
pub use parser::parse;
pub use resolve::VariantResolver;
pub use value::{Record, Value};
