//! Rebind IR - shared data structures for the binding generator.
//!
//! This crate holds the types that flow between pipeline phases:
//! - Spans and file ids for source locations
//! - The C type model ([`CType`]) produced by the header front end
//! - The source declaration AST ([`ast`]) handed to the generator
//! - The output declaration model ([`model`]) built by the transformer and
//!   consumed once by the emitter
//!
//! # Design Philosophy
//!
//! - **Immutable input**: the AST is produced once per run and never mutated.
//!   Every later phase builds new values from it.
//! - **Plain data**: no interior mutability, no shared ownership. Everything
//!   derives `Clone, Eq, Hash, Debug` so runs can be compared for idempotence.

pub mod ast;
mod ctype;
pub mod model;
mod span;

pub use ctype::{CType, IntKind};
pub use span::{FileId, Span};
