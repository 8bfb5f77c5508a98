//! ## Struct types for GraphQL
//!
//! `struct` declares a named composite type made only of leaf-compatible fields, usable as both
//! input and output. `structUnion` declares "one of a fixed set of structs". This crate provides
//! the three pieces needed to support them:
//!
//! - [`schema`]: reads schema definitions and validates struct and struct union declarations,
//!   including recursion that can never terminate.
//! - [`selection`]: validates the restricted selection grammar inside struct-typed fields and
//!   merges every occurrence of a field into one effective selection.
//! - [`coercion`]: coerces input values, resolving struct union members by `__typename`.
//!
//! Everything is a pure function of the schema, the document and the input. A validated schema
//! can be shared freely across threads.

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

pub mod coercion;
pub mod config;
pub mod error;
pub mod schema;
pub mod selection;

pub use crate::coercion::CoercedValue;
pub use crate::coercion::coerce_input;
pub use crate::config::StructConfig;
pub use crate::error::StructError;
pub use crate::schema::StructSchema;
pub use crate::schema::ValidStructSchema;
pub use crate::selection::StructSelection;
pub use crate::selection::merge_struct_selections;

const _: () = {
    const fn assert_thread_safe<T: Send + Sync>() {}
    assert_thread_safe::<ValidStructSchema>();
    assert_thread_safe::<StructError>();
};
