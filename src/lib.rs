//! Composable JSON decoders with three-way results.
//!
//! A decoder turns an untyped [`serde_json::Value`] into a typed value and
//! reports *everything* it found along the way as a [`DecodeError`] tree:
//!
//! - [`Outcome::Failure`] when the input is unusable,
//! - [`Outcome::Success`] when it is clean,
//! - [`Outcome::Warning`] when a value was produced but something was off
//!   (extra keys, NaN, ...).
//!
//! ```
//! use json_decode::{draw, number, string, struct_, Decoder};
//! use serde_json::json;
//!
//! let person = struct_([("name", string().json()), ("age", number().json())]);
//! let out = draw(person.decode(&json!({"name": "ada", "age": "36"})));
//! assert!(out.is_failure());
//! ```
pub mod decoder;
pub mod draw;
pub mod error;
pub mod intersect;
pub mod json;
pub mod lazy;
pub mod leaf;
pub mod outcome;
pub mod primitives;
pub mod schema;
pub mod structural;
pub mod sum;
pub mod union;

pub use decoder::{
    from_fn, id, refine, typed, BoxDecoder, CompositionD, Decoder, IdentityD, JsonDecoder, MapD, MapErrorD,
};
pub use draw::{draw, draw_tree, draw_with, render_leaf_with, to_tree, to_tree_with, Tree};
pub use error::{message, CompoundKind, DecodeError, MemberTag};
pub use intersect::{intersect, IntersectD, Mergeable};
pub use json::IntoJson;
pub use lazy::{lazy, recursive, LazyD, SelfRef};
pub use leaf::{format_unknown, LeafError, Literal};
pub use outcome::{failure, success, warning, Outcome};
pub use primitives::{boolean, float, literal, number, string, unknown_array, unknown_record};
pub use schema::{Schema, SchemaError};
pub use structural::{
    array, from_array, from_partial, from_record, from_struct, from_tuple, missing_indexes, missing_keys, partial,
    record, struct_, tuple, unexpected_indexes, unexpected_keys,
};
pub use sum::{from_sum, sum};
pub use union::{nullable, union};
