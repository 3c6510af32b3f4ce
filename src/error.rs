//! The decode-error tree.
//!
//! A closed set of node kinds: leaves carrying a domain payload `E`,
//! single-child wrappers that record *where* a problem happened, terminal
//! key/index collections, and named compounds. Rendering (`draw`) and
//! intersection pruning (`intersect`) both match on it exhaustively.
use std::fmt;

use serde::Serialize;

use crate::leaf::LeafError;

/// Which combinator produced a [`DecodeError::Compound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundKind {
    Struct,
    Partial,
    Tuple,
    Array,
    Record,
    Composition,
    Intersection,
    Union,
}

impl CompoundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompoundKind::Struct => "struct",
            CompoundKind::Partial => "partial",
            CompoundKind::Tuple => "tuple",
            CompoundKind::Array => "array",
            CompoundKind::Record => "record",
            CompoundKind::Composition => "composition",
            CompoundKind::Intersection => "intersection",
            CompoundKind::Union => "union",
        }
    }
}

impl fmt::Display for CompoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of a union / intersection / sum branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum MemberTag {
    /// Side of an intersection, 0 or 1.
    Index(usize),
    /// Position in a union's member list. Printed quoted, like a key.
    Position(usize),
    /// Discriminant value that selected a sum member.
    Key(String),
}

impl fmt::Display for MemberTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberTag::Index(i) => write!(f, "{i}"),
            MemberTag::Position(i) => write!(f, "\"{i}\""),
            MemberTag::Key(k) => f.write_str(&crate::leaf::quote(k)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeError<E = LeafError> {
    Leaf { error: E },
    RequiredKey { key: String, error: Box<DecodeError<E>> },
    OptionalKey { key: String, error: Box<DecodeError<E>> },
    RequiredIndex { index: usize, error: Box<DecodeError<E>> },
    OptionalIndex { index: usize, error: Box<DecodeError<E>> },
    Member { member: MemberTag, error: Box<DecodeError<E>> },
    /// Failure or warning raised by the first stage of a composition.
    Prev { error: Box<DecodeError<E>> },
    /// Failure or warning raised by the second stage of a composition.
    Next { error: Box<DecodeError<E>> },
    Nullable { error: Box<DecodeError<E>> },
    Lazy { id: String, error: Box<DecodeError<E>> },
    Sum { error: Box<DecodeError<E>> },
    UnexpectedKeys { keys: Vec<String> },
    MissingKeys { keys: Vec<String> },
    UnexpectedIndexes { indexes: Vec<usize> },
    MissingIndexes { indexes: Vec<usize> },
    /// Never constructed with an empty `errors` list.
    Compound { name: CompoundKind, errors: Vec<DecodeError<E>> },
}

impl<E> DecodeError<E> {
    pub fn leaf(error: E) -> Self {
        DecodeError::Leaf { error }
    }

    pub fn required_key(key: impl Into<String>, error: Self) -> Self {
        DecodeError::RequiredKey { key: key.into(), error: Box::new(error) }
    }

    pub fn optional_key(key: impl Into<String>, error: Self) -> Self {
        DecodeError::OptionalKey { key: key.into(), error: Box::new(error) }
    }

    pub fn required_index(index: usize, error: Self) -> Self {
        DecodeError::RequiredIndex { index, error: Box::new(error) }
    }

    pub fn optional_index(index: usize, error: Self) -> Self {
        DecodeError::OptionalIndex { index, error: Box::new(error) }
    }

    pub fn member(member: MemberTag, error: Self) -> Self {
        DecodeError::Member { member, error: Box::new(error) }
    }

    pub fn prev(error: Self) -> Self {
        DecodeError::Prev { error: Box::new(error) }
    }

    pub fn next(error: Self) -> Self {
        DecodeError::Next { error: Box::new(error) }
    }

    pub fn nullable(error: Self) -> Self {
        DecodeError::Nullable { error: Box::new(error) }
    }

    pub fn lazy(id: impl Into<String>, error: Self) -> Self {
        DecodeError::Lazy { id: id.into(), error: Box::new(error) }
    }

    pub fn sum(error: Self) -> Self {
        DecodeError::Sum { error: Box::new(error) }
    }

    pub fn compound(name: CompoundKind, errors: Vec<Self>) -> Self {
        debug_assert!(!errors.is_empty(), "compound `{name}` built without children");
        DecodeError::Compound { name, errors }
    }

    /// Re-types every leaf payload, keeping the tree shape.
    pub fn map_leaf<F2>(self, f: impl Fn(E) -> F2 + Copy) -> DecodeError<F2> {
        let wrap = |error: Box<DecodeError<E>>| Box::new((*error).map_leaf(f));
        match self {
            DecodeError::Leaf { error } => DecodeError::Leaf { error: f(error) },
            DecodeError::RequiredKey { key, error } => DecodeError::RequiredKey { key, error: wrap(error) },
            DecodeError::OptionalKey { key, error } => DecodeError::OptionalKey { key, error: wrap(error) },
            DecodeError::RequiredIndex { index, error } => DecodeError::RequiredIndex { index, error: wrap(error) },
            DecodeError::OptionalIndex { index, error } => DecodeError::OptionalIndex { index, error: wrap(error) },
            DecodeError::Member { member, error } => DecodeError::Member { member, error: wrap(error) },
            DecodeError::Prev { error } => DecodeError::Prev { error: wrap(error) },
            DecodeError::Next { error } => DecodeError::Next { error: wrap(error) },
            DecodeError::Nullable { error } => DecodeError::Nullable { error: wrap(error) },
            DecodeError::Lazy { id, error } => DecodeError::Lazy { id, error: wrap(error) },
            DecodeError::Sum { error } => DecodeError::Sum { error: wrap(error) },
            DecodeError::UnexpectedKeys { keys } => DecodeError::UnexpectedKeys { keys },
            DecodeError::MissingKeys { keys } => DecodeError::MissingKeys { keys },
            DecodeError::UnexpectedIndexes { indexes } => DecodeError::UnexpectedIndexes { indexes },
            DecodeError::MissingIndexes { indexes } => DecodeError::MissingIndexes { indexes },
            DecodeError::Compound { name, errors } => DecodeError::Compound {
                name,
                errors: errors.into_iter().map(|e| e.map_leaf(f)).collect(),
            },
        }
    }
}

pub fn message<E: From<LeafError>>(message: impl Into<String>) -> DecodeError<E> {
    DecodeError::leaf(E::from(LeafError::message(message)))
}

impl<E: fmt::Display> fmt::Display for DecodeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::draw::draw_tree(&crate::draw::to_tree(self)))
    }
}

impl<E: fmt::Display + fmt::Debug> std::error::Error for DecodeError<E> {}

// ------------------------------- Tests ------------------------------------ //
