//! Objects, tuples, arrays and records.
//!
//! The closed shapes are pipelines built with [`Decoder::compose`]:
//!
//! ```text
//! shape check → unexpected keys/indexes (warning, extras dropped)
//!             → missing keys/indexes   (failure)
//!             → per-member decode      (collect every member's outcome)
//! ```
//!
//! Each stage is public, so the pieces can be recombined.
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::decoder::{CompositionD, Decoder};
use crate::error::{CompoundKind, DecodeError};
use crate::outcome::{failure, success, warning, Outcome};
use crate::primitives::{unknown_array, unknown_record, UnknownArrayD, UnknownRecordD};

static NULL: Value = Value::Null;

// ————————————————————————————————————————————————————————————————————————————
// AGGREGATION
// ————————————————————————————————————————————————————————————————————————————

/// Per-member bookkeeping shared by every aggregating combinator.
///
/// Failures clear `is_both`; warnings keep it. A non-empty error list then
/// becomes a warning only if no member failed outright.
struct Collect<E> {
    errors: Vec<DecodeError<E>>,
    is_both: bool,
}

impl<E> Collect<E> {
    fn new() -> Self {
        Self { errors: Vec::new(), is_both: true }
    }

    fn member<A>(
        &mut self,
        outcome: Outcome<DecodeError<E>, A>,
        wrap: impl FnOnce(DecodeError<E>) -> DecodeError<E>,
    ) -> Option<A> {
        match outcome {
            Outcome::Failure { error } => {
                self.is_both = false;
                self.errors.push(wrap(error));
                None
            }
            Outcome::Success { value } => Some(value),
            Outcome::Warning { error, value } => {
                self.errors.push(wrap(error));
                Some(value)
            }
        }
    }

    fn finish<T>(self, name: CompoundKind, out: T) -> Outcome<DecodeError<E>, T> {
        if self.errors.is_empty() {
            success(out)
        } else if self.is_both {
            warning(DecodeError::compound(name, self.errors), out)
        } else {
            failure(DecodeError::compound(name, self.errors))
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// KEYS
// ————————————————————————————————————————————————————————————————————————————

/// Reports input keys outside `properties` and drops them from the output.
#[derive(Debug, Clone)]
pub struct UnexpectedKeysD {
    pub properties: Vec<String>,
}

pub fn unexpected_keys<K: Into<String>>(properties: impl IntoIterator<Item = K>) -> UnexpectedKeysD {
    UnexpectedKeysD { properties: properties.into_iter().map(Into::into).collect() }
}

impl Decoder for UnexpectedKeysD {
    type Input = Map<String, Value>;
    type Error = DecodeError;
    type Output = Map<String, Value>;

    fn decode(&self, ur: &Map<String, Value>) -> Outcome<DecodeError, Map<String, Value>> {
        let mut out = Map::new();
        for k in &self.properties {
            if let Some(v) = ur.get(k) {
                out.insert(k.clone(), v.clone());
            }
        }
        let keys: Vec<String> = ur.keys().filter(|k| !out.contains_key(*k)).cloned().collect();
        if keys.is_empty() {
            success(ur.clone())
        } else {
            warning(DecodeError::UnexpectedKeys { keys }, out)
        }
    }
}

#[derive(Debug, Clone)]
pub struct MissingKeysD {
    pub properties: Vec<String>,
}

pub fn missing_keys<K: Into<String>>(properties: impl IntoIterator<Item = K>) -> MissingKeysD {
    MissingKeysD { properties: properties.into_iter().map(Into::into).collect() }
}

impl Decoder for MissingKeysD {
    type Input = Map<String, Value>;
    type Error = DecodeError;
    type Output = Map<String, Value>;

    fn decode(&self, r: &Map<String, Value>) -> Outcome<DecodeError, Map<String, Value>> {
        let keys: Vec<String> = self.properties.iter().filter(|k| !r.contains_key(*k)).cloned().collect();
        if keys.is_empty() {
            success(r.clone())
        } else {
            failure(DecodeError::MissingKeys { keys })
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// STRUCT / PARTIAL
// ————————————————————————————————————————————————————————————————————————————

/// Decodes every declared property; absent keys are decoded as `null`.
#[derive(Debug, Clone)]
pub struct FromStructD<D> {
    pub properties: IndexMap<String, D>,
}

pub fn from_struct<K: Into<String>, D>(properties: impl IntoIterator<Item = (K, D)>) -> FromStructD<D> {
    FromStructD { properties: properties.into_iter().map(|(k, d)| (k.into(), d)).collect() }
}

impl<D, E> Decoder for FromStructD<D>
where
    D: Decoder<Input = Value, Error = DecodeError<E>>,
{
    type Input = Map<String, Value>;
    type Error = DecodeError<E>;
    type Output = IndexMap<String, D::Output>;

    fn decode(&self, ur: &Map<String, Value>) -> Outcome<Self::Error, Self::Output> {
        let mut collect = Collect::new();
        let mut ar = IndexMap::with_capacity(self.properties.len());
        for (k, decoder) in &self.properties {
            let de = decoder.decode(ur.get(k).unwrap_or(&NULL));
            if let Some(a) = collect.member(de, |e| DecodeError::required_key(k.clone(), e)) {
                ar.insert(k.clone(), a);
            }
        }
        collect.finish(CompoundKind::Struct, ar)
    }
}

pub type StructD<D> =
    CompositionD<CompositionD<CompositionD<UnknownRecordD, UnexpectedKeysD>, MissingKeysD>, FromStructD<D>>;

/// A closed object: every declared key is required, undeclared keys are
/// reported as a warning and stripped.
pub fn struct_<K, D>(properties: impl IntoIterator<Item = (K, D)>) -> StructD<D>
where
    K: Into<String>,
    D: Decoder<Input = Value, Error = DecodeError>,
{
    let from = from_struct(properties);
    let keys: Vec<String> = from.properties.keys().cloned().collect();
    unknown_record()
        .compose(unexpected_keys(keys.clone()))
        .compose(missing_keys(keys))
        .compose(from)
}

/// Like [`FromStructD`], but absent keys are skipped. A present `null` still
/// goes through the property decoder; wrap it in `nullable` to accept it.
#[derive(Debug, Clone)]
pub struct FromPartialD<D> {
    pub properties: IndexMap<String, D>,
}

pub fn from_partial<K: Into<String>, D>(properties: impl IntoIterator<Item = (K, D)>) -> FromPartialD<D> {
    FromPartialD { properties: properties.into_iter().map(|(k, d)| (k.into(), d)).collect() }
}

impl<D, E> Decoder for FromPartialD<D>
where
    D: Decoder<Input = Value, Error = DecodeError<E>>,
{
    type Input = Map<String, Value>;
    type Error = DecodeError<E>;
    type Output = IndexMap<String, D::Output>;

    fn decode(&self, ur: &Map<String, Value>) -> Outcome<Self::Error, Self::Output> {
        let mut collect = Collect::new();
        let mut ar = IndexMap::new();
        for (k, decoder) in &self.properties {
            let Some(u) = ur.get(k) else {
                continue;
            };
            if let Some(a) = collect.member(decoder.decode(u), |e| DecodeError::optional_key(k.clone(), e)) {
                ar.insert(k.clone(), a);
            }
        }
        collect.finish(CompoundKind::Partial, ar)
    }
}

pub type PartialD<D> = CompositionD<CompositionD<UnknownRecordD, UnexpectedKeysD>, FromPartialD<D>>;

pub fn partial<K, D>(properties: impl IntoIterator<Item = (K, D)>) -> PartialD<D>
where
    K: Into<String>,
    D: Decoder<Input = Value, Error = DecodeError>,
{
    let from = from_partial(properties);
    let keys: Vec<String> = from.properties.keys().cloned().collect();
    unknown_record().compose(unexpected_keys(keys)).compose(from)
}

// ————————————————————————————————————————————————————————————————————————————
// INDEXES
// ————————————————————————————————————————————————————————————————————————————

/// Reports elements past `arity` and truncates them away.
#[derive(Debug, Clone, Copy)]
pub struct UnexpectedIndexesD {
    pub arity: usize,
}

pub fn unexpected_indexes(arity: usize) -> UnexpectedIndexesD {
    UnexpectedIndexesD { arity }
}

impl Decoder for UnexpectedIndexesD {
    type Input = Vec<Value>;
    type Error = DecodeError;
    type Output = Vec<Value>;

    fn decode(&self, us: &Vec<Value>) -> Outcome<DecodeError, Vec<Value>> {
        if us.len() <= self.arity {
            return success(us.clone());
        }
        let indexes: Vec<usize> = (self.arity..us.len()).collect();
        warning(DecodeError::UnexpectedIndexes { indexes }, us[..self.arity].to_vec())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MissingIndexesD {
    pub arity: usize,
}

pub fn missing_indexes(arity: usize) -> MissingIndexesD {
    MissingIndexesD { arity }
}

impl Decoder for MissingIndexesD {
    type Input = Vec<Value>;
    type Error = DecodeError;
    type Output = Vec<Value>;

    fn decode(&self, us: &Vec<Value>) -> Outcome<DecodeError, Vec<Value>> {
        if us.len() >= self.arity {
            return success(us.clone());
        }
        let indexes: Vec<usize> = (us.len()..self.arity).collect();
        failure(DecodeError::MissingIndexes { indexes })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TUPLE / ARRAY / RECORD
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub struct FromTupleD<D> {
    pub components: Vec<D>,
}

pub fn from_tuple<D>(components: impl IntoIterator<Item = D>) -> FromTupleD<D> {
    FromTupleD { components: components.into_iter().collect() }
}

impl<D, E> Decoder for FromTupleD<D>
where
    D: Decoder<Input = Value, Error = DecodeError<E>>,
{
    type Input = Vec<Value>;
    type Error = DecodeError<E>;
    type Output = Vec<D::Output>;

    fn decode(&self, us: &Vec<Value>) -> Outcome<Self::Error, Self::Output> {
        let mut collect = Collect::new();
        let mut out = Vec::with_capacity(self.components.len());
        for (index, decoder) in self.components.iter().enumerate() {
            let de = decoder.decode(us.get(index).unwrap_or(&NULL));
            if let Some(a) = collect.member(de, |e| DecodeError::required_index(index, e)) {
                out.push(a);
            }
        }
        collect.finish(CompoundKind::Tuple, out)
    }
}

pub type TupleD<D> =
    CompositionD<CompositionD<CompositionD<UnknownArrayD, UnexpectedIndexesD>, MissingIndexesD>, FromTupleD<D>>;

/// Fixed-arity array; component `i` decodes element `i`.
pub fn tuple<D>(components: impl IntoIterator<Item = D>) -> TupleD<D>
where
    D: Decoder<Input = Value, Error = DecodeError>,
{
    let from = from_tuple(components);
    let arity = from.components.len();
    unknown_array()
        .compose(unexpected_indexes(arity))
        .compose(missing_indexes(arity))
        .compose(from)
}

#[derive(Debug, Clone)]
pub struct FromArrayD<D> {
    pub item: D,
}

pub fn from_array<D>(item: D) -> FromArrayD<D> {
    FromArrayD { item }
}

impl<D, E> Decoder for FromArrayD<D>
where
    D: Decoder<Input = Value, Error = DecodeError<E>>,
{
    type Input = Vec<Value>;
    type Error = DecodeError<E>;
    type Output = Vec<D::Output>;

    fn decode(&self, us: &Vec<Value>) -> Outcome<Self::Error, Self::Output> {
        let mut collect = Collect::new();
        let mut out = Vec::with_capacity(us.len());
        for (index, u) in us.iter().enumerate() {
            if let Some(a) = collect.member(self.item.decode(u), |e| DecodeError::optional_index(index, e)) {
                out.push(a);
            }
        }
        collect.finish(CompoundKind::Array, out)
    }
}

pub type ArrayD<D> = CompositionD<UnknownArrayD, FromArrayD<D>>;

pub fn array<D>(item: D) -> ArrayD<D>
where
    D: Decoder<Input = Value, Error = DecodeError>,
{
    unknown_array().compose(from_array(item))
}

#[derive(Debug, Clone)]
pub struct FromRecordD<D> {
    pub codomain: D,
}

pub fn from_record<D>(codomain: D) -> FromRecordD<D> {
    FromRecordD { codomain }
}

impl<D, E> Decoder for FromRecordD<D>
where
    D: Decoder<Input = Value, Error = DecodeError<E>>,
{
    type Input = Map<String, Value>;
    type Error = DecodeError<E>;
    type Output = IndexMap<String, D::Output>;

    fn decode(&self, i: &Map<String, Value>) -> Outcome<Self::Error, Self::Output> {
        let mut collect = Collect::new();
        let mut r = IndexMap::with_capacity(i.len());
        for (k, u) in i {
            if let Some(a) = collect.member(self.codomain.decode(u), |e| DecodeError::optional_key(k.clone(), e)) {
                r.insert(k.clone(), a);
            }
        }
        collect.finish(CompoundKind::Record, r)
    }
}

pub type RecordD<D> = CompositionD<UnknownRecordD, FromRecordD<D>>;

/// String-keyed map whose values all share `codomain`.
pub fn record<D>(codomain: D) -> RecordD<D>
where
    D: Decoder<Input = Value, Error = DecodeError>,
{
    unknown_record().compose(from_record(codomain))
}

// ------------------------------- Tests ------------------------------------ //
