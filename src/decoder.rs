//! The `Decoder` abstraction, its adapters, and pipeline composition.
//!
//! Decoders are plain values: every combinator is a struct that keeps its
//! constituent decoders in public fields, so a decoder graph can be walked
//! after construction.
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CompoundKind, DecodeError};
use crate::json::IntoJson;
use crate::leaf::LeafError;
use crate::outcome::{failure, success, warning, Outcome};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

pub trait Decoder {
    type Input: ?Sized;
    type Error;
    type Output;

    fn decode(&self, input: &Self::Input) -> Outcome<Self::Error, Self::Output>;

    fn map<B, F>(self, f: F) -> MapD<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Output) -> B,
    {
        MapD { decoder: self, map: f }
    }

    fn map_error<E2, F>(self, f: F) -> MapErrorD<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Error) -> E2,
    {
        MapErrorD { decoder: self, map_error: f }
    }

    /// Runs `next` on this decoder's output.
    fn compose<N>(self, next: N) -> CompositionD<Self, N>
    where
        Self: Sized,
        N: Decoder<Input = Self::Output>,
    {
        CompositionD { prev: self, next }
    }

    fn boxed(self) -> BoxDecoder<Self::Input, Self::Error, Self::Output>
    where
        Self: Sized + Send + Sync + 'static,
    {
        Arc::new(self)
    }

    /// Erases the output back to a JSON value, so that decoders with
    /// different outputs can share one schema map. The value is rebuilt
    /// from the output, see [`crate::json::IntoJson`].
    fn json(self) -> BoxDecoder<Self::Input, Self::Error, Value>
    where
        Self: Sized + Send + Sync + 'static,
        Self::Output: IntoJson,
    {
        let erased: MapD<Self, fn(Self::Output) -> Value> = MapD { decoder: self, map: IntoJson::into_json };
        Arc::new(erased)
    }
}

/// Shared, type-erased decoder.
pub type BoxDecoder<I, E, A> = Arc<dyn Decoder<Input = I, Error = E, Output = A> + Send + Sync>;

/// A decoder over JSON values with JSON output; the common currency of
/// heterogeneous schemas.
pub type JsonDecoder<E = LeafError> = BoxDecoder<Value, DecodeError<E>, Value>;

impl<D: Decoder + ?Sized> Decoder for Arc<D> {
    type Input = D::Input;
    type Error = D::Error;
    type Output = D::Output;

    fn decode(&self, input: &Self::Input) -> Outcome<Self::Error, Self::Output> {
        (**self).decode(input)
    }
}

impl<D: Decoder + ?Sized> Decoder for &D {
    type Input = D::Input;
    type Error = D::Error;
    type Output = D::Output;

    fn decode(&self, input: &Self::Input) -> Outcome<Self::Error, Self::Output> {
        (**self).decode(input)
    }
}

#[derive(Debug, Clone)]
pub struct MapD<D, F> {
    pub decoder: D,
    pub map: F,
}

impl<D, F, B> Decoder for MapD<D, F>
where
    D: Decoder,
    F: Fn(D::Output) -> B,
{
    type Input = D::Input;
    type Error = D::Error;
    type Output = B;

    fn decode(&self, input: &Self::Input) -> Outcome<Self::Error, B> {
        self.decoder.decode(input).map(&self.map)
    }
}

#[derive(Debug, Clone)]
pub struct MapErrorD<D, F> {
    pub decoder: D,
    pub map_error: F,
}

impl<D, F, E2> Decoder for MapErrorD<D, F>
where
    D: Decoder,
    F: Fn(D::Error) -> E2,
{
    type Input = D::Input;
    type Error = E2;
    type Output = D::Output;

    fn decode(&self, input: &Self::Input) -> Outcome<E2, Self::Output> {
        self.decoder.decode(input).map_error(&self.map_error)
    }
}

/// `prev` then `next`. Errors are tagged `Prev`/`Next` inside a
/// `composition` compound so the failing stage stays visible.
#[derive(Debug, Clone)]
pub struct CompositionD<P, N> {
    pub prev: P,
    pub next: N,
}

impl<P, N, E> Decoder for CompositionD<P, N>
where
    P: Decoder<Error = DecodeError<E>>,
    N: Decoder<Input = P::Output, Error = DecodeError<E>>,
{
    type Input = P::Input;
    type Error = DecodeError<E>;
    type Output = N::Output;

    fn decode(&self, input: &Self::Input) -> Outcome<Self::Error, Self::Output> {
        match self.prev.decode(input) {
            Outcome::Failure { error } => failure(composition(vec![DecodeError::prev(error)])),
            Outcome::Success { value } => self
                .next
                .decode(&value)
                .map_error(|e2| composition(vec![DecodeError::next(e2)])),
            Outcome::Warning { error: w1, value } => match self.next.decode(&value) {
                Outcome::Failure { error: e2 } => {
                    failure(composition(vec![DecodeError::prev(w1), DecodeError::next(e2)]))
                }
                Outcome::Success { value: b } => warning(composition(vec![DecodeError::prev(w1)]), b),
                Outcome::Warning { error: w2, value: b } => {
                    warning(composition(vec![DecodeError::prev(w1), DecodeError::next(w2)]), b)
                }
            },
        }
    }
}

fn composition<E>(errors: Vec<DecodeError<E>>) -> DecodeError<E> {
    DecodeError::compound(CompoundKind::Composition, errors)
}

/// Passes its input through untouched.
pub struct IdentityD<A, E = LeafError> {
    marker: PhantomData<fn(A) -> E>,
}

pub fn id<A: Clone, E>() -> IdentityD<A, E> {
    IdentityD { marker: PhantomData }
}

impl<A: Clone, E> Decoder for IdentityD<A, E> {
    type Input = A;
    type Error = DecodeError<E>;
    type Output = A;

    fn decode(&self, input: &A) -> Outcome<Self::Error, A> {
        success(input.clone())
    }
}

/// Decoder backed by a plain function.
pub struct FromFnD<I: ?Sized, E, A, F> {
    decode: F,
    marker: PhantomData<fn(&I) -> (E, A)>,
}

pub fn from_fn<I, E, A, F>(decode: F) -> FromFnD<I, E, A, F>
where
    I: ?Sized,
    F: Fn(&I) -> Outcome<E, A>,
{
    FromFnD { decode, marker: PhantomData }
}

impl<I: ?Sized, E, A, F> Decoder for FromFnD<I, E, A, F>
where
    F: Fn(&I) -> Outcome<E, A>,
{
    type Input = I;
    type Error = E;
    type Output = A;

    fn decode(&self, input: &I) -> Outcome<E, A> {
        (self.decode)(input)
    }
}

/// Keeps values that satisfy `predicate`; others fail with a message leaf.
/// Meant to sit after a shape decoder in a `compose` chain.
pub struct RefineD<A, F> {
    predicate: F,
    pub message: String,
    marker: PhantomData<fn(&A)>,
}

pub fn refine<A, F>(predicate: F, message: impl Into<String>) -> RefineD<A, F>
where
    A: Clone,
    F: Fn(&A) -> bool,
{
    RefineD { predicate, message: message.into(), marker: PhantomData }
}

impl<A: Clone, F: Fn(&A) -> bool> Decoder for RefineD<A, F> {
    type Input = A;
    type Error = DecodeError;
    type Output = A;

    fn decode(&self, input: &A) -> Outcome<DecodeError, A> {
        if (self.predicate)(input) {
            success(input.clone())
        } else {
            failure(crate::error::message(self.message.clone()))
        }
    }
}

/// Bridges into serde: decodes a JSON value into any deserializable `T`.
/// Failures carry the JSON path of the offending node.
pub struct TypedD<T> {
    marker: PhantomData<fn() -> T>,
}

pub fn typed<T: DeserializeOwned>() -> TypedD<T> {
    TypedD { marker: PhantomData }
}

impl<T: DeserializeOwned> Decoder for TypedD<T> {
    type Input = Value;
    type Error = DecodeError;
    type Output = T;

    fn decode(&self, input: &Value) -> Outcome<DecodeError, T> {
        match serde_path_to_error::deserialize::<_, T>(input) {
            Ok(v) => success(v),
            Err(err) => {
                let path = err.path().to_string();
                failure(crate::error::message(format!("at JSON path {path} → {}", err.into_inner())))
            }
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
