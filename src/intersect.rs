//! Intersection of two decoders over the same input.
//!
//! Each side is decoded independently and the two values are merged. The
//! tricky part is the diagnostics: neither side knows the other's schema, so
//! each one reports the other's fields as unexpected. Those reports are
//! cross-checked against the peer's error tree and only kept when the peer
//! complains about the same address too.
use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;

use crate::decoder::Decoder;
use crate::error::{CompoundKind, DecodeError, MemberTag};
use crate::outcome::{failure, success, warning, Outcome};

// ————————————————————————————————————————————————————————————————————————————
// VALUE MERGE
// ————————————————————————————————————————————————————————————————————————————

/// Depth-first merge of two decoded views of one input.
///
/// Objects merge key-wise, arrays position-wise; on any other clash the
/// second value wins.
pub trait Mergeable {
    fn merge(self, other: Self) -> Self;
}

impl Mergeable for Value {
    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Value::Object(mut a), Value::Object(b)) => {
                for (k, bv) in b {
                    match a.get_mut(&k) {
                        Some(av) => {
                            let taken = std::mem::take(av);
                            *av = taken.merge(bv);
                        }
                        None => {
                            a.insert(k, bv);
                        }
                    }
                }
                Value::Object(a)
            }
            (Value::Array(a), Value::Array(b)) => Value::Array(a.merge(b)),
            (_, b) => b,
        }
    }
}

impl<A: Mergeable> Mergeable for IndexMap<String, A> {
    fn merge(self, mut other: Self) -> Self {
        let mut out: IndexMap<String, A> = self
            .into_iter()
            .map(|(k, av)| {
                let merged = match other.shift_remove(&k) {
                    Some(bv) => av.merge(bv),
                    None => av,
                };
                (k, merged)
            })
            .collect();
        out.extend(other);
        out
    }
}

impl<A: Mergeable> Mergeable for Vec<A> {
    fn merge(self, other: Self) -> Self {
        let mut out = Vec::with_capacity(self.len().max(other.len()));
        let mut bs = other.into_iter();
        for a in self {
            match bs.next() {
                Some(b) => out.push(a.merge(b)),
                None => out.push(a),
            }
        }
        out.extend(bs);
        out
    }
}

impl<A: Mergeable> Mergeable for Option<A> {
    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Some(a), Some(b)) => Some(a.merge(b)),
            (a, None) => a,
            (None, b) => b,
        }
    }
}

macro_rules! second_wins {
    ($($t:ty),*) => {
        $(impl Mergeable for $t {
            fn merge(self, other: Self) -> Self {
                other
            }
        })*
    };
}

second_wins!(String, f64, bool, crate::leaf::Literal);

// ————————————————————————————————————————————————————————————————————————————
// PRUNING
// ————————————————————————————————————————————————————————————————————————————

/// Dot-joined addresses of every unexpected key/index reported in a tree,
/// e.g. `"a.0.b"`.
pub fn collect_prunable<E>(de: &DecodeError<E>) -> HashSet<String> {
    fn go<E>(de: &DecodeError<E>, prefix: &str, out: &mut HashSet<String>) {
        match de {
            DecodeError::Compound { errors, .. } => {
                for e in errors {
                    go(e, prefix, out);
                }
            }
            DecodeError::Lazy { error, .. }
            | DecodeError::Member { error, .. }
            | DecodeError::Next { error }
            | DecodeError::Nullable { error }
            | DecodeError::Prev { error }
            | DecodeError::Sum { error } => go(error, prefix, out),
            DecodeError::Leaf { .. } | DecodeError::MissingIndexes { .. } | DecodeError::MissingKeys { .. } => {}
            DecodeError::OptionalIndex { index, error } | DecodeError::RequiredIndex { index, error } => {
                go(error, &format!("{prefix}{index}."), out)
            }
            DecodeError::OptionalKey { key, error } | DecodeError::RequiredKey { key, error } => {
                go(error, &format!("{prefix}{key}."), out)
            }
            DecodeError::UnexpectedIndexes { indexes } => {
                out.extend(indexes.iter().map(|index| format!("{prefix}{index}")));
            }
            DecodeError::UnexpectedKeys { keys } => {
                out.extend(keys.iter().map(|key| format!("{prefix}{key}")));
            }
        }
    }
    let mut out = HashSet::new();
    go(de, "", &mut out);
    out
}

/// Keeps only the unexpected keys/indexes whose address (`anticollision`
/// prefix included) is also in `prunable`. Nodes left empty are dropped,
/// and so is every wrapper whose child was dropped.
pub fn prune<E>(de: DecodeError<E>, prunable: &HashSet<String>, anticollision: &str) -> Option<DecodeError<E>> {
    let go = |error: Box<DecodeError<E>>, anticollision: &str| prune(*error, prunable, anticollision);
    match de {
        DecodeError::Compound { name, errors } => {
            let pdes: Vec<_> = errors.into_iter().filter_map(|e| prune(e, prunable, anticollision)).collect();
            (!pdes.is_empty()).then(|| DecodeError::compound(name, pdes))
        }
        DecodeError::Sum { error } => go(error, anticollision).map(DecodeError::sum),
        DecodeError::Next { error } => go(error, anticollision).map(DecodeError::next),
        DecodeError::Nullable { error } => go(error, anticollision).map(DecodeError::nullable),
        DecodeError::Prev { error } => go(error, anticollision).map(DecodeError::prev),
        DecodeError::Lazy { id, error } => go(error, anticollision).map(|pde| DecodeError::lazy(id, pde)),
        DecodeError::Member { member, error } => {
            go(error, anticollision).map(|pde| DecodeError::member(member, pde))
        }
        de @ (DecodeError::Leaf { .. } | DecodeError::MissingIndexes { .. } | DecodeError::MissingKeys { .. }) => {
            Some(de)
        }
        DecodeError::OptionalIndex { index, error } => {
            go(error, &format!("{anticollision}{index}.")).map(|pde| DecodeError::optional_index(index, pde))
        }
        DecodeError::OptionalKey { key, error } => {
            let prefix = format!("{anticollision}{key}.");
            go(error, &prefix).map(|pde| DecodeError::optional_key(key, pde))
        }
        DecodeError::RequiredIndex { index, error } => {
            go(error, &format!("{anticollision}{index}.")).map(|pde| DecodeError::required_index(index, pde))
        }
        DecodeError::RequiredKey { key, error } => {
            let prefix = format!("{anticollision}{key}.");
            go(error, &prefix).map(|pde| DecodeError::required_key(key, pde))
        }
        DecodeError::UnexpectedIndexes { indexes } => {
            let pindexes: Vec<usize> = indexes
                .into_iter()
                .filter(|index| prunable.contains(&format!("{anticollision}{index}")))
                .collect();
            (!pindexes.is_empty()).then_some(DecodeError::UnexpectedIndexes { indexes: pindexes })
        }
        DecodeError::UnexpectedKeys { keys } => {
            let pkeys: Vec<String> =
                keys.into_iter().filter(|key| prunable.contains(&format!("{anticollision}{key}"))).collect();
            (!pkeys.is_empty()).then_some(DecodeError::UnexpectedKeys { keys: pkeys })
        }
    }
}

/// Strips every unexpected key/index report; used when the peer offers
/// nothing to cross-reference.
pub fn prune_all_unexpected<E>(de: DecodeError<E>) -> Option<DecodeError<E>> {
    prune(de, &HashSet::new(), "")
}

fn intersection<E>(members: Vec<DecodeError<E>>) -> DecodeError<E> {
    DecodeError::compound(CompoundKind::Intersection, members)
}

fn first<E>(de: DecodeError<E>) -> DecodeError<E> {
    DecodeError::member(MemberTag::Index(0), de)
}

fn second<E>(de: DecodeError<E>) -> DecodeError<E> {
    DecodeError::member(MemberTag::Index(1), de)
}

/// Mutual cross-reference of two warnings.
fn prune_difference<E>(de1: DecodeError<E>, de2: DecodeError<E>) -> Option<DecodeError<E>> {
    let prunable1 = collect_prunable(&de1);
    let prunable2 = collect_prunable(&de2);
    let pde1 = prune(de1, &prunable2, "");
    let pde2 = prune(de2, &prunable1, "");
    match (pde1, pde2) {
        (Some(pde1), Some(pde2)) => Some(intersection(vec![first(pde1), second(pde2)])),
        (Some(pde1), None) => Some(intersection(vec![first(pde1)])),
        (None, Some(pde2)) => Some(intersection(vec![second(pde2)])),
        (None, None) => None,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DECODER
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub struct IntersectD<F, S> {
    pub first: F,
    pub second: S,
}

pub fn intersect<F, S>(first: F, second: S) -> IntersectD<F, S> {
    IntersectD { first, second }
}

impl<F, S, E, A> Decoder for IntersectD<F, S>
where
    F: Decoder<Error = DecodeError<E>, Output = A>,
    S: Decoder<Input = F::Input, Error = DecodeError<E>, Output = A>,
    A: Mergeable,
{
    type Input = F::Input;
    type Error = DecodeError<E>;
    type Output = A;

    fn decode(&self, i: &F::Input) -> Outcome<DecodeError<E>, A> {
        let out1 = self.first.decode(i);
        let out2 = self.second.decode(i);
        match (out1, out2) {
            (Outcome::Failure { error: de1 }, Outcome::Failure { error: de2 }) => {
                failure(intersection(vec![first(de1), second(de2)]))
            }
            (Outcome::Failure { error: de1 }, Outcome::Success { .. }) => failure(intersection(vec![first(de1)])),
            (Outcome::Failure { error: de1 }, Outcome::Warning { error: de2, .. }) => match prune_all_unexpected(de2) {
                Some(pde2) => failure(intersection(vec![first(de1), second(pde2)])),
                None => failure(intersection(vec![first(de1)])),
            },
            (Outcome::Success { .. }, Outcome::Failure { error: de2 }) => failure(intersection(vec![second(de2)])),
            (Outcome::Success { value: a1 }, Outcome::Success { value: a2 }) => success(a1.merge(a2)),
            (Outcome::Success { value: a1 }, Outcome::Warning { error: de2, value: a2 }) => {
                match prune_all_unexpected(de2) {
                    Some(pde2) => warning(intersection(vec![second(pde2)]), a1.merge(a2)),
                    None => success(a1.merge(a2)),
                }
            }
            (Outcome::Warning { error: de1, .. }, Outcome::Failure { error: de2 }) => match prune_all_unexpected(de1) {
                Some(pde1) => failure(intersection(vec![first(pde1), second(de2)])),
                None => failure(intersection(vec![second(de2)])),
            },
            (Outcome::Warning { error: de1, value: a1 }, Outcome::Success { value: a2 }) => {
                match prune_all_unexpected(de1) {
                    Some(pde1) => warning(intersection(vec![first(pde1)]), a1.merge(a2)),
                    None => success(a1.merge(a2)),
                }
            }
            (Outcome::Warning { error: de1, value: a1 }, Outcome::Warning { error: de2, value: a2 }) => {
                match prune_difference(de1, de2) {
                    Some(difference) => warning(difference, a1.merge(a2)),
                    None => success(a1.merge(a2)),
                }
            }
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
