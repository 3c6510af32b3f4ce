//! Tagged unions: one discriminant read picks the single member to run.
use indexmap::IndexMap;
use serde_json::Value;

use crate::decoder::{BoxDecoder, CompositionD, Decoder};
use crate::error::{DecodeError, MemberTag};
use crate::json::IntoJson;
use crate::leaf::LeafError;
use crate::outcome::{failure, Outcome};
use crate::primitives::{unknown_array, unknown_record};
use crate::union::{union, UnionD};

#[derive(Debug, Clone)]
pub struct FromSumD<D> {
    /// Discriminant: a property name for tagged objects, a decimal index for
    /// tagged tuples.
    pub tag: String,
    pub members: IndexMap<String, D>,
}

pub fn from_sum<K: Into<String>, D>(tag: impl Into<String>, members: impl IntoIterator<Item = (K, D)>) -> FromSumD<D> {
    FromSumD {
        tag: tag.into(),
        members: members.into_iter().map(|(k, d)| (k.into(), d)).collect(),
    }
}

impl<D> FromSumD<D> {
    fn discriminant(&self, i: &Value) -> Option<String> {
        let v = match i {
            Value::Object(m) => m.get(&self.tag),
            Value::Array(xs) => self.tag.parse::<usize>().ok().and_then(|index| xs.get(index)),
            _ => None,
        }?;
        discriminant_text(v)
    }
}

/// The member key a discriminant value selects. Whole floats read as
/// integers, so `1.0` and `1` pick the same member.
pub(crate) fn discriminant_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_f64() => n.as_f64().map(|f| f.into_json().to_string()),
        Value::Number(_) | Value::Bool(_) => Some(v.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

impl<D, E> Decoder for FromSumD<D>
where
    D: Decoder<Input = Value, Error = DecodeError<E>>,
    E: From<LeafError>,
{
    type Input = Value;
    type Error = DecodeError<E>;
    type Output = D::Output;

    fn decode(&self, i: &Value) -> Outcome<Self::Error, D::Output> {
        let selected = self
            .discriminant(i)
            .and_then(|v| self.members.get_key_value(&v));
        match selected {
            Some((v, member)) => member
                .decode(i)
                .map_error(|e| DecodeError::sum(DecodeError::member(MemberTag::Key(v.clone()), e))),
            None => failure(DecodeError::leaf(E::from(LeafError::Tag {
                tag: self.tag.clone(),
                literals: self.members.keys().cloned().collect(),
            }))),
        }
    }
}

type Shape<E> = BoxDecoder<Value, DecodeError<E>, Value>;

pub type SumD<D, E = LeafError> = CompositionD<UnionD<Shape<E>>, FromSumD<D>>;

/// Tagged objects or tagged tuples, i.e. object-or-array shaped input.
fn unknown_record_or_array<E>() -> UnionD<Shape<E>>
where
    E: From<LeafError> + Send + Sync + 'static,
{
    union([
        unknown_record()
            .map(Value::Object)
            .map_error(|e: DecodeError| e.map_leaf(E::from))
            .boxed(),
        unknown_array()
            .map(Value::Array)
            .map_error(|e: DecodeError| e.map_leaf(E::from))
            .boxed(),
    ])
}

/// Dispatches on the value found at `tag`; no other member is tried.
pub fn sum<K, D, E>(tag: impl Into<String>, members: impl IntoIterator<Item = (K, D)>) -> SumD<D, E>
where
    K: Into<String>,
    D: Decoder<Input = Value, Error = DecodeError<E>>,
    E: From<LeafError> + Send + Sync + 'static,
{
    unknown_record_or_array().compose(from_sum(tag, members))
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::JsonDecoder;
    use crate::error::CompoundKind;
    use crate::outcome::success;
    use crate::primitives::{literal, number, string};
    use crate::structural::{struct_, tuple};
    use serde_json::json;

    fn shape() -> SumD<JsonDecoder> {
        sum(
            "type",
            [
                ("circle", struct_([("type", literal(["circle"]).json()), ("radius", number().json())]).json()),
                ("square", struct_([("type", literal(["square"]).json()), ("side", number().json())]).json()),
            ],
        )
    }

    #[test]
    fn discriminant_selects_the_member() {
        let out = shape().decode(&json!({"type": "square", "side": 2}));
        assert_eq!(out, success(json!({"type": "square", "side": 2})));
    }

    #[test]
    fn member_errors_are_wrapped_with_the_tag() {
        let out = shape().decode(&json!({"type": "circle", "radius": "big"}));
        match out {
            Outcome::Failure { error: DecodeError::Compound { name: CompoundKind::Composition, errors } } => {
                match &errors[..] {
                    [DecodeError::Next { error }] => match &**error {
                        DecodeError::Sum { error } => assert!(matches!(
                            &**error,
                            DecodeError::Member { member: MemberTag::Key(k), .. } if k == "circle"
                        )),
                        other => panic!("expected a sum node, got {other:?}"),
                    },
                    other => panic!("unexpected children {other:?}"),
                }
            }
            other => panic!("expected a failure, got {other:?}"),
        }
    }

    #[test]
    fn unknown_discriminant_lists_the_valid_ones() {
        let out = shape().decode(&json!({"type": "triangle"}));
        let expected = DecodeError::compound(
            CompoundKind::Composition,
            vec![DecodeError::next(DecodeError::leaf(LeafError::Tag {
                tag: "type".into(),
                literals: vec!["circle".into(), "square".into()],
            }))],
        );
        assert_eq!(out, failure(expected));
        assert!(shape().decode(&json!({"kind": "circle"})).is_failure());
    }

    #[test]
    fn non_structured_input_fails_the_shape_union() {
        let out = shape().decode(&json!("circle"));
        let rendered = out.error().map(|e| e.to_string()).unwrap_or_default();
        assert!(rendered.contains("expected an object"), "{rendered}");
        assert!(rendered.contains("expected an array"), "{rendered}");
    }

    #[test]
    fn tagged_tuples_use_an_index_discriminant() {
        let d: SumD<JsonDecoder> = sum(
            "0",
            [
                ("point", tuple([string().json(), number().json(), number().json()]).json()),
                ("label", tuple([string().json(), string().json()]).json()),
            ],
        );
        assert_eq!(d.decode(&json!(["label", "x"])), success(json!(["label", "x"])));
        assert!(d.decode(&json!(["point", 1])).is_failure());
    }

    #[test]
    fn whole_float_discriminants_select_integer_tags() {
        let d: SumD<JsonDecoder> = sum(
            "v",
            [
                ("1", struct_([("v", number().json())]).json()),
                ("2.5", struct_([("v", number().json())]).json()),
            ],
        );
        assert_eq!(d.decode(&json!({"v": 1})), success(json!({"v": 1})));
        assert_eq!(d.decode(&json!({"v": 1.0})), success(json!({"v": 1})));
        assert_eq!(d.decode(&json!({"v": 2.5})), success(json!({"v": 2.5})));
        assert!(d.decode(&json!({"v": 3})).is_failure());
        assert_eq!(discriminant_text(&json!(true)), Some("true".to_string()));
        assert_eq!(discriminant_text(&json!(null)), None);
    }
}
