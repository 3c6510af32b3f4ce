//! Try-in-order alternation and the nullable wrapper.
use serde_json::Value;

use crate::decoder::Decoder;
use crate::error::{CompoundKind, DecodeError, MemberTag};
use crate::leaf::LeafError;
use crate::outcome::{failure, success, Outcome};

/// Members are tried in declaration order and the first one that does not
/// fail wins, so declare them from most to least specific.
#[derive(Debug, Clone)]
pub struct UnionD<D> {
    pub members: Vec<D>,
}

pub fn union<D>(members: impl IntoIterator<Item = D>) -> UnionD<D> {
    UnionD { members: members.into_iter().collect() }
}

impl<D, E> Decoder for UnionD<D>
where
    D: Decoder<Error = DecodeError<E>>,
    E: From<LeafError>,
{
    type Input = D::Input;
    type Error = DecodeError<E>;
    type Output = D::Output;

    fn decode(&self, i: &D::Input) -> Outcome<Self::Error, D::Output> {
        let mut es = Vec::new();
        for (m, member) in self.members.iter().enumerate() {
            match member.decode(i) {
                Outcome::Failure { error } => es.push(DecodeError::member(MemberTag::Position(m), error)),
                // earlier failures are history, not the cause; a clean match drops them
                Outcome::Success { value } => return success(value),
                Outcome::Warning { error, value } => {
                    es.push(DecodeError::member(MemberTag::Position(m), error));
                    return Outcome::Warning { error: DecodeError::compound(CompoundKind::Union, es), value };
                }
            }
        }
        if es.is_empty() {
            failure(DecodeError::leaf(E::from(LeafError::NoMembers)))
        } else {
            failure(DecodeError::compound(CompoundKind::Union, es))
        }
    }
}

/// `null` or whatever `or` accepts.
#[derive(Debug, Clone)]
pub struct NullableD<D> {
    pub or: D,
}

pub fn nullable<D>(or: D) -> NullableD<D> {
    NullableD { or }
}

impl<D, E> Decoder for NullableD<D>
where
    D: Decoder<Input = Value, Error = DecodeError<E>>,
{
    type Input = Value;
    type Error = DecodeError<E>;
    type Output = Option<D::Output>;

    fn decode(&self, i: &Value) -> Outcome<Self::Error, Self::Output> {
        if i.is_null() {
            return success(None);
        }
        self.or.decode(i).map(Some).map_error(DecodeError::nullable)
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::JsonDecoder;
    use crate::primitives::{number, string};
    use crate::structural::struct_;
    use serde_json::json;

    fn string_or_number() -> UnionD<JsonDecoder> {
        union([string().json(), number().json()])
    }

    #[test]
    fn first_non_failing_member_wins() {
        assert_eq!(string_or_number().decode(&json!("a")), success(json!("a")));
        assert_eq!(string_or_number().decode(&json!(2)), success(json!(2)));
    }

    #[test]
    fn all_failures_are_reported_per_member() {
        let out = string_or_number().decode(&json!(true));
        assert_eq!(
            out,
            failure(DecodeError::compound(
                CompoundKind::Union,
                vec![
                    DecodeError::member(MemberTag::Position(0), DecodeError::leaf(LeafError::String { actual: json!(true) })),
                    DecodeError::member(MemberTag::Position(1), DecodeError::leaf(LeafError::Number { actual: json!(true) })),
                ],
            ))
        );
    }

    #[test]
    fn warning_member_carries_earlier_failures_as_history() {
        let d = union([string().json(), struct_([("a", number().json())]).json()]);
        let out = d.decode(&json!({"a": 1, "b": 2}));
        match out {
            Outcome::Warning { error: DecodeError::Compound { name, errors }, value } => {
                assert_eq!(name, CompoundKind::Union);
                assert_eq!(errors.len(), 2);
                assert!(matches!(&errors[0], DecodeError::Member { member: MemberTag::Position(0), .. }));
                assert!(matches!(&errors[1], DecodeError::Member { member: MemberTag::Position(1), .. }));
                assert_eq!(value, json!({"a": 1}));
            }
            other => panic!("expected a union warning, got {other:?}"),
        }
    }

    #[test]
    fn declaration_order_breaks_ties() {
        let d = union([number().map(|_| "first").boxed(), number().map(|_| "second").boxed()]);
        assert_eq!(d.decode(&json!(1)), success("first"));
    }

    #[test]
    fn empty_union_fails_with_no_members() {
        let d: UnionD<JsonDecoder> = union(Vec::new());
        assert_eq!(d.decode(&json!(1)), failure(DecodeError::leaf(LeafError::NoMembers)));
    }

    #[test]
    fn nullable_short_circuits_null() {
        let d = nullable(number());
        assert_eq!(d.decode(&json!(null)), success(None));
        assert_eq!(d.decode(&json!(3)), success(Some(3.0)));
        assert_eq!(
            d.decode(&json!("3")),
            failure(DecodeError::nullable(DecodeError::leaf(LeafError::Number { actual: json!("3") })))
        );
    }
}
