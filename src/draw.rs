//! Human-readable rendering of decode errors.
//!
//! Errors become a [`Tree`] of messages first and are then drawn with box
//! characters:
//!
//! ```text
//! 1 error(s) found while decoding (struct)
//! └─ 1 error(s) found while decoding required key "age"
//!    └─ cannot decode "36", expected a number
//! ```
use std::fmt::Display;

use serde::Serialize;
use serde_json::Value;

use crate::error::{CompoundKind, DecodeError};
use crate::leaf::{quote, LeafError};
use crate::outcome::Outcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tree<A> {
    pub value: A,
    pub forest: Vec<Tree<A>>,
}

impl<A> Tree<A> {
    pub fn leaf(value: A) -> Self {
        Tree { value, forest: Vec::new() }
    }

    pub fn node(value: A, forest: Vec<Tree<A>>) -> Self {
        Tree { value, forest }
    }
}

fn decoding<E>(what: String, error: &DecodeError<E>, render_leaf: &dyn Fn(&E) -> String) -> Tree<String> {
    Tree::node(format!("1 error(s) found while decoding {what}"), vec![to_tree_with(error, render_leaf)])
}

/// Converts an error tree into a message tree, rendering leaves with
/// `render_leaf`.
pub fn to_tree_with<E>(de: &DecodeError<E>, render_leaf: &dyn Fn(&E) -> String) -> Tree<String> {
    match de {
        DecodeError::MissingIndexes { indexes } => Tree::node(
            format!("{} error(s) found while checking indexes", indexes.len()),
            indexes.iter().map(|i| Tree::leaf(format!("missing required index {i}"))).collect(),
        ),
        DecodeError::MissingKeys { keys } => Tree::node(
            format!("{} error(s) found while checking keys", keys.len()),
            keys.iter().map(|k| Tree::leaf(format!("missing required key {}", quote(k)))).collect(),
        ),
        DecodeError::UnexpectedIndexes { indexes } => Tree::node(
            format!("{} error(s) found while checking indexes", indexes.len()),
            indexes.iter().map(|i| Tree::leaf(format!("unexpected index {i}"))).collect(),
        ),
        DecodeError::UnexpectedKeys { keys } => Tree::node(
            format!("{} error(s) found while checking keys", keys.len()),
            keys.iter().map(|k| Tree::leaf(format!("unexpected key {}", quote(k)))).collect(),
        ),
        DecodeError::Leaf { error } => Tree::leaf(render_leaf(error)),
        DecodeError::Nullable { error } => decoding("a nullable".to_string(), error, render_leaf),
        DecodeError::Prev { error } | DecodeError::Next { error } => to_tree_with(error, render_leaf),
        DecodeError::RequiredIndex { index, error } => {
            decoding(format!("required component {index}"), error, render_leaf)
        }
        DecodeError::OptionalIndex { index, error } => decoding(format!("optional index {index}"), error, render_leaf),
        DecodeError::RequiredKey { key, error } => {
            decoding(format!("required key {}", quote(key)), error, render_leaf)
        }
        DecodeError::OptionalKey { key, error } => {
            decoding(format!("optional key {}", quote(key)), error, render_leaf)
        }
        DecodeError::Member { member, error } => decoding(format!("member {member}"), error, render_leaf),
        DecodeError::Lazy { id, error } => decoding(format!("lazy decoder {id}"), error, render_leaf),
        DecodeError::Sum { error } => decoding("a sum".to_string(), error, render_leaf),
        DecodeError::Compound { name, errors } => match (name, errors.as_slice()) {
            // a single-stage composition adds nothing but noise
            (CompoundKind::Composition, [only]) => to_tree_with(only, render_leaf),
            _ => Tree::node(
                format!("{} error(s) found while decoding ({name})", errors.len()),
                errors.iter().map(|e| to_tree_with(e, render_leaf)).collect(),
            ),
        },
    }
}

pub fn to_tree<E: Display>(de: &DecodeError<E>) -> Tree<String> {
    to_tree_with(de, &|e: &E| e.to_string())
}

/// Renders a builtin leaf with a custom stringifier for the offending value.
pub fn render_leaf_with(leaf: &LeafError, stringify: &dyn Fn(&Value) -> String) -> String {
    leaf.render_with(stringify)
}

pub fn draw_tree(tree: &Tree<String>) -> String {
    let mut out = tree.value.clone();
    draw_forest(&mut out, "\n", &tree.forest);
    out
}

fn draw_forest(out: &mut String, indentation: &str, forest: &[Tree<String>]) {
    let len = forest.len();
    for (i, tree) in forest.iter().enumerate() {
        let is_last = i + 1 == len;
        out.push_str(indentation);
        out.push_str(if is_last { "└" } else { "├" });
        out.push_str("─ ");
        out.push_str(&tree.value);
        let pad = if len > 1 && !is_last { "│  " } else { "   " };
        draw_forest(out, &format!("{indentation}{pad}"), &tree.forest);
    }
}

/// Replaces the error channel of an outcome with its drawn tree.
pub fn draw<E: Display, A>(outcome: Outcome<DecodeError<E>, A>) -> Outcome<String, A> {
    outcome.map_error(|de| draw_tree(&to_tree(&de)))
}

pub fn draw_with<E, A>(outcome: Outcome<DecodeError<E>, A>, render_leaf: &dyn Fn(&E) -> String) -> Outcome<String, A> {
    outcome.map_error(|de| draw_tree(&to_tree_with(&de, render_leaf)))
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Decoder;
    use crate::error::MemberTag;
    use crate::outcome::{failure, success, warning};
    use crate::primitives::{number, string};
    use crate::structural::struct_;
    use serde_json::json;

    #[test]
    fn struct_failure_draws_as_nested_tree() {
        let d = struct_([("name", string().json()), ("age", number().json())]);
        let out = draw(d.decode(&json!({"name": "ada", "age": "36"})));
        assert_eq!(
            out,
            failure(
                "1 error(s) found while decoding (struct)\n\
                 └─ 1 error(s) found while decoding required key \"age\"\n   \
                    └─ cannot decode \"36\", expected a number"
                    .to_string()
            )
        );
    }

    #[test]
    fn siblings_get_vertical_guides() {
        let de: DecodeError = DecodeError::compound(
            CompoundKind::Union,
            vec![
                DecodeError::member(
                    MemberTag::Position(0),
                    DecodeError::leaf(LeafError::String { actual: json!(null) }),
                ),
                DecodeError::member(
                    MemberTag::Position(1),
                    DecodeError::leaf(LeafError::Number { actual: json!(null) }),
                ),
            ],
        );
        let expected = [
            "2 error(s) found while decoding (union)",
            "├─ 1 error(s) found while decoding member \"0\"",
            "│  └─ cannot decode null, expected a string",
            "└─ 1 error(s) found while decoding member \"1\"",
            "   └─ cannot decode null, expected a number",
        ]
        .join("\n");
        assert_eq!(de.to_string(), expected);
    }

    #[test]
    fn key_collections_list_each_key() {
        let de: DecodeError = DecodeError::compound(
            CompoundKind::Composition,
            vec![
                DecodeError::prev(DecodeError::UnexpectedKeys { keys: vec!["x".into(), "y".into()] }),
                DecodeError::next(DecodeError::MissingIndexes { indexes: vec![2] }),
            ],
        );
        let expected = [
            "2 error(s) found while decoding (composition)",
            "├─ 2 error(s) found while checking keys",
            "│  ├─ unexpected key \"x\"",
            "│  └─ unexpected key \"y\"",
            "└─ 1 error(s) found while checking indexes",
            "   └─ missing required index 2",
        ]
        .join("\n");
        assert_eq!(de.to_string(), expected);
    }

    #[test]
    fn draw_leaves_successes_and_keeps_warning_values() {
        assert_eq!(draw::<LeafError, _>(success(1)), success(1));
        let out = draw(warning(DecodeError::<LeafError>::leaf(LeafError::NaN), 2));
        assert_eq!(out, warning("value is NaN".to_string(), 2));
    }

    #[test]
    fn custom_leaf_rendering() {
        let d = struct_([("k", number().json())]);
        let out = draw_with(d.decode(&json!({"k": "secret"})), &|leaf: &LeafError| {
            render_leaf_with(leaf, &|_| "<value>".to_string())
        });
        assert_eq!(
            out,
            failure(
                [
                    "1 error(s) found while decoding (struct)",
                    "└─ 1 error(s) found while decoding required key \"k\"",
                    "   └─ cannot decode <value>, expected a number",
                ]
                .join("\n")
            )
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let d = struct_([("a", number().json()), ("b", string().json())]);
        let input = json!({"a": "1", "b": 2, "c": 3});
        let first = draw(d.decode(&input));
        let second = draw(d.decode(&input));
        assert_eq!(first, second);
    }
}
