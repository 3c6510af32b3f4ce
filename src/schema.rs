//! Builds decoders from JSON Schema documents.
//!
//! Only the vocabulary `json-osi` emits is understood, plus `$defs`/`$ref`,
//! `allOf` and discriminated `oneOf`. Unknown keywords are ignored.
//!
//! ```text
//! {"type": "object", "properties": {...}, "required": [...]}
//!     → intersect(struct(required), partial(optional))
//! {"type": ["string", "null"]}          → nullable(string)
//! {"oneOf": [...], "discriminator": {"propertyName": "kind"}}
//!     → sum("kind", {const of each member → member})
//! {"$ref": "#/$defs/Node"}              → lazy decoder "Node"
//! ```
use std::collections::HashSet;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::decoder::{from_fn, id, refine, Decoder, JsonDecoder};
use crate::error::DecodeError;
use crate::intersect::intersect;
use crate::lazy::lazy;
use crate::leaf::{LeafError, Literal};
use crate::outcome::{failure, Outcome};
use crate::primitives::{boolean, literal, number, string, unknown_array, unknown_record};
use crate::structural::{
    array, from_tuple, missing_indexes, partial, record, struct_, tuple, unexpected_indexes,
};
use crate::sum::{discriminant_text, sum};
use crate::union::{nullable, union};

// ————————————————————————————————————————————————————————————————————————————
// ERRORS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("{path}: a schema must be an object or a boolean")]
    NotASchema { path: String },
    #[error("{path}: unknown type {name:?}")]
    UnknownType { path: String, name: String },
    #[error("{path}: `{keyword}` must be {expected}")]
    Malformed { path: String, keyword: &'static str, expected: &'static str },
    #[error("{path}: invalid pattern")]
    Pattern {
        path: String,
        #[source]
        source: regex::Error,
    },
    #[error("{path}: unresolved reference {reference:?}")]
    UnresolvedRef { path: String, reference: String },
    #[error("{path}: member {index} has no constant value for discriminator {tag:?}")]
    Discriminator { path: String, index: usize, tag: String },
}

// ————————————————————————————————————————————————————————————————————————————
// COMPILED SCHEMA
// ————————————————————————————————————————————————————————————————————————————

type Registry = OnceCell<IndexMap<String, JsonDecoder>>;

/// A compiled schema document.
///
/// Owns the `$defs` registry. References inside the tree only hold weak
/// handles to it, so recursive definitions don't leak.
pub struct Schema {
    root: JsonDecoder,
    defs: Arc<Registry>,
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let defs: Vec<&String> = self.defs.get().map(|m| m.keys().collect()).unwrap_or_default();
        f.debug_struct("Schema").field("defs", &defs).finish()
    }
}

impl Schema {
    pub fn compile(doc: &Value) -> Result<Self, SchemaError> {
        let defs = Arc::new(Registry::new());
        let cx = Compiler { doc, defs: Arc::downgrade(&defs), names: definition_names(doc) };

        let mut compiled = IndexMap::new();
        for reference in &cx.names {
            let Some(def) = cx.lookup(reference) else { continue };
            compiled.insert(reference.clone(), cx.compile(def, reference)?);
        }
        // the cell is fresh, so this always installs `compiled`
        let count = defs.get_or_init(|| compiled).len();

        let root = cx.compile(doc, "#")?;
        debug!(defs = count, "compiled schema");
        Ok(Schema { root, defs })
    }

    pub fn definitions(&self) -> impl Iterator<Item = &str> {
        self.defs.get().into_iter().flat_map(|m| m.keys().map(String::as_str))
    }
}

impl Decoder for Schema {
    type Input = Value;
    type Error = DecodeError;
    type Output = Value;

    fn decode(&self, input: &Value) -> Outcome<DecodeError, Value> {
        self.root.decode(input)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// COMPILER
// ————————————————————————————————————————————————————————————————————————————

const DEF_SECTIONS: [&str; 2] = ["$defs", "definitions"];

fn definition_names(doc: &Value) -> Vec<String> {
    DEF_SECTIONS
        .iter()
        .filter_map(|section| doc.get(section).and_then(Value::as_object).map(|m| (section, m)))
        .flat_map(|(section, m)| m.keys().map(move |name| format!("#/{section}/{name}")))
        .collect()
}

struct Compiler<'a> {
    doc: &'a Value,
    defs: Weak<Registry>,
    names: Vec<String>,
}

fn any() -> JsonDecoder {
    id::<Value, LeafError>().boxed()
}

fn nothing() -> JsonDecoder {
    from_fn(|_: &Value| failure(crate::error::message("no value is allowed here"))).boxed()
}

fn join(path: &str, segment: impl std::fmt::Display) -> String {
    format!("{path}/{segment}")
}

impl Compiler<'_> {
    fn lookup(&self, reference: &str) -> Option<&Value> {
        let (section, name) = reference.strip_prefix("#/")?.split_once('/')?;
        DEF_SECTIONS.contains(&section).then_some(())?;
        self.doc.get(section)?.get(name)
    }

    fn compile(&self, schema: &Value, path: &str) -> Result<JsonDecoder, SchemaError> {
        match schema {
            Value::Bool(true) => Ok(any()),
            Value::Bool(false) => Ok(nothing()),
            Value::Object(obj) => self.compile_object(obj, path),
            _ => Err(SchemaError::NotASchema { path: path.to_string() }),
        }
    }

    fn compile_object(&self, obj: &Map<String, Value>, path: &str) -> Result<JsonDecoder, SchemaError> {
        if let Some(reference) = obj.get("$ref") {
            let reference = reference.as_str().ok_or_else(|| malformed(path, "$ref", "a string"))?;
            return self.reference(reference, path);
        }

        let mut parts: Vec<JsonDecoder> = Vec::new();

        if let Some(c) = obj.get("const") {
            parts.push(literal([scalar(c, path, "const")?]).json());
        }
        if let Some(e) = obj.get("enum") {
            let values = e.as_array().ok_or_else(|| malformed(path, "enum", "an array"))?;
            let literals = values.iter().map(|v| scalar(v, path, "enum")).collect::<Result<Vec<_>, _>>()?;
            parts.push(literal(literals).json());
        }
        if let Some(t) = obj.get("type") {
            parts.push(self.typed(t, obj, path)?);
        } else if obj.contains_key("properties") || obj.contains_key("additionalProperties") {
            parts.push(self.object(obj, path)?);
        } else if obj.contains_key("items") || obj.contains_key("prefixItems") {
            parts.push(self.array(obj, path)?);
        }

        let discriminator = obj
            .get("discriminator")
            .and_then(|d| d.get("propertyName"))
            .and_then(Value::as_str);
        for keyword in ["oneOf", "anyOf"] {
            let Some(members) = obj.get(keyword) else { continue };
            let members = members.as_array().ok_or_else(|| malformed(path, keyword, "an array"))?;
            let here = join(path, keyword);
            match discriminator {
                Some(tag) if keyword == "oneOf" => parts.push(self.sum(tag, members, &here)?),
                _ => parts.push(union(self.compile_all(members, &here)?).boxed()),
            }
        }
        if let Some(members) = obj.get("allOf") {
            let members = members.as_array().ok_or_else(|| malformed(path, "allOf", "an array"))?;
            parts.extend(self.compile_all(members, &join(path, "allOf"))?);
        }

        Ok(intersect_all(parts))
    }

    fn compile_all(&self, members: &[Value], path: &str) -> Result<Vec<JsonDecoder>, SchemaError> {
        members.iter().enumerate().map(|(i, m)| self.compile(m, &join(path, i))).collect()
    }

    fn reference(&self, reference: &str, path: &str) -> Result<JsonDecoder, SchemaError> {
        if !self.names.iter().any(|n| n == reference) {
            return Err(SchemaError::UnresolvedRef { path: path.to_string(), reference: reference.to_string() });
        }
        let defs = self.defs.clone();
        let key = reference.to_string();
        let label = reference.rsplit('/').next().unwrap_or(reference).to_string();
        // resolved on every decode: caching the definition here would close an Arc cycle
        let resolve = move |i: &Value| -> Outcome<DecodeError, Value> {
            match defs.upgrade().and_then(|defs| defs.get().and_then(|m| m.get(&key).cloned())) {
                Some(d) => d.decode(i),
                None => failure(crate::error::message(format!("schema reference {key} is no longer available"))),
            }
        };
        Ok(lazy(label, move || -> JsonDecoder {
            trace!("resolving schema reference");
            from_fn(resolve.clone()).boxed()
        })
        .boxed())
    }

    fn typed(&self, t: &Value, obj: &Map<String, Value>, path: &str) -> Result<JsonDecoder, SchemaError> {
        match t {
            Value::String(name) => self.single_type(name, obj, path),
            Value::Array(names) => {
                let names: Vec<&str> = names
                    .iter()
                    .map(|n| n.as_str().ok_or_else(|| malformed(path, "type", "a string or a list of strings")))
                    .collect::<Result<_, _>>()?;
                let is_nullable = names.contains(&"null");
                let members = names
                    .iter()
                    .copied()
                    .filter(|n| *n != "null")
                    .map(|n| self.single_type(n, obj, path))
                    .collect::<Result<Vec<_>, _>>()?;
                let core = match members.len() {
                    0 => return Ok(null()),
                    1 => members.into_iter().next().unwrap_or_else(any),
                    _ => union(members).boxed(),
                };
                Ok(if is_nullable { nullable(core).json() } else { core })
            }
            _ => Err(malformed(path, "type", "a string or a list of strings")),
        }
    }

    fn single_type(&self, name: &str, obj: &Map<String, Value>, path: &str) -> Result<JsonDecoder, SchemaError> {
        match name {
            "string" => match obj.get("pattern") {
                None => Ok(string().json()),
                Some(p) => {
                    let p = p.as_str().ok_or_else(|| malformed(path, "pattern", "a string"))?;
                    let re = Regex::new(p).map_err(|source| SchemaError::Pattern { path: path.to_string(), source })?;
                    let message = format!("expected a string matching {p}");
                    Ok(string().compose(refine(move |s: &String| re.is_match(s), message)).json())
                }
            },
            "number" => Ok(verbatim(number())),
            "integer" => Ok(verbatim(number().compose(refine(|n: &f64| n.fract() == 0.0, "expected an integer")))),
            "boolean" => Ok(boolean().json()),
            "null" => Ok(null()),
            "array" => self.array(obj, path),
            "object" => self.object(obj, path),
            "any" => Ok(any()),
            other => Err(SchemaError::UnknownType { path: path.to_string(), name: other.to_string() }),
        }
    }

    fn array(&self, obj: &Map<String, Value>, path: &str) -> Result<JsonDecoder, SchemaError> {
        if let Some(prefix) = obj.get("prefixItems") {
            let prefix = prefix.as_array().ok_or_else(|| malformed(path, "prefixItems", "an array"))?;
            let components = self.compile_all(prefix, &join(path, "prefixItems"))?;
            let min_items = match obj.get("minItems") {
                None => components.len(),
                Some(n) => n.as_u64().ok_or_else(|| malformed(path, "minItems", "a non-negative integer"))? as usize,
            };
            return Ok(if min_items >= components.len() {
                tuple(components).json()
            } else {
                padded_tuple(components, min_items)
            });
        }
        match obj.get("items") {
            Some(item) => Ok(array(self.compile(item, &join(path, "items"))?).json()),
            None => Ok(unknown_array().json()),
        }
    }

    /// Required properties become a closed struct, the rest a partial; the
    /// two are intersected so each side's extras are cross-checked.
    fn object(&self, obj: &Map<String, Value>, path: &str) -> Result<JsonDecoder, SchemaError> {
        let required: HashSet<&str> = match obj.get("required") {
            None => HashSet::new(),
            Some(r) => r
                .as_array()
                .ok_or_else(|| malformed(path, "required", "an array of strings"))?
                .iter()
                .map(|k| k.as_str().ok_or_else(|| malformed(path, "required", "an array of strings")))
                .collect::<Result<_, _>>()?,
        };
        let properties = match obj.get("properties") {
            None => None,
            Some(p) => Some(p.as_object().ok_or_else(|| malformed(path, "properties", "an object"))?),
        };

        let Some(properties) = properties.filter(|p| !p.is_empty()) else {
            return match obj.get("additionalProperties") {
                Some(extra @ Value::Object(_)) => {
                    Ok(record(self.compile(extra, &join(path, "additionalProperties"))?).json())
                }
                _ => Ok(unknown_record().json()),
            };
        };

        let here = join(path, "properties");
        let mut required_props = Vec::new();
        let mut optional_props = Vec::new();
        for (key, schema) in properties {
            let d = self.compile(schema, &join(&here, key))?;
            if required.contains(key.as_str()) {
                required_props.push((key.clone(), d));
            } else {
                optional_props.push((key.clone(), d));
            }
        }
        Ok(match (required_props.is_empty(), optional_props.is_empty()) {
            (false, true) => struct_(required_props).json(),
            (true, false) => partial(optional_props).json(),
            _ => intersect(struct_(required_props).json(), partial(optional_props).json()).boxed(),
        })
    }

    fn sum(&self, tag: &str, members: &[Value], path: &str) -> Result<JsonDecoder, SchemaError> {
        let mut keyed = Vec::with_capacity(members.len());
        for (index, member) in members.iter().enumerate() {
            let target = match member.get("$ref").and_then(Value::as_str) {
                Some(reference) => self.lookup(reference).unwrap_or(member),
                None => member,
            };
            let discriminant = target
                .get("properties")
                .and_then(|p| p.get(tag))
                .and_then(|p| p.get("const").or_else(|| p.get("enum").and_then(|e| e.get(0))))
                .and_then(discriminant_text)
                .ok_or_else(|| SchemaError::Discriminator { path: path.to_string(), index, tag: tag.to_string() })?;
            keyed.push((discriminant, self.compile(member, &join(path, index))?));
        }
        Ok(sum(tag, keyed).boxed())
    }
}

/// A tuple whose components past `min_items` may be left off the end.
fn padded_tuple(components: Vec<JsonDecoder>, min_items: usize) -> JsonDecoder {
    let arity = components.len();
    let present = from_fn(move |us: &Vec<Value>| from_tuple(components.iter().take(us.len()).cloned()).decode(us));
    unknown_array()
        .compose(unexpected_indexes(arity))
        .compose(missing_indexes(min_items))
        .compose(present)
        .json()
}

/// Checks with `check` but outputs the input itself, so numbers keep their
/// exact JSON text instead of going through `f64`.
fn verbatim<D>(check: D) -> JsonDecoder
where
    D: Decoder<Input = Value, Error = DecodeError> + Send + Sync + 'static,
{
    from_fn(move |i: &Value| check.decode(i).map(|_| i.clone())).boxed()
}

fn null() -> JsonDecoder {
    literal([Literal::Null]).json()
}

fn malformed(path: &str, keyword: &'static str, expected: &'static str) -> SchemaError {
    SchemaError::Malformed { path: path.to_string(), keyword, expected }
}

fn scalar(v: &Value, path: &str, keyword: &'static str) -> Result<Literal, SchemaError> {
    Literal::from_value(v).ok_or_else(|| malformed(path, keyword, "scalar values"))
}

fn intersect_all(parts: Vec<JsonDecoder>) -> JsonDecoder {
    parts.into_iter().reduce(|acc, d| intersect(acc, d).boxed()).unwrap_or_else(any)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::success;
    use serde_json::json;

    fn compile(doc: Value) -> Schema {
        match Schema::compile(&doc) {
            Ok(s) => s,
            Err(e) => panic!("schema should compile: {e}"),
        }
    }

    #[test]
    fn object_with_required_and_optional_properties() {
        let s = compile(json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer"},
                "name": {"type": "string"},
                "tags": {"type": "array", "items": {"type": "string"}},
            },
            "required": ["id", "name"],
        }));
        assert_eq!(s.decode(&json!({"id": 1, "name": "a"})), success(json!({"id": 1, "name": "a"})));
        assert_eq!(
            s.decode(&json!({"id": 1, "name": "a", "tags": ["x"]})),
            success(json!({"id": 1, "name": "a", "tags": ["x"]}))
        );
        assert!(s.decode(&json!({"id": 1.5, "name": "a"})).is_failure());
        assert!(s.decode(&json!({"name": "a"})).is_failure());

        let out = s.decode(&json!({"id": 1, "name": "a", "extra": true}));
        assert!(out.is_warning());
        let rendered = out.error().map(|e| e.to_string()).unwrap_or_default();
        assert!(rendered.contains(r#"unexpected key "extra""#), "{rendered}");
        assert!(!rendered.contains(r#"unexpected key "id""#), "{rendered}");
    }

    #[test]
    fn optional_properties_reject_null_unless_nullable() {
        let s = compile(json!({
            "type": "object",
            "properties": {"a": {"type": "string"}, "b": {"type": "string"}},
            "required": ["b"],
        }));
        assert!(s.decode(&json!({"b": "x"})).is_success());
        assert!(s.decode(&json!({"a": null, "b": "x"})).is_failure());
        assert!(s.decode(&json!({"b": null})).is_failure());

        let s = compile(json!({
            "type": "object",
            "properties": {"a": {"type": ["string", "null"]}},
        }));
        assert_eq!(s.decode(&json!({"a": null})), success(json!({"a": null})));
    }

    #[test]
    fn numbers_come_back_verbatim() {
        let s = compile(json!({"type": "array", "items": {"type": "number"}}));
        let input: Value = match serde_json::from_str("[9007199254740993, 1.0, 2.5]") {
            Ok(v) => v,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(s.decode(&input), success(input.clone()));
        let s = compile(json!({"type": "integer"}));
        assert_eq!(s.decode(&json!(1.0)), success(json!(1.0)));
        assert!(s.decode(&json!(1.5)).is_failure());
    }

    #[test]
    fn type_lists_with_null_are_nullable() {
        let s = compile(json!({"type": ["string", "null"]}));
        assert_eq!(s.decode(&json!(null)), success(json!(null)));
        assert_eq!(s.decode(&json!("x")), success(json!("x")));
        assert!(s.decode(&json!(1)).is_failure());

        let s = compile(json!({"oneOf": [{"type": "number"}, {"type": "null"}]}));
        assert!(s.decode(&json!(null)).is_success());
        assert!(s.decode(&json!(2)).is_success());
    }

    #[test]
    fn enums_and_patterns() {
        let s = compile(json!({"type": "string", "enum": ["a", "b"]}));
        assert!(s.decode(&json!("a")).is_success());
        assert!(s.decode(&json!("c")).is_failure());

        let s = compile(json!({"type": "string", "pattern": "^[0-9]+$"}));
        assert!(s.decode(&json!("123")).is_success());
        let out = s.decode(&json!("12a"));
        let rendered = out.error().map(|e| e.to_string()).unwrap_or_default();
        assert_eq!(rendered, "expected a string matching ^[0-9]+$");
    }

    #[test]
    fn prefix_items_are_tuples() {
        let s = compile(json!({"type": "array", "prefixItems": [{"type": "string"}, {"type": "boolean"}]}));
        assert_eq!(s.decode(&json!(["a", true])), success(json!(["a", true])));
        assert!(s.decode(&json!(["a"])).is_failure());
        assert!(s.decode(&json!(["a", true, 1])).is_warning());
    }

    #[test]
    fn min_items_below_the_prefix_length_makes_the_tail_optional() {
        let s = compile(json!({
            "type": "array",
            "prefixItems": [{"type": "string"}, {"type": "number"}, {"type": "boolean"}],
            "minItems": 1,
            "maxItems": 3,
        }));
        assert_eq!(s.decode(&json!(["a"])), success(json!(["a"])));
        assert_eq!(s.decode(&json!(["a", 1])), success(json!(["a", 1])));
        assert_eq!(s.decode(&json!(["a", 1, true])), success(json!(["a", 1, true])));
        assert!(s.decode(&json!([])).is_failure());
        assert!(s.decode(&json!(["a", "1"])).is_failure());
        let out = s.decode(&json!(["a", 1, true, null]));
        assert!(out.is_warning());
        assert_eq!(out.value(), Some(&json!(["a", 1, true])));

        let exact = compile(json!({"prefixItems": [{"type": "string"}], "minItems": 1, "maxItems": 1}));
        assert!(exact.decode(&json!([])).is_failure());
    }

    #[test]
    fn additional_properties_alone_is_a_record() {
        let s = compile(json!({"type": "object", "additionalProperties": {"type": "number"}}));
        assert!(s.decode(&json!({"a": 1, "b": 2})).is_success());
        assert!(s.decode(&json!({"a": "1"})).is_failure());
    }

    #[test]
    fn recursive_definitions_resolve_lazily() {
        let s = compile(json!({
            "$ref": "#/$defs/Node",
            "$defs": {
                "Node": {
                    "type": "object",
                    "properties": {
                        "value": {"type": "number"},
                        "children": {"type": "array", "items": {"$ref": "#/$defs/Node"}},
                    },
                    "required": ["value", "children"],
                },
            },
        }));
        assert_eq!(s.definitions().collect::<Vec<_>>(), ["#/$defs/Node"]);
        let tree = json!({"value": 1, "children": [{"value": 2, "children": []}]});
        assert_eq!(s.decode(&tree), success(tree.clone()));
        let bad = json!({"value": 1, "children": [{"value": "2", "children": []}]});
        let rendered = s.decode(&bad).error().map(|e| e.to_string()).unwrap_or_default();
        assert_eq!(rendered.matches("lazy decoder Node").count(), 2, "{rendered}");
    }

    #[test]
    fn discriminated_one_of_is_a_sum() {
        let s = compile(json!({
            "oneOf": [
                {"$ref": "#/$defs/Circle"},
                {
                    "type": "object",
                    "properties": {"kind": {"const": "square"}, "side": {"type": "number"}},
                    "required": ["kind", "side"],
                },
            ],
            "discriminator": {"propertyName": "kind"},
            "$defs": {
                "Circle": {
                    "type": "object",
                    "properties": {"kind": {"const": "circle"}, "radius": {"type": "number"}},
                    "required": ["kind", "radius"],
                },
            },
        }));
        assert!(s.decode(&json!({"kind": "circle", "radius": 1})).is_success());
        assert!(s.decode(&json!({"kind": "square", "side": 1})).is_success());
        let rendered = s.decode(&json!({"kind": "hexagon"})).error().map(|e| e.to_string()).unwrap_or_default();
        assert!(rendered.contains(r#"expected one of "circle", "square""#), "{rendered}");
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(matches!(Schema::compile(&json!(3)), Err(SchemaError::NotASchema { .. })));
        assert!(matches!(
            Schema::compile(&json!({"type": "strin"})),
            Err(SchemaError::UnknownType { name, .. }) if name == "strin"
        ));
        assert!(matches!(
            Schema::compile(&json!({"$ref": "#/$defs/Missing"})),
            Err(SchemaError::UnresolvedRef { .. })
        ));
        assert!(matches!(
            Schema::compile(&json!({"type": "string", "pattern": "("})),
            Err(SchemaError::Pattern { .. })
        ));
        assert!(matches!(
            Schema::compile(&json!({"oneOf": [{"type": "object"}], "discriminator": {"propertyName": "k"}})),
            Err(SchemaError::Discriminator { index: 0, .. })
        ));
    }

    #[test]
    fn boolean_schemas() {
        assert!(compile(json!(true)).decode(&json!({"anything": [1]})).is_success());
        assert!(compile(json!(false)).decode(&json!(null)).is_failure());
    }
}
