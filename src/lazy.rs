//! Deferred construction for recursive schemas.
use std::fmt;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use tracing::trace;

use crate::decoder::{BoxDecoder, Decoder};
use crate::error::DecodeError;
use crate::leaf::LeafError;
use crate::outcome::{failure, Outcome};

type Thunk<I, E, A> = Box<dyn Fn() -> BoxDecoder<I, DecodeError<E>, A> + Send + Sync>;

/// Builds its inner decoder on first use and reuses it afterwards. Every
/// error is wrapped with the decoder's `id`.
pub struct LazyD<I: ?Sized, E, A> {
    pub id: String,
    init: Thunk<I, E, A>,
    cell: OnceCell<BoxDecoder<I, DecodeError<E>, A>>,
}

impl<I: ?Sized, E, A> fmt::Debug for LazyD<I, E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyD")
            .field("id", &self.id)
            .field("forced", &self.cell.get().is_some())
            .finish()
    }
}

pub fn lazy<I, E, A, F>(id: impl Into<String>, f: F) -> LazyD<I, E, A>
where
    I: ?Sized,
    F: Fn() -> BoxDecoder<I, DecodeError<E>, A> + Send + Sync + 'static,
{
    LazyD { id: id.into(), init: Box::new(f), cell: OnceCell::new() }
}

impl<I: ?Sized, E, A> LazyD<I, E, A> {
    fn force(&self) -> &BoxDecoder<I, DecodeError<E>, A> {
        self.cell.get_or_init(|| {
            trace!(id = %self.id, "forcing lazy decoder");
            (self.init)()
        })
    }
}

impl<I: ?Sized, E, A> Decoder for LazyD<I, E, A> {
    type Input = I;
    type Error = DecodeError<E>;
    type Output = A;

    fn decode(&self, i: &I) -> Outcome<DecodeError<E>, A> {
        self.force().decode(i).map_error(|e| DecodeError::lazy(self.id.clone(), e))
    }
}

/// Handle a [`recursive`] decoder passes to its own constructor.
pub struct SelfRef<I: ?Sized, E, A> {
    pub id: String,
    this: Weak<LazyD<I, E, A>>,
}

impl<I: ?Sized, E, A> Clone for SelfRef<I, E, A> {
    fn clone(&self) -> Self {
        Self { id: self.id.clone(), this: self.this.clone() }
    }
}

impl<I: ?Sized, E, A> fmt::Debug for SelfRef<I, E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelfRef").field("id", &self.id).finish()
    }
}

impl<I: ?Sized, E: From<LeafError>, A> Decoder for SelfRef<I, E, A> {
    type Input = I;
    type Error = DecodeError<E>;
    type Output = A;

    fn decode(&self, i: &I) -> Outcome<DecodeError<E>, A> {
        match self.this.upgrade() {
            Some(lazy) => lazy.decode(i),
            None => failure(crate::error::message(format!("lazy decoder {} was dropped", self.id))),
        }
    }
}

/// A lazy decoder whose constructor can refer to the decoder being built.
///
/// All self-references share one memoized construction. The handle is weak,
/// so the returned `Arc` is the only owner.
pub fn recursive<I, E, A, F>(id: impl Into<String>, build: F) -> Arc<LazyD<I, E, A>>
where
    I: ?Sized + 'static,
    E: 'static,
    A: 'static,
    F: Fn(SelfRef<I, E, A>) -> BoxDecoder<I, DecodeError<E>, A> + Send + Sync + 'static,
{
    let id = id.into();
    Arc::new_cyclic(|this: &Weak<LazyD<I, E, A>>| {
        let handle = SelfRef { id: id.clone(), this: this.clone() };
        lazy(id, move || build(handle.clone()))
    })
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::JsonDecoder;
    use crate::outcome::success;
    use crate::primitives::{number, string};
    use crate::structural::{array, struct_};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn category() -> Arc<LazyD<Value, LeafError, Value>> {
        recursive("Category", |this| {
            struct_([("name", string().json()), ("subcategories", array(this).json())]).json()
        })
    }

    #[test]
    fn recursive_schema_accepts_nested_values() {
        let input = json!({
            "name": "root",
            "subcategories": [{"name": "leaf", "subcategories": []}],
        });
        assert_eq!(category().decode(&input), success(input.clone()));
    }

    #[test]
    fn every_recursion_level_is_labelled() {
        let input = json!({
            "name": "root",
            "subcategories": [{"name": 1, "subcategories": []}],
        });
        let out = category().decode(&input);
        let Outcome::Failure { error } = &out else {
            panic!("expected a failure, got {out:?}");
        };
        let rendered = error.to_string();
        assert_eq!(rendered.matches("lazy decoder Category").count(), 2, "{rendered}");
        assert!(rendered.contains(r#"required key "name""#), "{rendered}");
    }

    #[test]
    fn construction_runs_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let d = lazy("N", move || -> JsonDecoder {
            counter.fetch_add(1, Ordering::SeqCst);
            number().json()
        });
        assert_eq!(built.load(Ordering::SeqCst), 0);
        assert!(d.decode(&json!(1)).is_success());
        assert!(d.decode(&json!(2)).is_success());
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(
            d.decode(&json!("x")),
            crate::outcome::failure(DecodeError::lazy(
                "N",
                DecodeError::leaf(LeafError::Number { actual: json!("x") })
            ))
        );
    }

    #[test]
    fn self_reference_outliving_its_decoder_fails_cleanly() {
        let d = category();
        let handle = SelfRef { id: d.id.clone(), this: Arc::downgrade(&d) };
        drop(d);
        let out = handle.decode(&json!({"name": "x", "subcategories": []}));
        assert_eq!(out, failure(crate::error::message("lazy decoder Category was dropped")));
    }
}
