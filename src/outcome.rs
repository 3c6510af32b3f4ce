//! Ternary decode outcome: failure, success, or a usable value paired with
//! non-fatal diagnostics.

/// Result of every decode operation.
///
/// Unlike `Result`, a decoder may hand back a value *and* an error at the
/// same time (`Warning`), e.g. when an object carried keys nobody declared.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome<E, A> {
    Failure { error: E },
    Success { value: A },
    Warning { error: E, value: A },
}

pub fn success<E, A>(value: A) -> Outcome<E, A> {
    Outcome::Success { value }
}

pub fn failure<E, A>(error: E) -> Outcome<E, A> {
    Outcome::Failure { error }
}

pub fn warning<E, A>(error: E, value: A) -> Outcome<E, A> {
    Outcome::Warning { error, value }
}

impl<E, A> Outcome<E, A> {
    /// Total eliminator over the three cases.
    pub fn fold<R>(
        self,
        on_failure: impl FnOnce(E) -> R,
        on_success: impl FnOnce(A) -> R,
        on_warning: impl FnOnce(E, A) -> R,
    ) -> R {
        match self {
            Outcome::Failure { error } => on_failure(error),
            Outcome::Success { value } => on_success(value),
            Outcome::Warning { error, value } => on_warning(error, value),
        }
    }

    /// Maps the value of `Success` and `Warning`.
    pub fn map<B>(self, f: impl FnOnce(A) -> B) -> Outcome<E, B> {
        match self {
            Outcome::Failure { error } => failure(error),
            Outcome::Success { value } => success(f(value)),
            Outcome::Warning { error, value } => warning(error, f(value)),
        }
    }

    /// Maps the error of `Failure` and `Warning`.
    pub fn map_error<E2>(self, f: impl FnOnce(E) -> E2) -> Outcome<E2, A> {
        match self {
            Outcome::Failure { error } => failure(f(error)),
            Outcome::Success { value } => success(value),
            Outcome::Warning { error, value } => warning(f(error), value),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Outcome::Warning { .. })
    }

    pub fn value(&self) -> Option<&A> {
        match self {
            Outcome::Failure { .. } => None,
            Outcome::Success { value } | Outcome::Warning { value, .. } => Some(value),
        }
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure { error } | Outcome::Warning { error, .. } => Some(error),
        }
    }

    /// Drops any warning and keeps the value, if there is one.
    pub fn into_value(self) -> Option<A> {
        self.fold(|_| None, Some, |_, a| Some(a))
    }

    /// `Ok` for success and warning (warnings discarded), `Err` for failure.
    pub fn into_result(self) -> Result<A, E> {
        self.fold(Err, Ok, |_, a| Ok(a))
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_touches_success_and_warning_only() {
        let f: Outcome<&str, i32> = failure("bad");
        let s: Outcome<&str, i32> = success(1);
        let w: Outcome<&str, i32> = warning("meh", 2);
        assert_eq!(f.map(|n| n * 10), failure("bad"));
        assert_eq!(s.map(|n| n * 10), success(10));
        assert_eq!(w.map(|n| n * 10), warning("meh", 20));
    }

    #[test]
    fn map_error_touches_failure_and_warning_only() {
        let f: Outcome<&str, i32> = failure("bad");
        let s: Outcome<&str, i32> = success(1);
        let w: Outcome<&str, i32> = warning("meh", 2);
        assert_eq!(f.map_error(str::len), failure(3));
        assert_eq!(s.map_error(str::len), success(1));
        assert_eq!(w.map_error(str::len), warning(3, 2));
    }

    #[test]
    fn accessors_follow_the_variant() {
        let w: Outcome<&str, i32> = warning("meh", 2);
        assert!(w.is_warning());
        assert_eq!(w.value(), Some(&2));
        assert_eq!(w.error(), Some(&"meh"));
        assert_eq!(w.clone().into_result(), Ok(2));
        let f: Outcome<&str, i32> = failure("bad");
        assert!(f.is_failure());
        assert_eq!(f.into_value(), None);
    }
}
