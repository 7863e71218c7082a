//! Arity contracts for methods and closures.

use std::fmt;

/// How many arguments a callable accepts.
///
/// Fixed at creation time; never changes for the lifetime of a method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Arity {
    pub required: usize,
    pub optional: usize,
    pub rest: bool,
}

/// Argument count mismatch reported by [`Arity::check`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArityError {
    pub got: usize,
    /// The count named in the message: `required` when too few were given,
    /// `required + optional` when too many were given.
    pub expected: usize,
}

impl fmt::Display for ArityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "wrong number of arguments ({} for {})",
            self.got, self.expected
        )
    }
}

impl Arity {
    pub const NO_ARGUMENTS: Arity = Arity::fixed(0);
    pub const ONE_ARGUMENT: Arity = Arity::fixed(1);
    pub const OPTIONAL: Arity = Arity {
        required: 0,
        optional: 0,
        rest: true,
    };

    pub const fn fixed(required: usize) -> Self {
        Arity {
            required,
            optional: 0,
            rest: false,
        }
    }

    pub const fn new(required: usize, optional: usize, rest: bool) -> Self {
        Arity {
            required,
            optional,
            rest,
        }
    }

    /// Whether exactly `required` arguments are accepted.
    #[inline]
    pub fn is_fixed(self) -> bool {
        self.optional == 0 && !self.rest
    }

    /// Largest accepted argument count, or `None` with a rest parameter.
    #[inline]
    pub fn max(self) -> Option<usize> {
        if self.rest {
            None
        } else {
            Some(self.required.saturating_add(self.optional))
        }
    }

    /// Ruby-style arity number: `n` when fixed, `-(required + 1)` otherwise.
    pub fn value(self) -> i64 {
        let required = i64::try_from(self.required).unwrap_or(i64::MAX);
        if self.is_fixed() {
            required
        } else {
            -(required.saturating_add(1))
        }
    }

    /// Check an argument count against this arity.
    pub fn check(self, got: usize) -> Result<(), ArityError> {
        if got < self.required {
            return Err(ArityError {
                got,
                expected: self.required,
            });
        }
        if let Some(max) = self.max() {
            if got > max {
                return Err(ArityError { got, expected: max });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_arity_rejects_too_few() {
        let err = Arity::ONE_ARGUMENT.check(0);
        assert_eq!(
            err,
            Err(ArityError {
                got: 0,
                expected: 1
            })
        );
        assert_eq!(
            err.map_err(|e| e.to_string()),
            Err("wrong number of arguments (0 for 1)".to_string())
        );
    }

    #[test]
    fn optional_arity_reports_maximum_when_too_many() {
        let arity = Arity::new(1, 2, false);
        assert!(arity.check(1).is_ok());
        assert!(arity.check(3).is_ok());
        assert_eq!(
            arity.check(4),
            Err(ArityError {
                got: 4,
                expected: 3
            })
        );
    }

    #[test]
    fn rest_arity_has_no_upper_bound() {
        let arity = Arity::new(2, 0, true);
        assert!(arity.check(100).is_ok());
        assert!(arity.check(1).is_err());
        assert_eq!(arity.max(), None);
    }

    #[test]
    fn arity_value_encoding() {
        assert_eq!(Arity::fixed(2).value(), 2);
        assert_eq!(Arity::new(1, 1, false).value(), -2);
        assert_eq!(Arity::OPTIONAL.value(), -1);
    }
}
