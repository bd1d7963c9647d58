use std::any::Any;
use std::fmt;
use std::panic;

/// An opaque captured failure: the payload of a panicked child.
pub type Failure = Box<dyn Any + Send + 'static>;

/// The settled result of a single child: a value or a captured failure.
///
/// `Outcome` is how [`all_complete`](crate::all_complete()) and
/// [`Task::settle`](crate::Task::settle) report a child's fate without
/// deciding it for the caller. A captured failure can be re-raised with
/// [`value`](Outcome::value) or inspected opaquely with
/// [`failure`](Outcome::failure).
pub enum Outcome<T> {
    /// The child ran to completion and produced this value.
    Value(T),
    /// The child panicked; the payload is carried verbatim.
    Failure(Failure),
}

impl<T> Outcome<T> {
    pub(crate) fn from_caught(result: Result<T, Failure>) -> Self {
        match result {
            Ok(value) => Outcome::Value(value),
            Err(payload) => Outcome::Failure(payload),
        }
    }

    /// Returns `true` if the child produced a value.
    pub fn has_value(&self) -> bool {
        matches!(self, Outcome::Value(_))
    }

    /// Consumes the outcome, returning the value.
    ///
    /// A captured failure is resumed on the calling thread, exactly as if
    /// the child's panic had not been intercepted.
    pub fn value(self) -> T {
        match self {
            Outcome::Value(value) => value,
            Outcome::Failure(payload) => panic::resume_unwind(payload),
        }
    }

    /// Consumes the outcome, returning the captured failure if there is one.
    pub fn failure(self) -> Option<Failure> {
        match self {
            Outcome::Value(_) => None,
            Outcome::Failure(payload) => Some(payload),
        }
    }

    /// Converts into a plain `Result`, never panicking.
    pub fn into_result(self) -> Result<T, Failure> {
        match self {
            Outcome::Value(value) => Ok(value),
            Outcome::Failure(payload) => Err(payload),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Outcome::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Outcome::Failure(_) => f.debug_tuple("Failure").finish(),
        }
    }
}
