//! The condition a target raises instead of returning.

use std::any::Any;
use std::error::Error;
use std::fmt;

/// A failure raised by the target itself.
///
/// This is always the target's own condition, never a wrapper added by the
/// invocation layer. Typed errors keep their original value so predicates can
/// downcast to them.
pub struct Failure {
    kind: String,
    message: String,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl Failure {
    /// Kind reported for failures recovered from a panic.
    pub const PANIC: &'static str = "panic";

    /// Create a failure with an explicit kind label.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a typed error, labelling it with the error's short type name.
    pub fn from_error<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            kind: short_type_name::<E>().to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Recover a failure from a panic payload.
    ///
    /// `panic!` payloads are either `&'static str` or `String`; anything else
    /// keeps the kind but loses the message.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(s) => *s,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(s) => (*s).to_string(),
                Err(_) => "<non-string panic payload>".to_string(),
            },
        };
        Self::new(Self::PANIC, message)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether this failure was recovered from a panic.
    pub fn is_panic(&self) -> bool {
        self.kind == Self::PANIC
    }

    /// Downcast the original typed error, if there is one.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.source.as_ref().and_then(|e| e.downcast_ref::<E>())
    }

    /// Whether the original typed error is an `E`.
    pub fn is<E: Error + 'static>(&self) -> bool {
        self.downcast_ref::<E>().is_some()
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("typed", &self.source.is_some())
            .finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl Error for Failure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

/// `a::b::Thing<c::D>` -> `Thing<c::D>`
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct NullDeref;

    impl fmt::Display for NullDeref {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("null dereference")
        }
    }

    impl Error for NullDeref {}

    #[test]
    fn should_label_typed_errors_with_short_type_name() {
        let failure = Failure::from_error(NullDeref);
        assert_eq!(failure.kind(), "NullDeref");
        assert_eq!(failure.message(), "null dereference");
        assert!(failure.is::<NullDeref>());
        assert!(failure.source().is_some());
    }

    #[test]
    fn should_recover_message_from_str_and_string_panics() {
        let failure = Failure::from_panic(Box::new("boom"));
        assert!(failure.is_panic());
        assert_eq!(failure.message(), "boom");

        let failure = Failure::from_panic(Box::new(String::from("bang")));
        assert_eq!(failure.message(), "bang");

        let failure = Failure::from_panic(Box::new(7_u32));
        assert!(failure.is_panic());
        assert!(failure.message().contains("non-string"));
    }

    #[test]
    fn should_display_kind_and_message() {
        assert_eq!(Failure::new("Exception", "crac").to_string(), "Exception: crac");
        assert_eq!(Failure::new("NullPointer", "").to_string(), "NullPointer");
    }

    #[test]
    fn should_not_downcast_untyped_failures() {
        let failure = Failure::new("Exception", "crac");
        assert!(!failure.is::<NullDeref>());
        assert!(failure.source().is_none());
    }
}
