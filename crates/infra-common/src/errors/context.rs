//! Error context helpers.
//!
//! Lets callers annotate an infrastructure error with the component and
//! operation it surfaced from, without pulling in a full error-chain crate.

use super::Error;
use std::fmt;

/// Where an error happened: component plus the operation in flight.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub component: String,
    pub operation: String,
}

impl ErrorContext {
    pub fn new(component: impl Into<String>, operation: impl Into<String>) -> Self {
        ErrorContext {
            component: component.into(),
            operation: operation.into(),
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.component, self.operation)
    }
}

/// Extension trait for attaching context to infrastructure results.
pub trait ErrorExt<T> {
    /// Annotate the error with the component and operation it came from.
    fn in_context(self, component: &str, operation: &str) -> Result<T, Error>;
}

impl<T> ErrorExt<T> for Result<T, Error> {
    fn in_context(self, component: &str, operation: &str) -> Result<T, Error> {
        self.map_err(|e| {
            let ctx = ErrorContext::new(component, operation);
            match e {
                Error::Config(msg) => Error::Config(format!("{} [{}]", msg, ctx)),
                Error::Lifecycle(msg) => Error::Lifecycle(format!("{} [{}]", msg, ctx)),
                Error::Other(msg) => Error::Other(format!("{} [{}]", msg, ctx)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_appended_to_message() {
        let res: Result<(), Error> = Err(Error::Config("bad level".into()));
        let err = res.in_context("logging", "setup").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: bad level [logging::setup]"
        );
    }
}
