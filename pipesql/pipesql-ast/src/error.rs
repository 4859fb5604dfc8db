use std::fmt::Debug;

use serde::Serialize;

/// A pipesql error. Used internally, exposed as pipesql::ErrorMessage.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    /// Message kind. Currently only Error is implemented.
    pub kind: MessageKind,
    pub reason: Reason,
    pub hints: Vec<String>,
    /// Machine readable identifier error code eg, "E0001"
    pub code: Option<&'static str>,
}

/// Multiple pipesql errors. Used internally, exposed as pipesql::ErrorMessages.
#[derive(Debug, Clone)]
pub struct Errors(pub Vec<Error>);

/// Compile message kind. Currently only Error is implemented.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum MessageKind {
    Error,
    Warning,
    Lint,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    Simple(String),
    Expected {
        who: Option<String>,
        expected: String,
        found: String,
    },
    NotFound {
        name: String,
        namespace: String,
    },
    /// The pipeline requested an operator this compiler does not translate.
    Unsupported {
        operator: String,
    },
    /// An expression has no SQL equivalent.
    Untranslatable {
        what: String,
        expr: String,
    },
    /// A function was called with arguments it cannot accept.
    Usage {
        function: String,
        message: String,
    },
    Bug {
        details: Option<String>,
    },
}

pub mod codes {
    pub const UNSUPPORTED_OPERATOR: &str = "E0001";
    pub const UNTRANSLATABLE: &str = "E0002";
    pub const INVALID_USAGE: &str = "E0003";
    pub const NO_ELEMENTS: &str = "E0004";
}

impl Error {
    pub fn new(reason: Reason) -> Self {
        Error {
            kind: MessageKind::Error,
            reason,
            hints: Vec::new(),
            code: None,
        }
    }

    pub fn new_simple<S: ToString>(reason: S) -> Self {
        Error::new(Reason::Simple(reason.to_string()))
    }

    pub fn new_unsupported<S: ToString>(operator: S) -> Self {
        Error::new(Reason::Unsupported {
            operator: operator.to_string(),
        })
        .with_code(codes::UNSUPPORTED_OPERATOR)
    }

    pub fn new_untranslatable<W: ToString, E: ToString>(what: W, expr: E) -> Self {
        Error::new(Reason::Untranslatable {
            what: what.to_string(),
            expr: expr.to_string(),
        })
        .with_code(codes::UNTRANSLATABLE)
    }

    pub fn new_usage<F: ToString, M: ToString>(function: F, message: M) -> Self {
        Error::new(Reason::Usage {
            function: function.to_string(),
            message: message.to_string(),
        })
        .with_code(codes::INVALID_USAGE)
    }

    /// Used for things that you *think* should never happen, but are not sure.
    pub fn new_assert<S: ToString>(details: S) -> Self {
        Error::new(Reason::Bug {
            details: Some(details.to_string()),
        })
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reason::Simple(text) => f.write_str(text),
            Reason::Expected {
                who,
                expected,
                found,
            } => {
                if let Some(who) = who {
                    write!(f, "{who} ")?;
                }
                write!(f, "expected {expected}, but found {found}")
            }
            Reason::NotFound { name, namespace } => write!(f, "{namespace} `{name}` not found"),
            Reason::Unsupported { operator } => {
                write!(f, "operator `{operator}` is not implemented")
            }
            Reason::Untranslatable { what, expr } => {
                write!(f, "{what} `{expr}` could not be translated to SQL")
            }
            Reason::Usage { function, message } => write!(f, "invalid call to `{function}`: {message}"),
            Reason::Bug { details } => {
                write!(f, "internal compiler error")?;
                if let Some(details) = details {
                    write!(f, "; {details}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<Error> for Errors {
    fn from(error: Error) -> Self {
        Errors(vec![error])
    }
}

// Needed for anyhow
impl std::error::Error for Error {}

// Needed for anyhow
impl std::error::Error for Errors {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(code) = self.code {
            write!(f, "[{code}] ")?;
        }
        std::fmt::Display::fmt(&self.reason, f)
    }
}

// Needed for StdError
impl std::fmt::Display for Errors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self, f)
    }
}

pub trait WithErrorInfo: Sized {
    fn push_hint<S: Into<String>>(self, hint: S) -> Self;

    fn with_hints<S: Into<String>, I: IntoIterator<Item = S>>(self, hints: I) -> Self;

    fn with_code(self, code: &'static str) -> Self;
}

impl WithErrorInfo for Error {
    fn push_hint<S: Into<String>>(mut self, hint: S) -> Self {
        self.hints.push(hint.into());
        self
    }

    fn with_hints<S: Into<String>, I: IntoIterator<Item = S>>(mut self, hints: I) -> Self {
        self.hints = hints.into_iter().map(|x| x.into()).collect();
        self
    }

    fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }
}

impl<T, E: WithErrorInfo> WithErrorInfo for Result<T, E> {
    fn push_hint<S: Into<String>>(self, hint: S) -> Self {
        self.map_err(|e| e.push_hint(hint))
    }

    fn with_hints<S: Into<String>, I: IntoIterator<Item = S>>(self, hints: I) -> Self {
        self.map_err(|e| e.with_hints(hints))
    }

    fn with_code(self, code: &'static str) -> Self {
        self.map_err(|e| e.with_code(code))
    }
}
