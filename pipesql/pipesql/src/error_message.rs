use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};

use serde::Serialize;

use crate::{Error, Errors, MessageKind};

#[derive(Clone, PartialEq, Serialize)]
pub struct ErrorMessage {
    /// Message kind. Currently only Error is implemented.
    pub kind: MessageKind,
    /// Machine-readable identifier of the error
    pub code: Option<String>,
    /// Plain text of the error
    pub reason: String,
    /// A list of suggestions of how to fix the error
    pub hints: Vec<String>,
}

impl Display for ErrorMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let code = (self.code.as_ref())
            .map(|c| format!("[{c}] "))
            .unwrap_or_default();

        writeln!(f, "{}Error: {}", code, &self.reason)?;
        for hint in &self.hints {
            writeln!(f, "↳ Hint: {}", hint)?;
        }
        Ok(())
    }
}

impl Debug for ErrorMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self, f)
    }
}

impl From<Error> for ErrorMessage {
    fn from(e: Error) -> Self {
        log::debug!("{:#?}", e);
        ErrorMessage {
            code: e.code.map(str::to_string),
            kind: e.kind,
            reason: e.reason.to_string(),
            hints: e.hints,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMessages {
    pub inner: Vec<ErrorMessage>,
}
impl StdError for ErrorMessages {}

impl From<Vec<ErrorMessage>> for ErrorMessages {
    fn from(errors: Vec<ErrorMessage>) -> Self {
        ErrorMessages { inner: errors }
    }
}

impl From<ErrorMessage> for ErrorMessages {
    fn from(e: ErrorMessage) -> Self {
        ErrorMessages { inner: vec![e] }
    }
}

impl From<Error> for ErrorMessages {
    fn from(e: Error) -> Self {
        ErrorMessages {
            inner: vec![ErrorMessage::from(e)],
        }
    }
}

impl From<Errors> for ErrorMessages {
    fn from(errs: Errors) -> Self {
        ErrorMessages {
            inner: errs.0.into_iter().map(ErrorMessage::from).collect(),
        }
    }
}

impl Display for ErrorMessages {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for e in &self.inner {
            Display::fmt(&e, f)?;
        }
        Ok(())
    }
}

impl ErrorMessages {
    /// Serializes the messages. Falls back to the plain text of the messages
    /// in the unlikely case they cannot be serialized.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }

    /// Code of the first message, if it has one.
    pub fn code(&self) -> Option<&str> {
        self.inner.first().and_then(|e| e.code.as_deref())
    }
}

#[cfg(test)]
mod test {
    use insta::assert_snapshot;

    use super::*;
    use crate::WithErrorInfo;

    #[test]
    fn display() {
        let messages = ErrorMessages::from(
            Error::new_untranslatable("predicate", "x.Name.reverse()")
                .push_hint("filter the rows after loading them"),
        );
        assert_snapshot!(messages, @r"
        [E0002] Error: predicate `x.Name.reverse()` could not be translated to SQL
        ↳ Hint: filter the rows after loading them
        ");
        assert_eq!(messages.code(), Some("E0002"));
    }

    #[test]
    fn json() {
        let messages = ErrorMessages::from(Error::new_unsupported("Join"));
        assert_snapshot!(messages.to_json(), @r#"{"inner":[{"kind":"Error","code":"E0001","reason":"operator `Join` is not implemented","hints":[]}]}"#);
    }
}
