/// Builds an [`Error`] from an [`ErrorCode`], optionally with a source
/// line and a detail message.
///
/// ```ignore
/// error!(TypeMismatch)
/// error!(PreproError, line; "endif without a matching if")
/// error!(DivisionByZero; format!("{}(%{})", name, idx))
/// ```
macro_rules! error {
    ($err:ident) => {
        $crate::lang::Error::from_code($crate::lang::ErrorCode::$err)
    };
    ($err:ident; $msg:expr) => {
        $crate::lang::Error::from_code($crate::lang::ErrorCode::$err).with_message($msg)
    };
    ($err:ident, $line:expr) => {
        $crate::lang::Error::from_code($crate::lang::ErrorCode::$err).in_line($line)
    };
    ($err:ident, $line:expr; $msg:expr) => {
        $crate::lang::Error::from_code($crate::lang::ErrorCode::$err)
            .in_line($line)
            .with_message($msg)
    };
}

#[derive(Debug, PartialEq, Clone)]
pub struct Error {
    code: ErrorCode,
    line: Option<usize>,
    message: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorCode {
    SyntaxError,
    LexicalError,
    PreproError,
    TypeMismatch,
    DivisionByZero,
    SubscriptOutOfRange,
    IllegalArgument,
    UndefinedLabel,
    UndefinedCommand,
    UndefinedFunction,
    LoopMismatch,
    GosubMismatch,
    IoError,
    InternalError,
}

impl Error {
    pub fn from_code(code: ErrorCode) -> Error {
        Error {
            code,
            line: None,
            message: None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Attaches a 0-based source line. The first one sticks; callers up
    /// the stack cannot clobber a more precise location.
    pub fn in_line(mut self, line: usize) -> Error {
        if self.line.is_none() {
            self.line = Some(line);
        }
        self
    }

    /// Rebases the error onto `line`, overriding any earlier location.
    /// The preprocessor uses this when it tokenizes a single line whose
    /// local positions mean nothing to the reader.
    pub fn at_line(mut self, line: usize) -> Error {
        self.line = Some(line);
        self
    }

    pub fn with_message<S: Into<String>>(mut self, message: S) -> Error {
        if self.message.is_none() {
            self.message = Some(message.into());
        }
        self
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use ErrorCode::*;
        let s = match self.code {
            SyntaxError => "syntax error",
            LexicalError => "lexical error",
            PreproError => "preprocessor error",
            TypeMismatch => "type mismatch",
            DivisionByZero => "division by zero",
            SubscriptOutOfRange => "subscript out of range",
            IllegalArgument => "illegal argument",
            UndefinedLabel => "undefined label",
            UndefinedCommand => "undefined command",
            UndefinedFunction => "undefined function",
            LoopMismatch => "loop without repeat",
            GosubMismatch => "return without gosub",
            IoError => "i/o error",
            InternalError => "internal error",
        };
        write!(f, "{}", s)?;
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        if let Some(line) = self.line {
            write!(f, " (line {})", line + 1)?;
        }
        Ok(())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        error!(IoError; e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = error!(TypeMismatch);
        assert_eq!(e.to_string(), "type mismatch");
        let e = error!(PreproError, 2; "endif without a matching if");
        assert_eq!(
            e.to_string(),
            "preprocessor error: endif without a matching if (line 3)"
        );
    }

    #[test]
    fn test_first_location_sticks() {
        let e = error!(SyntaxError, 4).in_line(9);
        assert_eq!(e, error!(SyntaxError, 4));
    }
}
