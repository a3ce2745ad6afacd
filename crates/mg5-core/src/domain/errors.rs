use std::error::Error;
use std::fmt::{Display, Formatter};

pub type Mg5Result<T> = Result<T, Mg5Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mg5ErrorCategory {
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl Mg5ErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
            Self::InternalError => "InternalError",
        }
    }
}

/// Error raised anywhere in the wrapper.
///
/// `placeholder` is a stable dotted code (`INPUT.ABSOLUTE_PATH`,
/// `RUN.OUTPUT_MISSING`, ...) so callers and tests can match on the failure
/// without parsing the message. When the failure happened while a command
/// script was being executed the script is attached and rendered by
/// [`Mg5Error::diagnostic_line`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mg5Error {
    category: Mg5ErrorCategory,
    placeholder: &'static str,
    message: String,
    command: Option<String>,
}

impl Mg5Error {
    pub fn new(
        category: Mg5ErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
            command: None,
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(Mg5ErrorCategory::InputValidationError, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(Mg5ErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(Mg5ErrorCategory::ComputationError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(Mg5ErrorCategory::InternalError, placeholder, message)
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub const fn category(&self) -> Mg5ErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let mut line = format!("ERROR: [{}] {}", self.placeholder, self.message);
        if let Some(command) = &self.command {
            line.push_str("\n    The command was:");
            for command_line in command.lines() {
                line.push_str("\n        ");
                line.push_str(command_line);
            }
        }
        line
    }
}

impl Display for Mg5Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for Mg5Error {}
