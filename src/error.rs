//! Error and result types for the Eudoxus engine.
//!
//! Execution results are split in two: [`Status`] carries the outcomes that
//! are not failures (`OK`, `END`, `STOP`) and [`EudoxusError`] carries the
//! rest. [`ResultCode`] folds both back into the classic eight codes for
//! callers that want a single value to report.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EudoxusError>;

/// Non-error outcome of an engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// All input was consumed (or the operation completed normally).
    Ok,
    /// No outgoing transition for the current input byte.
    ///
    /// Not necessarily an error: accept/non-accept automata use a missing
    /// transition as an implicit non-accept signal.
    End,
    /// A callback asked for execution to stop.
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EudoxusError {
    /// A callback returned [`Command::Error`](crate::Command::Error).
    #[error("Callback indicated error")]
    Callback,
    /// Invalid arguments or malformed automata data.
    #[error("Invalid automata: {0}")]
    Invalid(String),
    /// Allocation failure.
    #[error("Allocation failure: {0}")]
    Alloc(String),
    /// Automata was not built for this engine.
    #[error("Incompatible automata: {0}")]
    Incompatible(String),
    /// Internal defect. Please report as bug.
    #[error("Insanity: {0}")]
    Insane(String),
    /// Reading the automata failed.
    #[error("IO error: {0}")]
    Io(String),
}

impl EudoxusError {
    /// The result code this error reports as.
    pub fn code(&self) -> ResultCode {
        match self {
            EudoxusError::Callback => ResultCode::Error,
            EudoxusError::Invalid(_) | EudoxusError::Io(_) => ResultCode::Invalid,
            EudoxusError::Alloc(_) => ResultCode::Alloc,
            EudoxusError::Incompatible(_) => ResultCode::Incompat,
            EudoxusError::Insane(_) => ResultCode::Insane,
        }
    }
}

impl From<std::io::Error> for EudoxusError {
    fn from(err: std::io::Error) -> Self {
        EudoxusError::Io(err.to_string())
    }
}

impl From<std::collections::TryReserveError> for EudoxusError {
    fn from(err: std::collections::TryReserveError) -> Self {
        EudoxusError::Alloc(err.to_string())
    }
}

/// Flat result code covering both [`Status`] and [`EudoxusError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Ok,
    Stop,
    Error,
    End,
    Invalid,
    Alloc,
    Incompat,
    Insane,
}

impl ResultCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultCode::Ok => "OK",
            ResultCode::Stop => "STOP",
            ResultCode::Error => "ERROR",
            ResultCode::End => "END",
            ResultCode::Invalid => "EINVAL",
            ResultCode::Alloc => "EALLOC",
            ResultCode::Incompat => "EINCOMPAT",
            ResultCode::Insane => "EINSANE",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Status> for ResultCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Ok => ResultCode::Ok,
            Status::End => ResultCode::End,
            Status::Stop => ResultCode::Stop,
        }
    }
}

impl From<&EudoxusError> for ResultCode {
    fn from(err: &EudoxusError) -> Self {
        err.code()
    }
}

impl<T> From<&Result<T>> for ResultCode
where
    T: Copy + Into<ResultCode>,
{
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(value) => (*value).into(),
            Err(err) => err.code(),
        }
    }
}
