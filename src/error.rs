//! The crate-wide error type and the stable status-code table from the public API.

use std::fmt;

/// Stable status codes mirroring the public C ABI's return values.
///
/// New codes may be added over time; existing codes are never renumbered or reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum StatusCode {
    Ok = 0,
    Err = -1,
    ErrMalloc = -2,
    ErrArg = -3,
    ErrBug = -4,
    ErrScript = -5,
    ErrDecodersDir = -6,
    ErrTermReq = -7,
}

impl StatusCode {
    pub fn name(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OTD_OK",
            StatusCode::Err => "OTD_ERR",
            StatusCode::ErrMalloc => "OTD_ERR_MALLOC",
            StatusCode::ErrArg => "OTD_ERR_ARG",
            StatusCode::ErrBug => "OTD_ERR_BUG",
            StatusCode::ErrScript => "OTD_ERR_SCRIPT",
            StatusCode::ErrDecodersDir => "OTD_ERR_DECODERS_DIR",
            StatusCode::ErrTermReq => "OTD_ERR_TERM_REQ",
        }
    }
}

/// Errors produced by the decoder runtime.
///
/// Every public, fallible operation in this crate returns `Result<T, Error>`; the
/// `code()` method maps each variant back onto the stable [`StatusCode`] table.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("argument error: {reason}")]
    Arg { reason: String },

    #[error("internal invariant violated: {reason}")]
    Bug { reason: String },

    #[error("decoder instance {instance} raised a script error at sample {samplenum}: {source}")]
    Script {
        instance: u64,
        samplenum: u64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("decoder search path invalid: {reason}")]
    DecodersDir { reason: String },

    #[error("termination requested")]
    TerminateRequested,

    #[error("end of stream")]
    EndOfStream,

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn arg(reason: impl Into<String>) -> Self {
        Error::Arg { reason: reason.into() }
    }

    pub fn bug(reason: impl Into<String>) -> Self {
        Error::Bug { reason: reason.into() }
    }

    /// Map this error onto the stable status-code table from the public API.
    pub fn code(&self) -> StatusCode {
        match self {
            Error::Arg { .. } => StatusCode::ErrArg,
            Error::Bug { .. } => StatusCode::ErrBug,
            Error::Script { .. } => StatusCode::ErrScript,
            Error::DecodersDir { .. } => StatusCode::ErrDecodersDir,
            Error::TerminateRequested => StatusCode::ErrTermReq,
            Error::EndOfStream => StatusCode::Err,
            Error::Other(_) => StatusCode::Err,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Human-readable string for a status code, for frontends that only have the integer.
pub fn strerror(code: StatusCode) -> &'static str {
    match code {
        StatusCode::Ok => "no error",
        StatusCode::Err => "generic/unspecified error",
        StatusCode::ErrMalloc => "memory allocation failed",
        StatusCode::ErrArg => "invalid argument",
        StatusCode::ErrBug => "internal error (bug)",
        StatusCode::ErrScript => "error in decoder script",
        StatusCode::ErrDecodersDir => "invalid decoders search directory",
        StatusCode::ErrTermReq => "termination requested",
    }
}

/// Symbolic name for a status code (e.g. `"OTD_ERR_ARG"`).
pub fn strerror_name(code: StatusCode) -> &'static str {
    code.name()
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), *self as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strerror_name_uses_the_otd_prefix_not_the_libsigrokdecode_one() {
        assert_eq!(strerror_name(StatusCode::Ok), "OTD_OK");
        assert_eq!(strerror_name(StatusCode::Err), "OTD_ERR");
        assert_eq!(strerror_name(StatusCode::ErrMalloc), "OTD_ERR_MALLOC");
        assert_eq!(strerror_name(StatusCode::ErrArg), "OTD_ERR_ARG");
        assert_eq!(strerror_name(StatusCode::ErrBug), "OTD_ERR_BUG");
        assert_eq!(strerror_name(StatusCode::ErrScript), "OTD_ERR_SCRIPT");
        assert_eq!(strerror_name(StatusCode::ErrDecodersDir), "OTD_ERR_DECODERS_DIR");
        assert_eq!(strerror_name(StatusCode::ErrTermReq), "OTD_ERR_TERM_REQ");
    }

    #[test]
    fn status_code_display_includes_the_symbolic_name_and_numeric_value() {
        assert_eq!(format!("{}", StatusCode::ErrArg), "OTD_ERR_ARG (-3)");
    }
}
