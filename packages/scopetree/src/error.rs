use cu::pre::*;

/// Fatal error codes
///
/// The driver formats these to stderr as `CODE: message` and exits with
/// status 1. Recoverable DWARF oddities are warnings, not codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Argument parsing
    CmdUnknownArg,
    CmdMissingValue,
    CmdUnexpectedValue,
    CmdInvalidValue,
    CmdShortcutWithValue,
    CmdInvalidRegex,

    // Reading
    ReadFailed,
    InvalidDwarf,

    // File IO
    FileIoGetCwd,
    FileIoAbsPath,
    FileIoOpenFailure,
    FileIoMakeDirFailure,
    SplitUnableToOpenFile,

    // Start up
    FileNotFound,
    InvalidFile,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CmdUnknownArg => "ERR_CMD_UNKNOWN_ARG",
            Self::CmdMissingValue => "ERR_CMD_MISSING_VALUE",
            Self::CmdUnexpectedValue => "ERR_CMD_UNEXPECTED_VALUE",
            Self::CmdInvalidValue => "ERR_CMD_INVALID_VALUE",
            Self::CmdShortcutWithValue => "ERR_CMD_SHORTCUT_WITH_VALUE",
            Self::CmdInvalidRegex => "ERR_CMD_INVALID_REGEX",
            Self::ReadFailed => "ERR_READ_FAILED",
            Self::InvalidDwarf => "ERR_INVALID_DWARF",
            Self::FileIoGetCwd => "ERR_FILEIO_GET_CWD",
            Self::FileIoAbsPath => "ERR_FILEIO_ABS_PATH",
            Self::FileIoOpenFailure => "ERR_FILEIO_OPEN_FAILURE",
            Self::FileIoMakeDirFailure => "ERR_FILEIO_MAKE_DIR_FAILURE",
            Self::SplitUnableToOpenFile => "ERR_SPLIT_UNABLE_TO_OPEN_FILE",
            Self::FileNotFound => "ERR_FILE_NOT_FOUND",
            Self::InvalidFile => "ERR_INVALID_FILE",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

/// Bail out of the enclosing function with one of the documented fatal
/// codes. The code string leads the message so the driver output stays
/// grep-able.
#[macro_export]
macro_rules! fatal {
    ($code:expr) => {
        cu::bail!("{}", $crate::error::ErrorCode::as_str($code))
    };
    ($code:expr, $($fmt:tt)*) => {
        cu::bail!(
            "{}: {}",
            $crate::error::ErrorCode::as_str($code),
            format!($($fmt)*)
        )
    };
}
