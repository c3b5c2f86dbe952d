use std::process::ExitCode;

use cu::pre::*;
use scopetree::error::ErrorCode;

mod cmds;

fn main() -> ExitCode {
    let args = match <cmds::CmdMain as clap::Parser>::try_parse() {
        Ok(args) => args,
        Err(err) => return report_parse_error(err),
    };
    match cmds::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            cu::error!("{err:?}");
            ExitCode::FAILURE
        }
    }
}

/// Translate clap failures into the documented error codes; help and
/// version requests are not errors
fn report_parse_error(err: clap::Error) -> ExitCode {
    use clap::error::ErrorKind;
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            ExitCode::SUCCESS
        }
        kind => {
            let code = match kind {
                ErrorKind::UnknownArgument => ErrorCode::CmdUnknownArg,
                ErrorKind::MissingRequiredArgument => ErrorCode::CmdMissingValue,
                ErrorKind::InvalidValue | ErrorKind::ValueValidation => {
                    ErrorCode::CmdInvalidValue
                }
                ErrorKind::TooManyValues | ErrorKind::ArgumentConflict => {
                    ErrorCode::CmdUnexpectedValue
                }
                _ => ErrorCode::CmdUnknownArg,
            };
            cu::error!("{code}: {err}");
            ExitCode::FAILURE
        }
    }
}
