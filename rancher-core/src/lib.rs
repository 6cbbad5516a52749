pub mod command_stream;
pub mod error;
pub mod file_system;
pub mod output_macros;

pub use command_stream::{
    CapturedOutput, CommandHandle, CommandOutcome, CommandRunner, CommandSpec, ExitCallback,
    OutputCapture, ProcessOutputCapture, ProcessRunner,
};
pub use error::{RancherError, Result};
pub use file_system::{is_tool_installed, ExistenceProbe, SystemProbe};
