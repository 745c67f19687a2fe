pub mod commands;
pub mod handlers;

pub use commands::{CliArgs, Commands, PayloadArgs};
pub use handlers::{handle_event, handle_resolve, read_event, resolve_event};
