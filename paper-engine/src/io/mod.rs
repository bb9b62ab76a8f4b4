pub mod args;
pub mod command;
pub mod publisher;

pub use args::Args;
pub use command::{handle_command, TraderCommand};
pub use publisher::{BroadcastPublisher, LogPublisher, RecordingPublisher};
