//! Participant-facing adapters for the shell and chat ports.

mod recording;
mod terminal;

pub use recording::{ChatEvent, RecordingChatSurface, RecordingShell, ShellEvent};
pub use terminal::{parse_answer, render, TerminalChat, TerminalShell};
