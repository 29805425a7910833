//! Chat Surface Port - the real-time conversation UI.
//!
//! The message transport itself lives behind this port; the engine only
//! frames the chat and ends it when the time budget runs out.

/// Operations the engine performs on the chat UI.
pub trait ChatSurface: Send + Sync {
    /// One-time framing message at chat start.
    fn show_banner(&self, text: &str);

    /// System notice, such as the time-limit message.
    fn show_system_notice(&self, text: &str);

    /// Ends the message transport.
    fn close_transport(&self);
}
