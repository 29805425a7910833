//! Recording shell and chat surface for tests.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::execution::Surface;
use crate::ports::{ChatSurface, ParticipantShell};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    Surface(Surface),
    ClearLocalState,
    Exit,
}

/// Shell that records every effect in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingShell {
    events: Arc<Mutex<Vec<ShellEvent>>>,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ShellEvent> {
        lock(&self.events).clone()
    }

    /// Last surface shown, if any.
    pub fn surface(&self) -> Option<Surface> {
        lock(&self.events).iter().rev().find_map(|event| match event {
            ShellEvent::Surface(surface) => Some(*surface),
            _ => None,
        })
    }

    pub fn exited(&self) -> bool {
        lock(&self.events).contains(&ShellEvent::Exit)
    }
}

impl ParticipantShell for RecordingShell {
    fn set_surface(&self, surface: Surface) {
        lock(&self.events).push(ShellEvent::Surface(surface));
    }

    fn clear_local_state(&self) {
        lock(&self.events).push(ShellEvent::ClearLocalState);
    }

    fn exit_experiment(&self) {
        lock(&self.events).push(ShellEvent::Exit);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Banner(String),
    Notice(String),
    TransportClosed,
}

/// Chat surface that records every effect in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingChatSurface {
    events: Arc<Mutex<Vec<ChatEvent>>>,
}

impl RecordingChatSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChatEvent> {
        lock(&self.events).clone()
    }

    pub fn banners(&self) -> Vec<String> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                ChatEvent::Banner(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn transport_closures(&self) -> usize {
        lock(&self.events)
            .iter()
            .filter(|event| matches!(event, ChatEvent::TransportClosed))
            .count()
    }
}

impl ChatSurface for RecordingChatSurface {
    fn show_banner(&self, text: &str) {
        lock(&self.events).push(ChatEvent::Banner(text.to_string()));
    }

    fn show_system_notice(&self, text: &str) {
        lock(&self.events).push(ChatEvent::Notice(text.to_string()));
    }

    fn close_transport(&self) {
        lock(&self.events).push(ChatEvent::TransportClosed);
    }
}
