// src/events.rs - Typed notifications for the UI layer
use crate::capabilities::{Capabilities, Dpi, Layout};
use crate::error::PrintError;
use crate::queue::JobId;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub enum PrintEvent {
    LayoutChange(Layout),
    DpiChange(Dpi),
    /// A job finished and its document is available.
    Print { job_id: JobId, result_url: String },
    /// A job failed.
    PrintException { job_id: JobId, error: PrintError },
    LoadCapabilities(Arc<Capabilities>),
    LoadCapabilitiesException(PrintError),
}

impl PrintEvent {
    /// Event name as exposed to UI bindings.
    pub fn name(&self) -> &'static str {
        match self {
            PrintEvent::LayoutChange(_) => "layoutchange",
            PrintEvent::DpiChange(_) => "dpichange",
            PrintEvent::Print { .. } => "print",
            PrintEvent::PrintException { .. } => "printexception",
            PrintEvent::LoadCapabilities(_) => "loadcapabilities",
            PrintEvent::LoadCapabilitiesException(_) => "loadcapabilitiesexception",
        }
    }
}

/// Single notification channel shared by the provider and the job queue.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PrintEvent>,
}

impl EventBus {
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer);
        Self { sender }
    }

    /// Having no subscribers is fine: the event is simply dropped.
    pub fn emit(&self, event: PrintEvent) {
        tracing::debug!("Event: {}", event.name());
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PrintEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
