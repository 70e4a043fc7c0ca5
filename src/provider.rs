// src/provider.rs - Print session: capabilities, selections and submission
use crate::capabilities::{Capabilities, CapabilityStore, Dpi, Layout};
use crate::config::PrintConfig;
use crate::error::PrintError;
use crate::events::{EventBus, PrintEvent};
use crate::layer::{LayerRegistry, MapState};
use crate::page::PrintPage;
use crate::queue::{JobId, PrintJobQueue};
use crate::request::{PrintRequest, PrintRequestBuilder, Selections};
use crate::transport::{HttpTransport, PrintTransport};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use url::Url;

/// One print service as seen by a map viewer.
///
/// Owns the capabilities, the current layout and DPI selection, the
/// request-level custom params and the job queue. Every state change is
/// announced on the event bus.
pub struct PrintProvider {
    service_url: String,
    store: CapabilityStore,
    transport: Arc<dyn PrintTransport>,
    registry: Arc<dyn LayerRegistry>,
    base_url: Option<Url>,
    layout: Option<Layout>,
    dpi: Option<Dpi>,
    custom_params: Map<String, Value>,
    events: EventBus,
    queue: PrintJobQueue,
}

impl PrintProvider {
    pub fn new(
        service_url: impl Into<String>,
        transport: Arc<dyn PrintTransport>,
        registry: Arc<dyn LayerRegistry>,
        extra_params: BTreeMap<String, String>,
    ) -> Self {
        let events = EventBus::default();
        let queue = PrintJobQueue::new(transport.clone(), events.clone());
        Self {
            service_url: service_url.into(),
            store: CapabilityStore::new(extra_params),
            transport,
            registry,
            base_url: None,
            layout: None,
            dpi: None,
            custom_params: Map::new(),
            events,
            queue,
        }
    }

    pub fn from_config(config: &PrintConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync + 'static>> {
        let transport = HttpTransport::new(config.service.timeout(), &config.service.encoding)?;
        let mut provider = Self::new(
            config.service.url.clone(),
            Arc::new(transport),
            Arc::new(config.cache.clone()),
            config.service.params.clone(),
        );
        provider.base_url = config.print.base_url()?;
        provider.custom_params = config.print.layout_params.clone();
        Ok(provider)
    }

    pub fn with_base_url(mut self, base_url: Option<Url>) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Loads the service capabilities and selects the first layout and DPI.
    ///
    /// Failures are both returned and announced with
    /// [`PrintEvent::LoadCapabilitiesException`].
    pub async fn load_capabilities(&mut self) -> Result<Arc<Capabilities>, PrintError> {
        let caps = match self.store.load(self.transport.as_ref(), &self.service_url).await {
            Ok(caps) => caps,
            Err(e) => {
                tracing::error!("Failed to load print capabilities from {}: {}", self.service_url, e);
                self.events.emit(PrintEvent::LoadCapabilitiesException(e.clone()));
                return Err(e);
            }
        };
        if self.layout.is_none() {
            if let Some(layout) = caps.layouts.first() {
                self.select_layout(layout.clone());
            }
        }
        if self.dpi.is_none() {
            if let Some(dpi) = caps.dpis.first() {
                self.select_dpi(dpi.clone());
            }
        }
        self.events.emit(PrintEvent::LoadCapabilities(caps.clone()));
        Ok(caps)
    }

    pub fn capabilities(&self) -> Result<Arc<Capabilities>, PrintError> {
        self.store.get()
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn dpi(&self) -> Option<&Dpi> {
        self.dpi.as_ref()
    }

    pub fn set_layout(&mut self, name: &str) -> Result<(), PrintError> {
        let caps = self.store.get()?;
        let layout = caps
            .layout(name)
            .cloned()
            .ok_or_else(|| PrintError::UnknownLayout(name.to_string()))?;
        self.select_layout(layout);
        Ok(())
    }

    /// Accepts either the DPI's display name or its numeric value.
    pub fn set_dpi(&mut self, value: &str) -> Result<(), PrintError> {
        let caps = self.store.get()?;
        let dpi = caps
            .dpi(value)
            .cloned()
            .ok_or_else(|| PrintError::UnknownDpi(value.to_string()))?;
        self.select_dpi(dpi);
        Ok(())
    }

    fn select_layout(&mut self, layout: Layout) {
        if self.layout.as_ref() == Some(&layout) {
            return;
        }
        tracing::debug!("Layout set to '{}'", layout.name);
        self.layout = Some(layout.clone());
        self.events.emit(PrintEvent::LayoutChange(layout));
    }

    fn select_dpi(&mut self, dpi: Dpi) {
        if self.dpi.as_ref() == Some(&dpi) {
            return;
        }
        tracing::debug!("DPI set to {}", dpi.value);
        self.dpi = Some(dpi.clone());
        self.events.emit(PrintEvent::DpiChange(dpi));
    }

    pub fn custom_params(&self) -> &Map<String, Value> {
        &self.custom_params
    }

    pub fn set_custom_params(&mut self, params: Map<String, Value>) {
        self.custom_params = params;
    }

    /// Current layout and DPI as a starting point for a print.
    pub fn selections(&self) -> Result<Selections, PrintError> {
        match (&self.layout, &self.dpi) {
            (Some(layout), Some(dpi)) => Ok(Selections::new(layout.clone(), dpi.clone())),
            _ => Err(PrintError::NotReady),
        }
    }

    pub fn build(
        &self,
        map: &MapState,
        pages: &[PrintPage],
        selections: &Selections,
    ) -> Result<PrintRequest, PrintError> {
        PrintRequestBuilder::new(&self.store, self.registry.as_ref())
            .with_base_url(self.base_url.as_ref())
            .build(map, pages, selections, &self.custom_params)
    }

    /// Builds a request and hands it to the job queue.
    pub async fn print(
        &self,
        map: &MapState,
        pages: &[PrintPage],
        selections: &Selections,
    ) -> Result<(JobId, JoinHandle<()>), PrintError> {
        let request = self.build(map, pages, selections)?;
        let url = self.store.create_url()?;
        let title = selections.title.as_deref().unwrap_or_default();
        self.queue.submit(url.as_str(), &request, title).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PrintEvent> {
        self.events.subscribe()
    }

    pub fn queue(&self) -> &PrintJobQueue {
        &self.queue
    }
}
