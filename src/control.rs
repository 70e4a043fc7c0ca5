//! Printer control logic.
//!
//! Turns what the user filled in on the print form into provider selections
//! and pages, then submits. Rendering the form is left to the host.

use crate::capabilities::{Layout, Scale};
use crate::config::PrintConfig;
use crate::error::PrintError;
use crate::layer::MapState;
use crate::page::{FitMode, PrintPage};
use crate::provider::PrintProvider;
use crate::queue::{JobId, JobState, PrintJob};
use crate::request::{PrintRequest, Selections};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;

/// Values entered on the print form. `None` keeps the provider's current choice.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PrintForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub layout: Option<String>,
    #[serde(default)]
    pub dpi: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    /// Print at the map's current scale around its center instead of its extent.
    #[serde(default)]
    pub force_scale: bool,
}

/// Settled jobs of [`PrintControl::print_all`], in submission order.
#[derive(Debug)]
pub struct PrintBatch {
    pub jobs: Vec<PrintJob>,
    /// Index and error of the map that stopped the batch.
    pub rejected: Option<(usize, PrintError)>,
}

impl PrintBatch {
    pub fn failures(&self) -> usize {
        self.jobs.iter().filter(|j| j.state != JobState::Completed).count()
    }
}

pub struct PrintControl {
    provider: PrintProvider,
    layout_params: Map<String, Value>,
    pages_params: Vec<Map<String, Value>>,
    fit_mode: Option<FitMode>,
}

impl PrintControl {
    pub fn new(provider: PrintProvider, layout_params: Map<String, Value>, pages_params: Vec<Map<String, Value>>) -> Self {
        let pages_params = if pages_params.is_empty() { vec![Map::new()] } else { pages_params };
        Self { provider, layout_params, pages_params, fit_mode: None }
    }

    pub fn from_config(config: &PrintConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync + 'static>> {
        let provider = PrintProvider::from_config(config)?;
        Ok(Self::new(provider, config.print.layout_params.clone(), config.print.pages.clone())
            .with_fit_mode(config.print.fit_mode))
    }

    pub fn with_fit_mode(mut self, fit_mode: Option<FitMode>) -> Self {
        self.fit_mode = fit_mode;
        self
    }

    pub fn provider(&self) -> &PrintProvider {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut PrintProvider {
        &mut self.provider
    }

    /// Applies `form` to the provider and derives the pages to print, one
    /// per configured page-param set.
    fn prepare(
        &mut self,
        map: &MapState,
        form: &PrintForm,
        legend: bool,
    ) -> Result<(Vec<PrintPage>, Selections), PrintError> {
        if let Some(layout) = &form.layout {
            self.provider.set_layout(layout)?;
        }
        if let Some(dpi) = &form.dpi {
            self.provider.set_dpi(dpi)?;
        }
        self.provider.set_custom_params(self.layout_params.clone());

        let mut selections = self.provider.selections()?;
        selections.output_format = form.format.clone();
        selections.title = Some(form.title.clone());
        selections.description = Some(form.description.clone());
        selections.legend = legend;

        let pages = self
            .pages_params
            .iter()
            .map(|params| self.page_for(map, form, &selections.layout).with_custom_params(params.clone()))
            .collect();
        Ok((pages, selections))
    }

    /// The request `print` would submit, without submitting it.
    pub fn build(&mut self, map: &MapState, form: &PrintForm, legend: bool) -> Result<PrintRequest, PrintError> {
        let (pages, selections) = self.prepare(map, form, legend)?;
        self.provider.build(map, &pages, &selections)
    }

    pub async fn print(
        &mut self,
        map: &MapState,
        form: &PrintForm,
        legend: bool,
    ) -> Result<(JobId, JoinHandle<()>), PrintError> {
        let (pages, selections) = self.prepare(map, form, legend)?;
        tracing::info!("Printing '{}' ({} pages, force scale: {})", form.title, pages.len(), form.force_scale);
        self.provider.print(map, &pages, &selections).await
    }

    /// Submits one job per map and waits until every submitted job settles.
    ///
    /// Outcomes are read back from the job records. A map that cannot be
    /// submitted stops the batch, but jobs already running are still awaited
    /// and reported alongside the error.
    pub async fn print_all(&mut self, maps: &[MapState], form: &PrintForm, legend: bool) -> PrintBatch {
        let mut ids = Vec::with_capacity(maps.len());
        let mut handles = Vec::with_capacity(maps.len());
        let mut rejected = None;
        for (index, map) in maps.iter().enumerate() {
            match self.print(map, form, legend).await {
                Ok((id, handle)) => {
                    ids.push(id);
                    handles.push(handle);
                }
                Err(e) => {
                    tracing::error!("Map {} could not be submitted: {}", index, e);
                    rejected = Some((index, e));
                    break;
                }
            }
        }

        for joined in futures::future::join_all(handles).await {
            if let Err(e) = joined {
                tracing::error!("Print task aborted: {}", e);
            }
        }

        let queue = self.provider.queue();
        let mut jobs = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(job) = queue.get(id).await {
                jobs.push(job);
            }
        }
        PrintBatch { jobs, rejected }
    }

    fn page_for(&self, map: &MapState, form: &PrintForm, layout: &Layout) -> PrintPage {
        if form.force_scale {
            return match (map.center, map.scale) {
                (Some(center), Some(scale)) => PrintPage::with_center_scale(center, Scale::new(scale)),
                _ => PrintPage::new(),
            };
        }
        let Some(extent) = map.extent else {
            return PrintPage::new();
        };
        let scales = self
            .provider
            .capabilities()
            .map(|caps| caps.scales.clone())
            .unwrap_or_default();
        match self.fit_mode {
            Some(mode) if !scales.is_empty() => {
                let mut page = PrintPage::new();
                page.fit(Some(extent), &scales, map.units, layout, mode);
                page
            }
            _ => PrintPage::with_bbox(extent),
        }
    }

    /// Forgets every job, pending or not. Late responses for them are dropped.
    pub async fn clean(&self) {
        self.provider.queue().clear().await;
    }
}
