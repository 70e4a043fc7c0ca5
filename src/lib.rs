//! Print subsystem for web map viewers.
//!
//! Snapshots a map's layers, encodes them into a MapFish-style print request,
//! submits it to a print service and tracks the resulting jobs.

pub mod capabilities;
pub mod config;
pub mod control;
pub mod encoder;
pub mod error;
pub mod events;
pub mod geometry;
pub mod layer;
pub mod page;
pub mod provider;
pub mod queue;
pub mod request;
pub mod transport;

pub use capabilities::{Capabilities, CapabilityStore, Dpi, Layout, OutputFormat, Scale};
pub use config::{load_config, PrintConfig};
pub use control::{PrintBatch, PrintControl, PrintForm};
pub use encoder::{encode_layer, encode_legend, EncodeContext, EncodedLayer, LayerEncoder};
pub use error::{ConfigError, PrintError};
pub use events::{EventBus, PrintEvent};
pub use geometry::{Bounds, LonLat, Polygon, Size, Units};
pub use layer::{CachedLayer, Layer, LayerRegistry, LayerSource, MapState, StaticLayerRegistry};
pub use page::{FitMode, PrintPage};
pub use provider::PrintProvider;
pub use queue::{JobId, JobState, PrintJob, PrintJobQueue};
pub use request::{PrintRequest, PrintRequestBuilder, Selections};
pub use transport::{HttpTransport, PrintTransport};
