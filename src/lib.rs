//! Interactive neural network dashboard: an in-memory network model with
//! selection, editing and bulk mutation, fed by a latency-simulating mock
//! backend and drawn with egui.

pub mod app;
pub mod autoplay;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod mock;
pub mod model;
pub mod mutation;
pub mod render;
pub mod selection;
pub mod snapshot;

pub use app::DashboardApp;
pub use config::DashboardConfig;
pub use dashboard::{ConnectionStatus, Dashboard};
pub use error::{ConfigError, SnapshotError, SourceError};
pub use mock::{Details, MockApi, NetworkSource};
pub use model::{Connection, Layer, LayerType, Metadata, Network, NetworkStats, Neuron, Vector3};
pub use selection::{Edit, EditorKind, Selection, SelectionState};
