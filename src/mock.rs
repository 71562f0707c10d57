use std::future::{self, Future};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::sleep;

use crate::config::DashboardConfig;
use crate::error::SourceError;
use crate::model::{
    Connection, ConnectionId, Layer, LayerType, Metadata, Network, Neuron, NeuronId, Vector3,
};
use crate::mutation;

pub const DEFAULT_NETWORK_ID: &str = "network_001";
pub const DEFAULT_NETWORK_NAME: &str = "AEIF Neural Network";

/// The two-call contract a backend has to satisfy, plus optional detail
/// lookups.
///
/// Futures are `Send` so requests can run on a multi-threaded runtime.
pub trait NetworkSource: Send + Sync + 'static {
    fn fetch_network(&self, id: &str) -> impl Future<Output = Result<Network, SourceError>> + Send;

    fn step_network(&self, id: &str) -> impl Future<Output = Result<Network, SourceError>> + Send;

    /// Sources without per-neuron readouts report `None`.
    fn neuron_details(
        &self,
        _id: NeuronId,
    ) -> impl Future<Output = Result<Option<NeuronDetails>, SourceError>> + Send {
        future::ready(Ok(None))
    }

    fn connection_details(
        &self,
        _id: &str,
    ) -> impl Future<Output = Result<Option<ConnectionDetails>, SourceError>> + Send {
        future::ready(Ok(None))
    }
}

// (id, activation, y, label) per layer; x comes from the layer position
type NeuronRow = (NeuronId, f64, f64, &'static str);

const INPUT: [NeuronRow; 4] = [
    (1, 0.8, 2.0, "Input 1"),
    (2, 0.6, 0.5, "Input 2"),
    (3, 0.9, -1.0, "Input 3"),
    (4, 0.3, -2.5, "Input 4"),
];

const HIDDEN_1: [NeuronRow; 5] = [
    (5, 0.7, 3.0, "Hidden 1.1"),
    (6, 0.4, 1.5, "Hidden 1.2"),
    (7, 0.85, 0.0, "Hidden 1.3"),
    (8, 0.2, -1.5, "Hidden 1.4"),
    (9, 0.65, -3.0, "Hidden 1.5"),
];

const HIDDEN_2: [NeuronRow; 4] = [
    (10, 0.55, 2.0, "Hidden 2.1"),
    (11, 0.78, 0.5, "Hidden 2.2"),
    (12, 0.35, -1.0, "Hidden 2.3"),
    (13, 0.92, -2.5, "Hidden 2.4"),
];

const OUTPUT: [NeuronRow; 2] = [(14, 0.82, 1.0, "Output 1"), (15, 0.15, -1.0, "Output 2")];

// c1..c48 in order
#[rustfmt::skip]
const CONNECTIONS: [(NeuronId, NeuronId, f64); 48] = [
    (1, 5, 0.7), (1, 6, -0.3), (1, 7, 0.8), (1, 8, 0.2), (1, 9, -0.5),
    (2, 5, 0.4), (2, 6, 0.9), (2, 7, -0.2), (2, 8, 0.6), (2, 9, 0.1),
    (3, 5, -0.4), (3, 6, 0.7), (3, 7, 0.5), (3, 8, -0.8), (3, 9, 0.3),
    (4, 5, 0.6), (4, 6, -0.1), (4, 7, 0.4), (4, 8, 0.9), (4, 9, -0.7),
    (5, 10, 0.5), (5, 11, -0.3), (5, 12, 0.8), (5, 13, 0.2),
    (6, 10, 0.7), (6, 11, 0.4), (6, 12, -0.6), (6, 13, 0.9),
    (7, 10, -0.2), (7, 11, 0.8), (7, 12, 0.3), (7, 13, -0.5),
    (8, 10, 0.6), (8, 11, -0.4), (8, 12, 0.7), (8, 13, 0.1),
    (9, 10, -0.7), (9, 11, 0.5), (9, 12, -0.2), (9, 13, 0.8),
    (10, 14, 0.7), (10, 15, -0.4), (11, 14, 0.8), (11, 15, 0.2),
    (12, 14, -0.3), (12, 15, 0.9), (13, 14, 0.6), (13, 15, -0.7),
];

fn layer(id: &str, layer_type: LayerType, name: &str, x: f64, rows: &[NeuronRow]) -> Layer {
    Layer {
        id: id.to_string(),
        layer_type,
        name: name.to_string(),
        position: Vector3::new(x, 0.0, 0.0),
        neurons: rows
            .iter()
            .map(|&(id, activation, y, label)| Neuron {
                id,
                activation,
                position: Vector3::new(x, y, 0.0),
                label: label.to_string(),
            })
            .collect(),
    }
}

/// The fixed 4/5/4/2 network with its hardcoded values, stamped with `now`.
pub fn initial_network_at(now: DateTime<Utc>) -> Network {
    let layers = vec![
        layer("input", LayerType::Input, "Input Layer", -4.0, &INPUT),
        layer("hidden1", LayerType::Hidden, "Hidden Layer 1", -1.0, &HIDDEN_1),
        layer("hidden2", LayerType::Hidden, "Hidden Layer 2", 2.0, &HIDDEN_2),
        layer("output", LayerType::Output, "Output Layer", 5.0, &OUTPUT),
    ];
    let connections = CONNECTIONS
        .iter()
        .enumerate()
        .map(|(i, &(from, to, weight))| Connection {
            id: format!("c{}", i + 1),
            from,
            to,
            weight,
            strength: weight.abs(),
        })
        .collect();

    Network {
        id: DEFAULT_NETWORK_ID.to_string(),
        name: DEFAULT_NETWORK_NAME.to_string(),
        layers,
        connections,
        metadata: Metadata {
            accuracy: 0.89,
            loss: 0.15,
            epoch: 150,
            learning_rate: 0.001,
            last_updated: now,
        },
    }
}

pub fn initial_network() -> Network {
    initial_network_at(Utc::now())
}

#[derive(Debug, Clone, PartialEq)]
pub struct NeuronDetails {
    pub neuron: Neuron,
    pub bias: f64,
    pub gradient: f64,
    pub last_activation: f64,
    pub activation_function: String,
    pub input_sum: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionDetails {
    pub connection: Connection,
    pub gradient: f64,
    pub last_update: f64,
    pub learning_rate: f64,
    pub momentum: f64,
}

/// Whatever detail lookup last came back.
#[derive(Debug, Clone, PartialEq)]
pub enum Details {
    Neuron(NeuronDetails),
    Connection(ConnectionDetails),
}

impl Details {
    pub fn neuron_id(&self) -> Option<NeuronId> {
        match self {
            Details::Neuron(d) => Some(d.neuron.id),
            Details::Connection(_) => None,
        }
    }

    pub fn connection_id(&self) -> Option<&ConnectionId> {
        match self {
            Details::Neuron(_) => None,
            Details::Connection(d) => Some(&d.connection.id),
        }
    }
}

/// In-memory stand-in for a network backend with artificial latency.
#[derive(Debug)]
pub struct MockApi {
    fetch_delay: Duration,
    step_delay: Duration,
    detail_delay: Duration,
    rng: Mutex<StdRng>,
}

impl MockApi {
    pub fn new(config: &DashboardConfig) -> Self {
        Self::with_delays(config.fetch_delay(), config.step_delay(), config.detail_delay())
    }

    pub fn with_delays(fetch_delay: Duration, step_delay: Duration, detail_delay: Duration) -> Self {
        Self {
            fetch_delay,
            step_delay,
            detail_delay,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Replaces the random source with a seeded one.
    pub fn seeded(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }
}

impl NetworkSource for MockApi {
    async fn fetch_network(&self, id: &str) -> Result<Network, SourceError> {
        sleep(self.fetch_delay).await;
        debug!("mock fetch resolved for {id}");
        Ok(initial_network())
    }

    async fn step_network(&self, id: &str) -> Result<Network, SourceError> {
        sleep(self.step_delay).await;
        debug!("mock step resolved for {id}");
        let network = self.with_rng(|rng| mutation::randomize_activations(&initial_network(), rng));
        Ok(network)
    }

    async fn neuron_details(&self, id: NeuronId) -> Result<Option<NeuronDetails>, SourceError> {
        sleep(self.detail_delay).await;
        let network = initial_network();
        let Some(neuron) = network.find_neuron(id).cloned() else {
            return Ok(None);
        };
        Ok(Some(self.with_rng(|rng| NeuronDetails {
            bias: rng.gen_range(-1.0..1.0),
            gradient: rng.gen_range(-0.05..0.05),
            last_activation: neuron.activation,
            activation_function: "ReLU".to_string(),
            input_sum: rng.gen_range(-1.0..1.0),
            neuron,
        })))
    }

    async fn connection_details(&self, id: &str) -> Result<Option<ConnectionDetails>, SourceError> {
        sleep(self.detail_delay).await;
        let network = initial_network();
        let Some(connection) = network.find_connection(id).cloned() else {
            return Ok(None);
        };
        Ok(Some(self.with_rng(|rng| ConnectionDetails {
            connection,
            gradient: rng.gen_range(-0.005..0.005),
            last_update: rng.gen_range(-0.0005..0.0005),
            learning_rate: 0.001,
            momentum: rng.gen_range(0.0..0.1),
        })))
    }
}
