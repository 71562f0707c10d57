use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type NeuronId = u32;
pub type ConnectionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    Input,
    Hidden,
    Output,
}

impl LayerType {
    /// Base display color as RGB.
    pub fn color(self) -> [u8; 3] {
        match self {
            LayerType::Input => [0x10, 0xb9, 0x81],
            LayerType::Hidden => [0x3b, 0x82, 0xf6],
            LayerType::Output => [0xf5, 0x9e, 0x0b],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LayerType::Input => "input",
            LayerType::Hidden => "hidden",
            LayerType::Output => "output",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: String,
    #[serde(rename = "type")]
    pub layer_type: LayerType,
    pub name: String,
    pub position: Vector3,
    pub neurons: Vec<Neuron>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neuron {
    pub id: NeuronId,
    pub activation: f64,
    pub position: Vector3,
    pub label: String,
}

impl Neuron {
    /// Returns the neuron with its activation forced into `[0, 1]`.
    pub fn clamped(mut self) -> Self {
        self.activation = clamp_activation(self.activation);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub from: NeuronId,
    pub to: NeuronId,
    pub weight: f64,
    pub strength: f64,
}

impl Connection {
    /// Returns the connection with its weight forced into `[-1, 1]`.
    ///
    /// `strength` is left as given: a manual edit may set it apart from `|weight|`.
    pub fn clamped(mut self) -> Self {
        self.weight = clamp_weight(self.weight);
        self
    }

    pub fn touches(&self, neuron: NeuronId) -> bool {
        self.from == neuron || self.to == neuron
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub accuracy: f64,
    pub loss: f64,
    pub epoch: u64,
    pub learning_rate: f64,
    pub last_updated: DateTime<Utc>,
}

/// One complete snapshot of the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    pub name: String,
    pub layers: Vec<Layer>,
    pub connections: Vec<Connection>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NetworkStats {
    pub neuron_count: usize,
    pub connection_count: usize,
    pub mean_abs_weight: f64,
    pub mean_activation: f64,
}

impl Network {
    /// All neurons, layer by layer.
    pub fn neurons(&self) -> impl Iterator<Item = &Neuron> {
        self.layers.iter().flat_map(|l| l.neurons.iter())
    }

    pub fn find_neuron(&self, id: NeuronId) -> Option<&Neuron> {
        self.neurons().find(|n| n.id == id)
    }

    pub fn find_connection(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Connections with `id` at either end, in collection order.
    pub fn connections_touching(&self, id: NeuronId) -> Vec<&Connection> {
        self.connections.iter().filter(|c| c.touches(id)).collect()
    }

    pub fn layer_of(&self, id: NeuronId) -> Option<&Layer> {
        self.layers
            .iter()
            .find(|l| l.neurons.iter().any(|n| n.id == id))
    }

    /// Connections whose endpoints are not both present among the layers.
    ///
    /// Imported snapshots may carry these; the canvas skips them when drawing.
    pub fn dangling_connections(&self) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| self.find_neuron(c.from).is_none() || self.find_neuron(c.to).is_none())
            .collect()
    }

    /// Every activation and weight pulled into range; `strength` is left alone.
    pub fn clamped(mut self) -> Self {
        for layer in &mut self.layers {
            layer.neurons = std::mem::take(&mut layer.neurons)
                .into_iter()
                .map(Neuron::clamped)
                .collect();
        }
        self.connections = std::mem::take(&mut self.connections)
            .into_iter()
            .map(Connection::clamped)
            .collect();
        self
    }

    pub fn aggregate(&self) -> NetworkStats {
        let connection_count = self.connections.len();
        let mut neuron_count = 0;
        let mut activation_sum = 0.0;
        for neuron in self.neurons() {
            neuron_count += 1;
            activation_sum += neuron.activation;
        }
        let weight_sum: f64 = self.connections.iter().map(|c| c.weight.abs()).sum();

        NetworkStats {
            neuron_count,
            connection_count,
            mean_abs_weight: mean(weight_sum, connection_count),
            mean_activation: mean(activation_sum, neuron_count),
        }
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Clamps into `[0, 1]`; NaN maps to 0.
pub fn clamp_activation(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// Clamps into `[-1, 1]`; NaN maps to 0.
pub fn clamp_weight(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(-1.0, 1.0) }
}
