//! Edits and bulk operations over a network snapshot.
//!
//! Every function takes the current snapshot by reference and returns the
//! replacement; the input is never modified.

use chrono::Utc;
use rand::Rng;

use crate::mock;
use crate::model::{Connection, Network, Neuron, clamp_activation, clamp_weight};

/// Replaces the neuron with the same id. Unknown ids leave the network as is.
pub fn apply_neuron_edit(network: &Network, edited: &Neuron) -> Network {
    let mut next = network.clone();
    let slot = next
        .layers
        .iter_mut()
        .flat_map(|l| l.neurons.iter_mut())
        .find(|n| n.id == edited.id);
    if let Some(slot) = slot {
        *slot = edited.clone().clamped();
    }
    next
}

/// Replaces the connection with the same id. Unknown ids leave the network as is.
pub fn apply_connection_edit(network: &Network, edited: &Connection) -> Network {
    let mut next = network.clone();
    if let Some(slot) = next.connections.iter_mut().find(|c| c.id == edited.id) {
        *slot = edited.clone().clamped();
    }
    next
}

pub fn randomize_activations<R: Rng + ?Sized>(network: &Network, rng: &mut R) -> Network {
    map_neurons(network, |n| n.activation = rng.gen_range(0.0..=1.0))
}

pub fn randomize_weights<R: Rng + ?Sized>(network: &Network, rng: &mut R) -> Network {
    map_connections(network, |c| set_weight(c, rng.gen_range(-1.0..=1.0)))
}

pub fn scale_activations(network: &Network, factor: f64) -> Network {
    map_neurons(network, |n| n.activation = clamp_activation(n.activation * factor))
}

pub fn scale_weights(network: &Network, factor: f64) -> Network {
    map_connections(network, |c| set_weight(c, c.weight * factor))
}

/// Back to the fixed initial values, keeping the network's identity.
pub fn reset(network: &Network) -> Network {
    let mut next = mock::initial_network_at(Utc::now());
    next.id = network.id.clone();
    next.name = network.name.clone();
    next
}

fn set_weight(connection: &mut Connection, weight: f64) {
    connection.weight = clamp_weight(weight);
    connection.strength = connection.weight.abs();
}

fn map_neurons(network: &Network, mut f: impl FnMut(&mut Neuron)) -> Network {
    let mut next = network.clone();
    for neuron in next.layers.iter_mut().flat_map(|l| l.neurons.iter_mut()) {
        f(neuron);
    }
    next
}

fn map_connections(network: &Network, mut f: impl FnMut(&mut Connection)) -> Network {
    let mut next = network.clone();
    next.connections.iter_mut().for_each(|c| f(c));
    next
}
