//! JSON export and import of whole network snapshots.
//!
//! Imported activations and weights are clamped into range. Connections
//! pointing at neurons the document does not contain are kept, logged, and
//! skipped when drawing.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::error::SnapshotError;
use crate::model::Network;

/// Pretty-printed UTF-8 JSON of the full network.
pub fn export_snapshot(network: &Network) -> Result<Vec<u8>, SnapshotError> {
    Ok(serde_json::to_vec_pretty(network)?)
}

pub fn import_snapshot(bytes: &[u8]) -> Result<Network, SnapshotError> {
    let parsed: Network = serde_json::from_slice(bytes)?;
    let network = parsed.clone().clamped();
    if network != parsed {
        warn!("imported network {} had out-of-range values, clamped", network.id);
    }
    let dangling = network.dangling_connections().len();
    if dangling > 0 {
        warn!("imported network {} has {dangling} dangling connection(s)", network.id);
    }
    Ok(network)
}

/// `neural_network_<unix-millis>.json`
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("neural_network_{}.json", at.timestamp_millis())
}

/// Writes an export file into `dir` and returns its path.
pub fn write_export(network: &Network, dir: &Path) -> Result<PathBuf, SnapshotError> {
    let bytes = export_snapshot(network)?;
    fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(Utc::now()));
    fs::write(&path, bytes)?;
    info!("exported {} to {}", network.id, path.display());
    Ok(path)
}

pub fn read_import(path: &Path) -> Result<Network, SnapshotError> {
    let bytes = fs::read(path)?;
    let network = import_snapshot(&bytes)?;
    info!("imported {} from {}", network.id, path.display());
    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::initial_network;
    use crate::mutation;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn scratch_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("nn-dashboard-{tag}-{}", std::process::id()))
    }

    #[test]
    fn export_uses_wire_field_names() {
        let text = String::from_utf8(export_snapshot(&initial_network()).unwrap()).unwrap();
        assert!(text.contains("\"learningRate\""));
        assert!(text.contains("\"lastUpdated\""));
        assert!(text.contains("\"type\": \"input\""));
        assert!(text.contains('\n'));
    }

    #[test]
    fn non_json_is_a_parse_error() {
        let result = import_snapshot(b"definitely not json");
        assert!(matches!(result, Err(SnapshotError::Parse(_))));
    }

    #[test]
    fn wrong_shape_is_a_parse_error() {
        let result = import_snapshot(br#"{ "id": "x", "layers": 3 }"#);
        assert!(matches!(result, Err(SnapshotError::Parse(_))));
    }

    #[test]
    fn dangling_references_are_accepted() {
        let mut net = initial_network();
        net.connections[0].to = 404;
        let bytes = export_snapshot(&net).unwrap();
        let imported = import_snapshot(&bytes).unwrap();
        assert_eq!(imported.dangling_connections().len(), 1);
        assert_eq!(imported, net);
    }

    #[test]
    fn out_of_range_values_are_clamped_on_import() {
        let mut net = initial_network();
        net.layers[0].neurons[0].activation = 5.0;
        net.connections[0].weight = -3.0;
        let bytes = export_snapshot(&net).unwrap();

        let imported = import_snapshot(&bytes).unwrap();
        assert_eq!(imported.find_neuron(1).unwrap().activation, 1.0);
        let c1 = imported.find_connection("c1").unwrap();
        assert_eq!(c1.weight, -1.0);
        assert_eq!(c1.strength, 0.7);
        assert!(imported.neurons().all(|n| (0.0..=1.0).contains(&n.activation)));
    }

    #[test]
    fn file_name_carries_unix_millis() {
        let at = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(export_file_name(at), "neural_network_1700000000123.json");
    }

    #[test]
    fn write_then_read_file() {
        let dir = scratch_dir("export");
        let net = initial_network();
        let path = write_export(&net, &dir).unwrap();
        assert!(
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("neural_network_") && n.ends_with(".json"))
        );
        let back = read_import(&path).unwrap();
        let _ = fs::remove_dir_all(&dir);
        assert_eq!(back, net);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = read_import(&scratch_dir("missing").join("none.json"));
        assert!(matches!(result, Err(SnapshotError::Io(_))));
    }

    proptest! {
        #[test]
        fn export_import_round_trips(seed in any::<u64>(), factor in 0.0f64..3.0) {
            let mut rng = StdRng::seed_from_u64(seed);
            let net = mutation::randomize_activations(&initial_network(), &mut rng);
            let net = mutation::randomize_weights(&net, &mut rng);
            let net = mutation::scale_weights(&net, factor);
            let bytes = export_snapshot(&net).unwrap();
            prop_assert_eq!(import_snapshot(&bytes).unwrap(), net);
        }
    }
}
