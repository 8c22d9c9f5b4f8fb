//! Configuration files and written artifacts.

use std::fs;
use std::io::Write;

use tempfile::{NamedTempFile, TempDir};

use qlab_adapter_ibm::IbmCredentials;
use qlab_demos::artifacts::{write_bloch, write_circuit, write_histogram};
use qlab_demos::circuits::{TeleportInput, teleport_circuit};
use qlab_demos::postprocess::BlochVector;
use qlab_demos::{DemoConfig, DemoError};
use qlab_hal::Counts;
use qlab_ir::DrawOptions;

fn yaml_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_config_file_overrides_defaults() {
    let file = yaml_file(
        r#"
qrng_shots: 1024
output_dir: /tmp/qlab-out
seed: 42
ibm:
  instance: "crn:v1:bluemix:public:quantum-computing:us-east:a/123::"
  optimization_level: 2
noise:
  t1_mean: 80000.0
"#,
    );
    let config = DemoConfig::from_file(file.path()).unwrap();

    assert_eq!(config.qrng_shots, 1024);
    assert_eq!(config.teleport_shots, 100_000);
    assert_eq!(config.session_max_minutes, 25);
    assert_eq!(config.output_dir.to_str(), Some("/tmp/qlab-out"));
    assert_eq!(config.seed, Some(42));
    assert_eq!(config.ibm.optimization_level, 2);
    assert!((config.noise.t1_mean - 80e3).abs() < f64::EPSILON);
    assert!((config.noise.t2_mean - 70e3).abs() < f64::EPSILON);

    let creds = config.fill_credentials(IbmCredentials::default());
    assert_eq!(creds.instance.as_deref(), config.ibm.instance.as_deref());
    assert!(creds.api_key.is_none());
}

#[test]
fn test_config_file_rejects_bad_values() {
    for contents in [
        "qrng_shots: 0\n",
        "session_max_minutes: 0\n",
        "ibm:\n  optimization_level: 7\n",
        "noise:\n  t1_mean: -1.0\n",
        "qrng_shots: [not, a, number]\n",
    ] {
        let file = yaml_file(contents);
        let err = DemoConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, DemoError::Config(_)), "{contents:?}: {err}");
    }
}

#[test]
fn test_missing_config_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let err = DemoConfig::from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn test_teleport_artifacts_are_written() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("nested");

    let circuit = teleport_circuit(TeleportInput { alpha: 0.6, beta: 0.8 }).unwrap();
    let counts = Counts::from_pairs([("000", 30), ("111", 70)]);
    let bloch = BlochVector { x: 0.96, y: 0.0, z: -0.28 };

    let bloch_path = write_bloch(&out, &bloch, "Bloch Vector Plot").unwrap();
    let histogram_path = write_histogram(&out, &counts, "Histogram Plot").unwrap();
    let circuit_path = write_circuit(&out, "circuit_diagram", &circuit, DrawOptions::default()).unwrap();

    assert!(fs::read_to_string(&bloch_path).unwrap().contains("(0.9600, 0.0000, -0.2800)"));
    assert!(fs::read_to_string(&histogram_path).unwrap().starts_with("Histogram Plot"));
    assert!(fs::read_to_string(&circuit_path).unwrap().contains("c_bit"));

    let histogram: Counts =
        serde_json::from_str(&fs::read_to_string(out.join("histogram.json")).unwrap()).unwrap();
    assert_eq!(histogram, counts);

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("circuit_diagram.json")).unwrap()).unwrap();
    assert_eq!(summary["num_qubits"], 3);
    assert_eq!(summary["num_clbits"], 3);
    assert_eq!(summary["name"], "teleport");

    let vector: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("bloch_plot.json")).unwrap()).unwrap();
    assert_eq!(vector["x"], 0.96);
}
