//! File-based loading tests wired through the core's fingerprint store

use car_adapt_config::{ConfigError, StaticConfig};
use car_adapt_core::{
    resolve_vehicle, EcuAddress, EcuKind, FingerprintStore, VehicleSignature,
};
use std::collections::HashMap;
use std::io::Write;

const TABLES_JSON: &str = r#"{
    "vehicles": {
        "SUBARU ASCENT LIMITED 2019": {
            "dbc": "subaru_global_2017_generated",
            "fingerprints": [{"2": 8, "1785": 5, "1788": 8}],
            "firmware": [
                {"ecu": "esp", "addr": 1968, "versions": ["a520190200"]},
                {"ecu": "eps", "addr": 1862, "versions": ["85c0d000"]},
                {"ecu": "engine", "addr": 2016, "versions": ["bb2ca07407", "f182bb2ca07487"]}
            ],
            "steer": {
                "max_torque": 2047,
                "delta_up": 50,
                "delta_down": 70,
                "driver_allowance": 60,
                "driver_multiplier": 10,
                "driver_factor": 1,
                "steer_step": 2
            },
            "steer_threshold": 80,
            "excluded_from_fingerprinting": true
        },
        "SUBARU IMPREZA LIMITED 2019": {
            "dbc": "subaru_global_2017_generated",
            "fingerprints": [
                {"2": 8, "1786": 5, "1788": 8},
                {"2": 8, "372": 8, "1786": 5, "1788": 8}
            ],
            "firmware": [
                {"ecu": "engine", "addr": 2016, "versions": ["aa61667307"]}
            ],
            "steer": {
                "max_torque": 2047,
                "delta_up": 50,
                "delta_down": 70,
                "driver_allowance": 60,
                "driver_multiplier": 10,
                "driver_factor": 1,
                "steer_step": 2
            },
            "steer_threshold": 80
        }
    }
}"#;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn load_json_file_and_build_store() {
    init_logs();
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(TABLES_JSON.as_bytes()).unwrap();

    let config = StaticConfig::load(file.path()).unwrap();
    assert_eq!(config.num_vehicles(), 2);

    let store = FingerprintStore::from_adapter(&config);
    let ascent = VehicleSignature::from("SUBARU ASCENT LIMITED 2019");
    assert!(store.is_excluded(&ascent));

    // Firmware lookup resolves the excluded vehicle
    let engine = EcuAddress::new(EcuKind::Engine, 0x7E0);
    let observed: HashMap<EcuAddress, Vec<u8>> =
        [(engine, b"\xbb\x2c\xa0\x74\x07".to_vec())].into_iter().collect();
    let matched = store.lookup_by_firmware(&observed);
    assert_eq!(matched.len(), 1);
    assert!(matched.contains(&ascent));

    // Session data round-trips through the adapter
    let vehicle = resolve_vehicle(&config, &ascent).unwrap();
    assert_eq!(vehicle.steer_params.max_torque, 2047);
    assert_eq!(vehicle.dbc_name.as_deref(), Some("subaru_global_2017_generated"));
    assert_eq!(vehicle.steer_threshold, Some(80));
}

#[test]
fn load_toml_file() {
    let toml_content = r#"
        [vehicles."SUBARU IMPREZA LIMITED 2019"]
        dbc = "subaru_global_2017_generated"
        steer_threshold = 80

        [[vehicles."SUBARU IMPREZA LIMITED 2019".fingerprints]]
        "2" = 8
        "1786" = 5

        [vehicles."SUBARU IMPREZA LIMITED 2019".steer]
        max_torque = 2047
        delta_up = 50
        delta_down = 70
        driver_allowance = 60
        driver_multiplier = 10
        driver_factor = 1
        steer_step = 2
    "#;

    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(toml_content.as_bytes()).unwrap();

    let config = StaticConfig::load(file.path()).unwrap();
    let impreza = VehicleSignature::from("SUBARU IMPREZA LIMITED 2019");
    assert_eq!(config.num_vehicles(), 1);

    let store = FingerprintStore::from_adapter(&config);
    let observed: HashMap<u32, u8> = [(2, 8), (1786, 5)].into_iter().collect();
    assert!(store.lookup_candidates(&observed).contains(&impreza));
}

#[test]
fn missing_file_reports_io_error() {
    let err = StaticConfig::load(std::path::Path::new("/no/such/tables.json")).unwrap_err();
    assert!(err
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<ConfigError>(), Some(ConfigError::Io(_)))));
}

#[test]
fn unsupported_extension_is_rejected() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(b"vehicles: {}").unwrap();
    assert!(StaticConfig::load(file.path()).is_err());
}
