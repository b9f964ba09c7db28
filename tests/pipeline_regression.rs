//! Pipeline Regression Tests
//!
//! End-to-end runs of the engine over a sled store seeded through the JSON
//! dataset importer, with coordinates sealed by the ChaCha codec.

use crm_engine::codec::ChaChaCoordinateCodec;
use crm_engine::config::CrmConfig;
use crm_engine::physics_engine::haversine_m;
use crm_engine::{
    CoordinateCodec, CrmEngine, CrmError, Dataset, MovingAverageForecaster, SledRepository, YearMonth,
};

use std::sync::Arc;
use tempfile::TempDir;

const KEY_HEX: &str = "8f1e2d3c4b5a69788796a5b4c3d2e1f00f1e2d3c4b5a69788796a5b4c3d2e1f0";

/// Producer 1, injectors 2 (near) and 3 (far), twelve months of rates.
/// Coordinates are sealed with `codec`.
fn dataset_json(codec: &ChaChaCoordinateCodec) -> String {
    let seal = |v: f64| codec.encrypt_number(v).unwrap();
    let mut well_data = Vec::new();
    let mut id = 0;
    for (well_id, rate) in [(1, 100.0), (2, 400.0), (3, 400.0)] {
        for month in 1..=12 {
            id += 1;
            well_data.push(serde_json::json!({
                "id": id, "wellId": well_id, "year": 2023, "month": month, "rate": rate
            }));
        }
    }

    serde_json::json!({
        "wells": [
            { "id": 1, "name": "P-1", "latitude": seal(61.000), "longitude": seal(73.000),
              "wellType": "producer", "drainageRadius": 450.0, "wellRadius": 0.1 },
            { "id": 2, "name": "I-2", "latitude": seal(61.005), "longitude": seal(73.000),
              "wellType": "injector", "drainageRadius": 450.0, "wellRadius": 0.1 },
            { "id": 3, "name": "I-3", "latitude": seal(61.015), "longitude": seal(73.000),
              "wellType": "injector", "drainageRadius": 450.0, "wellRadius": 0.1 }
        ],
        "horizons": [
            { "id": 10, "wellId": 1, "name": "BV8", "porosity": 0.21, "thickness": 9.0,
              "viscosity": 1.5, "permeability": 180.0, "compressibility": 0.0006, "status": "open" },
            { "id": 11, "wellId": 1, "name": "BV9", "status": "closed" },
            { "id": 20, "wellId": 2, "name": "BV8", "porosity": 0.19, "thickness": 11.0,
              "viscosity": 1.5, "permeability": 160.0, "compressibility": 0.0006, "status": "open" },
            { "id": 30, "wellId": 3, "name": "BV8", "porosity": 0.20, "thickness": 10.0,
              "viscosity": 1.5, "permeability": 170.0, "compressibility": 0.0006, "status": "partially_open" }
        ],
        "links": [
            { "id": 100, "producerId": 1, "injectorId": 2, "status": "active" },
            { "id": 101, "producerId": 1, "injectorId": 3, "status": "active", "lastRatio": 0.0 },
            { "id": 102, "producerId": 1, "injectorId": 3, "status": "inactive" }
        ],
        "measurings": [
            { "id": 1, "linkId": 100, "date": "2023-10-01", "ratio": 0.6 },
            { "id": 2, "linkId": 100, "date": "2023-11-01", "ratio": 0.65 },
            { "id": 3, "linkId": 100, "date": "2023-12-01", "ratio": 0.7 }
        ],
        "wellData": well_data,
        "skinFactors": [
            { "id": 1, "wellId": 1, "date": "2022-06-01", "value": 4.0 },
            { "id": 2, "wellId": 1, "date": "2023-06-01", "value": 1.5 }
        ]
    })
    .to_string()
}

fn seeded_engine(dir: &TempDir, codec: ChaChaCoordinateCodec, key_hex: &str) -> CrmEngine {
    let sealing = ChaChaCoordinateCodec::from_hex(key_hex).unwrap();
    let dataset = Dataset::from_json_str(&dataset_json(&sealing)).unwrap();
    let store = SledRepository::open(dir.path().join("crm.db")).unwrap();
    let written = store.import_dataset(&dataset).unwrap();
    assert_eq!(written, dataset.record_count());

    CrmEngine::new(
        Arc::new(store),
        Arc::new(codec),
        Arc::new(MovingAverageForecaster),
        CrmConfig::default(),
    )
}

#[test]
fn pipeline_ratios_from_sealed_coordinates() {
    let dir = TempDir::new().unwrap();
    let engine = seeded_engine(&dir, ChaChaCoordinateCodec::from_hex(KEY_HEX).unwrap(), KEY_HEX);
    let report = engine.ratios(1).unwrap();

    let ids: Vec<_> = report.results.iter().map(|r| r.link_id).collect();
    assert_eq!(ids, vec![100, 101]);
    assert!(report.applied_defaults.is_empty());

    let sum: f64 = report.results.iter().map(|r| r.calculated_ratio).sum();
    assert!((sum - 1.0).abs() < 1e-9);
    // Distance ratio 1:3, so the near injector dominates
    assert!(report.results[0].calculated_ratio > 0.85);
    assert_eq!(report.results[1].injector_name, "I-3");

    let near = &report.results[0];
    assert_eq!(near.historical_data.len(), 3);
    assert!(near.forecasted_ratio.is_some());
    let forecast_sum: f64 = report.results.iter().filter_map(|r| r.forecasted_ratio).sum();
    assert!((forecast_sum - 1.0).abs() < 1e-9);
}

#[test]
fn pipeline_production_forecast() {
    let dir = TempDir::new().unwrap();
    let engine = seeded_engine(&dir, ChaChaCoordinateCodec::from_hex(KEY_HEX).unwrap(), KEY_HEX);
    let report = engine.production_at(1, YearMonth::new(2024, 4)).unwrap();

    assert_eq!(report.current_production, 100.0);
    assert_eq!(report.historical_production.len(), 12);
    assert_eq!(report.forecasted_production.len(), 4);
    assert_eq!(report.forecasted_production[0].date, YearMonth::new(2024, 1));
    for p in &report.forecasted_production {
        assert!((p.value - 100.0).abs() < 1e-9);
    }

    // Forcing = Σ ratio × 400 = 400: production moves up from 100
    assert!(report.production_rate > 100.0 && report.production_rate < 400.0);
    assert!(report.time_constant > 0.0 && report.time_constant != 1.0);
    assert_eq!(report.connectivity_factors.len(), 2);
}

#[test]
fn pipeline_wrong_key_saturates_every_link() {
    // Undecryptable coordinates give distance 0, so every raw ratio hits the clamp
    let dir = TempDir::new().unwrap();
    let wrong = ChaChaCoordinateCodec::new(&[9u8; 32]);
    let engine = seeded_engine(&dir, wrong, KEY_HEX);
    let report = engine.ratios(1).unwrap();

    let ratios: Vec<_> = report.results.iter().map(|r| r.calculated_ratio).collect();
    assert_eq!(ratios, vec![0.5, 0.5]);
}

#[test]
fn pipeline_sealed_distance_matches_plain_haversine() {
    let codec = ChaChaCoordinateCodec::from_hex(KEY_HEX).unwrap();
    let lat = codec.encrypt_number(61.005).unwrap();
    assert_eq!(codec.decrypt_to_number(&lat), Some(61.005));
    let d = haversine_m(61.0, 73.0, 61.005, 73.0);
    assert!((d - 555.97).abs() < 0.5, "got {d}");
}

#[test]
fn pipeline_unknown_producer() {
    let dir = TempDir::new().unwrap();
    let engine = seeded_engine(&dir, ChaChaCoordinateCodec::from_hex(KEY_HEX).unwrap(), KEY_HEX);
    assert!(matches!(engine.production(77), Err(CrmError::ProducerNotFound(77))));
    assert!(matches!(engine.ratios(2), Err(CrmError::NotAProducer(2))));
}
