use gcp_sizer::core::geometry::recommend;
use gcp_sizer::domain::model::GeometryInput;
use gcp_sizer::domain::ports::KeyValueStore;
use gcp_sizer::{FileStore, GeometryModel, MemoryStore};
use tempfile::TempDir;

fn input(current: f64, utilization: f64, desired: f64, spread: f64) -> GeometryInput {
    GeometryInput {
        current,
        utilization,
        utilization_desired: desired,
        spread_percent: spread,
        ..GeometryInput::new("vCPU", "cores")
    }
}

#[test]
fn test_recommendation_with_spread() {
    let recommendation = recommend(&input(10.0, 80.0, 100.0, 20.0)).unwrap();

    assert_eq!(recommendation.recommended, 8.0);
    assert_eq!(recommendation.min_recommended, 6.0);
    assert_eq!(recommendation.max_recommended, 10.0);
    assert_eq!(recommendation.min_utilization_actual, Some(60.0));
    assert_eq!(recommendation.max_utilization_actual, Some(100.0));
}

#[test]
fn test_recommendation_properties() {
    for current in [0.0, 1.0, 7.0, 16.0, 96.0] {
        for utilization in [0.0, 13.0, 50.0, 99.0, 100.0] {
            for desired in [10.0, 65.0, 100.0] {
                for spread in [0.0, 10.0, 35.0, 100.0] {
                    let r = recommend(&input(current, utilization, desired, spread)).unwrap();
                    assert_eq!(r.recommended, (current * utilization / desired).ceil());
                    let up = r.max_recommended - r.recommended;
                    let down = r.recommended - r.min_recommended;
                    assert!((up - down).abs() <= 1.0);
                }
            }
        }
    }
}

#[test]
fn test_zero_desired_utilization_keeps_previous_recommendation() {
    let mut model = GeometryModel::load("Memory", "GB", MemoryStore::new());
    model.set_current(64.0);
    model.set_utilization(50.0);
    model.set_utilization_desired(80.0);
    assert_eq!(model.recommendation().recommended, 40.0);

    model.set_utilization_desired(0.0);
    assert_eq!(model.recommendation().recommended, 40.0);
}

#[test]
fn test_state_survives_reload_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("state").join("geometry.json");

    {
        let store = FileStore::open(&path).unwrap();
        let mut model = GeometryModel::load("Persistent Disk", "GB", store);
        model.set_current(500.0);
        model.set_utilization(90.0);
        model.set_utilization_desired(75.0);
        model.set_spread_percent(10.0);
        model.set_collapsed(true);
        assert_eq!(model.slug(), "persistentdisk");
    }

    let store = FileStore::open(&path).unwrap();
    assert_eq!(store.get("persistentdisk-current").as_deref(), Some("500"));
    assert_eq!(store.get("persistentdisk-isOpen").as_deref(), Some("false"));

    let model = GeometryModel::load("Persistent Disk", "GB", store);
    assert_eq!(model.input().current, 500.0);
    assert_eq!(model.input().spread_percent, 10.0);
    assert!(model.input().collapsed);
    assert_eq!(model.recommendation().recommended, 600.0);
    assert_eq!(model.recommendation().min_recommended, 540.0);
    assert_eq!(model.recommendation().max_recommended, 660.0);
}

#[test]
fn test_zero_fields_are_not_persisted() {
    let mut model = GeometryModel::load("vCPU", "cores", MemoryStore::new());
    model.set_current(4.0);

    let store = model.store();
    assert_eq!(store.get("vcpu-current").as_deref(), Some("4"));
    assert!(store.get("vcpu-utilization").is_none());
    assert!(store.get("vcpu-spread").is_none());
    assert_eq!(store.get("vcpu-isOpen").as_deref(), Some("true"));
}
