use std::collections::HashMap;

use super::*;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn empty_lookup_yields_defaults() {
    let cfg = MapConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(cfg, MapConfig::default());
    assert_eq!(cfg.cluster_distance_px, DEFAULT_CLUSTER_DISTANCE_PX);
    assert_eq!(cfg.cluster_radius_px, DEFAULT_CLUSTER_RADIUS_PX);
    assert_eq!(cfg.hit_tolerance_px, DEFAULT_HIT_TOLERANCE_PX);
    assert_eq!(cfg.render_buffer_px, DEFAULT_RENDER_BUFFER_PX);
}

#[test]
fn overrides_are_parsed() {
    let cfg = MapConfig::from_lookup(lookup(&[
        ("MAP_CLUSTER_DISTANCE_PX", "40"),
        ("MAP_CLUSTER_RADIUS_PX", " 6.5 "),
        ("MAP_HIT_TOLERANCE_PX", "2"),
        ("MAP_RENDER_BUFFER_PX", "0"),
    ]))
    .unwrap();
    assert_eq!(cfg.cluster_distance_px, 40.0);
    assert_eq!(cfg.cluster_radius_px, 6.5);
    assert_eq!(cfg.hit_tolerance_px, 2.0);
    assert_eq!(cfg.render_buffer_px, 0.0);
}

#[test]
fn unparsable_value_is_rejected() {
    let err = MapConfig::from_lookup(lookup(&[("MAP_CLUSTER_DISTANCE_PX", "twenty")])).unwrap_err();
    assert_eq!(err, ConfigError::Invalid { var: "MAP_CLUSTER_DISTANCE_PX", value: "twenty".into() });
    assert!(err.to_string().contains("MAP_CLUSTER_DISTANCE_PX"));
}

#[test]
fn negative_and_non_finite_values_are_rejected() {
    assert!(MapConfig::from_lookup(lookup(&[("MAP_HIT_TOLERANCE_PX", "-1")])).is_err());
    assert!(MapConfig::from_lookup(lookup(&[("MAP_RENDER_BUFFER_PX", "inf")])).is_err());
    assert!(MapConfig::from_lookup(lookup(&[("MAP_CLUSTER_RADIUS_PX", "NaN")])).is_err());
}

#[test]
fn from_env_reads_process_environment() {
    // Only this test touches MAP_* variables.
    unsafe {
        std::env::set_var("MAP_CLUSTER_DISTANCE_PX", "35");
        std::env::remove_var("MAP_CLUSTER_RADIUS_PX");
        std::env::remove_var("MAP_HIT_TOLERANCE_PX");
        std::env::remove_var("MAP_RENDER_BUFFER_PX");
    }
    let cfg = MapConfig::from_env().unwrap();
    assert_eq!(cfg.cluster_distance_px, 35.0);
    assert_eq!(cfg.cluster_radius_px, DEFAULT_CLUSTER_RADIUS_PX);
    unsafe { std::env::remove_var("MAP_CLUSTER_DISTANCE_PX") };
}

#[test]
fn serde_fills_missing_fields_with_defaults() {
    let cfg: MapConfig = serde_json::from_str(r#"{"cluster_distance_px": 50.0}"#).unwrap();
    assert_eq!(cfg.cluster_distance_px, 50.0);
    assert_eq!(cfg.render_buffer_px, DEFAULT_RENDER_BUFFER_PX);
}
