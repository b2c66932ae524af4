use std::collections::HashMap;

use super::ExchangeOptions;
use crate::engine::errors::ExchangeError;

fn options() -> ExchangeOptions {
    [
        ("Enabled", "TRUE"),
        ("batchSize", " 250 "),
        ("Threshold", "0.75"),
        ("huge", "9000000000"),
        ("mode", "fast"),
    ]
    .into_iter()
    .collect()
}

#[test]
fn keys_are_case_insensitive() {
    let options = options();
    assert!(options.contains("ENABLED"));
    assert!(options.contains("batchsize"));
    assert_eq!(options.get("MODE"), Some("fast"));
    assert_eq!(options.get("missing"), None);
    assert_eq!(options.len(), 5);
}

#[test]
fn typed_getters_parse_or_default() {
    let options = options();
    assert!(options.get_bool("enabled", false).unwrap());
    assert!(!options.get_bool("absent", false).unwrap());
    assert_eq!(options.get_int("BatchSize", 1).unwrap(), 250);
    assert_eq!(options.get_long("huge", 0).unwrap(), 9_000_000_000);
    assert_eq!(options.get_double("threshold", 0.0).unwrap(), 0.75);
    assert_eq!(options.get_int("absent", 7).unwrap(), 7);
}

#[test]
fn unparsable_values_are_config_errors() {
    let options = options();
    assert!(matches!(
        options.get_bool("mode", false).unwrap_err(),
        ExchangeError::Config(_)
    ));
    assert!(matches!(
        options.get_int("huge", 0).unwrap_err(),
        ExchangeError::Config(_)
    ));
    assert!(options.get_double("mode", 0.0).is_err());
}

#[test]
fn builds_from_hash_map() {
    let mut map = HashMap::new();
    map.insert("Key".to_string(), "value".to_string());
    let options = ExchangeOptions::from(map);
    assert_eq!(options.get("key"), Some("value"));
    assert_eq!(options.iter().collect::<Vec<_>>(), vec![("key", "value")]);
}
