use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, VarError> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
    move |key| map.get(key).cloned().ok_or(VarError::NotPresent)
}

#[test]
fn defaults() {
    let config = EditorConfig::default();
    assert_eq!(config.reject_policy, RejectPolicy::FallThrough);
    assert!(config.confirm_delete);
    assert!(config.container_accepts.is_empty());
}

#[test]
fn empty_lookup_yields_defaults() {
    assert_eq!(EditorConfig::from_lookup(lookup(&[])).unwrap(), EditorConfig::default());
}

#[test]
fn lookup_overrides_policy_and_confirmation() {
    let config =
        EditorConfig::from_lookup(lookup(&[(ENV_REJECT_POLICY, "cancel"), (ENV_CONFIRM_DELETE, "false")])).unwrap();
    assert_eq!(config.reject_policy, RejectPolicy::Cancel);
    assert!(!config.confirm_delete);
}

#[test]
fn policy_parsing_is_case_insensitive() {
    let config = EditorConfig::from_lookup(lookup(&[(ENV_REJECT_POLICY, " Fall_Through ")])).unwrap();
    assert_eq!(config.reject_policy, RejectPolicy::FallThrough);
}

#[test]
fn unknown_policy_is_config_error() {
    let err = EditorConfig::from_lookup(lookup(&[(ENV_REJECT_POLICY, "bounce")])).unwrap_err();
    assert!(matches!(err, EditorError::Config(msg) if msg.contains("bounce")));
}

#[test]
fn bad_bool_is_config_error() {
    let err = EditorConfig::from_lookup(lookup(&[(ENV_CONFIRM_DELETE, "maybe")])).unwrap_err();
    assert!(matches!(err, EditorError::Config(_)));
}

#[test]
fn deserialize_partial_json_fills_defaults() {
    let config: EditorConfig = serde_json::from_str(r#"{"confirm_delete": false}"#).unwrap();
    assert!(!config.confirm_delete);
    assert_eq!(config.reject_policy, RejectPolicy::FallThrough);
}

#[test]
fn deserialize_full_json() {
    let config: EditorConfig = serde_json::from_str(
        r#"{"reject_policy": "cancel", "confirm_delete": true, "container_accepts": ["text", "image"]}"#,
    )
    .unwrap();
    assert_eq!(config.reject_policy, RejectPolicy::Cancel);
    assert_eq!(config.container_accepts, vec![ElementKind::Text, ElementKind::Image]);
}
