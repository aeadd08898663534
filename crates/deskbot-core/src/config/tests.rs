use super::*;

#[test]
fn test_defaults_when_empty() {
    let cfg = parse("").unwrap();
    assert_eq!(cfg.deskbot.name, "Deskbot");
    assert_eq!(cfg.api.port, 5000);
    assert!(cfg.api.api_key.is_empty());
    assert_eq!(cfg.dispatch.unknown_intent, UnknownIntentPolicy::Reject);
    assert_eq!(cfg.dispatch.pending_ttl_secs, None);
    assert_eq!(cfg.collaborators.timeout_secs, 10);
    assert_eq!(cfg.history.max_messages_per_conversation, 0);
    assert!(cfg.audit.enabled);
}

#[test]
fn test_dispatch_section_from_toml() {
    let toml_str = r#"
        [dispatch]
        unknown_intent = "classify"
        pending_ttl_secs = 120
    "#;
    let cfg = parse(toml_str).unwrap();
    assert_eq!(cfg.dispatch.unknown_intent, UnknownIntentPolicy::Classify);
    assert_eq!(cfg.dispatch.pending_ttl_secs, Some(120));
}

#[test]
fn test_partial_collaborators_keep_defaults() {
    let toml_str = r#"
        [collaborators]
        timeout_secs = 3
        search_url = "http://search.internal:9200"
    "#;
    let cfg = parse(toml_str).unwrap();
    assert_eq!(cfg.collaborators.timeout_secs, 3);
    assert_eq!(cfg.collaborators.search_url, "http://search.internal:9200");
    assert_eq!(cfg.collaborators.directory_url, "http://localhost:8081");
}

#[test]
fn test_invalid_policy_is_config_error() {
    let err = parse("[dispatch]\nunknown_intent = \"maybe\"\n").unwrap_err();
    assert!(matches!(err, DeskbotError::Config(_)));
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let cfg = load("/nonexistent/__deskbot_test__/config.toml").unwrap();
    assert_eq!(cfg.api.host, "127.0.0.1");
}

#[test]
fn test_shellexpand_home() {
    let home = std::env::var("HOME").unwrap_or_default();
    if !home.is_empty() {
        assert_eq!(shellexpand("~/x/y"), format!("{home}/x/y"));
    }
    assert_eq!(shellexpand("/abs/path"), "/abs/path");
}
