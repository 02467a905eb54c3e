//! Unit tests for configuration loading

use remedia::config::Config;

#[test]
fn defaults_are_sensible() {
    let config = Config::default();
    assert!(config.lms.base_url.starts_with("https://"));
    assert_eq!(config.lms.per_page, 100);
    assert_eq!(config.retry.max_retries, 3);
    assert_eq!(config.sweep.interval_secs, 3600);
    assert!(config.sweep.courses.is_empty());
    assert!(config.store.path.is_none());
    assert!(config.lms.token.is_none());
}

#[test]
fn parses_full_toml() {
    let toml = r#"
        [lms]
        base_url = "https://lms.school.edu/api/v1"
        token = "secret"
        per_page = 50

        [topics]
        model = "gpt-4o"
        api_key = "topic-key"

        [videos]
        api_key = "video-key"

        [retry]
        max_retries = 5

        [sweep]
        interval_secs = 600

        [[sweep.courses]]
        id = "1042"
        name = "Intro to Algebra"

        [[sweep.courses]]
        id = "2077"
        token = "per-course-token"

        [store]
        path = "/var/lib/remedia/store.json"
    "#;
    let config: Config = toml::from_str(toml).unwrap();

    assert_eq!(config.lms.base_url, "https://lms.school.edu/api/v1");
    assert_eq!(config.lms.per_page, 50);
    // Unspecified fields keep their defaults.
    assert_eq!(config.lms.timeout_secs, 30);
    assert_eq!(config.topics.model, "gpt-4o");
    assert_eq!(config.retry.max_retries, 5);
    assert_eq!(config.retry.base_delay_ms, 1000);
    assert_eq!(config.sweep.courses.len(), 2);
    assert_eq!(config.sweep.courses[0].name.as_deref(), Some("Intro to Algebra"));
    assert_eq!(config.sweep.courses[1].token.as_deref(), Some("per-course-token"));
    assert_eq!(
        config.store.path.as_deref(),
        Some(std::path::Path::new("/var/lib/remedia/store.json"))
    );
}

#[test]
fn empty_toml_uses_defaults() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config.lms.per_page, 100);
    assert_eq!(config.videos.max_results, 1);
}
