use std::time::Duration;

use offgrid::config::ConfigBuildError;
use offgrid_configuration::{Config, ConfigError, Interceptor, Page, from_yaml};
use offgrid_core::CacheKind;
use offgrid_page::ResourceType;
use pretty_assertions::assert_eq;

#[test]
fn test_minimal_config_uses_defaults() {
    let yaml = r#"
origin: "https://devcommunity.cn"
"#;

    let config: Config = serde_saphyr::from_str(yaml).expect("failed to deserialize");
    assert_eq!(config.interceptor, Interceptor::default());
    assert_eq!(config.page, Page::default());

    let runtime = config.into_runtime().expect("defaults are valid");
    assert_eq!(
        runtime.interceptor.cache_names.get(CacheKind::Static).as_str(),
        "devcommunity-static-v1"
    );
    assert_eq!(runtime.interceptor.manifest.len(), 10);
    assert_eq!(runtime.page.memory_ttl, Duration::from_secs(300));
    assert_eq!(runtime.page.persist_ttl, Duration::from_secs(86_400));
    assert_eq!(runtime.page.offline_ttl_multiplier, 7);
    assert_eq!(runtime.page.backup_ttl_multiplier, 2);
}

#[test]
fn test_full_config_deserialize() {
    let yaml = r#"
origin: "https://devcommunity.cn"
interceptor:
  site: meetups
  version: v3
  manifest: ["/", "/en/", "/offline.html"]
  static_extensions: [".css", "js"]
  dynamic_patterns: ['^/events/\d+$']
  trim:
    max_entries: 20
    keep_entries: 10
  notification:
    icon: /images/icon-192.png
    badge: /images/badge.png
page:
  memory_ttl: 10m
  sweep_interval: 30s
  namespace: meetups_
  persist_ttl: 12h
  critical_resources:
    - url: /styles/main.css
      type: style
    - url: /images/logo.png
      type: image
  popular_cities: [chengdu]
  scroll_debounce: 250ms
  proximity_px: 400
  probe_timeout: 2s
"#;

    let runtime = from_yaml(yaml).expect("valid configuration");

    let interceptor = runtime.interceptor;
    assert_eq!(
        interceptor.cache_names.get(CacheKind::Image).as_str(),
        "meetups-image-v3"
    );
    assert_eq!(interceptor.manifest, vec!["/", "/en/", "/offline.html"]);
    assert_eq!(interceptor.static_extensions, vec!["css", "js"]);
    assert!(interceptor.dynamic_patterns[0].is_match("/events/42"));
    assert_eq!(interceptor.trim.max_entries, 20);
    assert_eq!(interceptor.notification.badge, "/images/badge.png");

    let page = runtime.page;
    assert_eq!(page.memory_ttl, Duration::from_secs(600));
    assert_eq!(page.sweep_interval, Duration::from_secs(30));
    assert_eq!(page.namespace, "meetups_");
    assert_eq!(page.persist_ttl, Duration::from_secs(12 * 3600));
    assert_eq!(
        page.critical_resources,
        vec![
            ("/styles/main.css".to_owned(), ResourceType::Style),
            ("/images/logo.png".to_owned(), ResourceType::Image),
        ]
    );
    assert_eq!(page.popular_cities, vec!["chengdu"]);
    assert_eq!(page.scroll_debounce, Duration::from_millis(250));
    assert_eq!(page.proximity_px, 400.0);
    assert_eq!(page.probe_timeout, Duration::from_secs(2));
}

#[test]
fn test_invalid_pattern_is_rejected() {
    let yaml = r#"
origin: "https://devcommunity.cn"
interceptor:
  dynamic_patterns: ["^/cities/(unclosed$"]
"#;

    let error = from_yaml(yaml).expect_err("pattern must not compile");
    assert!(matches!(
        error,
        ConfigError::Interceptor(ConfigBuildError::Pattern { .. })
    ));
}

#[test]
fn test_inverted_trim_is_rejected() {
    let yaml = r#"
origin: "https://devcommunity.cn"
interceptor:
  trim:
    max_entries: 10
    keep_entries: 50
"#;

    let error = from_yaml(yaml).expect_err("trim keeps more than it allows");
    assert!(matches!(
        error,
        ConfigError::Interceptor(ConfigBuildError::Trim { max: 10, keep: 50 })
    ));
}

#[test]
fn test_relative_origin_is_rejected() {
    let error = from_yaml("origin: /cities/\n").expect_err("origin must be absolute");
    assert!(matches!(error, ConfigError::Origin(_)));
}

#[test]
fn test_unknown_field_is_rejected() {
    let yaml = r#"
origin: "https://devcommunity.cn"
page:
  memory_tll: 5m
"#;

    assert!(matches!(from_yaml(yaml), Err(ConfigError::Yaml(_))));
}

#[test]
fn test_page_validation() {
    let yaml = r#"
origin: "https://devcommunity.cn"
page:
  offline_ttl_multiplier: 0
"#;

    match from_yaml(yaml) {
        Err(ConfigError::Page { field, .. }) => assert_eq!(field, "offline_ttl_multiplier"),
        other => panic!("expected page error, got {other:?}"),
    }

    let yaml = r#"
origin: "https://devcommunity.cn"
page:
  critical_resources:
    - url: images/logo.png
      type: image
"#;

    match from_yaml(yaml) {
        Err(ConfigError::Page { field, .. }) => assert_eq!(field, "critical_resources"),
        other => panic!("expected page error, got {other:?}"),
    }
}
