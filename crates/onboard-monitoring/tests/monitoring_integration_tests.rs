use onboard_monitoring::{init, init_logging, MonitoringConfig};

#[test]
fn test_logging_installs_once() {
    let config = MonitoringConfig {
        json_logging: true,
        with_source_location: true,
        ..MonitoringConfig::for_service("monitoring-tests")
    };

    assert!(init(config.clone()).is_ok());
    tracing::info!(step = "after-init", "Logged through the installed subscriber");

    let second = init_logging(&config);
    assert!(second.is_err());
    assert!(second.unwrap_err().to_string().contains("global default subscriber"));
}

#[test]
fn test_config_deserializes() {
    let config: MonitoringConfig = serde_json::from_str(
        r#"{ "service_name": "svc", "log_filter": "debug", "json_logging": false, "with_source_location": true }"#,
    )
    .unwrap();

    assert_eq!(config.service_name, "svc");
    assert!(config.with_source_location);
}
