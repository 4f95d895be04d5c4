use std::path::PathBuf;

use reelgate::config::{
    AppConfig, CliArgs, DEFAULT_CAPACITY, ProximityMargin, SchedulerConfig,
};

fn base_cli() -> CliArgs {
    CliArgs {
        config: PathBuf::from("scheduler.toml"),
        scenario: PathBuf::from("scenario.toml"),
        capacity: None,
        threshold: None,
        margin: None,
        degraded: false,
    }
}

#[test]
fn defaults_are_explicit() {
    let config = SchedulerConfig::default();
    assert_eq!(config.capacity, DEFAULT_CAPACITY);
    assert_eq!(config.visibility_threshold, 0.1);
    assert_eq!(config.proximity_margin.as_pixels(), 50.0);
    config.validate().expect("defaults validate");
}

#[test]
fn margin_accepts_numbers_and_pixel_strings() {
    let numeric = SchedulerConfig::from_toml_str("proximity_margin = 120").expect("numeric");
    assert_eq!(numeric.proximity_margin, ProximityMargin::pixels(120.0));

    let text = SchedulerConfig::from_toml_str("proximity_margin = \"200px\"").expect("text");
    assert_eq!(text.proximity_margin, ProximityMargin::pixels(200.0));
    assert_eq!(text.capacity, DEFAULT_CAPACITY);

    let err = SchedulerConfig::from_toml_str("proximity_margin = \"wide\"")
        .expect_err("garbage margin should fail");
    assert!(format!("{err}").contains("proximity margin"));
}

#[test]
fn validation_rejects_out_of_range_values() {
    let err = SchedulerConfig::from_toml_str("capacity = 0").expect_err("zero capacity");
    assert!(format!("{err}").contains("capacity"));

    let err = SchedulerConfig::from_toml_str("visibility_threshold = 1.5")
        .expect_err("threshold above one");
    assert!(format!("{err}").contains("visibility threshold"));

    let err = SchedulerConfig::from_toml_str("proximity_margin = -10")
        .expect_err("negative margin");
    assert!(format!("{err}").contains("non-negative"));
}

#[tokio::test]
async fn app_config_loads_repository_documents() {
    let config = AppConfig::load(base_cli()).await.expect("load documents");
    assert_eq!(config.scheduler.capacity, 6);
    assert_eq!(config.scheduler.proximity_margin.as_pixels(), 50.0);
    assert_eq!(config.scenario.page, "allworks");
    assert_eq!(config.scenario.elements.len(), 6);
    assert_eq!(config.scenario.stops.len(), 3);
}

#[tokio::test]
async fn cli_overrides_win_over_documents() {
    let mut cli = base_cli();
    cli.capacity = Some(2);
    cli.margin = Some("200px".parse().expect("margin"));
    let config = AppConfig::load(cli).await.expect("load documents");
    assert_eq!(config.scheduler.capacity, 2);
    assert_eq!(config.scheduler.proximity_margin.as_pixels(), 200.0);
}

#[tokio::test]
async fn cli_overrides_are_validated() {
    let mut cli = base_cli();
    cli.threshold = Some(-0.5);
    let err = AppConfig::load(cli).await.expect_err("invalid threshold");
    assert!(format!("{err}").contains("visibility threshold"));
}

#[tokio::test]
async fn missing_documents_report_io_errors() {
    let mut cli = base_cli();
    cli.config = PathBuf::from("does-not-exist.toml");
    let err = AppConfig::load(cli).await.expect_err("missing config");
    assert!(format!("{err}").contains("failed to read config"));
}
