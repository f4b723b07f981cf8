use price_etl::utils::validation::Validate;
use price_etl::{EmptySeriesPolicy, FetchConfig};

#[test]
fn test_example_config_matches_reference_run() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/price-etl.example.toml");

    // without the variable the output directory is unknown
    std::env::remove_var("PRICE_ETL_OUTPUT_DIR");
    let err = FetchConfig::from_file(path).unwrap_err();
    assert!(err.to_string().contains("PRICE_ETL_OUTPUT_DIR is not set"));

    std::env::set_var("PRICE_ETL_OUTPUT_DIR", "./out");
    let config = FetchConfig::from_file(path).unwrap();
    let defaults = FetchConfig::default();

    assert_eq!(config.tickers, defaults.tickers);
    assert_eq!(config.periods, defaults.periods);
    assert_eq!(config.output.base_dir, "./out");
    assert_eq!(config.output.on_empty, EmptySeriesPolicy::WriteHeader);
    assert_eq!(config.run.concurrent_requests, 1);
    assert!(config.validate().is_ok());

    std::env::remove_var("PRICE_ETL_OUTPUT_DIR");
}

#[test]
fn test_concurrency_out_of_range_is_rejected() {
    let config = FetchConfig::from_toml_str("[run]\nconcurrent_requests = 64\n").unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("run.concurrent_requests"));
}

#[test]
fn test_inverted_period_is_rejected() {
    let config = FetchConfig::from_toml_str(
        r#"
[[periods]]
folder = "data"
start = "2025-04-01"
end = "2025-01-01"
"#,
    )
    .unwrap();
    assert!(config.validate().is_err());
}
