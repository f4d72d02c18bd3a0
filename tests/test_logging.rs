//! Tests for logging configuration and format parsing
//!
//! Tests the pure functions in the logging module that handle
//! log format parsing and configuration from environment variables.

use livefeed::logging::LogFormat;
use tracing::Level;

#[test]
fn test_log_format_parse_is_case_insensitive() {
    assert!(matches!(LogFormat::parse("json"), LogFormat::Json));
    assert!(matches!(LogFormat::parse("JSON"), LogFormat::Json));
    assert!(matches!(LogFormat::parse("Json"), LogFormat::Json));

    assert!(matches!(LogFormat::parse("pretty"), LogFormat::Pretty));
    assert!(matches!(LogFormat::parse("PRETTY"), LogFormat::Pretty));
    assert!(matches!(LogFormat::parse("Pretty"), LogFormat::Pretty));

    assert!(matches!(LogFormat::parse("compact"), LogFormat::Compact));
    assert!(matches!(LogFormat::parse("COMPACT"), LogFormat::Compact));
    assert!(matches!(LogFormat::parse("Compact"), LogFormat::Compact));
}

#[test]
fn test_log_format_parse_invalid_defaults_to_json() {
    // Unknown formats fall back to JSON so production output stays structured
    assert!(matches!(LogFormat::parse("invalid"), LogFormat::Json));
    assert!(matches!(LogFormat::parse(""), LogFormat::Json));
    assert!(matches!(LogFormat::parse("xml"), LogFormat::Json));
    assert!(matches!(LogFormat::parse("logfmt"), LogFormat::Json));
    assert!(matches!(LogFormat::parse("123"), LogFormat::Json));
}

#[test]
fn test_log_format_parse_padded_input_falls_back_to_json() {
    // Parsing does not trim, so padded values take the JSON default arm
    assert!(matches!(LogFormat::parse("  json  "), LogFormat::Json));
    assert!(matches!(LogFormat::parse("pretty\n"), LogFormat::Json));
    assert!(matches!(LogFormat::parse("\tcompact"), LogFormat::Json));
}

#[test]
fn test_log_levels_are_distinct() {
    let levels = [
        Level::ERROR,
        Level::WARN,
        Level::INFO,
        Level::DEBUG,
        Level::TRACE,
    ];

    for pair in levels.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
}

#[test]
fn test_log_format_clone_and_copy() {
    let format = LogFormat::Pretty;
    let cloned = format;
    let copied = format;

    assert!(matches!(format, LogFormat::Pretty));
    assert!(matches!(cloned, LogFormat::Pretty));
    assert!(matches!(copied, LogFormat::Pretty));
}

#[test]
fn test_log_format_debug() {
    assert!(format!("{:?}", LogFormat::Json).contains("Json"));
    assert!(format!("{:?}", LogFormat::Pretty).contains("Pretty"));
    assert!(format!("{:?}", LogFormat::Compact).contains("Compact"));
}

#[test]
fn test_log_level_env_parsing_logic() {
    // Mirrors the LOG_LEVEL handling in init_default_logging: uppercase names
    // map to their level, anything else lands on INFO
    let test_cases = vec![
        ("ERROR", Level::ERROR),
        ("WARN", Level::WARN),
        ("INFO", Level::INFO),
        ("DEBUG", Level::DEBUG),
        ("TRACE", Level::TRACE),
        ("warn", Level::WARN),
        ("verbose", Level::INFO),
        ("", Level::INFO),
    ];

    for (input, expected) in test_cases {
        let level = match input.to_uppercase().as_str() {
            "ERROR" => Level::ERROR,
            "WARN" => Level::WARN,
            "INFO" => Level::INFO,
            "DEBUG" => Level::DEBUG,
            "TRACE" => Level::TRACE,
            _ => Level::INFO,
        };
        assert_eq!(level, expected, "unexpected level for input: {input:?}");
    }
}

#[test]
fn test_log_spans_parsing_logic() {
    // LOG_SPANS accepts only case-insensitive "true"; everything else is off
    let test_cases = vec![
        ("true", true),
        ("TRUE", true),
        ("True", true),
        ("false", false),
        ("FALSE", false),
        ("", false),
        ("yes", false),
        ("1", false),
    ];

    for (input, expected) in test_cases {
        let result = input.to_lowercase() == "true";
        assert_eq!(result, expected, "unexpected span flag for input: {input:?}");
    }
}
