use adaptive_thermostat::config::LoggingConfig;
use adaptive_thermostat::logging::{
    LogContext, get_logger, get_logger_with_context, init_logging, parse_log_level,
};
use tracing::Level;

#[test]
fn parse_log_level_is_case_insensitive() {
    assert_eq!(parse_log_level("trace").unwrap(), Level::TRACE);
    assert_eq!(parse_log_level("Info").unwrap(), Level::INFO);
    assert_eq!(parse_log_level("ERROR").unwrap(), Level::ERROR);
    let err = parse_log_level("chatty").unwrap_err();
    assert!(format!("{}", err).contains("Invalid log level"));
}

#[test]
fn init_logging_console_only_when_file_logging_disabled() {
    // SAFETY: no other test in this binary reads or writes the environment
    unsafe {
        std::env::set_var("ADAPTIVE_THERMOSTAT_DISABLE_FILE_LOG", "1");
    }
    let cfg = LoggingConfig {
        level: "DEBUG".to_string(),
        ..Default::default()
    };
    assert!(init_logging(&cfg).is_ok());
    // A second call reports the first outcome
    assert!(init_logging(&cfg).is_ok());

    let logger = get_logger_with_context(LogContext::new("test").with_thermostat("bedroom"));
    logger.info("context logger works");
    get_logger("plain").debug("plain logger works");
}
