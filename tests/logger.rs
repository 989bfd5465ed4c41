use simpm::logger::LoggerBuilder;

#[test]
fn test_logger() -> Result<(), log::SetLoggerError> {
    let buffer = LoggerBuilder::default()
        .level(log::LevelFilter::Trace)
        .init()?;
    log::info!("Info");
    log::debug!("Debug");
    log::warn!("Warn");
    log::error!("Error");
    assert_eq!(
        buffer.drain(),
        vec![
            String::from("[INFO]  Info"),
            String::from("[DEBUG] Debug"),
            String::from("[WARN]  Warn"),
            String::from("[ERROR] Error"),
        ]
    );
    log::error!("Error");
    log::warn!("Warn");
    log::debug!("Debug");
    log::info!("Info");
    assert_eq!(
        buffer.drain(),
        vec![
            String::from("[ERROR] Error"),
            String::from("[WARN]  Warn"),
            String::from("[DEBUG] Debug"),
            String::from("[INFO]  Info"),
        ]
    );
    Ok(())
}
