use std::path::PathBuf;

use cardio::{
    config::{Settings, DEFAULT_CONFIG_FILE},
    journal::ErrorJournal,
    logging, pipeline,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);
    let settings = Settings::load_or_default(&config_path)?;

    if let Err(error) = logging::init(&settings.logging.level) {
        eprintln!("logging disabled: {error}");
    }

    let journal = ErrorJournal::new(
        &settings.logging.journal_db,
        &settings.logging.journal_fallback,
    );

    let summary = pipeline::run_and_journal(&settings, &journal)?;
    println!("{summary}");
    Ok(())
}
