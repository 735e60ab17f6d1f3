use std::{env, fs::File, path::Path, sync::Arc};

use vitalperks_bridge::{
    Config, DebitProcessor, Engine, InMemoryAccountStore, SystemClock, dlq::LoggingDlq,
    ingestion::CsvCommandReader, onboarding::Onboarding, telemetry,
};

#[tokio::main] // using Tokio runtime for async
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();

    let mut args = env::args();
    let file_path = args
        .nth(1)
        .ok_or("usage: vitalperks_bridge <commands.csv>")?;
    let file = File::open(Path::new(&file_path))?;

    let config = Config::from_env()?;

    // Set up the components
    let store = Arc::new(InMemoryAccountStore::new());
    let processor = DebitProcessor::new(Arc::clone(&store), SystemClock, &config);
    let onboarding = Onboarding::new(Arc::clone(&store), &config);
    let ingestion = CsvCommandReader::new(file)?;

    let mut engine = Engine::new(ingestion, processor, onboarding, LoggingDlq::default());
    engine.process().await?;
    engine.flush(std::io::stdout().lock())?;

    Ok(())
}
