//! Binary for fetching the shelf detection model ahead of time

use shelfwatch_core::ShelfConfig;
use shelfwatch_eye::error::VisionError;
use shelfwatch_eye::models::ModelManager;
use std::env;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), VisionError> {
    tracing_subscriber::fmt().with_target(false).init();

    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: download_model [config_file]");
        std::process::exit(1);
    }

    let config = ShelfConfig::load(args.get(1).map(Path::new))?;
    let manager = ModelManager::new(config.model);

    println!("Fetching shelf model...");
    let path = manager.ensure_model_available().await?;
    println!("Model available at: {:?}", path);

    Ok(())
}
