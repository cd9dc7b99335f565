use personalizer::{logger, server, Config};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    logger::init()?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = Config::from_env();
    logger::log_startup_info("Illustration Personalizer", env!("CARGO_PKG_VERSION"), &config);
    logger::log_config_info(&config);

    if let Err(e) = server::run(config).await {
        log::error!("❌ Server stopped with error: {}", e);
        return Err(e.into());
    }

    log::info!("👋 Server shut down");
    Ok(())
}
