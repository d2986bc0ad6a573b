use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

use vulnapp::db::SqliteExecutor;
use vulnapp::script::PythonEngine;
use vulnapp::{config, AppConfig, AppState};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let settings = Arc::new(AppConfig::from_env());
    warn!("Starting an intentionally vulnerable application; never expose it");
    info!("Database: {}", settings.database_url);
    info!("Upload dir: {}", settings.upload_dir);
    info!("Script interpreter: {}", settings.script_interpreter);

    let state = AppState {
        db: Arc::new(SqliteExecutor::lazy(&settings.database_url)?),
        engine: Arc::new(PythonEngine::new(settings.script_interpreter.clone())),
        config: settings.clone(),
    };

    let bind = (settings.host.clone(), settings.port);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(config)
    })
    .workers(1)
    .bind(bind.clone())?;

    info!("Listening on http://{}:{}", bind.0, bind.1);

    server.run().await?;
    Ok(())
}
