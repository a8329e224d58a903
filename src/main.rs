use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use roleauth_server::config::CorsConfig;
use roleauth_server::{AppState, Settings};
use std::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn cors(config: &CorsConfig) -> Cors {
    if !config.enabled {
        return Cors::default();
    }

    let cors = if config.allow_any_origin {
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
    } else {
        Cors::default()
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://127.0.0.1:3000")
            .allowed_methods(vec!["GET", "POST", "PUT"])
            .allowed_headers(vec!["Authorization", "Content-Type"])
    };

    cors.max_age(config.max_age as usize)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = Settings::new().context("Failed to load configuration")?;
    info!("Configuration loaded for environment: {}", config.environment);

    let state = AppState::new(config.clone())
        .await
        .context("Failed to initialize application state")?;
    let state = web::Data::new(state);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&address)
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Starting server at {}", address);

    let cors_config = config.cors.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&cors_config))
            .app_data(state.clone())
            .configure(roleauth_server::configure)
    })
    .workers(config.server.workers as usize)
    .listen(listener)?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
