use actix_web::{web, App, HttpServer};
use log::{info, warn, LevelFilter};
use std::sync::Arc;

use manga_page_gateway::app_state::AppState;
use manga_page_gateway::browser::BrowserManager;
use manga_page_gateway::config::{Config, ServerConfig};
use manga_page_gateway::http_client::EnhancedHttpClient;
use manga_page_gateway::routes;

const LOG_CONFIG_FILE: &str = "log4rs.yml";

fn init_logging() {
    if let Err(e) = log4rs::init_file(LOG_CONFIG_FILE, Default::default()) {
        use log4rs::append::console::ConsoleAppender;
        use log4rs::config::{Appender, Config as LogConfig, Root};
        use log4rs::encode::pattern::PatternEncoder;

        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(
                "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {t} - {m}{n}",
            )))
            .build();
        let fallback = LogConfig::builder()
            .appender(Appender::builder().build("stdout", Box::new(stdout)))
            .build(Root::builder().appender("stdout").build(LevelFilter::Info));

        match fallback.map(log4rs::init_config) {
            Ok(Ok(_)) => warn!("Could not load {} ({}), logging to console", LOG_CONFIG_FILE, e),
            Ok(Err(e)) => eprintln!("Failed to install logger: {}", e),
            Err(e) => eprintln!("Invalid fallback logging config: {}", e),
        }
    }
}

/// Bind the first free port in `port..=max_port` and run until shutdown
async fn serve(data: web::Data<AppState>, server: &ServerConfig) -> std::io::Result<()> {
    let mut last_err: Option<std::io::Error> = None;
    for port in server.port..=server.max_port {
        let data_clone = data.clone();
        let addr = format!("{}:{}", server.host, port);
        match HttpServer::new(move || {
            App::new()
                .app_data(data_clone.clone())
                .configure(routes::configure)
        })
        .bind(&addr)
        {
            Ok(server) => {
                info!("Listening on {}", addr);
                return server.run().await;
            }
            Err(e) => {
                last_err = Some(e);
                continue;
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            format!("No available ports {}-{}", server.port, server.max_port),
        )
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_logging();

    let cfg = Config::load();

    let enhanced_client = EnhancedHttpClient::with_config(cfg.upstream.http_client_config())
        .map_err(std::io::Error::other)?;

    std::fs::create_dir_all(cfg.temp_dir())?;

    info!("HTTP client initialized:");
    info!("  API: {}", cfg.upstream.api_base_url);
    info!("  Timeout: {}s", cfg.upstream.timeout_secs);
    info!("  Temp dir: {}", cfg.temp_dir().display());

    let browser_manager = if cfg.browser.enabled {
        match BrowserManager::new(cfg.browser.browser_config()) {
            Ok(manager) => {
                info!("Headless browser ready, render fallback enabled");
                Some(Arc::new(manager))
            }
            Err(e) => {
                warn!("Browser failed to start, render fallback disabled: {}", e);
                None
            }
        }
    } else {
        info!("Render fallback disabled by configuration");
        None
    };

    let data = web::Data::new(AppState::new(&cfg, enhanced_client, browser_manager.clone()));

    let result = serve(data, &cfg.server).await;

    if let Some(manager) = browser_manager {
        manager.shutdown();
    }
    result
}
