use std::time::Duration;

use actix_web::{
    http::StatusCode, middleware::Logger, web, App, HttpMessage, HttpRequest, HttpResponse,
    HttpServer,
};
use env_logger::Env;
use log::{debug, info};

use crate::{
    adapter::{self, ApiRequest, ApiResponse},
    config::{Config, Environment},
    errors::AppError,
    middleware::RateLimit,
    rate_limit::{RateLimitDecision, RateLimiter},
    types::AppState,
    utils::time::now_millis,
};

// Custom result type for the application
pub type AppResult<T> = Result<T, AppError>;

// Setup logging with custom format and configuration
pub fn setup_logging(config: &Config) -> AppResult<()> {
    // Configure log level based on environment and config
    let log_level = match config.app.environment {
        Environment::Development => config.app.log_level.clone(),
        Environment::Testing => "debug,actix_web=info".to_string(),
        Environment::Production => "info,actix_web=warn".to_string(),
    };

    let env = Env::default()
        .filter_or("RUST_LOG", log_level)
        .write_style_or("RUST_LOG_STYLE", "always");

    env_logger::try_init_from_env(env)
        .map_err(|e| AppError::Logger(format!("Failed to initialize logger: {}", e)))
}

/// Catch-all actix handler: converts to the shared request type, runs the
/// router and converts back.
pub async fn handle_request(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> HttpResponse {
    let decision = req.extensions().get::<RateLimitDecision>().cloned();

    let mut api_req = ApiRequest::new(req.method().as_str(), req.path())
        .with_query_string(req.query_string())
        .with_body(&body)
        .with_client_ip(req.peer_addr().map(|addr| addr.ip().to_string()));
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            api_req = api_req.with_header(name.as_str(), value);
        }
    }

    into_http_response(adapter::process(&state, api_req, decision).await)
}

fn into_http_response(res: ApiResponse) -> HttpResponse {
    let status = StatusCode::from_u16(res.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = HttpResponse::build(status);
    for (name, value) in res.headers {
        builder.insert_header((name, value));
    }
    builder.body(res.body)
}

// Evicts idle limiter entries once per window for the life of the server
fn spawn_sweeper(limiter: RateLimiter) {
    let period = Duration::from_millis(limiter.window_ms());
    actix_web::rt::spawn(async move {
        let mut ticker = actix_web::rt::time::interval(period);
        loop {
            ticker.tick().await;
            limiter.sweep(now_millis());
        }
    });
}

pub async fn server() -> AppResult<()> {
    // Load application configuration
    let config = Config::load()?;

    setup_logging(&config)?;

    info!("Starting {} v{}", config.app.name, config.app.version);
    info!("Environment: {:?}", config.app.environment);
    info!(
        "Binding to {}:{} with {} workers",
        config.server.host, config.server.port, config.server.workers
    );
    info!(
        "Rate limit: {} requests per {}ms (blocking: {})",
        config.rate_limit.requests_per_window,
        config.rate_limit.window_ms,
        config.rate_limit.blocking
    );

    if config.app.environment == Environment::Development {
        debug!("Full configuration: {:?}", config);
    }

    // One state for all workers so they share the limiter and the locks
    let state = web::Data::new(AppState::from_config(&config)?);
    spawn_sweeper(state.limiter.clone());

    // Determine log format based on environment
    let log_format = if config.app.environment == Environment::Production {
        "%a \"%r\" %s %b %T"
    } else {
        "%a \"%r\" %s %b %T \"%{Referer}i\" \"%{User-Agent}i\""
    };

    let app_state = state.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(RateLimit::new(app_state.limiter.clone()))
            .wrap(Logger::new(log_format))
            .default_service(web::to(handle_request))
    })
    .workers(config.server.workers)
    .bind((config.server.host.to_string(), config.server.port))?
    .run()
    .await?;

    info!("Server stopped after {}s", state.uptime());
    Ok(())
}
