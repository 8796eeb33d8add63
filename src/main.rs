use axum::{extract::DefaultBodyLimit, http::{header::{ACCEPT, CONTENT_TYPE}, Method}, Router};
use clap::Parser;
use model::ModelController;
use server::{get_server_port, Args};
use tokio::net::TcpListener;
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};
use tools::log::{init_logging, log_error, log_info, LogServiceType};
pub use self::error::{Result, Error};

mod model;
mod routes;
mod error;
mod tools;
mod server;
mod domain;

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;


#[tokio::main]
async fn main() {
    init_logging();
    let args = Args::parse();
    log_info(LogServiceType::Register, "Starting emotion-lens server".to_string());
    log_info(LogServiceType::Register, "Initializing config".to_string());
    let (config, local_path) = match server::initialize_config(&args).await {
        Ok(initialized) => initialized,
        Err(err) => {
            log_error(LogServiceType::Register, format!("Unable to initialize config: {:?}", err));
            std::process::exit(1);
        }
    };

    let mc = ModelController::new(&config, &local_path).await;

    if args.check {
        println!("{}", mc.health.to_text());
        std::process::exit(if mc.health.analysis_available { 0 } else { 1 });
    }

    let local_port = get_server_port(&args, &config);
    let listener = match TcpListener::bind(format!("0.0.0.0:{}", local_port)).await {
        Ok(listener) => listener,
        Err(err) => {
            log_error(LogServiceType::Register, format!("Unable to listen on port {}: {}", local_port, err));
            std::process::exit(1);
        }
    };
    log_info(LogServiceType::Register, format!("->> LISTENING on {:?}\n", listener.local_addr()));

    if let Err(err) = axum::serve(listener, app(mc)).await {
        log_error(LogServiceType::Register, format!("Server stopped: {}", err));
        std::process::exit(1);
    }
}


fn app(mc: ModelController) -> Router {
    let cors: CorsLayer = CorsLayer::new()
    .allow_methods(vec![Method::GET, Method::HEAD, Method::OPTIONS, Method::POST])
    .allow_headers([ACCEPT, CONTENT_TYPE])
    // allow requests from any origin
    .allow_origin(Any);

    Router::new()
        .merge(routes::pages::routes(mc.clone()))
        .nest("/api", routes::analyze::routes(mc.clone()))
        .nest("/live", routes::live::routes(mc.clone()))
        .nest("/health", routes::health::routes(mc.clone()))
        .nest("/ping", routes::ping::routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
