use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{error, info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::services::store::AppointmentStore;
use appointment_cell::state::SchedulingState;
use notification_cell::{
    DeliveryPipeline, HttpPushClient, MailSink, NoopMailer, NoopPush, NotificationDispatcher,
    PushSink, RedisEventBus, SmtpMailer,
};
use shared_config::AppConfig;
use shared_database::PostgrestClient;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic scheduling API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());

    // Singleton clients, constructed once for the process lifetime
    let db = Arc::new(PostgrestClient::new(&config));
    let store = Arc::new(AppointmentStore::new(db));

    let bus = match RedisEventBus::new(&config).await {
        Ok(bus) => Arc::new(bus),
        Err(e) => {
            error!("Failed to initialize event bus: {}", e);
            std::process::exit(1);
        }
    };

    // Notification dispatcher runs alongside the HTTP listener, consuming
    // the same bus the scheduling services publish to.
    let mail: Arc<dyn MailSink> = if config.is_mail_configured() {
        Arc::new(SmtpMailer::new(&config))
    } else {
        Arc::new(NoopMailer)
    };
    let push: Arc<dyn PushSink> = match &config.push_gateway_url {
        Some(url) => Arc::new(HttpPushClient::new(url, &config)),
        None => Arc::new(NoopPush),
    };
    let pipeline = Arc::new(DeliveryPipeline::new(mail, push));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::clone(&bus),
        pipeline,
        &config,
    ));

    tokio::spawn({
        let dispatcher = Arc::clone(&dispatcher);
        async move {
            if let Err(e) = dispatcher.start().await {
                error!("Notification dispatcher stopped: {}", e);
            }
        }
    });

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Create shared state
    let state = Arc::new(SchedulingState::new(Arc::clone(&config), store, bus));

    // Build the application router
    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
