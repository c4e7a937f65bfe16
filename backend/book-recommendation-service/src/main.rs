use actix_web::{middleware::Logger, web, App, HttpServer};
use book_recommendation_service::{handlers, Config, Recommender};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,actix_web=info".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_thread_ids(true)
                    .with_target(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    info!(
        env = %config.app_env,
        address = %config.bind_address(),
        model = %config.model_path.display(),
        "Starting book-recommendation-service"
    );

    // A missing or corrupt artifact stops the process here.
    let recommender = web::Data::new(Recommender::load(&config)?);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(recommender.clone())
            .configure(handlers::configure)
    })
    .bind(config.bind_address())?
    .run()
    .await?;

    Ok(())
}
