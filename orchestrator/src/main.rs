use std::sync::Arc;
use tracing::info;
use warp::Filter;

use travel_orchestrator::{api, middleware, Config, TravelAgent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing OPENAI_API_KEY aborts startup here
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!("Starting travel itinerary orchestrator");
    info!(
        "Configuration loaded (chat model {}, corpus {})",
        config.chat_model, config.corpus_url
    );

    let agent = Arc::new(TravelAgent::from_config(&config)?);
    info!("Pipeline ready");

    let routes = api::routes(agent)
        .with(warp::log("api"))
        .with(middleware::cors());

    let addr = ([0, 0, 0, 0], config.port);
    info!("Server listening on {}", addr.1);

    warp::serve(routes).run(addr).await;

    Ok(())
}
