use std::sync::Arc;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod model;
mod server;

use model::ModelPipeline;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::Config::load()?;
    logger::init(&cfg)?;

    // Build the Tokio runtime, sizing workers from config
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        logger::log_info(&format!("[CONFIG] Using {workers} worker threads"));
    } else {
        logger::log_info("[CONFIG] Using default worker threads (CPU cores)");
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    // The model must be in place before the first request can arrive
    let pipeline = ModelPipeline::load(&cfg.model.path).map_err(|e| {
        logger::log_error(&e.to_string());
        e
    })?;
    logger::log_model_loaded(
        &cfg.model.path,
        pipeline.name.as_deref(),
        pipeline.feature_width(),
    );

    let addr = cfg.get_socket_addr()?;
    let listener = server::create_listener(addr)?;
    let state = Arc::new(config::AppState::new(&cfg, Arc::new(pipeline)));

    let shutdown = Arc::new(server::ShutdownSignal::new());
    server::start_signal_handler(Arc::clone(&shutdown))?;

    logger::log_server_start(&addr, &cfg);

    server::start_server_loop(listener, state, shutdown).await?;
    Ok(())
}
