use api_server::config::AppConfig;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    api_server::init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        "Starting stock agent API (blocking pool: {} threads)",
        config.blocking_threads
    );

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(config.blocking_threads)
        .build()?
        .block_on(api_server::run_server(config))
}
