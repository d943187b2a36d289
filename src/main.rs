use envconfig::Envconfig;
use memload_cluster::config::Config;
use memload_cluster::net::self_address;
use memload_cluster::worker::handlers::start_worker_api;
use memload_cluster::worker::node::WorkerNode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = Config::init_from_env()?;

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [<bootstrap addr:port>]", args[0]);
        eprintln!("Example: {} 10.0.0.5:8081", args[0]);
        std::process::exit(1);
    }
    if let Some(bootstrap) = args.get(1) {
        config.bootstrap_address = bootstrap.clone();
    }

    config.validate()?;

    let self_address = self_address(config.coordinator_port);
    tracing::info!(
        "Starting instance at {} (bootstrap {})",
        self_address,
        config.bootstrap_address
    );

    let node = WorkerNode::join(config.clone(), self_address).await?;

    // A second process on the same host cannot take the worker port; it keeps
    // polling without serving the worker API.
    if let Err(e) = start_worker_api(
        &config.worker_bind(),
        node.view(),
        node.client(),
        config.coordinator_port,
    )
    .await
    {
        tracing::warn!("Can't run worker server, assuming we run on one host: {}", e);
    }

    node.run().await?;

    Ok(())
}
