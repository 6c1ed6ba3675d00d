use anyhow::Context;
use clap::Parser;
use rampart_contract::SpecSource;
use rampart_proxy::aggregate::{Aggregator, FileSink};
use rampart_proxy::config::Args;
use rampart_proxy::delay::DelaySampler;
use rampart_proxy::mock::MockResolver;
use rampart_proxy::proxy::client::create_http_client;
use rampart_proxy::proxy::server::prebind;
use rampart_proxy::proxy::{LifecycleHandle, ProxyServer, ProxyState, TargetMode};
use rampart_proxy::validator::ReloadableValidator;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    run(args).await
}

async fn run(args: Args) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));

    // with async start the socket binds while the specification loads
    let prebound = args.async_start.then(|| prebind(addr));

    let source = SpecSource::new(&args.spec, args.base_uri.clone(), args.ignore_x_headers);
    let validator = Arc::new(ReloadableValidator::load(source).await?);

    let aggregator = Arc::new(match &args.save_dir {
        Some(dir) => Aggregator::with_sink(
            FileSink::new(dir, args.format).context("failed to prepare save directory")?,
        ),
        None => Aggregator::new(),
    });

    let mode = match (&args.target, &args.mock_dir) {
        (Some(url), None) => {
            info!("proxy mode, forwarding to {url}");
            TargetMode::Proxy {
                upstream: url.trim_end_matches('/').to_string(),
                client: create_http_client(),
            }
        }
        (None, Some(dir)) => {
            info!("mock mode, serving from {dir:?}");
            TargetMode::Mock {
                resolver: MockResolver::new(dir),
            }
        }
        _ => anyhow::bail!("exactly one of --target or --mock-dir is required"),
    };

    let lifecycle = LifecycleHandle::new(Arc::clone(&aggregator));
    let state = Arc::new(ProxyState {
        mode,
        delay: DelaySampler::Range(args.delay),
        aggregator,
        validator,
        lifecycle,
    });

    let server = ProxyServer::new(state);
    let listener = match prebound {
        Some(pending) => server.adopt_prebound(pending).await?,
        None => server.bind(addr).await?,
    };
    server.serve(listener).await
}
