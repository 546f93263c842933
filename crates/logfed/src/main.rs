use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use liblogfed::discovery::MulticastOptions;
use liblogfed::{Announcer, ClusterState, Indexer, Listener};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Federated log-tail daemon: announces this host over multicast, indexes
/// its peers' file listings, and serves `/log` and `/ls` over HTTP.
#[derive(Parser, Debug)]
#[command(version, author, about)]
struct Opts {
    /// HTTP listen port.
    #[arg(long, default_value_t = 7777, env = "LOGFED_PORT")]
    port: u16,

    /// Log root directory. A trailing `/` is enforced regardless of input.
    #[arg(long, default_value = "/var/log", env = "LOGFED_LOG_PATH", value_parser = normalize_log_path)]
    log_path: PathBuf,

    /// IPv4 multicast group used for peer discovery.
    #[arg(long, default_value = "239.0.1.5", env = "LOGFED_MULTICAST_GRP")]
    multicast_grp: Ipv4Addr,

    /// Multicast UDP port.
    #[arg(long, default_value_t = 8888, env = "LOGFED_MULTICAST_PORT")]
    multicast_port: u16,

    /// How often this node broadcasts its presence, e.g. "1s".
    #[arg(long, default_value = "1s", value_parser = parse_duration::parse, env = "LOGFED_ANNOUNCE_INTERVAL")]
    announce_interval: Duration,

    /// How often the indexer re-polls every known peer's `/ls`, e.g. "2s".
    #[arg(long, default_value = "2s", value_parser = parse_duration::parse, env = "LOGFED_POLL_INTERVAL")]
    poll_interval: Duration,

    /// Connect/read timeout for a single peer `/ls` poll, e.g. "3s".
    #[arg(long, default_value = "3s", value_parser = parse_duration::parse, env = "LOGFED_PEER_TIMEOUT")]
    peer_timeout: Duration,
}

fn normalize_log_path(raw: &str) -> Result<PathBuf, std::convert::Infallible> {
    let mut s = raw.to_string();
    if !s.ends_with('/') {
        s.push('/');
    }
    Ok(PathBuf::from(s))
}

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let token = CancellationToken::new();
    #[cfg(not(target_os = "windows"))]
    {
        let token = token.clone();
        use signal_hook::{consts::SIGINT, consts::SIGTERM, iterator::Signals};
        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        thread::spawn(move || {
            let mut cancel_triggered = false;
            while let Some(sig) = signals.forever().next() {
                if cancel_triggered {
                    warn!("received signal {:?}, forcing shutdown", sig);
                    std::process::exit(1);
                }
                warn!("received signal {:?}, shutting down gracefully", sig);
                token.cancel();
                cancel_triggered = true;
            }
        });
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("error building tokio runtime")?;

    let result = rt.block_on(async_main(opts, token));
    if let Err(e) = result.as_ref() {
        error!("error running logfedd: {e:?}");
    }
    rt.shutdown_timeout(Duration::from_secs(1));
    match result {
        Ok(()) => std::process::exit(0),
        Err(_) => std::process::exit(1),
    }
}

async fn async_main(opts: Opts, cancel: CancellationToken) -> anyhow::Result<()> {
    let state = ClusterState::new(opts.log_path.clone(), opts.port);

    let multicast_opts = MulticastOptions {
        group: opts.multicast_grp,
        port: opts.multicast_port,
    };

    liblogfed::spawn::spawn_with_cancel(
        tracing::info_span!("announcer"),
        cancel.clone(),
        Announcer::new(multicast_opts.clone(), opts.port, opts.announce_interval).run(),
    );

    liblogfed::spawn::spawn_with_cancel(
        tracing::info_span!("listener"),
        cancel.clone(),
        Listener::new(multicast_opts, state.peer_table.clone()).run(),
    );

    let indexer = Indexer::new(
        state.peer_table.clone(),
        state.file_index.clone(),
        state.peer_files.clone(),
        opts.poll_interval,
        opts.peer_timeout,
    )?;
    liblogfed::spawn::spawn_with_cancel(tracing::info_span!("indexer"), cancel.clone(), indexer.run());

    let listen_addr = SocketAddr::from(([0, 0, 0, 0], opts.port));
    let tcp_listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("error binding HTTP listener on {listen_addr}"))?;
    info!(addr = %listen_addr, log_root = %state.log_root.display(), "logfedd listening");

    let app = liblogfed::http::router(state);
    let serve = axum::serve(tcp_listener, app.into_make_service());

    tokio::select! {
        result = serve => result.context("error running HTTP front end"),
        _ = cancel.cancelled() => {
            info!("shutdown signal received, exiting");
            Ok(())
        }
    }
}
