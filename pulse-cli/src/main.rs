use futures::StreamExt;
use pulse::{Builder, Config, PeerList, UdpTransport};
use std::{path::PathBuf, time::Duration};
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_log::LogTracer::init()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pulse=info,pulse_cli=info"));
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let opts = Opts::from_args();
    let config = opts.config();
    config.validate()?;

    let peers = PeerList::load(&opts.peers)?;
    tracing::info!(peers = peers.len(), file = %opts.peers.display(), "loaded peer list");

    let transport = UdpTransport::bind(config.port).await?;

    let node = Builder::new()
        .transport(transport)
        .peers(peers)
        .config(config)
        .finish()?;

    let mut events = node.handle();
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            tracing::info!(%event, "membership changed");
        }
    });

    node.run(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "unable to listen for ctrl-c");
            futures::future::pending::<()>().await;
        }
        tracing::info!("received ctrl-c");
    })
    .await?;

    Ok(())
}

#[derive(StructOpt, Debug)]
#[structopt(name = "pulse-cli", rename_all = "kebab-case")]
struct Opts {
    /// UDP port to listen on.
    #[structopt(long, default_value = "9999")]
    port: u16,

    /// File with one `host:port` peer per line.
    #[structopt(long, default_value = "ips", parse(from_os_str))]
    peers: PathBuf,

    /// Seconds of silence before a peer is presumed failed.
    #[structopt(long, default_value = "35")]
    timeout: u64,

    /// Lower bound of the gossip interval in seconds.
    #[structopt(long, default_value = "1")]
    min_interval: u64,

    /// Upper bound of the gossip interval in seconds.
    #[structopt(long, default_value = "30")]
    max_interval: u64,

    #[structopt(long, default_value = "1000")]
    recv_timeout_ms: u64,

    /// Largest datagram to send, in bytes.
    #[structopt(long, default_value = "1024")]
    max_frame: usize,
}

impl Opts {
    fn config(&self) -> Config {
        Config::default()
            .port(self.port)
            .failure_timeout(Duration::from_secs(self.timeout))
            .gossip_interval(
                Duration::from_secs(self.min_interval),
                Duration::from_secs(self.max_interval),
            )
            .recv_timeout(Duration::from_millis(self.recv_timeout_ms))
            .max_frame_len(self.max_frame)
    }
}
