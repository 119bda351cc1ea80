//! Generate, inject and inspect scripted TCP connections.
//!
//! Call examples:
//!
//! * `tcpsynth-replay generate -m c:hello -m s:world -o hello.pcap`
//! * `tcpsynth-replay generate --syn-mss 1460 --syn-sack-perm -m c:hex:00ff -i veth0`
//! * `tcpsynth-replay listen -r hello.pcap --port 80`
//! * `tcpsynth-replay listen -i eth0 --promisc -c 10 --max-time-secs 30`
use std::process;

use tcpsynth_replay::config::{Command, Config};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = Config::from_args();

    let result = match &config.command {
        Command::Generate(args) => tcpsynth_replay::generate(args).map(|_| ()),
        Command::Listen(args) => tcpsynth_replay::listen(args).map(|summary| {
            tracing::info!(
                delivered = summary.delivered,
                skipped = summary.skipped,
                "[+] Done");
        }),
    };

    if let Err(err) = result {
        tracing::error!("{}", err);
        process::exit(1);
    }
}
