//! Binary entry point: wires configuration, sources, dedup, the vessel
//! store, the forwarder actor, the TCP/UDP/HTTP fronts and the periodic
//! reporter together and runs them until every upstream source has ended.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use ais_relay::config::Cli;
use ais_relay::dedup::DuplicateFilter;
use ais_relay::vessel::VesselStore;
use ais_relay::{forwarder, reporter, source, transport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let max_message_timespan =
        chrono::Duration::from_std(cli.max_message_timespan).context("--max-message-timespan out of range")?;

    let (handle, actor) = forwarder::spawn();
    tokio::spawn(actor);

    let vessels = Arc::new(VesselStore::new());
    let dedup = Arc::new(DuplicateFilter::new());

    tokio::spawn({
        let dedup = Arc::clone(&dedup);
        let min_keep_alive = cli.min_keep_alive;
        async move {
            let mut ticker = tokio::time::interval(min_keep_alive);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                dedup.rotate();
            }
        }
    });

    let sources = source::spawn_all(
        cli.sources,
        max_message_timespan,
        Arc::clone(&dedup),
        handle.clone(),
        Arc::clone(&vessels),
    );

    let sources_done = {
        let connectors = sources.connectors;
        let drain = sources.drain;
        tokio::spawn(async move {
            for connector in connectors {
                let _ = connector.await;
            }
            // every connector has dropped its sender; the drain task will
            // finish processing whatever is still queued and return.
            let _ = drain.await;
        })
    };

    tokio::spawn(reporter::run(cli.report_interval, Arc::clone(&sources.counters)));

    let tcp_addr = cli.tcp_addr();
    let http_addr = cli.http_addr();

    tokio::select! {
        result = transport::tcp_server(tcp_addr, handle.clone()) => {
            result.context("tcp forwarding server failed")?;
        }
        result = transport::udp_server(tcp_addr, handle.clone()) => {
            result.context("udp forwarding server failed")?;
        }
        result = transport::http_server(http_addr, handle, vessels) => {
            result.context("http api server failed")?;
        }
        _ = sources_done => {
            log::info!("every configured source has ended, shutting down");
        }
    }

    Ok(())
}
