#![warn(rust_2018_idioms)]

use std::str::FromStr;

use flexi_logger::{LogSpecBuilder, LoggerHandle};
use futures::future::{select, Either};
use futures::pin_mut;
use log::{error, info, LevelFilter};
use tokio::sync::oneshot;

use netjack_server::{run, settings};

fn main() -> anyhow::Result<()> {
    let settings = settings::load()?;
    settings.validate()?;
    let _logger = setup_logger(&settings.logging)?;
    let runtime = setup_runtime(&settings.runtime)?;

    runtime.block_on(async move {
        // Spin up the server.
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let server = tokio::spawn(run(settings.server, settings.game, shutdown_rx));
        let signal = tokio::signal::ctrl_c();
        pin_mut!(signal);
        // Wait either for the interrupt signal, or for the server task to
        // stop on its own (e.g. failing to bind).
        let stats = match select(signal, server).await {
            Either::Left((signal, server)) => {
                if let Err(e) = signal {
                    error!("while listening for interrupt: {}", e);
                }
                info!("sending shutdown notice");
                shutdown_tx.send(()).ok();
                server.await??
            }
            Either::Right((result, _)) => {
                error!("server stopped unexpectedly");
                result??
            }
        };
        info!(
            "served {} connections at {} tables",
            stats.total_accepted_connections, stats.tables_opened
        );
        Ok::<_, anyhow::Error>(())
    })?;
    info!("good-bye, world!");
    Ok(())
}

fn setup_logger(l: &settings::Logging) -> anyhow::Result<LoggerHandle> {
    let mut spec_builder = LogSpecBuilder::new();
    spec_builder.default(LevelFilter::from_str(&l.level)?);
    let spec = spec_builder.build();
    let handle = flexi_logger::Logger::with(spec)
        .format(flexi_logger::default_format)
        .start()?;
    Ok(handle)
}

fn setup_runtime(r: &settings::Runtime) -> anyhow::Result<tokio::runtime::Runtime> {
    let mut builder = if r.threaded {
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.worker_threads(r.worker_threads);
        builder
    } else {
        tokio::runtime::Builder::new_current_thread()
    };
    builder.enable_all().thread_name(&r.thread_name);
    Ok(builder.build()?)
}
