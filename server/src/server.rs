use std::mem;

use anyhow::Context;
use futures::stream::futures_unordered::FuturesUnordered;
use futures::StreamExt;
use log::{debug, error, info};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};

use netjack_game::model::{ClientId, TableId};
use netjack_game::{seat, Settings, Table};

use crate::{client, settings};

/// Execute the entire lifecycle of the netjack server.
///
/// Accepted connections wait in the lobby until enough have arrived to fill a
/// table, then play at that table until they leave. Returns once
/// `shutdown_rx` fires and every connection and table task has finished.
pub async fn run(
    server: settings::Server,
    game: Settings,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> anyhow::Result<Stats> {
    let (stopped_tx, stopped_rx) = watch::channel(false);

    // Bind server to the address and begin listening.
    let bind_addr = format!("{}:{}", server.host, server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;
    info!("netjack server running on {}", bind_addr);

    let mut stats = Stats::default();
    let mut lobby = Vec::with_capacity(game.players_per_table);
    let mut connection_tasks = FuturesUnordered::new();
    let mut table_tasks = FuturesUnordered::new();
    loop {
        tokio::select! {
            // shutdown notice.
            _ = &mut shutdown_rx => {
                info!("received shutdown notice");
                break
            },
            // inbound connection.
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    stats.total_accepted_connections += 1;
                    let id = ClientId(stats.total_accepted_connections as u64);
                    debug!("accepted {} from {}", id, addr);
                    let (seat, events) = seat(id);
                    connection_tasks.push(client::spawn(id, stream, addr, events, game, stopped_rx.clone()));
                    lobby.push(seat);
                    if lobby.len() >= game.players_per_table {
                        stats.tables_opened += 1;
                        let id = TableId(stats.tables_opened as u32);
                        let seats = mem::replace(&mut lobby, Vec::with_capacity(game.players_per_table));
                        let players: Vec<String> = seats.iter().map(|s| s.client().to_string()).collect();
                        info!("opening {} for {}", id, players.join(", "));
                        table_tasks.push(tokio::spawn(Table::new(id, game, seats).run()));
                    }
                },
                Err(e) => error!("while accepting connection: {}", e),
            },
            // completed connection tasks.
            Some(result) = connection_tasks.next() => {
                if let Err(e) = result {
                    error!("connection task: {}", e);
                }
            },
            // completed tables.
            Some(result) = table_tasks.next() => match result {
                Ok(table) => debug!("table closed after {} rounds", table.rounds_played),
                Err(e) => error!("table task: {}", e),
            },
        }
    }

    // Inform connection tasks of shutdown, then await them and their tables.
    stopped_tx.send(true).ok();
    drop(lobby);
    info!("reaping {} connection tasks", connection_tasks.len());
    while let Some(result) = connection_tasks.next().await {
        if let Err(e) = result {
            error!("connection task: {}", e);
        }
    }
    info!("reaping {} tables", table_tasks.len());
    while let Some(result) = table_tasks.next().await {
        if let Err(e) = result {
            error!("table task: {}", e);
        }
    }

    Ok(stats)
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Stats {
    pub total_accepted_connections: usize,
    pub tables_opened: usize,
}
