use std::time::Duration;

use futures::stream::futures_unordered::FuturesUnordered;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_util::codec::{Framed, LinesCodec};

use netjack_server::{run, settings};

async fn next_line(lines: &mut Framed<TcpStream, LinesCodec>) -> String {
    lines
        .next()
        .await
        .expect("server to respond")
        .expect("response to be a line")
}

// Ensure that:
//
// - a server can be started.
// - a large number of clients can connect, get seated and bet.
// - the server receives the shutdown notification.
// - all client tasks and tables stop.
// - the server shuts down gracefully.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn graceful_shutdown() {
    let _logger = flexi_logger::Logger::try_with_env_or_str("info")
        .expect("log spec")
        .format(flexi_logger::with_thread)
        .start()
        .expect("logger to start");
    // Spawn server.
    let settings = settings::Server {
        host: "127.0.0.1".into(),
        port: 18023,
    };
    let game = netjack_game::Settings::default();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let server = tokio::spawn(async move { run(settings, game, shutdown_rx).await.ok() });

    // Hack: wait a bit for the server to be ready.
    tokio::time::sleep(Duration::from_millis(150)).await;

    // Spawn many clients in parallel; every pair fills a table.
    const NUM_CLIENTS: usize = 200;
    let mut connections = FuturesUnordered::new();
    for _id in 0..NUM_CLIENTS {
        connections.push(tokio::spawn(async move {
            let stream = TcpStream::connect("127.0.0.1:18023")
                .await
                .expect("server to be up");
            let mut lines = Framed::new(stream, LinesCodec::new());
            assert_eq!(next_line(&mut lines).await, "WELCOME");
            assert_eq!(next_line(&mut lines).await, "WAITING--PLAYERS");
            assert_eq!(next_line(&mut lines).await, "NEWROUND--2500.00");
            assert_eq!(next_line(&mut lines).await, "GETBET--2500.00--500.00");
            lines.send("500".to_string()).await.expect("bet to send");
            let response = next_line(&mut lines).await;
            (lines, response)
        }));
    }

    // Wait for all clients to get a bet through.
    let mut clients = Vec::with_capacity(NUM_CLIENTS);
    while let Some(client_task) = connections.next().await {
        clients.push(client_task.expect("client"));
    }
    for (_, response) in clients.iter() {
        assert_eq!(response, "BETRESPONSE--SUCCESS--2000.00");
    }

    // Tell server to shutdown.
    shutdown_tx.send(()).expect("server still running");
    let stats = tokio::time::timeout(Duration::from_secs(10), server)
        .await
        .expect("server to stop in time")
        .expect("server shutdown smoothly")
        .expect("server shutdown smoothly");

    // Ensure the server agrees with us.
    assert_eq!(stats.total_accepted_connections, NUM_CLIENTS);
    assert_eq!(stats.tables_opened, NUM_CLIENTS / 2);
    drop(clients);
}
