use std::net::SocketAddr;

use log::{debug, info, warn};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LinesCodec};

use netjack_game::model::ClientId;
use netjack_game::protocol::MAX_LINE_LENGTH;
use netjack_game::table::EventRx;
use netjack_game::{Session, SessionError, Settings};

/// Runs one participant's session until it ends or the server stops.
pub fn spawn(
    id: ClientId,
    stream: TcpStream,
    addr: SocketAddr,
    events: EventRx,
    game: Settings,
    mut stopped_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let lines = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
        let session = Session::new(id, lines, events, &game);
        tokio::select! {
            result = session.run() => match result {
                Ok(balance) => info!("{} ({}) left with {}", id, addr, balance),
                Err(SessionError::Disconnected) => info!("{} ({}) disconnected", id, addr),
                Err(e) => warn!("while handling {} ({}): {}", id, addr, e),
            },
            _ = stopped_rx.changed() => {
                debug!("received notification to stop processing {}", addr);
            },
        }
    })
}
