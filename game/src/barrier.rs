//! A single-use rendezvous for one phase of a round.
//!
//! The coordinator holds the `PhaseBarrier`; each seated session holds one
//! `Arrival`. Arriving consumes the token, so a party cannot signal twice.
//! A token dropped without arriving (the session task ended) shows up as
//! `None` in the coordinator's result instead of stalling it.

use futures::future::join_all;
use tokio::sync::oneshot;

pub struct PhaseBarrier<T> {
    arrivals: Vec<oneshot::Receiver<T>>,
}

pub struct Arrival<T> {
    tx: oneshot::Sender<T>,
}

/// Creates a barrier for `parties` sessions, with their tokens in seat order.
pub fn phase_barrier<T>(parties: usize) -> (PhaseBarrier<T>, Vec<Arrival<T>>) {
    let (tokens, arrivals): (Vec<_>, Vec<_>) = (0..parties)
        .map(|_| {
            let (tx, rx) = oneshot::channel();
            (Arrival { tx }, rx)
        })
        .unzip();
    (PhaseBarrier { arrivals }, tokens)
}

impl<T> PhaseBarrier<T> {
    pub fn parties(&self) -> usize {
        self.arrivals.len()
    }

    /// Waits until every party has arrived or departed.
    pub async fn wait(self) -> Vec<Option<T>> {
        join_all(self.arrivals)
            .await
            .into_iter()
            .map(Result::ok)
            .collect()
    }
}

impl<T> Arrival<T> {
    pub fn arrive(self, value: T) {
        // the coordinator only goes away when the whole table does.
        self.tx.send(value).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn waits_for_every_party() {
        let (barrier, tokens) = phase_barrier::<u32>(3);
        assert_eq!(barrier.parties(), 3);
        let handles: Vec<_> = tokens
            .into_iter()
            .enumerate()
            .map(|(i, token)| {
                tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    token.arrive(i as u32 * 10);
                })
            })
            .collect();
        assert_eq!(barrier.wait().await, vec![Some(0), Some(10), Some(20)]);
        for h in handles {
            h.await.expect("party task");
        }
    }

    #[tokio::test]
    async fn dropped_token_is_a_departure() {
        let (barrier, mut tokens) = phase_barrier::<()>(2);
        let second = tokens.pop().expect("two tokens");
        drop(tokens);
        second.arrive(());
        assert_eq!(barrier.wait().await, vec![None, Some(())]);
    }

    #[tokio::test]
    async fn empty_barrier_releases_immediately() {
        let (barrier, tokens) = phase_barrier::<()>(0);
        assert!(tokens.is_empty());
        assert!(barrier.wait().await.is_empty());
    }
}
