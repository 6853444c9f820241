//! The round coordinator.
//!
//! A table owns the shoe and the dealer's hand and drives every seated
//! session through the phases of a round. Sessions are only ever reached
//! through their event channel; the coordinator learns of their progress
//! through one `PhaseBarrier` per phase, allocated fresh each round.

use std::mem;

use log::{debug, info, warn};
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};

use crate::barrier::{phase_barrier, Arrival};
use crate::card::Card;
use crate::hand::Hand;
use crate::model::{ClientId, TableId};
use crate::shoe::Shoe;

#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub players_per_table: usize,
    pub starting_balance: u32,
    pub minimum_bet: u32,
    pub decks: usize,
    pub reshuffle_threshold: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            players_per_table: 2,
            starting_balance: 2500,
            minimum_bet: 500,
            decks: 6,
            reshuffle_threshold: 52,
        }
    }
}

/// Everything the coordinator tells a session, in the order it tells it.
pub enum TableEvent {
    RoundStarted(RoundPasses),
    Dealt { cards: [Card; 2], dealer_up: Card },
    DealerChecked { dealer_blackjack: bool },
    /// The session holds the shoe until it sends it back through `done`.
    TakeTurn { shoe: Shoe, done: oneshot::Sender<Shoe> },
    DealerFinished { dealer: Hand },
}

/// A session's tokens for the barriers of one round.
pub struct RoundPasses {
    pub bets: Arrival<()>,
    pub insurance: Arrival<()>,
    pub turn_ready: Arrival<()>,
    pub decision: Arrival<Decision>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Decision {
    Continue,
    Leave,
}

/// The sender half for events to a session.
pub type EventTx = mpsc::UnboundedSender<TableEvent>;

/// The receiver half for events to a session.
pub type EventRx = mpsc::UnboundedReceiver<TableEvent>;

/// The coordinator's handle on one seated session.
pub struct Seat {
    client: ClientId,
    events: EventTx,
}

/// Creates a seat for `client`, and the receiver its session listens on.
pub fn seat(client: ClientId) -> (Seat, EventRx) {
    let (events, rx) = mpsc::unbounded_channel();
    (Seat { client, events }, rx)
}

impl Seat {
    pub fn client(&self) -> ClientId {
        self.client
    }

    fn notify(&self, event: TableEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TableStats {
    pub rounds_played: u64,
}

pub struct Table {
    id: TableId,
    settings: Settings,
    shoe: Shoe,
    dealer: Hand,
    seats: Vec<Seat>,
    rounds: u64,
}

impl Table {
    pub fn new(id: TableId, settings: Settings, seats: Vec<Seat>) -> Self {
        Self::with_shoe(id, settings, seats, Shoe::new(settings.decks))
    }

    pub fn with_shoe(id: TableId, settings: Settings, seats: Vec<Seat>, shoe: Shoe) -> Self {
        Table {
            id,
            settings,
            shoe,
            dealer: Hand::new(),
            seats,
            rounds: 0,
        }
    }

    /// Plays rounds until every seat has left.
    pub async fn run(mut self) -> TableStats {
        info!("{} opened with {} seats", self.id, self.seats.len());
        while !self.seats.is_empty() {
            self.play_round().await;
        }
        info!("{} closed after {} rounds", self.id, self.rounds);
        TableStats {
            rounds_played: self.rounds,
        }
    }

    async fn play_round(&mut self) {
        self.rounds += 1;
        let parties = self.seats.len();
        info!(
            "{} starting round {} with {} seats",
            self.id, self.rounds, parties
        );

        // setup
        if self.shoe.reshuffle_if_low(self.settings.reshuffle_threshold) {
            debug!("{} reshuffled the shoe", self.id);
        }
        self.dealer.clear();
        let (bets, bet_passes) = phase_barrier(parties);
        let (insurance, insurance_passes) = phase_barrier(parties);
        let (turn_ready, turn_passes) = phase_barrier(parties);
        let (decisions, decision_passes) = phase_barrier(parties);

        // start
        let passes = bet_passes
            .into_iter()
            .zip(insurance_passes)
            .zip(turn_passes)
            .zip(decision_passes);
        for (seat, (((bets, insurance), turn_ready), decision)) in self.seats.iter().zip(passes) {
            seat.notify(TableEvent::RoundStarted(RoundPasses {
                bets,
                insurance,
                turn_ready,
                decision,
            }));
        }
        let mut present = vec![true; parties];

        self.mark_departures(&mut present, bets.wait().await);
        debug!("{} bets placed", self.id);
        self.deal(&present);

        self.mark_departures(&mut present, insurance.wait().await);
        debug!("{} insurance placed", self.id);
        let dealer_blackjack = self.dealer.is_natural();
        self.notify_present(&present, || TableEvent::DealerChecked { dealer_blackjack });

        self.mark_departures(&mut present, turn_ready.wait().await);
        // one session at a time holds the shoe.
        for index in 0..parties {
            if present[index] && !self.hand_over_turn(index).await {
                present[index] = false;
            }
        }

        while self.dealer.dealer_must_hit() {
            let card = self.shoe.draw();
            self.dealer.add(card);
        }
        debug!(
            "{} dealer stands with {}",
            self.id,
            self.dealer.blackjack_value()
        );
        let dealer = &self.dealer;
        for (seat, _) in self.seats.iter().zip(&present).filter(|&(_, &p)| p) {
            seat.notify(TableEvent::DealerFinished {
                dealer: dealer.clone(),
            });
        }

        let decisions = decisions.wait().await;
        let staying: Vec<bool> = present
            .iter()
            .zip(decisions)
            .map(|(&p, d)| p && d == Some(Decision::Continue))
            .collect();
        let id = self.id;
        let mut staying = staying.into_iter();
        self.seats.retain(|seat| {
            let stays = staying.next().unwrap_or(false);
            if !stays {
                info!("{} left {}", seat.client, id);
            }
            stays
        });
    }

    fn mark_departures<T>(&self, present: &mut [bool], arrivals: Vec<Option<T>>) {
        for ((here, arrival), seat) in present.iter_mut().zip(arrivals).zip(&self.seats) {
            if *here && arrival.is_none() {
                warn!("{} departed {} mid-round", seat.client, self.id);
                *here = false;
            }
        }
    }

    fn notify_present<F>(&self, present: &[bool], event: F)
    where
        F: Fn() -> TableEvent,
    {
        for (seat, _) in self.seats.iter().zip(present).filter(|&(_, &p)| p) {
            seat.notify(event());
        }
    }

    // Two cards each, alternating dealer then seats in seating order.
    fn deal(&mut self, present: &[bool]) {
        let dealer_up = self.shoe.draw();
        self.dealer.add(dealer_up);
        let mut firsts = Vec::with_capacity(present.len());
        for (index, _) in present.iter().enumerate().filter(|&(_, &p)| p) {
            firsts.push((index, self.shoe.draw()));
        }
        let hole = self.shoe.draw();
        self.dealer.add(hole);
        for (index, first) in firsts {
            let second = self.shoe.draw();
            self.seats[index].notify(TableEvent::Dealt {
                cards: [first, second],
                dealer_up,
            });
        }
    }

    // Lends the shoe to one session for its whole turn. Returns false if the
    // session has gone.
    async fn hand_over_turn(&mut self, index: usize) -> bool {
        let shoe = mem::replace(&mut self.shoe, Shoe::empty(self.settings.decks));
        let (done, returned) = oneshot::channel();
        let seat = &self.seats[index];
        if let Err(mpsc::error::SendError(event)) = seat.events.send(TableEvent::TakeTurn { shoe, done }) {
            if let TableEvent::TakeTurn { shoe, .. } = event {
                self.shoe = shoe;
            }
            return false;
        }
        match returned.await {
            Ok(shoe) => {
                self.shoe = shoe;
                true
            }
            Err(_) => {
                warn!(
                    "{} never returned the shoe to {}; continuing with a fresh one",
                    seat.client, self.id
                );
                false
            }
        }
    }
}
