//! One participant's side of the table.
//!
//! A session talks to its peer over a line transport and to its table over
//! the event channel handed out with its seat. It never touches the shoe
//! except during its own turn, when the table lends it.

use std::mem;

use futures::{Sink, SinkExt, Stream, StreamExt};
use log::{debug, info, warn};
use snafu::{ResultExt, Snafu};
use tokio_util::codec::LinesCodecError;

use crate::card::Card;
use crate::hand::{Hand, RoundHand};
use crate::model::{ClientId, Money};
use crate::protocol::{
    parse_bet, parse_yes_no, BetResponse, BlackjackReveal, ContinueResponse, InsuranceResponse,
    Phase, ServerMessage, Shown, TurnChoice, TurnOption,
};
use crate::settle::settle;
use crate::shoe::Shoe;
use crate::table::{Decision, EventRx, RoundPasses, Settings, TableEvent};

#[derive(Debug, Snafu)]
pub enum SessionError {
    #[snafu(display("peer disconnected"))]
    Disconnected,
    #[snafu(display("transport error: {}", source))]
    Transport { source: LinesCodecError },
    #[snafu(display("table closed while waiting for {}", expected))]
    TableClosed { expected: &'static str },
    #[snafu(display("table sent an event out of order; expected {}", expected))]
    OutOfOrder { expected: &'static str },
}

// How a hand's turn ended.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum HandEnd {
    Done,
    Split,
}

pub struct Session<T> {
    client: ClientId,
    lines: T,
    events: EventRx,
    minimum_bet: Money,
    balance: Money,
    hands: Vec<RoundHand>,
    blackjack: bool,
    insurance: Option<Money>,
    // the codec yields one `None` after skipping an overlong line.
    resyncing: bool,
}

impl<T> Session<T>
where
    T: Stream<Item = Result<String, LinesCodecError>> + Sink<String, Error = LinesCodecError> + Unpin,
{
    pub fn new(client: ClientId, lines: T, events: EventRx, settings: &Settings) -> Self {
        Session {
            client,
            lines,
            events,
            minimum_bet: Money::units(settings.minimum_bet),
            balance: Money::units(settings.starting_balance),
            hands: Vec::new(),
            blackjack: false,
            insurance: None,
            resyncing: false,
        }
    }

    /// Greets the peer, then plays every round the table starts until the
    /// participant leaves. Returns the final balance.
    pub async fn run(mut self) -> Result<Money, SessionError> {
        self.send(ServerMessage::Welcome).await?;
        self.send(ServerMessage::Waiting(Phase::Players)).await?;
        while let Some(event) = self.events.recv().await {
            let passes = match event {
                TableEvent::RoundStarted(passes) => passes,
                _ => return OutOfOrderSnafu { expected: "round start" }.fail(),
            };
            if self.play_round(passes).await? == Decision::Leave {
                break;
            }
        }
        info!("{} finished with {}", self.client, self.balance);
        Ok(self.balance)
    }

    async fn play_round(&mut self, passes: RoundPasses) -> Result<Decision, SessionError> {
        let RoundPasses {
            bets,
            insurance,
            turn_ready,
            decision,
        } = passes;
        self.hands.clear();
        self.blackjack = false;
        self.insurance = None;

        self.send(ServerMessage::NewRound {
            balance: self.balance,
        })
        .await?;
        let bet = self.take_bet().await?;
        self.hands.push(RoundHand::new(bet));
        self.send(ServerMessage::NewHand { index: 0 }).await?;
        self.send(ServerMessage::HandBet { index: 0, amount: bet }).await?;
        bets.arrive(());
        self.send(ServerMessage::Waiting(Phase::Bets)).await?;

        let (cards, dealer_up) = match self.next_event("deal").await? {
            TableEvent::Dealt { cards, dealer_up } => (cards, dealer_up),
            _ => return OutOfOrderSnafu { expected: "deal" }.fail(),
        };
        self.receive_deal(cards, dealer_up).await?;
        if dealer_up.is_ace() {
            self.offer_insurance().await?;
            self.send(ServerMessage::InsuranceBetDone).await?;
        }
        insurance.arrive(());
        self.send(ServerMessage::Waiting(Phase::Insurance)).await?;

        let dealer_blackjack = match self.next_event("dealer check").await? {
            TableEvent::DealerChecked { dealer_blackjack } => dealer_blackjack,
            _ => return OutOfOrderSnafu { expected: "dealer check" }.fail(),
        };
        self.reveal_naturals(dealer_up, dealer_blackjack).await?;
        turn_ready.arrive(());
        self.send(ServerMessage::Waiting(Phase::Turns)).await?;

        let (mut shoe, done) = match self.next_event("turn").await? {
            TableEvent::TakeTurn { shoe, done } => (shoe, done),
            _ => return OutOfOrderSnafu { expected: "turn" }.fail(),
        };
        let turn = if self.blackjack || dealer_blackjack {
            Ok(())
        } else {
            self.take_turn(&mut shoe).await
        };
        // the shoe goes back even when the peer failed mid-turn.
        done.send(shoe).ok();
        turn?;
        self.send(ServerMessage::Waiting(Phase::Dealer)).await?;

        let dealer = match self.next_event("dealer hand").await? {
            TableEvent::DealerFinished { dealer } => dealer,
            _ => return OutOfOrderSnafu { expected: "dealer hand" }.fail(),
        };
        self.settle_hands(&dealer, dealer_blackjack).await?;

        let choice = self.decide().await?;
        decision.arrive(choice);
        if choice == Decision::Continue {
            self.send(ServerMessage::Waiting(Phase::Decisions)).await?;
        }
        Ok(choice)
    }

    async fn take_bet(&mut self) -> Result<Money, SessionError> {
        loop {
            self.send(ServerMessage::GetBet {
                balance: self.balance,
                minimum: self.minimum_bet,
            })
            .await?;
            let line = self.receive().await?;
            match parse_bet(&line, self.balance, self.minimum_bet) {
                Ok(bet) => {
                    self.balance -= bet;
                    debug!("{} bet {}", self.client, bet);
                    self.send(ServerMessage::BetResponse(BetResponse::Success(self.balance)))
                        .await?;
                    return Ok(bet);
                }
                Err(rejection) => {
                    debug!("{} bet refused: {:?}", self.client, rejection);
                    self.send(ServerMessage::BetResponse(rejection.into())).await?;
                }
            }
        }
    }

    async fn receive_deal(&mut self, cards: [Card; 2], dealer_up: Card) -> Result<(), SessionError> {
        let [first, second] = cards;
        self.hands[0].add(first);
        self.hands[0].add(second);
        let hand = self.hands[0].hand();
        let value = hand.blackjack_value();
        self.blackjack = hand.is_natural();

        self.send(ServerMessage::NewPlayerCard {
            index: 0,
            card: Shown::Face(first),
        })
        .await?;
        self.send(ServerMessage::NewDealerCard(Shown::Face(dealer_up))).await?;
        self.send(ServerMessage::NewPlayerCard {
            index: 0,
            card: Shown::Face(second),
        })
        .await?;
        self.send(ServerMessage::NewDealerCard(Shown::Back)).await?;
        self.send(ServerMessage::HandValue { index: 0, value }).await
    }

    async fn offer_insurance(&mut self) -> Result<(), SessionError> {
        let stake = self.hands[0].bet().half();
        if self.balance < stake {
            return self.send(ServerMessage::CannotInsuranceBet).await;
        }
        loop {
            self.send(ServerMessage::GetInsuranceBet).await?;
            let line = self.receive().await?;
            let response = match parse_yes_no(&line) {
                Some(true) => {
                    self.balance -= stake;
                    self.insurance = Some(stake);
                    InsuranceResponse::Placed {
                        stake,
                        balance: self.balance,
                    }
                }
                Some(false) => InsuranceResponse::NotPlaced,
                None => InsuranceResponse::Error,
            };
            self.send(ServerMessage::InsuranceBetResponse(response)).await?;
            if response != InsuranceResponse::Error {
                return Ok(());
            }
        }
    }

    async fn reveal_naturals(&mut self, dealer_up: Card, dealer_blackjack: bool) -> Result<(), SessionError> {
        let reveal = match (self.blackjack, dealer_blackjack) {
            (true, true) => Some(BlackjackReveal::PlayerAndDealer),
            (true, false) => Some(BlackjackReveal::Player),
            (false, true) => Some(BlackjackReveal::Dealer),
            (false, false) if dealer_up.is_ace() => Some(BlackjackReveal::DealerNoBlackjack),
            (false, false) => None,
        };
        if let Some(reveal) = reveal {
            self.send(ServerMessage::Blackjack(reveal)).await?;
        }

        if let Some(stake) = self.insurance {
            if dealer_blackjack {
                let winnings = stake.scaled(2, 1);
                self.balance += stake + winnings;
                self.send(ServerMessage::InsuranceBetWon {
                    amount: winnings,
                    balance: self.balance,
                })
                .await?;
            } else {
                self.send(ServerMessage::InsuranceBetLost).await?;
            }
        }
        Ok(())
    }

    async fn take_turn(&mut self, shoe: &mut Shoe) -> Result<(), SessionError> {
        self.send(ServerMessage::TakeTurn).await?;
        // hands before `index` are finished; a split replaces the hand at
        // `index` with its two halves, and the left half is played next.
        let mut index = 0;
        while index < self.hands.len() {
            if self.hands[index].is_split_ace() {
                index += 1;
                continue;
            }
            if self.play_hand(index, shoe).await? == HandEnd::Done {
                index += 1;
            }
        }
        Ok(())
    }

    async fn play_hand(&mut self, index: usize, shoe: &mut Shoe) -> Result<HandEnd, SessionError> {
        loop {
            let option = self.turn_option(index);
            self.send(ServerMessage::TurnOption { option, index }).await?;
            let line = self.receive().await?;
            let choice = match TurnChoice::parse(&line).filter(|c| option.allows(*c)) {
                Some(choice) => choice,
                None => {
                    self.send(ServerMessage::TurnOptionError { index }).await?;
                    continue;
                }
            };
            match choice {
                TurnChoice::Stand => return Ok(HandEnd::Done),
                TurnChoice::Hit => {
                    let card = shoe.draw();
                    self.hands[index].add(card);
                    let value = self.hands[index].hand().blackjack_value();
                    self.send(ServerMessage::NewPlayerCard {
                        index,
                        card: Shown::Face(card),
                    })
                    .await?;
                    self.send(ServerMessage::HandValue { index, value }).await?;
                    if value > 21 {
                        self.send(ServerMessage::Bust { index }).await?;
                        return Ok(HandEnd::Done);
                    }
                }
                TurnChoice::DoubleDown => {
                    self.double_down(index, shoe).await?;
                    return Ok(HandEnd::Done);
                }
                TurnChoice::SplitPairs => {
                    self.split(index, shoe).await?;
                    return Ok(HandEnd::Split);
                }
            }
        }
    }

    fn turn_option(&self, index: usize) -> TurnOption {
        let hand = &self.hands[index];
        match (hand.can_split(self.balance), hand.can_double(self.balance)) {
            (true, true) => TurnOption::Both,
            (true, false) => TurnOption::SplitPairs,
            (false, true) => TurnOption::DoubleDown,
            (false, false) => TurnOption::Neither,
        }
    }

    async fn double_down(&mut self, index: usize, shoe: &mut Shoe) -> Result<(), SessionError> {
        self.balance -= self.hands[index].bet();
        let card = shoe.draw();
        self.hands[index].double_down(card);
        debug!("{} doubled hand {}", self.client, index);
        self.send(ServerMessage::DoubleDownResponse {
            index,
            balance: self.balance,
        })
        .await?;
        self.send(ServerMessage::HandBet {
            index,
            amount: self.hands[index].bet(),
        })
        .await?;
        self.send(ServerMessage::NewPlayerCard {
            index,
            card: Shown::Back,
        })
        .await
    }

    async fn split(&mut self, index: usize, shoe: &mut Shoe) -> Result<(), SessionError> {
        let original = self.hands.remove(index);
        let bet = original.bet();
        self.balance -= bet;
        debug!("{} split hand {}", self.client, index);
        self.send(ServerMessage::RemoveHand { index }).await?;
        self.send(ServerMessage::SplitPairsResponse {
            balance: self.balance,
        })
        .await?;

        for (offset, card) in original.into_cards().into_iter().enumerate() {
            let at = index + offset;
            self.hands.insert(at, RoundHand::from_split(card, bet));
            self.send(ServerMessage::NewHand { index: at }).await?;
            self.send(ServerMessage::HandBet { index: at, amount: bet }).await?;
            self.send(ServerMessage::NewPlayerCard {
                index: at,
                card: Shown::Face(card),
            })
            .await?;
        }
        for at in index..index + 2 {
            let card = shoe.draw();
            self.hands[at].add(card);
            let value = self.hands[at].hand().blackjack_value();
            self.send(ServerMessage::NewPlayerCard {
                index: at,
                card: Shown::Face(card),
            })
            .await?;
            self.send(ServerMessage::HandValue { index: at, value }).await?;
        }
        Ok(())
    }

    async fn settle_hands(&mut self, dealer: &Hand, dealer_blackjack: bool) -> Result<(), SessionError> {
        self.send(ServerMessage::SendResult).await?;
        self.send(ServerMessage::RemoveDealerFaceDownCard).await?;
        for &card in dealer.cards().iter().skip(1) {
            self.send(ServerMessage::NewDealerCard(Shown::Face(card))).await?;
        }
        self.send(ServerMessage::DealerHandValue {
            value: dealer.blackjack_value(),
        })
        .await?;

        for index in 0..self.hands.len() {
            if let Some(card) = self.hands[index].reveal_down_card() {
                let value = self.hands[index].hand().blackjack_value();
                self.send(ServerMessage::RemoveDoubleDownFaceDownCard { index }).await?;
                self.send(ServerMessage::NewPlayerCard {
                    index,
                    card: Shown::Face(card),
                })
                .await?;
                self.send(ServerMessage::HandValue { index, value }).await?;
            }
            let hand = &self.hands[index];
            let outcome = settle(hand.hand(), hand.bet(), self.blackjack, dealer, dealer_blackjack);
            self.balance += outcome.credit;
            debug!(
                "{} hand {}: {:?} {:?}, credited {}",
                self.client, index, outcome.kind, outcome.winner, outcome.credit
            );
            self.send(ServerMessage::RoundResult {
                kind: outcome.kind,
                winner: outcome.winner,
                index,
                balance: self.balance,
            })
            .await?;
        }
        Ok(())
    }

    async fn decide(&mut self) -> Result<Decision, SessionError> {
        if self.balance < self.minimum_bet {
            info!("{} can no longer cover the minimum bet", self.client);
            self.send(ServerMessage::GameOver {
                balance: self.balance,
            })
            .await?;
            return Ok(Decision::Leave);
        }
        loop {
            self.send(ServerMessage::GetContinuePlaying).await?;
            let line = self.receive().await?;
            match parse_yes_no(&line) {
                Some(true) => {
                    self.send(ServerMessage::ContinuePlayingResponse(ContinueResponse::Continue))
                        .await?;
                    return Ok(Decision::Continue);
                }
                Some(false) => {
                    self.send(ServerMessage::GameOver {
                        balance: self.balance,
                    })
                    .await?;
                    return Ok(Decision::Leave);
                }
                None => {
                    self.send(ServerMessage::ContinuePlayingResponse(ContinueResponse::Error))
                        .await?;
                }
            }
        }
    }

    async fn next_event(&mut self, expected: &'static str) -> Result<TableEvent, SessionError> {
        match self.events.recv().await {
            Some(event) => Ok(event),
            None => TableClosedSnafu { expected }.fail(),
        }
    }

    async fn send(&mut self, message: ServerMessage) -> Result<(), SessionError> {
        self.lines.send(message.to_string()).await.context(TransportSnafu)
    }

    /// Reads the next reply. An overlong line is answered like any other
    /// unparseable reply, so the current prompt repeats.
    async fn receive(&mut self) -> Result<String, SessionError> {
        loop {
            match self.lines.next().await {
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    warn!("{} sent an overlong line", self.client);
                    self.resyncing = true;
                    return Ok(String::new());
                }
                Some(line) => {
                    self.resyncing = false;
                    return line.context(TransportSnafu);
                }
                None if mem::take(&mut self.resyncing) => continue,
                None => return DisconnectedSnafu.fail(),
            }
        }
    }
}
