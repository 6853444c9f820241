use std::cmp::Ordering;

use crate::hand::Hand;
use crate::model::Money;

/// What decided a hand's outcome.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResultKind {
    Bust,
    Normal,
    Blackjack,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Winner {
    Tie,
    Dealer,
    Player,
}

/// The outcome of one player hand against the dealer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Settlement {
    pub kind: ResultKind,
    pub winner: Winner,
    /// Amount returned to the balance. The stake was withheld when it was bet.
    pub credit: Money,
}

/// Settles one hand. Naturals override busts and totals; a bust on both sides
/// is a push.
pub fn settle(
    hand: &Hand,
    stake: Money,
    player_natural: bool,
    dealer: &Hand,
    dealer_natural: bool,
) -> Settlement {
    use ResultKind::*;
    use Winner::*;

    let (kind, winner) = match (player_natural, dealer_natural) {
        (true, true) => (Blackjack, Tie),
        (false, true) => (Blackjack, Dealer),
        (true, false) => (Blackjack, Player),
        (false, false) => match (hand.is_bust(), dealer.is_bust()) {
            (true, true) => (Bust, Tie),
            (true, false) => (Bust, Dealer),
            (false, true) => (Bust, Player),
            (false, false) => match hand.blackjack_value().cmp(&dealer.blackjack_value()) {
                Ordering::Greater => (Normal, Player),
                Ordering::Less => (Normal, Dealer),
                Ordering::Equal => (Normal, Tie),
            },
        },
    };
    let credit = match (kind, winner) {
        (_, Tie) => stake,
        (_, Dealer) => Money::ZERO,
        (Blackjack, Player) => stake.scaled(5, 2),
        (_, Player) => stake.scaled(2, 1),
    };
    Settlement {
        kind,
        winner,
        credit,
    }
}
