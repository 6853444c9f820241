//! The line-oriented wire catalog.
//!
//! Each server message renders to one line of fields joined by `SEPARATOR`,
//! discriminator first. Enumerated fields map to wire text through explicit
//! tables, never through identifier names.

use std::fmt;

use crate::card::Card;
use crate::model::Money;
use crate::settle::{ResultKind, Winner};

pub const SEPARATOR: &str = "--";

/// Longest client line a session accepts.
pub const MAX_LINE_LENGTH: usize = 256;

/// A table phase a session may be waiting on.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    Players,
    Bets,
    Insurance,
    Turns,
    Dealer,
    Decisions,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BetResponse {
    Invalid,
    TooMuch,
    Minimum,
    Success(Money),
}

/// A card as shown to the client; the face-down side hides it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Shown {
    Face(Card),
    Back,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BlackjackReveal {
    Player,
    Dealer,
    PlayerAndDealer,
    DealerNoBlackjack,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum InsuranceResponse {
    Error,
    Placed { stake: Money, balance: Money },
    NotPlaced,
}

/// The choices offered for a hand at the start of each decision.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TurnOption {
    Both,
    SplitPairs,
    DoubleDown,
    Neither,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ContinueResponse {
    Error,
    Continue,
}

/// Every message the server sends to a client.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ServerMessage {
    Welcome,
    Waiting(Phase),
    NewRound { balance: Money },
    GameOver { balance: Money },
    GetBet { balance: Money, minimum: Money },
    BetResponse(BetResponse),
    NewHand { index: usize },
    RemoveHand { index: usize },
    NewPlayerCard { index: usize, card: Shown },
    HandValue { index: usize, value: u32 },
    HandBet { index: usize, amount: Money },
    NewDealerCard(Shown),
    Blackjack(BlackjackReveal),
    GetInsuranceBet,
    InsuranceBetResponse(InsuranceResponse),
    CannotInsuranceBet,
    InsuranceBetWon { amount: Money, balance: Money },
    InsuranceBetLost,
    InsuranceBetDone,
    TakeTurn,
    TurnOption { option: TurnOption, index: usize },
    TurnOptionError { index: usize },
    Bust { index: usize },
    SplitPairsResponse { balance: Money },
    DoubleDownResponse { index: usize, balance: Money },
    SendResult,
    RemoveDealerFaceDownCard,
    DealerHandValue { value: u32 },
    RemoveDoubleDownFaceDownCard { index: usize },
    RoundResult {
        kind: ResultKind,
        winner: Winner,
        index: usize,
        balance: Money,
    },
    GetContinuePlaying,
    ContinuePlayingResponse(ContinueResponse),
}

impl Phase {
    fn wire(self) -> &'static str {
        match self {
            Phase::Players => "PLAYERS",
            Phase::Bets => "BETS",
            Phase::Insurance => "INSURANCE",
            Phase::Turns => "TURNS",
            Phase::Dealer => "DEALER",
            Phase::Decisions => "DECISIONS",
        }
    }
}

impl BlackjackReveal {
    fn wire(self) -> &'static str {
        match self {
            BlackjackReveal::Player => "PLAYER",
            BlackjackReveal::Dealer => "DEALER",
            BlackjackReveal::PlayerAndDealer => "PLAYERANDDEALER",
            BlackjackReveal::DealerNoBlackjack => "DEALERNOBLACKJACK",
        }
    }
}

impl TurnOption {
    fn wire(self) -> &'static str {
        match self {
            TurnOption::Both => "BOTH",
            TurnOption::SplitPairs => "SPLITPAIRS",
            TurnOption::DoubleDown => "DOUBLEDOWN",
            TurnOption::Neither => "NEITHER",
        }
    }

    /// Whether a reply is one of the choices this option offers.
    pub fn allows(self, choice: TurnChoice) -> bool {
        match choice {
            TurnChoice::Hit | TurnChoice::Stand => true,
            TurnChoice::SplitPairs => matches!(self, TurnOption::Both | TurnOption::SplitPairs),
            TurnChoice::DoubleDown => matches!(self, TurnOption::Both | TurnOption::DoubleDown),
        }
    }
}

fn result_kind(kind: ResultKind) -> &'static str {
    match kind {
        ResultKind::Bust => "BUST",
        ResultKind::Normal => "NORMAL",
        ResultKind::Blackjack => "BLACKJACK",
    }
}

fn winner(winner: Winner) -> &'static str {
    match winner {
        Winner::Tie => "TIE",
        Winner::Dealer => "DEALER",
        Winner::Player => "PLAYER",
    }
}

impl fmt::Display for Shown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shown::Face(card) => fmt::Display::fmt(card, f),
            Shown::Back => f.write_str("back"),
        }
    }
}

impl ServerMessage {
    fn fields(&self) -> Vec<String> {
        fn f<T: ToString>(t: T) -> String {
            t.to_string()
        }

        match self {
            Self::Welcome => vec![f("WELCOME")],
            Self::Waiting(phase) => vec![f("WAITING"), f(phase.wire())],
            Self::NewRound { balance } => vec![f("NEWROUND"), f(balance)],
            Self::GameOver { balance } => vec![f("GAMEOVER"), f(balance)],
            Self::GetBet { balance, minimum } => vec![f("GETBET"), f(balance), f(minimum)],
            Self::BetResponse(response) => {
                let mut fields = vec![f("BETRESPONSE")];
                match response {
                    BetResponse::Invalid => fields.push(f("INVALID")),
                    BetResponse::TooMuch => fields.push(f("TOOMUCH")),
                    BetResponse::Minimum => fields.push(f("MINIMUM")),
                    BetResponse::Success(balance) => {
                        fields.push(f("SUCCESS"));
                        fields.push(f(balance));
                    }
                }
                fields
            }
            Self::NewHand { index } => vec![f("NEWHAND"), f(index)],
            Self::RemoveHand { index } => vec![f("REMOVEHAND"), f(index)],
            Self::NewPlayerCard { index, card } => vec![f("NEWPLAYERCARD"), f(index), f(card)],
            Self::HandValue { index, value } => vec![f("HANDVALUE"), f(index), f(value)],
            Self::HandBet { index, amount } => vec![f("HANDBET"), f(index), f(amount)],
            Self::NewDealerCard(card) => vec![f("NEWDEALERCARD"), f(card)],
            Self::Blackjack(reveal) => vec![f("BLACKJACK"), f(reveal.wire())],
            Self::GetInsuranceBet => vec![f("GETINSURANCEBET")],
            Self::InsuranceBetResponse(response) => {
                let mut fields = vec![f("INSURANCEBETRESPONSE")];
                match response {
                    InsuranceResponse::Error => fields.push(f("ERROR")),
                    InsuranceResponse::Placed { stake, balance } => {
                        fields.extend(vec![f("PLACED"), f(stake), f(balance)]);
                    }
                    InsuranceResponse::NotPlaced => fields.push(f("NOTPLACED")),
                }
                fields
            }
            Self::CannotInsuranceBet => vec![f("CANNOTINSURANCEBET")],
            Self::InsuranceBetWon { amount, balance } => {
                vec![f("INSURANCEBETWON"), f(amount), f(balance)]
            }
            Self::InsuranceBetLost => vec![f("INSURANCEBETLOST")],
            Self::InsuranceBetDone => vec![f("INSURANCEBETDONE")],
            Self::TakeTurn => vec![f("TAKETURN")],
            Self::TurnOption { option, index } => vec![f("TURNOPTION"), f(option.wire()), f(index)],
            Self::TurnOptionError { index } => vec![f("TURNOPTIONERROR"), f(index)],
            Self::Bust { index } => vec![f("BUST"), f(index)],
            Self::SplitPairsResponse { balance } => {
                vec![f("SPLITPAIRSRESPONSE"), f("SUCCESS"), f(balance)]
            }
            Self::DoubleDownResponse { index, balance } => {
                vec![f("DOUBLEDOWNRESPONSE"), f("SUCCESS"), f(index), f(balance)]
            }
            Self::SendResult => vec![f("SENDRESULT")],
            Self::RemoveDealerFaceDownCard => vec![f("REMOVEDEALERFACEDOWNCARD")],
            Self::DealerHandValue { value } => vec![f("DEALERHANDVALUE"), f(value)],
            Self::RemoveDoubleDownFaceDownCard { index } => {
                vec![f("REMOVEDOUBLEDOWNFACEDOWNCARD"), f(index)]
            }
            Self::RoundResult {
                kind,
                winner: who,
                index,
                balance,
            } => vec![
                f("ROUNDRESULT"),
                f(result_kind(*kind)),
                f(winner(*who)),
                f(index),
                f(balance),
            ],
            Self::GetContinuePlaying => vec![f("GETCONTINUEPLAYING")],
            Self::ContinuePlayingResponse(response) => vec![
                f("CONTINUEPLAYINGRESPONSE"),
                f(match response {
                    ContinueResponse::Error => "ERROR",
                    ContinueResponse::Continue => "CONTINUE",
                }),
            ],
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fields().join(SEPARATOR))
    }
}

/// A player's reply during a hand's turn.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TurnChoice {
    Hit,
    Stand,
    SplitPairs,
    DoubleDown,
}

impl TurnChoice {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_uppercase().as_str() {
            "HIT" => Some(TurnChoice::Hit),
            "STAND" => Some(TurnChoice::Stand),
            "SPLITPAIRS" => Some(TurnChoice::SplitPairs),
            "DOUBLEDOWN" => Some(TurnChoice::DoubleDown),
            _ => None,
        }
    }
}

/// Parses a yes/no reply, as used by the insurance and continue prompts.
pub fn parse_yes_no(line: &str) -> Option<bool> {
    match line.trim().to_ascii_uppercase().as_str() {
        "YES" => Some(true),
        "NO" => Some(false),
        _ => None,
    }
}

/// Why a bet line was refused.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BetRejection {
    NotANumber,
    ExceedsBalance,
    BelowMinimum,
}

/// Validates a bet line against the balance and the table minimum.
pub fn parse_bet(line: &str, balance: Money, minimum: Money) -> Result<Money, BetRejection> {
    let digits = line.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BetRejection::NotANumber);
    }
    let bet = match digits.parse::<u32>() {
        Ok(0) => return Err(BetRejection::NotANumber),
        Ok(units) => Money::units(units),
        // all digits, so the only failure left is overflow.
        Err(_) => return Err(BetRejection::ExceedsBalance),
    };
    if bet > balance {
        Err(BetRejection::ExceedsBalance)
    } else if bet < minimum {
        Err(BetRejection::BelowMinimum)
    } else {
        Ok(bet)
    }
}

impl From<BetRejection> for BetResponse {
    fn from(r: BetRejection) -> Self {
        match r {
            BetRejection::NotANumber => BetResponse::Invalid,
            BetRejection::ExceedsBalance => BetResponse::TooMuch,
            BetRejection::BelowMinimum => BetResponse::Minimum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Rank, Suit};

    #[test]
    fn lines_join_fields_in_order() {
        let msg = ServerMessage::GetBet {
            balance: Money::units(2500),
            minimum: Money::units(500),
        };
        assert_eq!(msg.to_string(), "GETBET--2500.00--500.00");

        let msg = ServerMessage::RoundResult {
            kind: ResultKind::Blackjack,
            winner: Winner::Player,
            index: 0,
            balance: Money::units(3250),
        };
        assert_eq!(msg.to_string(), "ROUNDRESULT--BLACKJACK--PLAYER--0--3250.00");

        let card = Shown::Face(Card::new(Rank::Queen, Suit::Hearts));
        let msg = ServerMessage::NewPlayerCard { index: 1, card };
        assert_eq!(msg.to_string(), "NEWPLAYERCARD--1--QH");
        assert_eq!(ServerMessage::NewDealerCard(Shown::Back).to_string(), "NEWDEALERCARD--back");
        assert_eq!(
            ServerMessage::BetResponse(BetResponse::TooMuch).to_string(),
            "BETRESPONSE--TOOMUCH"
        );
    }

    #[test]
    fn bet_validation() {
        let balance = Money::units(2500);
        let minimum = Money::units(500);
        assert_eq!(parse_bet("abc", balance, minimum), Err(BetRejection::NotANumber));
        assert_eq!(parse_bet("-5", balance, minimum), Err(BetRejection::NotANumber));
        assert_eq!(parse_bet("0", balance, minimum), Err(BetRejection::NotANumber));
        assert_eq!(parse_bet("12.5", balance, minimum), Err(BetRejection::NotANumber));
        assert_eq!(parse_bet("3000", balance, minimum), Err(BetRejection::ExceedsBalance));
        assert_eq!(parse_bet("499", balance, minimum), Err(BetRejection::BelowMinimum));
        assert_eq!(parse_bet(" 500 ", balance, minimum), Ok(Money::units(500)));
    }

    #[test]
    fn bet_must_be_plain_digits() {
        let balance = Money::units(2500);
        let minimum = Money::units(500);
        assert_eq!(parse_bet("+500", balance, minimum), Err(BetRejection::NotANumber));
        assert_eq!(parse_bet("", balance, minimum), Err(BetRejection::NotANumber));
        assert_eq!(parse_bet("000", balance, minimum), Err(BetRejection::NotANumber));
        assert_eq!(parse_bet("5000000000", balance, minimum), Err(BetRejection::ExceedsBalance));
        assert_eq!(parse_bet("0500", balance, minimum), Ok(Money::units(500)));
    }

    #[test]
    fn turn_options_gate_choices() {
        assert!(TurnOption::Both.allows(TurnChoice::SplitPairs));
        assert!(TurnOption::Both.allows(TurnChoice::DoubleDown));
        assert!(!TurnOption::SplitPairs.allows(TurnChoice::DoubleDown));
        assert!(!TurnOption::DoubleDown.allows(TurnChoice::SplitPairs));
        assert!(TurnOption::Neither.allows(TurnChoice::Stand));
        assert!(!TurnOption::Neither.allows(TurnChoice::DoubleDown));
        assert_eq!(TurnChoice::parse("hit\r"), Some(TurnChoice::Hit));
        assert_eq!(TurnChoice::parse("fold"), None);
        assert_eq!(parse_yes_no(" yes"), Some(true));
        assert_eq!(parse_yes_no("maybe"), None);
    }
}
