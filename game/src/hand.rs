use crate::card::Card;
use crate::model::Money;

/// An ordered sequence of cards with blackjack scoring.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Self {
        Hand { cards: Vec::new() }
    }

    pub fn add(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Sum of card values with every Ace counted as 1.
    pub fn value(&self) -> u32 {
        self.cards.iter().map(Card::value).sum()
    }

    /// Re-derived from the current cards on every call: one more card can turn
    /// a soft hand hard.
    pub fn is_soft(&self) -> bool {
        self.value() < 12 && self.cards.iter().any(Card::is_ace)
    }

    /// `value()` with exactly one Ace promoted to 11 when the hand is soft.
    pub fn blackjack_value(&self) -> u32 {
        if self.is_soft() {
            self.value() + 10
        } else {
            self.value()
        }
    }

    pub fn is_bust(&self) -> bool {
        self.blackjack_value() > 21
    }

    /// Two cards totalling 21. Only meaningful for the initial deal; callers
    /// keep the result in a flag instead of asking again later.
    pub fn is_natural(&self) -> bool {
        self.cards.len() == 2 && self.blackjack_value() == 21
    }

    pub fn is_pair(&self) -> bool {
        match self.cards.as_slice() {
            [a, b] => a.rank() == b.rank(),
            _ => false,
        }
    }

    /// Dealer stands on 17 or more, except that a soft 17 still draws.
    pub fn dealer_must_hit(&self) -> bool {
        let total = self.blackjack_value();
        total < 17 || (total == 17 && self.is_soft())
    }
}

/// A player hand together with its betting state for one round.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RoundHand {
    hand: Hand,
    bet: Money,
    split: bool,
    doubled: bool,
    down_card: Option<Card>,
}

impl RoundHand {
    pub fn new(bet: Money) -> Self {
        RoundHand {
            hand: Hand::new(),
            bet,
            split: false,
            doubled: false,
            down_card: None,
        }
    }

    /// One half of a split pair, holding a single card.
    pub fn from_split(card: Card, bet: Money) -> Self {
        let mut hand = RoundHand::new(bet);
        hand.hand.add(card);
        hand.split = true;
        hand
    }

    pub fn hand(&self) -> &Hand {
        &self.hand
    }

    pub fn add(&mut self, card: Card) {
        self.hand.add(card);
    }

    pub fn bet(&self) -> Money {
        self.bet
    }

    pub fn is_split(&self) -> bool {
        self.split
    }

    pub fn is_doubled(&self) -> bool {
        self.doubled
    }

    /// Split Aces get their one follow-up card and no turn of their own.
    pub fn is_split_ace(&self) -> bool {
        self.is_split() && self.hand.cards().first().map_or(false, Card::is_ace)
    }

    pub fn can_split(&self, balance: Money) -> bool {
        !self.is_split() && !self.is_doubled() && self.hand.is_pair() && balance >= self.bet
    }

    /// Hard totals 9 to 11, or soft totals 19 to 21, on the first two cards.
    pub fn can_double(&self, balance: Money) -> bool {
        let total = self.hand.blackjack_value();
        let in_band = (9..=11).contains(&total) || (self.hand.is_soft() && (19..=21).contains(&total));
        !self.is_doubled() && self.hand.len() == 2 && in_band && balance >= self.bet
    }

    /// Doubles the stake and keeps the extra card face down until settlement.
    pub fn double_down(&mut self, card: Card) {
        self.bet += self.bet;
        self.doubled = true;
        self.down_card = Some(card);
    }

    /// Turns the face-down double card over, adding it to the hand.
    pub fn reveal_down_card(&mut self) -> Option<Card> {
        let card = self.down_card.take()?;
        self.hand.add(card);
        Some(card)
    }

    pub fn into_cards(self) -> Vec<Card> {
        self.hand.cards
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Rank::*, Suit::*, RANKS};

    fn hand(ranks: &[crate::card::Rank]) -> Hand {
        let mut h = Hand::new();
        for &r in ranks {
            h.add(Card::new(r, Hearts));
        }
        h
    }

    #[test]
    fn blackjack_value_matches_formula() {
        for &a in RANKS.iter() {
            for &b in RANKS.iter() {
                for &c in RANKS.iter() {
                    let h = hand(&[a, b, c]);
                    let sum = a.value() + b.value() + c.value();
                    let has_ace = [a, b, c].contains(&Ace);
                    let expected = if has_ace && sum < 12 { sum + 10 } else { sum };
                    assert_eq!(h.blackjack_value(), expected);
                }
            }
        }
    }

    #[test]
    fn soft_hand_turns_hard() {
        let mut h = hand(&[Ace, Six]);
        assert!(h.is_soft());
        assert_eq!(h.blackjack_value(), 17);
        h.add(Card::new(Nine, Clubs));
        assert!(!h.is_soft());
        assert_eq!(h.blackjack_value(), 16);
    }

    #[test]
    fn only_one_ace_is_promoted() {
        let h = hand(&[Ace, Ace, Nine]);
        assert_eq!(h.value(), 11);
        assert_eq!(h.blackjack_value(), 21);
    }

    #[test]
    fn clear_empties_the_hand() {
        let mut h = hand(&[Ace, Six]);
        assert!(!h.is_empty());
        h.clear();
        assert!(h.is_empty());
        assert_eq!(h.blackjack_value(), 0);
        assert!(!h.is_soft());
    }

    #[test]
    fn natural_needs_two_cards() {
        assert!(hand(&[Ace, King]).is_natural());
        assert!(!hand(&[Seven, Seven, Seven]).is_natural());
        assert!(!hand(&[Five, Six, Ten]).is_natural());
    }

    #[test]
    fn dealer_hits_soft_seventeen_only() {
        assert!(hand(&[Ace, Six]).dealer_must_hit());
        assert!(!hand(&[Ten, Seven]).dealer_must_hit());
        assert!(hand(&[Ten, Six]).dealer_must_hit());
        assert!(!hand(&[Ace, Seven]).dealer_must_hit());
        assert!(!hand(&[Ten, Six, King]).dealer_must_hit());
    }

    #[test]
    fn dealer_always_ends_on_seventeen_or_bust() {
        for &a in RANKS.iter() {
            for &b in RANKS.iter() {
                let mut h = hand(&[a, b]);
                let mut draws = RANKS.iter().cycle().skip(a.value() as usize);
                while h.dealer_must_hit() {
                    h.add(Card::new(*draws.next().unwrap(), Spades));
                }
                assert!(h.blackjack_value() >= 17);
            }
        }
    }

    #[test]
    fn double_down_bands() {
        let balance = Money::units(1000);
        let mut rh = RoundHand::new(Money::units(500));
        rh.add(Card::new(Five, Hearts));
        rh.add(Card::new(Four, Clubs));
        assert!(rh.can_double(balance));

        let mut soft = RoundHand::new(Money::units(500));
        soft.add(Card::new(Ace, Hearts));
        soft.add(Card::new(Eight, Clubs));
        assert!(soft.can_double(balance));

        let mut soft_thirteen = RoundHand::new(Money::units(500));
        soft_thirteen.add(Card::new(Ace, Hearts));
        soft_thirteen.add(Card::new(Two, Clubs));
        assert!(!soft_thirteen.can_double(balance));

        assert!(!rh.can_double(Money::units(499)));
    }

    #[test]
    fn split_once_per_original_hand() {
        let balance = Money::units(1000);
        let mut rh = RoundHand::new(Money::units(500));
        rh.add(Card::new(Eight, Hearts));
        rh.add(Card::new(Eight, Clubs));
        assert!(rh.can_split(balance));

        let mut half = RoundHand::from_split(Card::new(Eight, Hearts), Money::units(500));
        assert!(half.is_split());
        half.add(Card::new(Eight, Spades));
        assert!(!half.can_split(balance));
        assert!(!half.is_split_ace());
        assert!(RoundHand::from_split(Card::new(Ace, Hearts), Money::units(5)).is_split_ace());
    }

    #[test]
    fn down_card_revealed_once() {
        let mut rh = RoundHand::new(Money::units(500));
        rh.add(Card::new(Six, Hearts));
        rh.add(Card::new(Five, Clubs));
        rh.double_down(Card::new(King, Spades));
        assert!(rh.is_doubled());
        assert!(!rh.can_double(Money::units(1000)));
        assert_eq!(rh.bet(), Money::units(1000));
        assert_eq!(rh.hand().blackjack_value(), 11);
        assert_eq!(rh.reveal_down_card(), Some(Card::new(King, Spades)));
        assert_eq!(rh.hand().blackjack_value(), 21);
        assert_eq!(rh.reveal_down_card(), None);
    }
}
