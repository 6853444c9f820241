use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::card::{self, Card};

/// The shuffled pool of cards built from several standard decks.
///
/// Cards are dealt from the end of the pool, so its size strictly decreases
/// by one per draw until a reshuffle replaces the pool wholesale.
pub struct Shoe {
    decks: usize,
    cards: Vec<Card>,
    rng: StdRng,
}

impl Shoe {
    /// A freshly shuffled shoe of `decks` decks (at least one).
    pub fn new(decks: usize) -> Self {
        Self::with_rng(decks, StdRng::from_entropy())
    }

    /// Like `new`, but with reproducible shuffles.
    pub fn seeded(decks: usize, seed: u64) -> Self {
        Self::with_rng(decks, StdRng::seed_from_u64(seed))
    }

    /// A shoe that deals `cards` in the given order before falling back to
    /// shuffled decks.
    pub fn stacked<I>(decks: usize, cards: I) -> Self
    where
        I: IntoIterator<Item = Card>,
    {
        let mut cards: Vec<Card> = cards.into_iter().collect();
        cards.reverse();
        Shoe {
            decks: decks.max(1),
            cards,
            rng: StdRng::from_entropy(),
        }
    }

    /// An exhausted shoe, rebuilt on its first draw.
    pub fn empty(decks: usize) -> Self {
        Self::stacked(decks, Vec::new())
    }

    fn with_rng(decks: usize, rng: StdRng) -> Self {
        let mut shoe = Shoe {
            decks: decks.max(1),
            cards: Vec::new(),
            rng,
        };
        shoe.reshuffle();
        shoe
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn full_size(&self) -> usize {
        self.decks * 52
    }

    /// Removes one card, or `None` when the pool is exhausted.
    pub fn deal(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    /// Removes one card, rebuilding the pool first if it is exhausted.
    pub fn draw(&mut self) -> Card {
        loop {
            if let Some(card) = self.deal() {
                return card;
            }
            debug!("shoe exhausted mid-round; rebuilding");
            self.reshuffle();
        }
    }

    /// Discards the pool and builds a freshly shuffled one.
    pub fn reshuffle(&mut self) {
        let mut cards: Vec<Card> = (0..self.decks).flat_map(|_| card::deck()).collect();
        cards.shuffle(&mut self.rng);
        self.cards = cards;
    }

    /// Reshuffles when no more than `threshold` cards remain. Returns whether
    /// it did.
    pub fn reshuffle_if_low(&mut self, threshold: usize) -> bool {
        if self.remaining() <= threshold {
            self.reshuffle();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Rank, Suit};

    #[test]
    fn each_draw_removes_exactly_one() {
        let mut shoe = Shoe::seeded(2, 7);
        assert_eq!(shoe.remaining(), 104);
        for expected in (0..104).rev() {
            shoe.draw();
            assert_eq!(shoe.remaining(), expected);
        }
        assert_eq!(shoe.deal(), None);
    }

    #[test]
    fn empty_draw_rebuilds_before_drawing() {
        let mut shoe = Shoe::empty(1);
        assert_eq!(shoe.remaining(), 0);
        shoe.draw();
        assert_eq!(shoe.remaining(), 51);
    }

    #[test]
    fn reshuffle_respects_threshold() {
        let mut shoe = Shoe::seeded(1, 3);
        for _ in 0..40 {
            shoe.draw();
        }
        assert!(!shoe.reshuffle_if_low(11));
        assert_eq!(shoe.remaining(), 12);
        assert!(shoe.reshuffle_if_low(12));
        assert_eq!(shoe.remaining(), shoe.full_size());
    }

    #[test]
    fn shoe_holds_every_deck() {
        let mut shoe = Shoe::seeded(3, 11);
        let mut aces_of_spades = 0;
        while let Some(card) = shoe.deal() {
            if card == Card::new(Rank::Ace, Suit::Spades) {
                aces_of_spades += 1;
            }
        }
        assert_eq!(aces_of_spades, 3);
    }

    #[test]
    fn stacked_deals_in_order() {
        let first = Card::new(Rank::Six, Suit::Clubs);
        let second = Card::new(Rank::Ten, Suit::Spades);
        let mut shoe = Shoe::stacked(1, vec![first, second]);
        assert_eq!(shoe.draw(), first);
        assert_eq!(shoe.draw(), second);
        shoe.draw();
        assert_eq!(shoe.remaining(), 51);
    }
}
