use super::{PlaylistItem, ShuffleMode};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Largest rating weighted shuffle distinguishes; keeps the weight sum finite
const MAX_RATING: f64 = 1e6;

/// Navigable list of items with shuffle and repeat
///
/// `current` is always `None` or a valid index into the items. In uniform
/// shuffle the traversal order is a permutation of the indices; `cursor` is
/// the position reached in it, which may be set while `current` is `None`
/// (after the current item was removed or the sequencer was reset).
#[derive(Debug)]
pub struct PlaylistSequencer<T> {
    items: Vec<T>,
    current: Option<usize>,
    shuffle: ShuffleMode,
    repeat: bool,
    order: Vec<usize>,
    cursor: Option<usize>,
    history: Vec<usize>,
    rng: StdRng,
}

impl<T: PlaylistItem> Default for PlaylistSequencer<T> {
    fn default() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl<T: PlaylistItem> PlaylistSequencer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequencer with a fixed random seed, for reproducible shuffles
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            items: Vec::new(),
            current: None,
            shuffle: ShuffleMode::Off,
            repeat: false,
            order: Vec::new(),
            cursor: None,
            history: Vec::new(),
            rng,
        }
    }

    /// Replace the items, keeping the current item if it is still present
    pub fn set(&mut self, items: Vec<T>) {
        let previous = self.current_item().cloned();
        self.items = items;
        self.current = previous.and_then(|item| self.find(&item));
        self.history.clear();
        self.rebuild_order();
    }

    pub fn get(&self) -> &[T] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.set(Vec::new());
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.find(item).is_some()
    }

    /// Index of the first item equal to `item`
    pub fn find(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|i| i == item)
    }

    pub fn current(&self) -> Option<&T> {
        self.current_item()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn shuffle(&self) -> ShuffleMode {
        self.shuffle
    }

    pub fn set_shuffle(&mut self, mode: ShuffleMode) {
        if self.shuffle != mode {
            self.shuffle = mode;
            self.history.clear();
            self.rebuild_order();
        }
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: bool) {
        self.repeat = repeat;
    }

    /// Advance and return the new current item
    pub fn next(&mut self) -> Option<&T> {
        if self.items.is_empty() {
            self.current = None;
            return None;
        }

        self.current = match self.shuffle {
            ShuffleMode::Off => match self.current {
                None => Some(0),
                Some(i) if i + 1 < self.items.len() => Some(i + 1),
                Some(_) if self.repeat => Some(0),
                Some(_) => None,
            },
            ShuffleMode::Uniform => {
                let pos = self.cursor.map_or(0, |c| c + 1);
                if pos < self.order.len() {
                    self.cursor = Some(pos);
                    Some(self.order[pos])
                } else {
                    // cycle finished: start a fresh permutation
                    self.order.shuffle(&mut self.rng);
                    if self.repeat {
                        self.cursor = Some(0);
                        self.order.first().copied()
                    } else {
                        self.cursor = None;
                        None
                    }
                }
            }
            ShuffleMode::Weighted => {
                if let Some(i) = self.current {
                    self.history.push(i);
                }
                Some(self.draw_weighted())
            }
        };
        self.current_item()
    }

    /// Step back in the traversal order; never leaves a non-empty list
    /// without a current item
    pub fn previous(&mut self) -> Option<&T> {
        if self.items.is_empty() {
            self.current = None;
            return None;
        }

        self.current = match self.shuffle {
            ShuffleMode::Off => Some(self.current.map_or(0, |i| i.saturating_sub(1))),
            ShuffleMode::Uniform => {
                let pos = match (self.current, self.cursor) {
                    (Some(_), Some(c)) => c.saturating_sub(1),
                    (None, Some(c)) => c,
                    (_, None) => 0,
                };
                self.cursor = Some(pos);
                self.order.get(pos).copied()
            }
            ShuffleMode::Weighted => self
                .history
                .pop()
                .or(self.current)
                .or(Some(0)),
        };
        self.current_item()
    }

    /// Jump to an item, or to no item with `None`
    ///
    /// Returns false, leaving the position alone, if the item is not in the
    /// list.
    pub fn go_to(&mut self, item: Option<&T>) -> bool {
        let Some(item) = item else {
            self.current = None;
            self.cursor = None;
            self.history.clear();
            if self.shuffle == ShuffleMode::Uniform {
                self.rebuild_order();
                self.move_to_front(0);
            }
            return true;
        };
        let Some(index) = self.find(item) else {
            return false;
        };

        match self.shuffle {
            ShuffleMode::Off => {}
            ShuffleMode::Uniform => self.place_next_in_order(index),
            ShuffleMode::Weighted => {
                if let Some(i) = self.current {
                    self.history.push(i);
                }
            }
        }
        self.current = Some(index);
        true
    }

    /// Delete the first item equal to `item`
    pub fn remove(&mut self, item: &T) -> Option<T> {
        let index = self.find(item)?;
        Some(self.remove_at(index))
    }

    /// Delete the item at `index`; the current item becomes `None` if it
    /// was the one removed
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove_at(&mut self, index: usize) -> T {
        let removed = self.items.remove(index);

        self.current = match self.current {
            Some(c) if c == index => None,
            Some(c) if c > index => Some(c - 1),
            other => other,
        };

        if let Some(pos) = self.order.iter().position(|&i| i == index) {
            self.order.remove(pos);
            self.cursor = match self.cursor {
                Some(c) if pos <= c => c.checked_sub(1),
                other => other,
            };
        }
        for i in &mut self.order {
            if *i > index {
                *i -= 1;
            }
        }

        self.history.retain(|&i| i != index);
        for i in &mut self.history {
            if *i > index {
                *i -= 1;
            }
        }

        removed
    }

    /// Forget the current item without touching the items or shuffle order
    pub fn reset(&mut self) {
        self.current = None;
    }

    fn current_item(&self) -> Option<&T> {
        self.current.and_then(|i| self.items.get(i))
    }

    /// New permutation with the current item, if any, at the front
    fn rebuild_order(&mut self) {
        self.order = (0..self.items.len()).collect();
        self.cursor = None;
        if self.shuffle != ShuffleMode::Uniform {
            return;
        }
        self.order.shuffle(&mut self.rng);
        if let Some(current) = self.current {
            self.move_to_front(current);
            self.cursor = Some(0);
        }
    }

    fn move_to_front(&mut self, index: usize) {
        if let Some(pos) = self.order.iter().position(|&i| i == index) {
            self.order.swap(0, pos);
        }
    }

    /// Make `index` the item reached at the next cursor position
    fn place_next_in_order(&mut self, index: usize) {
        let Some(pos) = self.order.iter().position(|&i| i == index) else {
            return;
        };
        let next = self.cursor.map_or(0, |c| c + 1);
        if pos >= next {
            self.order.swap(pos, next);
            self.cursor = Some(next);
        } else {
            // already played this cycle: move it up to the cursor
            let value = self.order.remove(pos);
            let at = next - 1;
            self.order.insert(at, value);
            self.cursor = Some(at);
        }
    }

    /// Index drawn with weight `1 + rating`
    ///
    /// Ratings are clamped to `0..=MAX_RATING`; non-finite ones count as 0.
    fn draw_weighted(&mut self) -> usize {
        let weights: Vec<f64> = self
            .items
            .iter()
            .map(|item| {
                let rating = item.rating();
                1.0 + if rating.is_finite() { rating.clamp(0.0, MAX_RATING) } else { 0.0 }
            })
            .collect();
        match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(e) => {
                log::debug!("Falling back to a uniform draw: {}", e);
                self.rng.gen_range(0..self.items.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten() -> PlaylistSequencer<u32> {
        let mut pl = PlaylistSequencer::with_seed(7);
        pl.set((0..10).collect());
        assert_eq!(pl.current(), None);
        pl
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Rated(u8);

    impl PlaylistItem for Rated {
        fn rating(&self) -> f64 {
            f64::from(self.0)
        }
    }

    #[test]
    fn test_is_empty() {
        let mut pl = ten();
        assert!(!pl.is_empty());
        pl.clear();
        assert!(pl.is_empty());
        assert_eq!(pl.next(), None);
        assert_eq!(pl.previous(), None);
    }

    #[test]
    fn test_get() {
        let mut pl = ten();
        assert_eq!(pl.get(), (0..10).collect::<Vec<u32>>().as_slice());
        pl.set((0..12).collect());
        assert_eq!(pl.len(), 12);
    }

    #[test]
    fn test_next() {
        let mut pl = ten();
        assert_eq!(pl.next(), Some(&0));
        assert_eq!(pl.next(), Some(&1));
        assert!(pl.go_to(Some(&9)));
        assert_eq!(pl.current(), Some(&9));
        assert_eq!(pl.next(), None);
        assert_eq!(pl.current_index(), None);
    }

    #[test]
    fn test_full_pass() {
        let mut pl = ten();
        let seen: Vec<u32> = (0..10).filter_map(|_| pl.next().copied()).collect();
        assert_eq!(seen, (0..10).collect::<Vec<u32>>());
        assert_eq!(pl.next(), None);
    }

    #[test]
    fn test_contains() {
        let pl = ten();
        assert!(pl.contains(&1));
        assert!(pl.contains(&8));
        assert!(!pl.contains(&22));
        assert_eq!(pl.find(&8), Some(8));
    }

    #[test]
    fn test_go_to_missing_item() {
        let mut pl = ten();
        pl.go_to(Some(&4));
        assert!(!pl.go_to(Some(&40)));
        assert_eq!(pl.current(), Some(&4));
    }

    #[test]
    fn test_removal() {
        let mut pl = ten();
        pl.go_to(Some(&8));
        for i in 3..8 {
            assert_eq!(pl.remove(&i), Some(i));
        }
        assert_eq!(pl.next(), Some(&9));
    }

    #[test]
    fn test_removing_current_clears_it() {
        let mut pl = ten();
        pl.go_to(Some(&4));
        pl.remove(&4);
        assert_eq!(pl.current(), None);
        assert_eq!(pl.remove(&4), None);
    }

    #[test]
    fn test_next_repeat() {
        let mut pl = ten();
        pl.set_repeat(true);
        pl.go_to(Some(&3));
        for _ in 0..9 {
            pl.next();
        }
        assert_eq!(pl.current(), Some(&2));
        for _ in 0..12 {
            pl.next();
        }
        assert_eq!(pl.current(), Some(&4));
    }

    #[test]
    fn test_shuffle() {
        let mut pl = ten();
        pl.set_shuffle(ShuffleMode::Uniform);
        for _ in 0..5 {
            let mut numbers: Vec<u32> = (0..10).filter_map(|_| pl.next().copied()).collect();
            assert_eq!(numbers.len(), 10);
            assert_ne!(numbers, (0..10).collect::<Vec<u32>>());
            numbers.sort();
            assert_eq!(numbers, (0..10).collect::<Vec<u32>>());
            assert_eq!(pl.next(), None);
        }
    }

    #[test]
    fn test_shuffle_repeat() {
        let mut pl = ten();
        pl.set_shuffle(ShuffleMode::Uniform);
        pl.set_repeat(true);
        let mut numbers: Vec<u32> = (0..30).filter_map(|_| pl.next().copied()).collect();
        let mut all: Vec<u32> = (0..10).chain(0..10).chain(0..10).collect();
        all.sort();
        assert_ne!(numbers, all);
        numbers.sort();
        assert_eq!(numbers, all);
    }

    #[test]
    fn test_weighted_shuffle() {
        let mut pl = PlaylistSequencer::with_seed(11);
        pl.set_shuffle(ShuffleMode::Weighted);
        pl.set(vec![Rated(0), Rated(1), Rated(2), Rated(3)]);
        let mut counts = [0usize; 4];
        for _ in 0..1000 {
            let song = pl.next().cloned().unwrap();
            counts[usize::from(song.0)] += 1;
        }
        assert!(counts[1] > counts[0]);
        assert!(counts[2] > counts[1]);
        assert!(counts[3] > counts[2]);
    }

    #[test]
    fn test_weighted_shuffle_huge_ratings() {
        #[derive(Debug, Clone, PartialEq)]
        struct Scored(u8, f64);

        impl PlaylistItem for Scored {
            fn rating(&self) -> f64 {
                self.1
            }
        }

        let mut pl = PlaylistSequencer::with_seed(3);
        pl.set_shuffle(ShuffleMode::Weighted);
        pl.set(vec![
            Scored(0, 1e308),
            Scored(1, f64::MAX),
            Scored(2, f64::INFINITY),
            Scored(3, f64::NAN),
        ]);
        let mut counts = [0usize; 4];
        for _ in 0..200 {
            let song = pl.next().cloned().unwrap();
            counts[usize::from(song.0)] += 1;
        }
        assert!(counts[0] > 50, "{:?}", counts);
        assert!(counts[1] > 50, "{:?}", counts);
    }

    #[test]
    fn test_weighted_previous_walks_history() {
        let mut pl = ten();
        pl.set_shuffle(ShuffleMode::Weighted);
        let first = *pl.next().unwrap();
        let second = *pl.next().unwrap();
        assert_eq!(pl.current(), Some(&second));
        assert_eq!(pl.previous(), Some(&first));
        assert_eq!(pl.previous(), Some(&first));
    }

    #[test]
    fn test_previous() {
        let mut pl = ten();
        pl.go_to(Some(&2));
        assert_eq!(pl.previous(), Some(&1));
        assert_eq!(pl.previous(), Some(&0));
        assert_eq!(pl.previous(), Some(&0));
    }

    #[test]
    fn test_previous_from_nothing() {
        let mut pl = ten();
        assert_eq!(pl.previous(), Some(&0));

        let mut shuffled = ten();
        shuffled.set_shuffle(ShuffleMode::Uniform);
        assert!(shuffled.previous().is_some());
    }

    #[test]
    fn test_shuffle_previous_retraces_order() {
        let mut pl = ten();
        pl.set_shuffle(ShuffleMode::Uniform);
        let a = *pl.next().unwrap();
        let b = *pl.next().unwrap();
        let c = *pl.next().unwrap();
        assert_eq!(pl.previous(), Some(&b));
        assert_eq!(pl.previous(), Some(&a));
        assert_eq!(pl.previous(), Some(&a));
        assert_eq!(pl.next(), Some(&b));
        assert_eq!(pl.next(), Some(&c));
    }

    #[test]
    fn test_go_to_saves_current() {
        let mut pl = ten();
        pl.go_to(Some(&5));
        pl.set(vec![5, 10, 15, 20]);
        assert_eq!(pl.current(), Some(&5));
        assert_eq!(pl.next(), Some(&10));
    }

    #[test]
    fn test_go_to_shuffle() {
        let mut pl = ten();
        pl.set_shuffle(ShuffleMode::Uniform);
        for _ in 0..5 {
            pl.go_to(Some(&5));
            assert_eq!(pl.current(), Some(&5));
            pl.go_to(Some(&1));
            assert_eq!(pl.current(), Some(&1));
        }
    }

    #[test]
    fn test_go_to_shuffle_keeps_cycle() {
        let mut pl = ten();
        pl.set_shuffle(ShuffleMode::Uniform);
        pl.next();
        pl.next();
        pl.go_to(Some(&6));
        let mut seen: Vec<u32> = pl.order[..=pl.cursor.unwrap()]
            .iter()
            .map(|&i| pl.items[i])
            .collect();
        while let Some(&n) = pl.next() {
            seen.push(n);
        }
        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<u32>>());
    }

    #[test]
    fn test_go_to_none() {
        let mut pl = ten();
        for _ in 0..5 {
            pl.go_to(None);
            assert_eq!(pl.current(), None);
            assert_eq!(pl.next(), Some(&0));
        }

        pl.set_shuffle(ShuffleMode::Uniform);
        pl.next();
        pl.go_to(None);
        assert_eq!(pl.next(), Some(&0));
    }

    #[test]
    fn test_reset() {
        let mut pl = ten();
        pl.go_to(Some(&5));
        pl.reset();
        assert_eq!(pl.current(), None);
        assert_eq!(pl.get().len(), 10);
        assert_eq!(pl.next(), Some(&0));
    }

    #[test]
    fn test_reset_shuffle() {
        let mut pl = ten();
        pl.set_shuffle(ShuffleMode::Uniform);
        pl.go_to(Some(&5));
        let order = pl.order.clone();
        pl.reset();
        assert_eq!(pl.current(), None);
        assert_eq!(pl.order, order);
    }

    #[test]
    fn test_restart() {
        let mut pl = ten();
        pl.go_to(Some(&1));
        pl.set(vec![101, 102, 103, 104]);
        assert_eq!(pl.next(), Some(&101));
    }

    #[test]
    fn test_shuffle_removal_keeps_index_valid() {
        let mut pl = ten();
        pl.set_shuffle(ShuffleMode::Uniform);
        let first = *pl.next().unwrap();
        pl.remove(&first);
        let rest: Vec<u32> = std::iter::from_fn(|| pl.next().copied()).collect();
        assert_eq!(rest.len(), 9);
        assert!(!rest.contains(&first));
    }
}
