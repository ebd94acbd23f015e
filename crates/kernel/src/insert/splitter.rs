//! Greedy cost-bounded splitting of a stream into batches.
//!
//! Items are taken in order and added to the current batch while the
//! batch's total cost stays within the maximum. The first item that would
//! overflow is left in the stream (one item of look-ahead) to start the next
//! batch. An item whose own cost exceeds the maximum ends up alone in its
//! batch. Concatenating the batches gives back the input sequence.

use std::iter::Peekable;

/// Splits streams into batches whose cumulative cost stays within a bound.
#[derive(Debug, Clone)]
pub struct CostSplitter<F> {
    cost_of: F,
    max_cost: u64,
}

impl<F> CostSplitter<F> {
    pub fn new(cost_of: F, max_cost: u64) -> Self {
        Self { cost_of, max_cost }
    }

    pub fn max_cost(&self) -> u64 {
        self.max_cost
    }

    /// Lazily split `items` into batches.
    ///
    /// Splitting the same finite sequence again yields the same batches.
    pub fn iter_batches<T, I>(&self, items: I) -> Batches<'_, I::IntoIter, F>
    where
        I: IntoIterator<Item = T>,
        F: Fn(&T) -> u64,
    {
        Batches {
            items: items.into_iter().peekable(),
            splitter: self,
        }
    }

    /// Split `items` into a list of batches.
    pub fn list_batches<T, I>(&self, items: I) -> Vec<Vec<T>>
    where
        I: IntoIterator<Item = T>,
        F: Fn(&T) -> u64,
    {
        self.iter_batches(items).collect()
    }
}

/// Iterator over the batches of a stream, see [`CostSplitter::iter_batches`].
pub struct Batches<'a, I: Iterator, F> {
    items: Peekable<I>,
    splitter: &'a CostSplitter<F>,
}

impl<T, I, F> Iterator for Batches<'_, I, F>
where
    I: Iterator<Item = T>,
    F: Fn(&T) -> u64,
{
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Vec<T>> {
        let CostSplitter { cost_of, max_cost } = self.splitter;

        let first = self.items.next()?;
        let mut cost = cost_of(&first);
        let mut batch = vec![first];
        if cost > *max_cost {
            return Some(batch);
        }

        while let Some(next) = self.items.peek() {
            let total = cost.saturating_add(cost_of(next));
            if total > *max_cost {
                break;
            }
            cost = total;
            batch.extend(self.items.next());
        }
        Some(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(x: &u64) -> u64 {
        *x
    }

    #[test]
    fn splits_greedily() {
        let splitter = CostSplitter::new(identity, 5);
        let batches = splitter.list_batches([1, 7, 2, 3, 8, 5, 1, 2, 1]);
        assert_eq!(
            batches,
            vec![vec![1], vec![7], vec![2, 3], vec![8], vec![5], vec![1, 2, 1]]
        );
    }

    #[test]
    fn empty_input_has_no_batches() {
        let splitter = CostSplitter::new(identity, 5);
        assert!(splitter.list_batches(Vec::<u64>::new()).is_empty());
    }

    #[test]
    fn everything_fits_in_one_batch() {
        let splitter = CostSplitter::new(identity, 100);
        assert_eq!(splitter.list_batches([1, 2, 3]), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn zero_max_cost_isolates_every_costly_item() {
        let splitter = CostSplitter::new(identity, 0);
        assert_eq!(
            splitter.list_batches([0, 0, 1, 0]),
            vec![vec![0, 0], vec![1], vec![0]]
        );
    }

    #[test]
    fn batches_preserve_order_and_bound() {
        let items: Vec<u64> = (0..50).map(|i| (i * 7) % 11).collect();
        let splitter = CostSplitter::new(identity, 12);
        let batches = splitter.list_batches(items.iter().copied());

        let flattened: Vec<u64> = batches.iter().flatten().copied().collect();
        assert_eq!(flattened, items);
        for batch in &batches {
            let cost: u64 = batch.iter().sum();
            assert!(cost <= 12 || batch.len() == 1, "{batch:?}");
        }
    }

    #[test]
    fn resplitting_gives_the_same_batches() {
        let items = vec![4, 1, 9, 2, 2, 2, 6];
        let splitter = CostSplitter::new(identity, 6);
        let first = splitter.list_batches(items.iter().copied());
        let second = splitter.list_batches(items.iter().copied());
        assert_eq!(first, second);
    }

    #[test]
    fn batches_are_produced_lazily() {
        let splitter = CostSplitter::new(identity, 3);
        let mut batches = splitter.iter_batches((1..).take(1000));
        assert_eq!(batches.next(), Some(vec![1, 2]));
        assert_eq!(batches.next(), Some(vec![3]));
        assert_eq!(batches.next(), Some(vec![4]));
    }
}
