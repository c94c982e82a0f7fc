//! Enumeration of argument tuples for relation predicates.
//!
//! [`CombinationGenerator`] walks every `arity`-tuple drawn from a pool:
//!
//! | `ordered` | `allow_repeat` | Tuples for pool 4, arity 2 |
//! |---|---|---|
//! | false | false | C(4,2) = 6 |
//! | true  | false | 4·3 = 12 |
//! | false | true  | C(5,2) = 10 |
//! | true  | true  | 4² = 16 |
//!
//! Unordered tuples are emitted with their pool indices non-increasing from
//! left to right (strictly decreasing without repeats), so each set appears
//! once.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fresh,
    Running,
    Done,
}

/// Lazily enumerates tuples of pool elements.  See the module docs.
#[derive(Debug, Clone)]
pub struct CombinationGenerator<T> {
    pool: Vec<T>,
    arity: usize,
    ordered: bool,
    allow_repeat: bool,
    indices: Vec<usize>,
    state: State,
}

impl<T: Clone> CombinationGenerator<T> {
    pub fn new(pool: Vec<T>, arity: usize, ordered: bool, allow_repeat: bool) -> Self {
        Self {
            pool,
            arity,
            ordered,
            allow_repeat,
            indices: Vec::new(),
            state: State::Fresh,
        }
    }

    /// Restart the enumeration from the first tuple.
    pub fn reset(&mut self) {
        self.indices.clear();
        self.state = State::Fresh;
    }

    fn first(&mut self) -> bool {
        let m = self.pool.len();
        let n = self.arity;
        if n == 0 {
            return true;
        }
        if m == 0 || (!self.allow_repeat && m < n) {
            return false;
        }
        self.indices = if self.ordered || self.allow_repeat {
            vec![0; n]
        } else {
            (0..n).rev().collect()
        };
        if self.ordered && !self.allow_repeat && has_repeat(&self.indices) {
            return self.next_ordered();
        }
        true
    }

    fn step(&mut self) -> bool {
        if self.arity == 0 {
            return false;
        }
        match (self.ordered, self.allow_repeat) {
            (true, _) => self.next_ordered(),
            (false, false) => self.next_unordered(),
            (false, true) => self.next_multiset(),
        }
    }

    /// Odometer, last position fastest, skipping tuples with repeated
    /// indices when repeats are not allowed.
    fn next_ordered(&mut self) -> bool {
        let m = self.pool.len();
        loop {
            let mut k = self.indices.len();
            loop {
                if k == 0 {
                    return false;
                }
                k -= 1;
                self.indices[k] += 1;
                if self.indices[k] < m {
                    break;
                }
                self.indices[k] = 0;
            }
            if self.allow_repeat || !has_repeat(&self.indices) {
                return true;
            }
        }
    }

    /// `a[0] > a[1] > … > a[n-1]`.  Bump the lowest position that still has
    /// room, then pack everything to its left just above it.
    fn next_unordered(&mut self) -> bool {
        let m = self.pool.len();
        let n = self.indices.len();
        let Some(i) = (0..n).find(|&i| self.indices[i] < m - 1 - i) else {
            return false;
        };
        self.indices[i] += 1;
        for k in (0..i).rev() {
            self.indices[k] = self.indices[k + 1] + 1;
        }
        true
    }

    /// `a[0] >= a[1] >= … >= a[n-1]`.
    fn next_multiset(&mut self) -> bool {
        let m = self.pool.len();
        let n = self.indices.len();
        let Some(i) = (0..n).find(|&i| self.indices[i] < m - 1) else {
            return false;
        };
        self.indices[i] += 1;
        for k in 0..i {
            self.indices[k] = self.indices[i];
        }
        true
    }

    fn current(&self) -> Vec<T> {
        self.indices.iter().map(|&i| self.pool[i].clone()).collect()
    }
}

fn has_repeat(indices: &[usize]) -> bool {
    indices
        .iter()
        .enumerate()
        .any(|(i, a)| indices[i + 1..].contains(a))
}

impl<T: Clone> Iterator for CombinationGenerator<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Vec<T>> {
        let more = match self.state {
            State::Fresh => self.first(),
            State::Running => self.step(),
            State::Done => false,
        };
        if more {
            self.state = State::Running;
            Some(self.current())
        } else {
            self.state = State::Done;
            None
        }
    }
}

/// Every ordering of `items`, the identity ordering first.
pub fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    CombinationGenerator::new((0..items.len()).collect(), items.len(), true, false)
        .map(|idx| idx.into_iter().map(|i| items[i].clone()).collect())
        .collect()
}
