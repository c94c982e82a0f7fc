//! [`ChangeTrackingList`] – an owning list that remembers what changed.
//!
//! Every filter output and every filter input is one of these.  Besides the
//! live elements, the list keeps three views of the current *epoch* (the
//! span since the last [`clear_changes`][ChangeTrackingList::clear_changes]):
//!
//! | View | Meaning |
//! |---|---|
//! | added   | suffix of the current elements starting at `first_added()` |
//! | changed | old elements marked dirty during the epoch |
//! | removed | elements detached during the epoch, still alive until commit |
//!
//! Removed elements are dropped when the epoch is committed, never earlier,
//! so a consumer reading the deltas can still look at what was removed.
//!
//! # Example
//!
//! ```rust
//! use svs_filter::change_tracking::ChangeTrackingList;
//!
//! let mut list = ChangeTrackingList::new();
//! let a = list.add("a");
//! list.clear_changes();
//!
//! let b = list.add("b");
//! list.change(a);
//! assert_eq!(list.added().map(|(id, _)| id).collect::<Vec<_>>(), [b]);
//! assert_eq!(list.num_changed(), 1);
//!
//! list.remove(a);
//! assert_eq!(list.num_removed(), 1);
//! assert_eq!(list.num_changed(), 0);
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one element held by a [`ChangeTrackingList`].
///
/// Ids are unique across every list in the process, so a reverse index can
/// mix ids coming from several upstream lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElemId(u64);

impl ElemId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ElemId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Observer of list mutations.
///
/// Callbacks fire synchronously at the moment of mutation, in registration
/// order.  All methods default to no-ops so listeners only implement what
/// they care about.
pub trait CtListListener<T> {
    fn on_add(&mut self, _id: ElemId, _value: &T) {}
    fn on_remove(&mut self, _id: ElemId, _value: &T) {}
    fn on_change(&mut self, _id: ElemId, _value: &T) {}
}

/// A listener shared between the list and whoever registered it.
pub type SharedListener<T> = Rc<RefCell<dyn CtListListener<T>>>;

/// Owning list with add/remove/change tracking.  See the module docs.
pub struct ChangeTrackingList<T> {
    current: Vec<(ElemId, T)>,
    first_added: usize,
    changed: Vec<ElemId>,
    removed: Vec<(ElemId, T)>,
    listeners: Vec<SharedListener<T>>,
}

impl<T> Default for ChangeTrackingList<T> {
    fn default() -> Self {
        Self {
            current: Vec::new(),
            first_added: 0,
            changed: Vec::new(),
            removed: Vec::new(),
            listeners: Vec::new(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ChangeTrackingList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeTrackingList")
            .field("current", &self.current)
            .field("first_added", &self.first_added)
            .field("changed", &self.changed)
            .field("removed", &self.removed)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<T> ChangeTrackingList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Mutation ─────────────────────────────────────────────────────────────

    /// Append `value`, taking ownership, and return its id.
    pub fn add(&mut self, value: T) -> ElemId {
        let id = ElemId::next();
        self.current.push((id, value));
        let value = &self.current[self.current.len() - 1].1;
        for l in &self.listeners {
            l.borrow_mut().on_add(id, value);
        }
        id
    }

    /// Detach the element `id`.  It stays alive in the removed view until
    /// the epoch is committed.
    ///
    /// # Panics
    ///
    /// When `id` is not a current element.  Passing an unknown id is a bug in
    /// the caller.
    pub fn remove(&mut self, id: ElemId) {
        let pos = self.position(id).unwrap_or_else(|| {
            panic!("ChangeTrackingList::remove: {id:?} is not a current element")
        });
        if pos < self.first_added {
            self.first_added -= 1;
        }
        self.changed.retain(|c| *c != id);
        let entry = self.current.remove(pos);
        for l in &self.listeners {
            l.borrow_mut().on_remove(id, &entry.1);
        }
        self.removed.push(entry);
    }

    /// Mark the element `id` as changed.
    ///
    /// Has no effect on elements added during this epoch or already marked.
    ///
    /// # Panics
    ///
    /// When `id` is not a current element.
    pub fn change(&mut self, id: ElemId) {
        let pos = self.position(id).unwrap_or_else(|| {
            panic!("ChangeTrackingList::change: {id:?} is not a current element")
        });
        if pos >= self.first_added || self.changed.contains(&id) {
            return;
        }
        self.changed.push(id);
        let value = &self.current[pos].1;
        for l in &self.listeners {
            l.borrow_mut().on_change(id, value);
        }
    }

    /// Commit the epoch: drop removed elements, forget changes, and treat
    /// every current element as old.
    pub fn clear_changes(&mut self) {
        self.removed.clear();
        self.changed.clear();
        self.first_added = self.current.len();
    }

    /// Commit the epoch and then mark every current element as added again.
    pub fn reset(&mut self) {
        self.clear_changes();
        self.first_added = 0;
    }

    /// Remove every element, notifying listeners, and commit.
    pub fn clear(&mut self) {
        for (id, value) in &self.current {
            for l in &self.listeners {
                l.borrow_mut().on_remove(*id, value);
            }
        }
        self.removed.append(&mut self.current);
        self.clear_changes();
    }

    /// Mutable access to a current element.  Does not mark it changed.
    pub fn get_mut(&mut self, id: ElemId) -> Option<&mut T> {
        self.current
            .iter_mut()
            .find(|(i, _)| *i == id)
            .map(|(_, v)| v)
    }

    // ── Listeners ────────────────────────────────────────────────────────────

    pub fn listen(&mut self, listener: SharedListener<T>) {
        self.listeners.push(listener);
    }

    /// Unregister `listener`.  No-op when it was never registered.
    pub fn unlisten(&mut self, listener: &SharedListener<T>) {
        self.listeners.retain(|l| !Rc::ptr_eq(l, listener));
    }

    // ── Indexed access ───────────────────────────────────────────────────────

    pub fn num_current(&self) -> usize {
        self.current.len()
    }

    pub fn get_current(&self, i: usize) -> (ElemId, &T) {
        let (id, v) = &self.current[i];
        (*id, v)
    }

    /// Index of the first element added during this epoch.
    pub fn first_added(&self) -> usize {
        self.first_added
    }

    pub fn num_changed(&self) -> usize {
        self.changed.len()
    }

    pub fn get_changed(&self, i: usize) -> (ElemId, &T) {
        let id = self.changed[i];
        match self.get(id) {
            Some(v) => (id, v),
            None => unreachable!("changed element {id:?} missing from current"),
        }
    }

    pub fn num_removed(&self) -> usize {
        self.removed.len()
    }

    pub fn get_removed(&self, i: usize) -> (ElemId, &T) {
        let (id, v) = &self.removed[i];
        (*id, v)
    }

    // ── Lookup and iteration ─────────────────────────────────────────────────

    pub fn get(&self, id: ElemId) -> Option<&T> {
        self.current.iter().find(|(i, _)| *i == id).map(|(_, v)| v)
    }

    pub fn contains(&self, id: ElemId) -> bool {
        self.position(id).is_some()
    }

    /// True when `id` is current and was added during this epoch.
    pub fn is_added(&self, id: ElemId) -> bool {
        self.position(id).is_some_and(|p| p >= self.first_added)
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn current(&self) -> impl Iterator<Item = (ElemId, &T)> {
        self.current.iter().map(|(id, v)| (*id, v))
    }

    pub fn added(&self) -> impl Iterator<Item = (ElemId, &T)> {
        self.current[self.first_added..].iter().map(|(id, v)| (*id, v))
    }

    /// Elements present before this epoch.
    pub fn old(&self) -> impl Iterator<Item = (ElemId, &T)> {
        self.current[..self.first_added].iter().map(|(id, v)| (*id, v))
    }

    pub fn changed(&self) -> impl Iterator<Item = (ElemId, &T)> {
        (0..self.changed.len()).map(|i| self.get_changed(i))
    }

    pub fn removed(&self) -> impl Iterator<Item = (ElemId, &T)> {
        self.removed.iter().map(|(id, v)| (*id, v))
    }

    fn position(&self, id: ElemId) -> Option<usize> {
        self.current.iter().position(|(i, _)| *i == id)
    }
}
