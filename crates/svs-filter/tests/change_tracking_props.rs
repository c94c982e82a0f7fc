use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use proptest::prelude::*;
use svs_filter::change_tracking::{ChangeTrackingList, ElemId};

/// Counts how many times it has been dropped.
struct Tracked {
    drops: Rc<Cell<usize>>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

#[derive(Debug, Clone)]
enum Op {
    Add,
    Remove(usize),
    Change(usize),
    ClearChanges,
    Reset,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Add),
        2 => any::<usize>().prop_map(Op::Remove),
        2 => any::<usize>().prop_map(Op::Change),
        1 => Just(Op::ClearChanges),
        1 => Just(Op::Reset),
    ]
}

fn apply(list: &mut ChangeTrackingList<u32>, op: &Op, next: &mut u32) {
    match op {
        Op::Add => {
            list.add(*next);
            *next += 1;
        }
        Op::Remove(i) if !list.is_empty() => {
            let (id, _) = list.get_current(i % list.num_current());
            list.remove(id);
        }
        Op::Change(i) if !list.is_empty() => {
            let (id, _) = list.get_current(i % list.num_current());
            list.change(id);
        }
        Op::ClearChanges => list.clear_changes(),
        Op::Reset => list.reset(),
        _ => {}
    }
}

proptest! {
    #[test]
    fn committed_removal_drops_exactly_once(extra in 0usize..5) {
        let drops = Rc::new(Cell::new(0));
        let mut list = ChangeTrackingList::new();
        for _ in 0..extra {
            list.add(Tracked { drops: Rc::new(Cell::new(0)) });
        }
        let x = list.add(Tracked { drops: drops.clone() });
        list.clear_changes();

        prop_assert!(list.current().any(|(id, _)| id == x));
        prop_assert!(!list.added().any(|(id, _)| id == x));

        list.remove(x);
        prop_assert_eq!(drops.get(), 0);
        list.clear_changes();

        prop_assert!(!list.current().any(|(id, _)| id == x));
        prop_assert!(!list.removed().any(|(id, _)| id == x));
        prop_assert_eq!(drops.get(), 1);
        drop(list);
        prop_assert_eq!(drops.get(), 1);
    }

    #[test]
    fn changed_is_always_subset_of_current(ops in prop::collection::vec(op(), 0..64)) {
        let mut list = ChangeTrackingList::new();
        let mut next = 0;
        for op in &ops {
            apply(&mut list, op, &mut next);
            let current: HashSet<ElemId> = list.current().map(|(id, _)| id).collect();
            for (id, _) in list.changed() {
                prop_assert!(current.contains(&id));
            }
            prop_assert!(list.first_added() <= list.num_current());
        }
    }

    #[test]
    fn reset_marks_everything_added(ops in prop::collection::vec(op(), 0..64)) {
        let mut list = ChangeTrackingList::new();
        let mut next = 0;
        for op in &ops {
            apply(&mut list, op, &mut next);
        }
        let before = list.num_current();
        list.reset();
        prop_assert_eq!(list.first_added(), 0);
        prop_assert_eq!(list.num_changed(), 0);
        prop_assert_eq!(list.num_removed(), 0);
        prop_assert_eq!(list.added().count(), before);
    }
}
