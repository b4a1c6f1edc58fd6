//! Reactive List - An owned collection that announces its structural changes.
//!
//! Every `add`, `remove`, `clear` and `flush_remove_queue` emits the full
//! current snapshot on [`ReactiveList::changed`], which is exactly what the
//! keyed [`For`](crate::primitives::For) component consumes.
//!
//! Removals requested while iterating game state can be batched with
//! [`ReactiveList::queue_remove`] and applied together, producing one emission.

use std::cell::RefCell;
use std::rc::Rc;

use super::signal::Signal;

struct ListInner<T> {
    items: RefCell<Vec<T>>,
    queued_to_remove: RefCell<Vec<T>>,
    changed: Signal<Vec<T>>,
}

/// Shared handle to a list. Clones refer to the same list.
pub struct ReactiveList<T> {
    inner: Rc<ListInner<T>>,
}

impl<T> Clone for ReactiveList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Default for ReactiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + PartialEq + 'static> ReactiveList<T> {
    pub fn new() -> Self {
        Self::from_items(Vec::new())
    }

    /// Start with `items`. The signal's initial value is that snapshot.
    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            inner: Rc::new(ListInner {
                changed: Signal::new(items.clone()),
                items: RefCell::new(items),
                queued_to_remove: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Emits the full list after every structural change.
    pub fn changed(&self) -> &Signal<Vec<T>> {
        &self.inner.changed
    }

    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.items.borrow().get(index).cloned()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.inner.items.borrow().contains(item)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.inner.items.borrow().clone()
    }

    pub fn add(&self, item: T) {
        self.inner.items.borrow_mut().push(item);
        self.notify();
    }

    /// Remove the first element equal to `item`. Emits even when nothing matched.
    pub fn remove(&self, item: &T) -> bool {
        let removed = remove_first(&mut self.inner.items.borrow_mut(), item);
        self.notify();
        removed
    }

    pub fn clear(&self) {
        self.inner.items.borrow_mut().clear();
        self.notify();
    }

    /// Mark `item` for removal at the next [`flush_remove_queue`](Self::flush_remove_queue).
    pub fn queue_remove(&self, item: T) {
        self.inner.queued_to_remove.borrow_mut().push(item);
    }

    /// Apply queued removals with a single emission.
    pub fn flush_remove_queue(&self) {
        let queued = std::mem::take(&mut *self.inner.queued_to_remove.borrow_mut());
        {
            let mut items = self.inner.items.borrow_mut();
            for item in &queued {
                remove_first(&mut items, item);
            }
        }
        self.notify();
    }

    fn notify(&self) {
        let snapshot = self.to_vec();
        self.inner.changed.emit(snapshot);
    }
}

fn remove_first<T: PartialEq>(items: &mut Vec<T>, item: &T) -> bool {
    match items.iter().position(|existing| existing == item) {
        Some(position) => {
            items.remove(position);
            true
        }
        None => false,
    }
}
