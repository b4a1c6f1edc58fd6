//! Resources - App-level, type-keyed singletons.
//!
//! Unlike node context, resources are not scoped to a subtree: there is one
//! value per type for the whole app. Observers can watch a type being set or
//! deleted.
//!
//! ```ignore
//! let resources = Resources::new();
//! let watch = resources.on_set::<Score>(|score| println!("{}", score.0));
//! resources.set(Score(10)); // prints "10"
//! watch.dispose();
//! ```

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::engine::Dispose;

type Observer = Rc<dyn Fn(&dyn Any)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObserverKind {
    Set,
    Del,
}

#[derive(Default)]
struct ObserverTable {
    set: HashMap<TypeId, Vec<(u64, Observer)>>,
    del: HashMap<TypeId, Vec<(u64, Observer)>>,
    next_id: u64,
}

impl ObserverTable {
    fn slot(&mut self, kind: ObserverKind) -> &mut HashMap<TypeId, Vec<(u64, Observer)>> {
        match kind {
            ObserverKind::Set => &mut self.set,
            ObserverKind::Del => &mut self.del,
        }
    }

    fn snapshot(&mut self, kind: ObserverKind, type_id: TypeId) -> Vec<Observer> {
        self.slot(kind)
            .get(&type_id)
            .map(|observers| observers.iter().map(|(_, observer)| observer.clone()).collect())
            .unwrap_or_default()
    }
}

#[derive(Default)]
struct ResourcesInner {
    values: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
    observers: RefCell<ObserverTable>,
}

impl ResourcesInner {
    fn notify(&self, kind: ObserverKind, type_id: TypeId, value: &dyn Any) {
        let observers = self.observers.borrow_mut().snapshot(kind, type_id);
        for observer in observers {
            observer(value);
        }
    }
}

/// Shared type-keyed store. Clones refer to the same store.
#[derive(Clone, Default)]
pub struct Resources {
    inner: Rc<ResourcesInner>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, replacing any previous `T`, and notify `on_set` observers.
    pub fn set<T: 'static>(&self, value: T) -> Rc<T> {
        let value = Rc::new(value);
        let erased: Rc<dyn Any> = value.clone();
        self.inner
            .values
            .borrow_mut()
            .insert(TypeId::of::<T>(), erased);
        self.inner.notify(ObserverKind::Set, TypeId::of::<T>(), &*value);
        value
    }

    pub fn get<T: 'static>(&self) -> Option<Rc<T>> {
        let value = self.inner.values.borrow().get(&TypeId::of::<T>()).cloned()?;
        value.downcast::<T>().ok()
    }

    pub fn has<T: 'static>(&self) -> bool {
        self.inner.values.borrow().contains_key(&TypeId::of::<T>())
    }

    /// Remove `T` and notify `on_del` observers with the removed value.
    pub fn del<T: 'static>(&self) -> Option<Rc<T>> {
        let removed = self.inner.values.borrow_mut().remove(&TypeId::of::<T>())?;
        let removed = removed.downcast::<T>().ok()?;
        self.inner.notify(ObserverKind::Del, TypeId::of::<T>(), &*removed);
        Some(removed)
    }

    pub fn on_set<T: 'static>(&self, callback: impl Fn(&T) + 'static) -> ResourceObserver {
        self.observe(ObserverKind::Set, callback)
    }

    pub fn on_del<T: 'static>(&self, callback: impl Fn(&T) + 'static) -> ResourceObserver {
        self.observe(ObserverKind::Del, callback)
    }

    fn observe<T: 'static>(
        &self,
        kind: ObserverKind,
        callback: impl Fn(&T) + 'static,
    ) -> ResourceObserver {
        let observer: Observer = Rc::new(move |value: &dyn Any| {
            if let Some(value) = value.downcast_ref::<T>() {
                callback(value);
            }
        });

        let mut table = self.inner.observers.borrow_mut();
        let id = table.next_id;
        table.next_id += 1;
        table
            .slot(kind)
            .entry(TypeId::of::<T>())
            .or_default()
            .push((id, observer));

        ResourceObserver {
            resources: Rc::downgrade(&self.inner),
            kind,
            type_id: TypeId::of::<T>(),
            id,
        }
    }
}

/// Handle to an `on_set`/`on_del` observer.
#[must_use = "the observer stays registered until dispose() is called"]
pub struct ResourceObserver {
    resources: Weak<ResourcesInner>,
    kind: ObserverKind,
    type_id: TypeId,
    id: u64,
}

impl ResourceObserver {
    pub fn dispose(self) {
        let Some(resources) = self.resources.upgrade() else {
            return;
        };
        let mut table = resources.observers.borrow_mut();
        if let Some(observers) = table.slot(self.kind).get_mut(&self.type_id) {
            observers.retain(|(id, _)| *id != self.id);
        }
    }
}

impl Dispose for ResourceObserver {
    fn dispose(self) {
        ResourceObserver::dispose(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, PartialEq)]
    struct Score(u32);

    #[test]
    fn test_set_get_has_del() {
        let resources = Resources::new();
        assert!(!resources.has::<Score>());

        resources.set(Score(3));
        assert!(resources.has::<Score>());
        assert_eq!(*resources.get::<Score>().unwrap(), Score(3));

        resources.set(Score(4));
        assert_eq!(*resources.get::<Score>().unwrap(), Score(4));

        assert_eq!(resources.del::<Score>().as_deref(), Some(&Score(4)));
        assert!(resources.get::<Score>().is_none());
        assert!(resources.del::<Score>().is_none());
    }

    #[test]
    fn test_observers_see_values() {
        let resources = Resources::new();
        let set_total = Rc::new(Cell::new(0));
        let deleted = Rc::new(Cell::new(0));

        let set_sink = set_total.clone();
        let _set = resources.on_set::<Score>(move |score| set_sink.set(set_sink.get() + score.0));
        let del_sink = deleted.clone();
        let _del = resources.on_del::<Score>(move |score| del_sink.set(score.0));

        resources.set(Score(2));
        resources.set(Score(5));
        resources.set(1_u8);
        resources.del::<Score>();

        assert_eq!(set_total.get(), 7);
        assert_eq!(deleted.get(), 5);
    }

    #[test]
    fn test_disposed_observer_is_silent() {
        let resources = Resources::new();
        let calls = Rc::new(Cell::new(0));
        let sink = calls.clone();
        let observer = resources.on_set::<Score>(move |_| sink.set(sink.get() + 1));

        resources.set(Score(1));
        observer.dispose();
        resources.set(Score(2));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_observer_can_read_store() {
        let resources = Resources::new();
        let seen = Rc::new(Cell::new(0));

        let store = resources.clone();
        let sink = seen.clone();
        let _observer = resources.on_set::<Score>(move |_| {
            sink.set(store.get::<Score>().map_or(0, |score| score.0));
        });

        resources.set(Score(9));
        assert_eq!(seen.get(), 9);
    }

    #[test]
    fn test_node_cleanup_disposes_observer() {
        let tree = crate::engine::Tree::new();
        let watcher = tree.create_node("watcher");
        tree.build_node(&watcher);

        let resources = Resources::new();
        let calls = Rc::new(Cell::new(0));
        let sink = calls.clone();
        watcher.auto_dispose(resources.on_set::<Score>(move |_| sink.set(sink.get() + 1)));

        resources.set(Score(1));
        tree.free();
        resources.set(Score(2));
        assert_eq!(calls.get(), 1);
    }
}
