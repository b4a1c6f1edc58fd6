//! Shared helpers for unit tests.

use std::cell::RefCell;
use std::rc::Rc;

/// Records named calls in order.
#[derive(Clone, Default)]
pub(crate) struct CallLog {
    entries: Rc<RefCell<Vec<String>>>,
}

impl CallLog {
    pub(crate) fn push(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    pub(crate) fn count(&self, entry: &str) -> usize {
        self.entries.borrow().iter().filter(|e| *e == entry).count()
    }

    /// A lifecycle hook that records `entry`.
    pub(crate) fn hook(&self, entry: &str) -> impl FnOnce() + 'static {
        let log = self.clone();
        let entry = entry.to_owned();
        move || log.push(entry)
    }

    /// An event handler that records `entry` on every call.
    pub(crate) fn handler<T: 'static>(&self, entry: &str) -> impl Fn(&T) + 'static {
        let log = self.clone();
        let entry = entry.to_owned();
        move |_: &T| log.push(entry.clone())
    }
}
