//! Out - Write-once slots filled by child components.
//!
//! A parent creates an [`Out`], hands a clone to a child blueprint, and reads
//! it once the child has initialized. The child fills it with
//! [`Node::init_out`](crate::Node::init_out), which also ties the slot to the
//! child's lifetime: when the child is freed the slot is cleared.
//!
//! ```ignore
//! let texture = Out::new();
//! Group::new()
//!     .child(SubViewport { texture: texture.clone(), .. })
//!     .child(Sprite::from_out(texture));
//! ```

use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::engine::Dispose;
use crate::error::{Result, TreeError, fatal};

struct OutInner<T> {
    value: RefCell<Option<T>>,
    initialized: Cell<bool>,
    disposed: Cell<bool>,
}

/// Shared write-once slot. Clones refer to the same slot.
pub struct Out<T> {
    inner: Rc<OutInner<T>>,
}

impl<T> Clone for Out<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for Out<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Out<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(OutInner {
                value: RefCell::new(None),
                initialized: Cell::new(false),
                disposed: Cell::new(false),
            }),
        }
    }

    /// Fill the slot. Fails if it was filled before, even if it has since
    /// been cleared.
    pub fn try_init(&self, value: T) -> Result<()> {
        if self.inner.initialized.replace(true) {
            return Err(TreeError::OutAlreadyInitialized {
                type_name: type_name::<T>(),
            });
        }
        *self.inner.value.borrow_mut() = Some(value);
        Ok(())
    }

    pub fn init(&self, value: T) {
        self.try_init(value).unwrap_or_else(|err| fatal(err))
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.get()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Drop the value. Later reads yield `None`.
    pub fn clear(&self) {
        self.inner.disposed.set(true);
        let value = self.inner.value.borrow_mut().take();
        drop(value);
    }
}

impl<T: Clone> Out<T> {
    /// The value, if the slot is filled and not yet cleared.
    pub fn get(&self) -> Option<T> {
        self.inner.value.borrow().clone()
    }
}

impl<T> Dispose for Out<T> {
    fn dispose(self) {
        self.clear();
    }
}

impl<T: fmt::Debug> fmt::Debug for Out<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Out")
            .field("value", &self.inner.value.borrow())
            .field("initialized", &self.is_initialized())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
