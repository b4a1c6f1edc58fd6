//! Context Map - Per-node, type-keyed value store.
//!
//! Each entry is written once and stored as an `Rc<T>`, so unsized
//! capability interfaces (`Rc<dyn Trait>`) work the same as plain values.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Default)]
pub(crate) struct ContextMap {
    // Each value is a boxed `Rc<T>` keyed by `TypeId::of::<T>()`.
    values: HashMap<TypeId, Box<dyn Any>>,
}

impl ContextMap {
    /// Insert a value. Returns `false` (and keeps the old value) if the type is taken.
    pub(crate) fn insert<T: ?Sized + 'static>(&mut self, value: Rc<T>) -> bool {
        let key = TypeId::of::<T>();
        if self.values.contains_key(&key) {
            return false;
        }
        self.values.insert(key, Box::new(value));
        true
    }

    pub(crate) fn get<T: ?Sized + 'static>(&self) -> Option<Rc<T>> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<Rc<T>>())
            .cloned()
    }

    pub(crate) fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    pub(crate) fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    #[test]
    fn test_write_once() {
        let mut map = ContextMap::default();
        assert!(map.insert(Rc::new(1_i32)));
        assert!(!map.insert(Rc::new(2_i32)));
        assert_eq!(map.get::<i32>().as_deref(), Some(&1));
    }

    #[test]
    fn test_types_are_separate_keys() {
        let mut map = ContextMap::default();
        map.insert(Rc::new(1_i32));
        map.insert(Rc::new(String::from("one")));

        assert!(map.contains::<i32>());
        assert!(map.contains::<String>());
        assert!(!map.contains::<u32>());
        assert_eq!(map.get::<String>().as_deref().map(String::as_str), Some("one"));
    }

    #[test]
    fn test_trait_object_values() {
        let mut map = ContextMap::default();
        let greeter: Rc<dyn Greeter> = Rc::new(English);
        map.insert(greeter);

        let found = map.get::<dyn Greeter>().expect("greeter registered");
        assert_eq!(found.greet(), "hello");
        assert!(map.get::<English>().is_none());
    }
}
