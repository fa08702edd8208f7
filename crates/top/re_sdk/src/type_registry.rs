use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use arrow::datatypes::DataType;
use parking_lot::Mutex;

use re_types_core::ComponentDescriptor;

use crate::NativeType;

/// The type a component got pinned to the first time it was successfully logged.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegisteredType {
    /// The innermost element type, if native values can produce it.
    pub native: Option<NativeType>,

    pub arrow: DataType,
}

impl RegisteredType {
    pub fn new(arrow: DataType) -> Self {
        Self {
            native: NativeType::of_datatype(&arrow),
            arrow,
        }
    }
}

/// Remembers the arrow type of every dynamically typed component.
///
/// Once a component has been logged with some type, every later value for that same
/// [`ComponentDescriptor`] is coerced to that type, so that a column never changes type
/// mid-recording.
///
/// Pins are write-once: concurrent first writers race, exactly one wins, and everybody
/// observes the winner.
#[derive(Default)]
pub struct TypeRegistry {
    types: Mutex<ahash::HashMap<ComponentDescriptor, RegisteredType>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, shared by every recording that doesn't bring its own.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<TypeRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Self::new())).clone()
    }

    pub fn get(&self, descriptor: &ComponentDescriptor) -> Option<RegisteredType> {
        self.types.lock().get(descriptor).cloned()
    }

    /// Pins `ty` for `descriptor`, unless something was pinned first.
    ///
    /// Returns whatever ends up pinned.
    pub fn pin(&self, descriptor: &ComponentDescriptor, ty: RegisteredType) -> RegisteredType {
        let mut types = self.types.lock();
        let pinned = types.entry(descriptor.clone()).or_insert_with(|| {
            re_log::debug!("Pinned {descriptor} to {}", ty.arrow);
            ty
        });
        pinned.clone()
    }

    pub fn len(&self) -> usize {
        self.types.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.lock().is_empty()
    }

    /// All the pins, sorted for display.
    pub fn snapshot(&self) -> BTreeMap<String, RegisteredType> {
        self.types
            .lock()
            .iter()
            .map(|(descriptor, ty)| (descriptor.to_string(), ty.clone()))
            .collect()
    }

    /// Forgets everything. Mostly useful in tests.
    pub fn reset(&self) {
        self.types.lock().clear();
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.snapshot()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;

    use super::*;

    #[test]
    fn first_pin_wins() {
        let registry = TypeRegistry::new();
        let descriptor = ComponentDescriptor::partial("confidence");
        assert!(registry.get(&descriptor).is_none());

        let pinned = registry.pin(&descriptor, RegisteredType::new(DataType::Float64));
        assert_eq!(pinned.native, Some(NativeType::Float64));

        let pinned = registry.pin(&descriptor, RegisteredType::new(DataType::Utf8));
        assert_eq!(pinned.arrow, DataType::Float64);
        assert_eq!(registry.len(), 1);

        // Same component name, different archetype: a different column.
        let other = ComponentDescriptor::partial("confidence").with_archetype("MyThing".into());
        registry.pin(&other, RegisteredType::new(DataType::Int64));
        assert_eq!(registry.len(), 2);

        registry.reset();
        assert!(registry.is_empty());
    }

    #[test]
    fn concurrent_pins_agree() {
        let registry = Arc::new(TypeRegistry::new());
        let descriptor = ComponentDescriptor::partial("racy");
        let datatypes = [DataType::Int8, DataType::Int16, DataType::Int32, DataType::Int64];
        let barrier = Arc::new(Barrier::new(datatypes.len()));

        let handles: Vec<_> = datatypes
            .into_iter()
            .map(|datatype| {
                let registry = registry.clone();
                let descriptor = descriptor.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    registry.pin(&descriptor, RegisteredType::new(datatype))
                })
            })
            .collect();

        let winners: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(winners.iter().all(|w| w == &winners[0]));
        assert_eq!(registry.get(&descriptor).as_ref(), Some(&winners[0]));
    }
}
