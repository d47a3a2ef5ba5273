//! Object model
//!
//! Objects live in the `ObjectSpace` arena and are referred to by `ObjectId`.
//! Each object owns an insertion-ordered attribute table and holds at most
//! one non-owning delegate reference, fixed when the object is created.

use std::fmt;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::composite::MethodId;
use crate::mixin::PropertyDescriptor;
use crate::value::Value;
use crate::{MopError, MopResult};

/// Attribute table keyed by name, iterated in insertion order
pub type SlotTable = IndexMap<String, Slot, FxBuildHasher>;

/// Handle to an object in an `ObjectSpace`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u32);

impl ObjectId {
    pub(crate) const ROOT: ObjectId = ObjectId(0);

    pub(crate) fn new(index: usize) -> MopResult<Self> {
        u32::try_from(index)
            .map(Self)
            .map_err(|_| MopError::CapacityExceeded("objects"))
    }

    /// Arena index
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How an object came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// The root delegate; every chain ends here
    Root,
    /// Singleton metaobject layer created for one instance
    Layer,
    /// Instance produced by the metaobject factory
    Instance,
    /// Plain object (shared prototype, mixin source)
    Plain,
}

/// An own attribute
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Plain data attribute
    Data {
        /// Stored value
        value: Value,
        /// Visible to enumeration and mixin copying
        enumerable: bool,
    },
    /// Composite method installed under this name. Reading yields the
    /// method handle; assignment replaces only the method's body.
    Composite(MethodId),
}

impl Slot {
    /// Enumerable data slot
    pub fn data(value: impl Into<Value>) -> Self {
        Slot::Data {
            value: value.into(),
            enumerable: true,
        }
    }

    /// Value observed when the slot is read
    pub fn value(&self) -> Value {
        match self {
            Slot::Data { value, .. } => value.clone(),
            Slot::Composite(id) => Value::Method(*id),
        }
    }

    /// Composite slots are never enumerable
    pub fn is_enumerable(&self) -> bool {
        match self {
            Slot::Data { enumerable, .. } => *enumerable,
            Slot::Composite(_) => false,
        }
    }
}

impl From<PropertyDescriptor> for Slot {
    fn from(descriptor: PropertyDescriptor) -> Self {
        Slot::Data {
            value: descriptor.value,
            enumerable: descriptor.enumerable,
        }
    }
}

/// Object storage
#[derive(Debug, Clone)]
pub struct ObjectData {
    kind: ObjectKind,
    delegate: Option<ObjectId>,
    slots: SlotTable,
}

impl ObjectData {
    /// Create an empty object
    pub fn new(kind: ObjectKind, delegate: Option<ObjectId>) -> Self {
        Self {
            kind,
            delegate,
            slots: SlotTable::default(),
        }
    }

    /// Object kind
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Next object in the delegation chain
    pub fn delegate(&self) -> Option<ObjectId> {
        self.delegate
    }

    /// Get an own slot
    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.get(name)
    }

    /// Check for an own attribute
    pub fn has_own(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Own attribute names in insertion order (enumerable or not)
    pub fn own_keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Own enumerable data attributes in insertion order
    pub fn enumerable_entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.slots.iter().filter_map(|(name, slot)| match slot {
            Slot::Data {
                value,
                enumerable: true,
            } => Some((name.as_str(), value)),
            _ => None,
        })
    }

    /// Number of own attributes
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Write an own slot; an existing name keeps its position
    pub(crate) fn put_slot(&mut self, name: &str, slot: Slot) -> Option<Slot> {
        match self.slots.get_mut(name) {
            Some(existing) => Some(std::mem::replace(existing, slot)),
            None => {
                self.slots.insert(name.to_string(), slot);
                None
            }
        }
    }

    pub(crate) fn slot_mut(&mut self, name: &str) -> Option<&mut Slot> {
        self.slots.get_mut(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_creation() {
        let obj = ObjectData::new(ObjectKind::Plain, Some(ObjectId::ROOT));
        assert_eq!(obj.kind(), ObjectKind::Plain);
        assert_eq!(obj.delegate(), Some(ObjectId::ROOT));
        assert_eq!(obj.slot_count(), 0);
    }

    #[test]
    fn test_slot_order_is_stable() {
        let mut obj = ObjectData::new(ObjectKind::Plain, None);
        obj.put_slot("b", Slot::data(1));
        obj.put_slot("a", Slot::data(2));
        obj.put_slot("b", Slot::data(3));

        let keys: Vec<&str> = obj.own_keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(obj.slot("b").map(Slot::value), Some(Value::Int(3)));
    }

    #[test]
    fn test_enumerable_entries_skip_hidden_and_composite() {
        let mut obj = ObjectData::new(ObjectKind::Layer, None);
        obj.put_slot("shown", Slot::data("x"));
        obj.put_slot(
            "hidden",
            Slot::Data {
                value: Value::Int(1),
                enumerable: false,
            },
        );
        obj.put_slot("method", Slot::Composite(MethodId::new(0).unwrap()));

        let names: Vec<&str> = obj.enumerable_entries().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["shown"]);
        assert_eq!(obj.own_keys().count(), 3);
    }

    #[test]
    fn test_composite_slot_reads_as_method() {
        let slot = Slot::Composite(MethodId::new(4).unwrap());
        assert_eq!(slot.value(), Value::Method(MethodId::new(4).unwrap()));
        assert!(!slot.is_enumerable());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_handles_do_not_wrap() {
        let past_end = u32::MAX as usize + 1;
        assert_eq!(ObjectId::new(past_end), Err(MopError::CapacityExceeded("objects")));
        assert_eq!(
            MethodId::new(past_end),
            Err(MopError::CapacityExceeded("composite methods"))
        );
        assert_eq!(ObjectId::new(u32::MAX as usize).map(ObjectId::index), Ok(u32::MAX as usize));
    }
}
