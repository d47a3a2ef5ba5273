//! Metaobject factory
//!
//! Every instance gets a private singleton layer between itself and its
//! nominal prototype:
//!
//! ```text
//! instance ──► layer (private) ──► super delegate ──► ... ──► root
//! ```
//!
//! Composite methods are installed on the layer, so siblings created from
//! the same prototype never see each other's methods.

use crate::mixin::PropertyMap;
use crate::object::{ObjectId, ObjectKind};
use crate::space::ObjectSpace;
use crate::MopResult;

impl ObjectSpace {
    /// Create an instance delegating (through a fresh singleton layer) to
    /// `super_delegate`, or to the root when `None`. `properties` become the
    /// instance's own attributes.
    pub fn create(&mut self, super_delegate: Option<ObjectId>, properties: PropertyMap) -> MopResult<ObjectId> {
        let layer = self.alloc(ObjectKind::Layer, super_delegate.unwrap_or(self.root()))?;
        let instance = self.alloc(ObjectKind::Instance, layer)?;
        self.fill(instance, properties)?;

        tracing::trace!(%instance, %layer, "created instance");
        Ok(instance)
    }

    /// The singleton layer of an instance built by `create`
    pub fn metaobject_layer(&self, instance: ObjectId) -> MopResult<Option<ObjectId>> {
        let Some(delegate) = self.delegate_of(instance)? else {
            return Ok(None);
        };
        Ok((self.object(delegate)?.kind() == ObjectKind::Layer).then_some(delegate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixin::PropertyDescriptor;
    use crate::value::Value;
    use crate::MopError;

    #[test]
    fn test_create_builds_layer() {
        let mut space = ObjectSpace::new();
        let obj = space.create(None, PropertyMap::new()).unwrap();
        let layer = space.metaobject_layer(obj).unwrap().unwrap();

        assert_eq!(space.object(obj).unwrap().kind(), ObjectKind::Instance);
        assert_eq!(space.object(layer).unwrap().slot_count(), 0);
        assert_eq!(space.chain(obj).unwrap(), vec![obj, layer, space.root()]);
    }

    #[test]
    fn test_siblings_do_not_share_layers() {
        let mut space = ObjectSpace::new();
        let proto = space.plain(None, PropertyMap::new()).unwrap();
        let a = space.create(Some(proto), PropertyMap::new()).unwrap();
        let b = space.create(Some(proto), PropertyMap::new()).unwrap();

        assert_ne!(space.metaobject_layer(a).unwrap(), space.metaobject_layer(b).unwrap());

        space
            .install(a, "greet", Some(Value::function(|_, _, _| Ok(Value::from("hi")))))
            .unwrap();
        assert!(space.resolve(a, "greet").unwrap().is_some());
        assert_eq!(space.resolve(b, "greet").unwrap(), None);
        assert!(space.own_keys(proto).unwrap().is_empty());
    }

    #[test]
    fn test_descriptors_become_own_attributes() {
        let mut space = ObjectSpace::new();
        let props = PropertyMap::new()
            .with("firstName", "Sam")
            .with_descriptor("id", PropertyDescriptor::hidden(7));
        let obj = space.create(None, props).unwrap();

        assert_eq!(space.own_keys(obj).unwrap(), vec!["firstName", "id"]);
        assert_eq!(space.properties(obj).unwrap(), PropertyMap::new().with("firstName", "Sam"));
        assert_eq!(space.resolve(obj, "id").unwrap(), Some(Value::Int(7)));
    }

    #[test]
    fn test_inherits_from_super_delegate() {
        let mut space = ObjectSpace::new();
        let proto = space.plain(None, PropertyMap::new().with("species", "human")).unwrap();
        let obj = space.create(Some(proto), PropertyMap::new()).unwrap();
        assert_eq!(space.resolve(obj, "species").unwrap(), Some(Value::from("human")));
    }

    #[test]
    fn test_plain_objects_have_no_layer() {
        let mut space = ObjectSpace::new();
        let plain = space.plain(None, PropertyMap::new()).unwrap();
        assert_eq!(space.metaobject_layer(plain).unwrap(), None);
        assert_eq!(space.metaobject_layer(space.root()).unwrap(), None);
    }

    #[test]
    fn test_unknown_super_delegate() {
        let mut space = ObjectSpace::new();
        let mut other = ObjectSpace::new();
        let foreign = other.create(None, PropertyMap::new()).unwrap();
        assert_eq!(
            space.create(Some(foreign), PropertyMap::new()).unwrap_err(),
            MopError::UnknownObject(foreign)
        );
    }
}
