//! Object space
//!
//! The object space owns every object and every composite method. All
//! operations take `&mut ObjectSpace`; handles (`ObjectId`, `MethodId`) are
//! plain indices and never keep anything alive on their own.
//!
//! Delegates are fixed when an object is allocated and must already exist,
//! so every delegation chain is finite and ends at the root.

use std::fmt;
use std::rc::Rc;

use crate::composite::{CompositeMethod, MethodId};
use crate::dispatch::{FailOnMiss, NotUnderstood, ReportMiss};
use crate::mixin::{mixin_entries, PropertyDescriptor, PropertyMap};
use crate::object::{ObjectData, ObjectId, ObjectKind, Slot};
use crate::options::{MissPolicy, SpaceOptions, DEFAULT_MAX_CALL_DEPTH};
use crate::value::{Callable, Value};
use crate::{CallableRole, MopError, MopResult};

/// Arena of objects and composite methods
pub struct ObjectSpace {
    objects: Vec<ObjectData>,
    pub(crate) methods: Vec<CompositeMethod>,
    root: ObjectId,
    options: SpaceOptions,
    miss_handler: Rc<dyn NotUnderstood>,
    depth: usize,
}

impl ObjectSpace {
    /// Create a space with default options
    pub fn new() -> Self {
        Self::with_options(SpaceOptions::default())
    }

    /// Create a space; the not-understood handler follows `options.miss_policy`.
    /// A `max_call_depth` of 0 falls back to the default.
    pub fn with_options(mut options: SpaceOptions) -> Self {
        if options.max_call_depth == 0 {
            tracing::warn!(default = DEFAULT_MAX_CALL_DEPTH, "max_call_depth of 0 replaced by default");
            options.max_call_depth = DEFAULT_MAX_CALL_DEPTH;
        }
        let miss_handler: Rc<dyn NotUnderstood> = match options.miss_policy {
            MissPolicy::Report => Rc::new(ReportMiss),
            MissPolicy::Fail => Rc::new(FailOnMiss),
        };
        Self {
            objects: vec![ObjectData::new(ObjectKind::Root, None)],
            methods: Vec::new(),
            root: ObjectId::ROOT,
            options,
            miss_handler,
            depth: 0,
        }
    }

    /// Active options
    pub fn options(&self) -> &SpaceOptions {
        &self.options
    }

    /// The root delegate
    pub fn root(&self) -> ObjectId {
        self.root
    }

    /// Number of allocated objects (root included)
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of composite methods ever created
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Replace the not-understood handler used by `send`
    pub fn set_miss_handler(&mut self, handler: impl NotUnderstood + 'static) {
        self.miss_handler = Rc::new(handler);
    }

    pub(crate) fn miss_handler(&self) -> Rc<dyn NotUnderstood> {
        Rc::clone(&self.miss_handler)
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    pub(crate) fn alloc(&mut self, kind: ObjectKind, delegate: ObjectId) -> MopResult<ObjectId> {
        self.object(delegate)?;
        let id = ObjectId::new(self.objects.len())?;
        self.objects.push(ObjectData::new(kind, Some(delegate)));
        Ok(id)
    }

    pub(crate) fn fill(&mut self, id: ObjectId, properties: PropertyMap) -> MopResult<()> {
        let object = self.object_mut(id)?;
        for (name, descriptor) in properties {
            object.put_slot(&name, Slot::from(descriptor));
        }
        Ok(())
    }

    /// Allocate an object without a singleton layer. Used for shared
    /// prototypes; `None` delegates to the root.
    pub fn plain(&mut self, delegate: Option<ObjectId>, properties: PropertyMap) -> MopResult<ObjectId> {
        let id = self.alloc(ObjectKind::Plain, delegate.unwrap_or(self.root))?;
        self.fill(id, properties)?;
        Ok(id)
    }

    // ========================================================================
    // Object access
    // ========================================================================

    /// Borrow an object
    pub fn object(&self, id: ObjectId) -> MopResult<&ObjectData> {
        self.objects.get(id.index()).ok_or(MopError::UnknownObject(id))
    }

    pub(crate) fn object_mut(&mut self, id: ObjectId) -> MopResult<&mut ObjectData> {
        self.objects.get_mut(id.index()).ok_or(MopError::UnknownObject(id))
    }

    /// Next object in the chain, `None` for the root
    pub fn delegate_of(&self, id: ObjectId) -> MopResult<Option<ObjectId>> {
        Ok(self.object(id)?.delegate())
    }

    /// The delegation chain starting at `id` (inclusive) and ending at the root
    pub fn chain(&self, id: ObjectId) -> MopResult<Vec<ObjectId>> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(next) = current {
            chain.push(next);
            current = self.object(next)?.delegate();
        }
        Ok(chain)
    }

    /// Check for an own attribute
    pub fn has_own(&self, id: ObjectId, name: &str) -> MopResult<bool> {
        Ok(self.object(id)?.has_own(name))
    }

    /// Own attribute names, enumerable or not, in insertion order
    pub fn own_keys(&self, id: ObjectId) -> MopResult<Vec<String>> {
        Ok(self.object(id)?.own_keys().map(str::to_string).collect())
    }

    /// Snapshot of the own enumerable data attributes, usable as a mixin
    /// provider
    pub fn properties(&self, id: ObjectId) -> MopResult<PropertyMap> {
        Ok(self
            .object(id)?
            .enumerable_entries()
            .map(|(name, value)| (name, value.clone()))
            .collect())
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Write an own data attribute directly, replacing whatever own slot
    /// had that name. Composite slots further up the chain are not consulted.
    pub fn define(&mut self, id: ObjectId, name: &str, descriptor: PropertyDescriptor) -> MopResult<()> {
        self.object_mut(id)?.put_slot(name, Slot::from(descriptor));
        Ok(())
    }

    /// Assign an attribute.
    ///
    /// - an own data attribute is overwritten in place
    /// - otherwise, the first composite slot found along the chain has its
    ///   body replaced (`value` must be callable)
    /// - otherwise a new own enumerable attribute is created, shadowing any
    ///   data attribute further up the chain
    pub fn set(&mut self, id: ObjectId, name: &str, value: impl Into<Value>) -> MopResult<()> {
        let value = value.into();
        if let Some(method) = self.assignment_target(id, name)? {
            return self.set_body(method, value);
        }

        let object = self.object_mut(id)?;
        match object.slot_mut(name) {
            Some(Slot::Data { value: slot, .. }) => *slot = value,
            _ => {
                object.put_slot(name, Slot::data(value));
            }
        }
        Ok(())
    }

    /// The composite method whose body an assignment of `name` on `id`
    /// would replace, if any
    fn assignment_target(&self, id: ObjectId, name: &str) -> MopResult<Option<MethodId>> {
        let mut current = Some(id);
        while let Some(next) = current {
            let object = self.object(next)?;
            match object.slot(name) {
                Some(Slot::Composite(method)) => return Ok(Some(*method)),
                Some(Slot::Data { .. }) => return Ok(None),
                None => current = object.delegate(),
            }
        }
        Ok(None)
    }

    /// Apply the mixin rules to a live object, using assignment semantics.
    ///
    /// Every entry is checked before anything is written; a non-callable value
    /// landing on a composite method leaves the object untouched.
    pub fn extend_object(&mut self, id: ObjectId, providers: &[&PropertyMap]) -> MopResult<ObjectId> {
        self.object(id)?;
        let mut writes = Vec::new();
        for provider in providers {
            for (name, value) in mixin_entries(provider) {
                if self.assignment_target(id, name)?.is_some() {
                    Callable::from_value(value.clone(), CallableRole::Body)?;
                }
                writes.push((name, value.clone()));
            }
        }

        for (name, value) in writes {
            self.set(id, name, value)?;
        }
        Ok(id)
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Call a callable with `this` as receiver, enforcing `max_call_depth`
    pub fn apply(&mut self, callable: &Callable, this: ObjectId, args: &[Value]) -> MopResult<Value> {
        let limit = self.options.max_call_depth;
        if self.depth >= limit {
            return Err(MopError::CallDepthExceeded(limit));
        }

        self.depth += 1;
        let result = match callable {
            Callable::Native(func) => func.call(self, this, args),
            Callable::Composite(method) => self.invoke(*method, this, args),
        };
        self.depth -= 1;
        result
    }
}

impl Default for ObjectSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectSpace")
            .field("objects", &self.objects.len())
            .field("methods", &self.methods.len())
            .field("options", &self.options)
            .finish()
    }
}
