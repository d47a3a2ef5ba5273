//! Composite Methods
//!
//! A composite method is a named callable made of three parts:
//! - `before`: advice run for side effects, most recently prepended first
//! - `body`: the replaceable core that produces the initial result
//! - `after`: advice folded over the result, in registration order
//!
//! ## Installation
//!
//! Composite methods are installed on an instance's singleton metaobject
//! layer, never on the object itself. Objects without a layer (the root and
//! plain objects) cannot hold composite methods. Reading the name through the
//! chain yields `Value::Method`; assigning the name through
//! `ObjectSpace::set` replaces only the body, keeping both advice lists.
//!
//! ## Invocation
//!
//! ```text
//! for advice in before:  advice(this, args)            // result discarded
//! acc = body(this, args)
//! for advice in after:   r = advice(this, [acc])
//!                        if r is not undefined: acc = r
//! return acc
//! ```

use std::fmt;
use std::rc::Rc;

use crate::object::{ObjectId, Slot};
use crate::space::ObjectSpace;
use crate::value::{Callable, Function, Value};
use crate::{CallableRole, MopError, MopResult};

/// Handle to a composite method in an `ObjectSpace`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(u32);

impl MethodId {
    pub(crate) fn new(index: usize) -> MopResult<Self> {
        u32::try_from(index)
            .map(Self)
            .map_err(|_| MopError::CapacityExceeded("composite methods"))
    }

    /// Arena index
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Composite method record
#[derive(Debug, Clone)]
pub struct CompositeMethod {
    name: Rc<str>,
    layer: ObjectId,
    body: Callable,
    before: Rc<Vec<Callable>>,
    after: Rc<Vec<Callable>>,
}

impl CompositeMethod {
    fn new(name: &str, layer: ObjectId, body: Callable) -> Self {
        Self {
            name: Rc::from(name),
            layer,
            body,
            before: Rc::new(Vec::new()),
            after: Rc::new(Vec::new()),
        }
    }

    /// Name the method was installed under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The layer holding the method's slot
    pub fn layer(&self) -> ObjectId {
        self.layer
    }

    /// Current body
    pub fn body(&self) -> &Callable {
        &self.body
    }

    /// Before-advice in execution order
    pub fn before(&self) -> &[Callable] {
        &self.before
    }

    /// After-advice in execution order
    pub fn after(&self) -> &[Callable] {
        &self.after
    }
}

impl ObjectSpace {
    /// Borrow a composite method
    pub fn method(&self, id: MethodId) -> MopResult<&CompositeMethod> {
        self.methods.get(id.index()).ok_or(MopError::UnknownMethod(id))
    }

    fn method_mut(&mut self, id: MethodId) -> MopResult<&mut CompositeMethod> {
        self.methods.get_mut(id.index()).ok_or(MopError::UnknownMethod(id))
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Install (or look up) the composite method `name` for `object`.
    ///
    /// Without an override, a composite method already reachable through the
    /// chain is returned unchanged. With an override, or when none is
    /// reachable, a fresh method with empty advice lists is installed on the
    /// object's layer, replacing any slot of that name there.
    pub fn install(&mut self, object: ObjectId, name: &str, override_body: Option<Value>) -> MopResult<MethodId> {
        let body = override_body
            .map(|value| Callable::from_value(value, CallableRole::Body))
            .transpose()?;
        self.install_callable(object, name, body)
    }

    /// Install every `(name, body)` pair as an override on `object`.
    ///
    /// All bodies are validated before anything is installed.
    pub fn install_all<I, S>(&mut self, object: ObjectId, methods: I) -> MopResult<ObjectId>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: AsRef<str>,
    {
        let methods = methods
            .into_iter()
            .map(|(name, body)| {
                let name = name.as_ref();
                if name.is_empty() {
                    return Err(MopError::InvalidName(name.to_string()));
                }
                Ok((name.to_string(), Callable::from_value(body, CallableRole::Body)?))
            })
            .collect::<MopResult<Vec<_>>>()?;

        for (name, body) in methods {
            self.install_callable(object, &name, Some(body))?;
        }
        Ok(object)
    }

    fn install_callable(&mut self, object: ObjectId, name: &str, body: Option<Callable>) -> MopResult<MethodId> {
        if name.is_empty() {
            return Err(MopError::InvalidName(name.to_string()));
        }

        let layer = self
            .metaobject_layer(object)?
            .ok_or(MopError::NoMetaobjectLayer(object))?;

        // Own attributes of the instance may shadow the method; look from the layer up.
        if body.is_none() {
            if let Some(Value::Method(existing)) = self.resolve(layer, name)? {
                return Ok(existing);
            }
        }

        let overridden = body.is_some();
        let body = body.unwrap_or_else(|| Callable::Native(Function::noop()));
        let id = MethodId::new(self.methods.len())?;
        self.methods.push(CompositeMethod::new(name, layer, body));
        self.object_mut(layer)?.put_slot(name, Slot::Composite(id));

        tracing::debug!(method = %id, name, %object, %layer, overridden, "installed composite method");
        Ok(id)
    }

    /// Insert before-advice at the front. Returns the new list length.
    pub fn prepend_before(&mut self, id: MethodId, advice: impl Into<Value>) -> MopResult<usize> {
        let advice = Callable::from_value(advice.into(), CallableRole::BeforeAdvice)?;
        let method = self.method_mut(id)?;
        let before = Rc::make_mut(&mut method.before);
        before.insert(0, advice);
        Ok(before.len())
    }

    /// Insert after-advice at the back. Returns the new list length.
    pub fn append_after(&mut self, id: MethodId, advice: impl Into<Value>) -> MopResult<usize> {
        let advice = Callable::from_value(advice.into(), CallableRole::AfterAdvice)?;
        let method = self.method_mut(id)?;
        let after = Rc::make_mut(&mut method.after);
        after.push(advice);
        Ok(after.len())
    }

    /// Replace the body, keeping both advice lists
    pub fn set_body(&mut self, id: MethodId, body: impl Into<Value>) -> MopResult<()> {
        let body = Callable::from_value(body.into(), CallableRole::Body)?;
        self.method_mut(id)?.body = body;
        Ok(())
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Run a composite method against `receiver`.
    ///
    /// The advice lists are snapshotted first; advice added while the method
    /// runs takes effect on the next invocation.
    pub fn invoke(&mut self, id: MethodId, receiver: ObjectId, args: &[Value]) -> MopResult<Value> {
        let method = self.method(id)?;
        let before = Rc::clone(&method.before);
        let after = Rc::clone(&method.after);
        let body = method.body.clone();

        tracing::trace!(method = %id, %receiver, before = before.len(), after = after.len(), "invoke");

        for advice in before.iter() {
            self.apply(advice, receiver, args)?;
        }

        let initial = self.apply(&body, receiver, args)?;

        after.iter().try_fold(initial, |acc, advice| {
            let next = self.apply(advice, receiver, std::slice::from_ref(&acc))?;
            Ok(if next.is_undefined() { acc } else { next })
        })
    }
}
