//! Type services: loading bean classes by name and converting values.

mod class;
mod conversion;

pub use class::{BeanClass, BeanClassBuilder, InvocationError, Member, Property};
pub use conversion::ConversionHelper;

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::{DiError, DiResult};

/// Resolves class names to [`BeanClass`] descriptors.
///
/// Recipes refer to classes either directly or by name; named references are
/// resolved through the loader of the bean context when the recipe runs.
pub trait TypeLoader: Send + Sync {
    /// Looks up a class by its registered name.
    fn load_type(&self, name: &str) -> DiResult<Arc<BeanClass>>;

    /// Descriptor of the Rust type behind a live bean, if one is registered.
    fn class_of(&self, id: TypeId) -> Option<Arc<BeanClass>>;

    /// Names of every class this loader knows.
    fn type_names(&self) -> Vec<String>;
}

/// Default [`TypeLoader`]: an in-memory registry of class descriptors.
///
/// ```rust
/// use beanwire::{BeanClass, TypeLoader, TypeRegistry};
///
/// struct Clock;
///
/// let registry = TypeRegistry::new();
/// registry.register(BeanClass::builder::<Clock>("Clock").constructor(&[], |_| Ok(Clock)).build());
///
/// assert!(registry.load_type("Clock").is_ok());
/// assert!(registry.load_type("Calendar").is_err());
/// ```
#[derive(Default)]
pub struct TypeRegistry {
    by_name: RwLock<IndexMap<String, Arc<BeanClass>>>,
    by_id: RwLock<HashMap<TypeId, Arc<BeanClass>>>,
    parent: Option<Arc<dyn TypeLoader>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry consulted before `parent`.
    pub fn with_parent(parent: Arc<dyn TypeLoader>) -> Self {
        TypeRegistry {
            parent: Some(parent),
            ..Default::default()
        }
    }

    /// Registers `class` under its own name; a later registration replaces an
    /// earlier one with the same name or type.
    pub fn register(&self, class: Arc<BeanClass>) -> &Self {
        self.by_id.write().insert(class.key().id(), class.clone());
        self.by_name.write().insert(class.name().to_string(), class);
        self
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<BeanClass>> {
        let removed = self.by_name.write().shift_remove(name)?;
        let mut by_id = self.by_id.write();
        if by_id
            .get(&removed.key().id())
            .is_some_and(|c| Arc::ptr_eq(c, &removed))
        {
            by_id.remove(&removed.key().id());
        }
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.by_name.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TypeLoader for TypeRegistry {
    fn load_type(&self, name: &str) -> DiResult<Arc<BeanClass>> {
        if let Some(class) = self.by_name.read().get(name) {
            return Ok(class.clone());
        }
        match &self.parent {
            Some(parent) => parent.load_type(name),
            None => Err(DiError::NotFound(format!("class {}", name))),
        }
    }

    fn class_of(&self, id: TypeId) -> Option<Arc<BeanClass>> {
        if let Some(class) = self.by_id.read().get(&id) {
            return Some(class.clone());
        }
        self.parent.as_ref().and_then(|p| p.class_of(id))
    }

    fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_name.read().keys().cloned().collect();
        if let Some(parent) = &self.parent {
            for name in parent.type_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("classes", &self.by_name.read().keys().collect::<Vec<_>>())
            .field("parent", &self.parent.is_some())
            .finish()
    }
}

/// Reference from a recipe to the class it instantiates.
#[derive(Clone)]
pub enum ClassDescription {
    /// Descriptor supplied at registration time
    Direct(Arc<BeanClass>),
    /// Name resolved through the context's [`TypeLoader`]
    Named(String),
}

impl ClassDescription {
    pub fn named(name: impl Into<String>) -> Self {
        ClassDescription::Named(name.into())
    }

    pub fn resolve(&self, loader: &dyn TypeLoader) -> DiResult<Arc<BeanClass>> {
        match self {
            ClassDescription::Direct(class) => Ok(class.clone()),
            ClassDescription::Named(name) => loader.load_type(name),
        }
    }

    /// Type produced by this class when it is known without a loader.
    pub fn known_key(&self) -> Option<crate::key::TypeKey> {
        match self {
            ClassDescription::Direct(class) => Some(class.key()),
            ClassDescription::Named(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ClassDescription::Direct(class) => class.name(),
            ClassDescription::Named(name) => name,
        }
    }
}

impl From<Arc<BeanClass>> for ClassDescription {
    fn from(class: Arc<BeanClass>) -> Self {
        ClassDescription::Direct(class)
    }
}

impl From<&str> for ClassDescription {
    fn from(name: &str) -> Self {
        ClassDescription::Named(name.to_string())
    }
}

impl fmt::Debug for ClassDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassDescription::Direct(class) => write!(f, "Direct({})", class.name()),
            ClassDescription::Named(name) => write!(f, "Named({})", name),
        }
    }
}
