//! Type keys and dependency references.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::bean::Bean;
use crate::recipe::{Constant, Recipe};

/// Identifies a Rust type by `TypeId`, carrying its name for diagnostics.
///
/// Equality and hashing use the `TypeId` only.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeKey {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Key accepting any bean; conversion to it is the identity.
    pub fn any() -> Self {
        TypeKey::of::<dyn Any + Send + Sync>()
    }

    /// Builds a key from a raw `TypeId`, e.g. one taken from a live bean.
    pub fn from_id(id: TypeId, name: &'static str) -> Self {
        TypeKey { id, name }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[inline(always)]
pub fn key_of_type<T: ?Sized + 'static>() -> TypeKey {
    TypeKey::of::<T>()
}

/// A reference from a recipe to a value it needs.
///
/// Dependencies are resolved by the active resolver: names and types are
/// looked up along the store chain, nested recipes are resolved directly and
/// literal values need no store at all.
#[derive(Clone)]
pub enum Dependency {
    /// Bean registered under a name
    Name(String),
    /// Bean whose recipe produces this type
    Type(TypeKey),
    /// Literal value, optionally converted to a target type
    Value(Constant),
    /// Anonymous recipe resolved in place
    Recipe(Arc<Recipe>),
    /// Variable bound earlier in the same initialization chain
    Variable(String),
}

impl Dependency {
    pub fn name(name: impl Into<String>) -> Self {
        Dependency::Name(name.into())
    }

    pub fn of_type<T: ?Sized + 'static>() -> Self {
        Dependency::Type(TypeKey::of::<T>())
    }

    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Dependency::Value(Constant::new(value))
    }

    /// Literal value that is converted to `T` when resolved.
    pub fn converted<T: Any + Send + Sync>(value: impl Any + Send + Sync) -> Self {
        Dependency::Value(Constant::new(value).convert_to::<T>())
    }

    /// Wraps an existing bean as a literal.
    pub fn bean(bean: Bean) -> Self {
        Dependency::Value(Constant::from_bean(bean))
    }

    pub fn nested(recipe: Arc<Recipe>) -> Self {
        Dependency::Recipe(recipe)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Dependency::Variable(name.into())
    }

    /// `true` for dependencies that never touch the store chain.
    pub fn is_literal(&self) -> bool {
        matches!(self, Dependency::Value(_))
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Name(name) => write!(f, "Name({})", name),
            Dependency::Type(key) => write!(f, "Type({})", key.name()),
            Dependency::Value(constant) => write!(f, "Value({:?})", constant),
            Dependency::Recipe(recipe) => write!(f, "Recipe({})", recipe.display_name()),
            Dependency::Variable(name) => write!(f, "Variable({})", name),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Name(name) => f.write_str(name),
            Dependency::Type(key) => write!(f, "type {}", key.name()),
            Dependency::Value(_) => f.write_str("<literal>"),
            Dependency::Recipe(recipe) => f.write_str(&recipe.display_name()),
            Dependency::Variable(name) => write!(f, "${}", name),
        }
    }
}

impl From<&str> for Dependency {
    fn from(name: &str) -> Self {
        Dependency::Name(name.to_string())
    }
}

impl From<String> for Dependency {
    fn from(name: String) -> Self {
        Dependency::Name(name)
    }
}

impl From<Arc<Recipe>> for Dependency {
    fn from(recipe: Arc<Recipe>) -> Self {
        Dependency::Recipe(recipe)
    }
}
