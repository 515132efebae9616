//! Recipe descriptors for introspection and diagnostics.

use crate::key::TypeKey;
use crate::lifetime::Scope;
use crate::recipe::{Recipe, RecipeId};

/// Snapshot of a visible recipe.
///
/// Descriptors are listed by [`BeanContext::descriptors`](crate::BeanContext::descriptors)
/// for every name reachable from the context's store, nearest store first.
///
/// # Examples
///
/// ```rust
/// use beanwire::{BuildUnit, Recipe, Scope, Shutdown};
///
/// let mut unit = BuildUnit::new();
/// unit.add_singleton("port", 8080u16).unwrap();
/// unit.add_recipe(
///     None,
///     "buffer",
///     Recipe::from_fn(vec![], |_| Ok(Vec::<u8>::new()))
///         .scope(Scope::Factory)
///         .shutdown(Shutdown::handler(|_| Ok(())))
///         .build(),
/// )
/// .unwrap();
///
/// let ctx = unit.build().bean_context();
/// let descriptors = ctx.descriptors();
/// let buffer = descriptors.iter().find(|d| d.name == "buffer").unwrap();
/// assert_eq!(buffer.scope, Scope::Factory);
/// assert!(buffer.has_shutdown);
/// assert!(buffer.type_name().unwrap().ends_with("Vec<u8>"));
/// ```
#[derive(Debug, Clone)]
pub struct RecipeDescriptor {
    /// Name the recipe is visible under
    pub name: String,
    /// Name of the store that registers it
    pub store: String,
    /// Identity of the recipe
    pub id: RecipeId,
    pub scope: Scope,
    /// Produced type, when known without creating the bean
    pub bean_type: Option<TypeKey>,
    pub has_shutdown: bool,
}

impl RecipeDescriptor {
    pub(crate) fn new(
        name: String,
        store: &str,
        recipe: &Recipe,
        bean_type: Option<TypeKey>,
    ) -> Self {
        RecipeDescriptor {
            name,
            store: store.to_string(),
            id: recipe.id(),
            scope: recipe.scope(),
            bean_type,
            has_shutdown: recipe.has_shutdown(),
        }
    }

    pub fn type_name(&self) -> Option<&'static str> {
        self.bean_type.map(|key| key.name())
    }

    pub fn is_singleton(&self) -> bool {
        self.scope.is_singleton()
    }
}
