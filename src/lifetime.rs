//! Bean scope definitions.

/// Scope of a recipe, controlling instance caching.
///
/// # Examples
///
/// ```rust
/// use beanwire::{bean, BuildUnit, Recipe, Scope};
/// use std::sync::Arc;
///
/// struct Counter;
///
/// let mut unit = BuildUnit::new();
/// unit.add_recipe(None, "shared", Recipe::from_fn(vec![], |_| Ok(Counter)).build()).unwrap();
/// unit.add_recipe(
///     None,
///     "fresh",
///     Recipe::from_fn(vec![], |_| Ok(Counter)).scope(Scope::Factory).build(),
/// )
/// .unwrap();
///
/// let result = unit.build();
/// let ctx = result.bean_context();
///
/// // Singleton: same instance for every request
/// let a = ctx.get_as::<Counter>("shared").unwrap();
/// let b = ctx.get_as::<Counter>("shared").unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// // Factory: new instance for every request
/// let c = ctx.get_as::<Counter>("fresh").unwrap();
/// let d = ctx.get_as::<Counter>("fresh").unwrap();
/// assert!(!Arc::ptr_eq(&c, &d));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum Scope {
    /// One instance per bean context, created on first request
    ///
    /// While the instance is being populated it is already visible to the
    /// recipes it depends on, which is what lets cyclic singletons resolve.
    #[default]
    Singleton,
    /// New instance per request, never cached
    ///
    /// A factory recipe that is reached again while it is still being built
    /// is a fatal cycle.
    Factory,
}

impl Scope {
    pub fn is_singleton(self) -> bool {
        self == Scope::Singleton
    }
}
