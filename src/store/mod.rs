//! Bean stores: chainable name to recipe namespaces.
//!
//! A store answers lookups from its local map only; walking up to the parent
//! is done by [`find_recipe`] and friends so that every store flavor gets the
//! same chain semantics. Parents are held weakly: the owner of a store
//! hierarchy (usually a [`BuildResult`](crate::BuildResult)) keeps every store
//! alive.

mod combined;
mod default;
mod simple;

pub use combined::CombinedBeanStore;
pub use default::DefaultBeanStore;
pub use simple::{BeanContributor, SimpleBeanStore};

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::key::TypeKey;
use crate::recipe::Recipe;
use crate::types::{ConversionHelper, TypeLoader};

/// A namespace of recipes with an optional parent.
pub trait BeanStore: Send + Sync {
    /// Name of this store, for diagnostics and store lookups.
    fn name(&self) -> &str;

    /// Recipe registered locally under `name`.
    fn recipe(&self, name: &str) -> Option<Arc<Recipe>>;

    /// Names listed by this store, excluding anonymous recipes.
    fn provider_names(&self) -> BTreeSet<String>;

    /// Parent store, if it is still alive.
    fn parent(&self) -> Option<Arc<dyn BeanStore>>;

    /// Conversion helper attached to this store.
    fn conversion_helper(&self) -> Option<Arc<ConversionHelper>> {
        None
    }

    /// Every recipe registered locally, anonymous ones included, paired with
    /// the name it is registered under.
    fn recipes(&self) -> Vec<(String, Arc<Recipe>)>;
}

/// The store and every ancestor, nearest first.
pub fn store_chain(store: &Arc<dyn BeanStore>) -> Vec<Arc<dyn BeanStore>> {
    let mut chain = vec![store.clone()];
    let mut current = store.parent();
    while let Some(next) = current {
        if chain.iter().any(|s| same_store(s, &next)) {
            break;
        }
        current = next.parent();
        chain.push(next);
    }
    chain
}

/// Looks `name` up in `store`, then along its parents.
pub fn find_recipe(store: &Arc<dyn BeanStore>, name: &str) -> Option<Arc<Recipe>> {
    if let Some(recipe) = store.recipe(name) {
        return Some(recipe);
    }
    store_chain(store)
        .into_iter()
        .skip(1)
        .find_map(|s| s.recipe(name))
}

/// First recipe producing `key`: stores are searched nearest first, names in
/// each store in sorted order.
pub fn find_recipe_by_type(
    store: &Arc<dyn BeanStore>,
    key: TypeKey,
    loader: Option<&dyn TypeLoader>,
) -> Option<(String, Arc<Recipe>)> {
    for s in store_chain(store) {
        for name in s.provider_names() {
            if let Some(recipe) = s.recipe(&name) {
                if recipe.bean_type(loader) == Some(key) {
                    return Some((name, recipe));
                }
            }
        }
    }
    None
}

/// Union of the provider names of the whole chain.
pub fn chain_names(store: &Arc<dyn BeanStore>) -> BTreeSet<String> {
    store_chain(store)
        .iter()
        .flat_map(|s| s.provider_names())
        .collect()
}

/// First conversion helper found along the chain.
pub fn fetch_conversion_helper(store: &Arc<dyn BeanStore>) -> Option<Arc<ConversionHelper>> {
    store_chain(store)
        .iter()
        .find_map(|s| s.conversion_helper())
}

/// Identity comparison of store handles.
pub fn same_store(a: &Arc<dyn BeanStore>, b: &Arc<dyn BeanStore>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
