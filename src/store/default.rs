use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::BeanStore;
use crate::recipe::Recipe;
use crate::types::ConversionHelper;

/// Prefix of the generated names of anonymous recipes.
pub(crate) const ANONYMOUS_PREFIX: &str = "__anonymous#";

/// Mutable store backed by a map.
///
/// Recipes can be added and removed after the store is in use; each lookup
/// sees the current state.
pub struct DefaultBeanStore {
    name: String,
    recipes: RwLock<IndexMap<String, Arc<Recipe>>>,
    parent: RwLock<Option<Weak<dyn BeanStore>>>,
    conversion: RwLock<Option<Arc<ConversionHelper>>>,
    anonymous: RwLock<u64>,
}

impl DefaultBeanStore {
    pub fn new(name: impl Into<String>) -> Self {
        DefaultBeanStore {
            name: name.into(),
            recipes: RwLock::new(IndexMap::new()),
            parent: RwLock::new(None),
            conversion: RwLock::new(None),
            anonymous: RwLock::new(0),
        }
    }

    pub fn with_parent(name: impl Into<String>, parent: &Arc<dyn BeanStore>) -> Self {
        let store = Self::new(name);
        store.set_parent(Some(parent));
        store
    }

    /// Registers `recipe` under `name`, returning the recipe it replaces.
    pub fn add(&self, name: impl Into<String>, recipe: Arc<Recipe>) -> Option<Arc<Recipe>> {
        self.recipes.write().insert(name.into(), recipe)
    }

    /// Registers `recipe` under a generated name that [`provider_names`]
    /// does not list. Returns the generated name.
    ///
    /// [`provider_names`]: BeanStore::provider_names
    pub fn add_anonymous(&self, recipe: Arc<Recipe>) -> String {
        let name = {
            let mut counter = self.anonymous.write();
            *counter += 1;
            format!("{}{}", ANONYMOUS_PREFIX, *counter)
        };
        self.recipes.write().insert(name.clone(), recipe);
        name
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Recipe>> {
        self.recipes.write().shift_remove(name)
    }

    pub fn clear(&self) {
        self.recipes.write().clear();
    }

    pub fn len(&self) -> usize {
        self.recipes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_parent(&self, parent: Option<&Arc<dyn BeanStore>>) {
        *self.parent.write() = parent.map(Arc::downgrade);
    }

    pub fn set_conversion_helper(&self, helper: Option<Arc<ConversionHelper>>) {
        *self.conversion.write() = helper;
    }
}

impl BeanStore for DefaultBeanStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn recipe(&self, name: &str) -> Option<Arc<Recipe>> {
        self.recipes.read().get(name).cloned()
    }

    fn provider_names(&self) -> BTreeSet<String> {
        self.recipes
            .read()
            .keys()
            .filter(|name| !name.starts_with(ANONYMOUS_PREFIX))
            .cloned()
            .collect()
    }

    fn parent(&self) -> Option<Arc<dyn BeanStore>> {
        self.parent.read().as_ref().and_then(Weak::upgrade)
    }

    fn conversion_helper(&self) -> Option<Arc<ConversionHelper>> {
        self.conversion.read().clone()
    }

    fn recipes(&self) -> Vec<(String, Arc<Recipe>)> {
        self.recipes
            .read()
            .iter()
            .map(|(name, recipe)| (name.clone(), recipe.clone()))
            .collect()
    }
}

impl std::fmt::Debug for DefaultBeanStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultBeanStore")
            .field("name", &self.name)
            .field("recipes", &self.recipes.read().keys().collect::<Vec<_>>())
            .field("has_parent", &self.parent().is_some())
            .finish()
    }
}
