use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::BeanStore;
use crate::bean::Bean;
use crate::recipe::Recipe;
use crate::types::ConversionHelper;

/// Live source of named beans for a [`SimpleBeanStore`].
///
/// Contributors are asked on every lookup, so the beans they expose may
/// change over time.
pub trait BeanContributor: Send + Sync {
    fn bean_names(&self) -> Vec<String>;

    fn bean(&self, name: &str) -> Option<Bean>;
}

/// Store exposing plain objects as constant recipes.
///
/// Beans added directly take precedence over contributors; contributors are
/// asked in registration order.
///
/// ```rust
/// use beanwire::{bean, BeanStore, SimpleBeanStore};
///
/// let store = SimpleBeanStore::new("params");
/// store.add_bean("timeout", bean(30u32));
/// assert!(store.recipe("timeout").is_some());
/// assert!(store.recipe("retries").is_none());
/// ```
pub struct SimpleBeanStore {
    name: String,
    beans: RwLock<IndexMap<String, Arc<Recipe>>>,
    contributors: RwLock<Vec<Arc<dyn BeanContributor>>>,
    parent: RwLock<Option<Weak<dyn BeanStore>>>,
    conversion: RwLock<Option<Arc<ConversionHelper>>>,
}

impl SimpleBeanStore {
    pub fn new(name: impl Into<String>) -> Self {
        SimpleBeanStore {
            name: name.into(),
            beans: RwLock::new(IndexMap::new()),
            contributors: RwLock::new(Vec::new()),
            parent: RwLock::new(None),
            conversion: RwLock::new(None),
        }
    }

    pub fn add_bean(&self, name: impl Into<String>, bean: Bean) {
        let name = name.into();
        let recipe = Recipe::constant_bean(bean).named(name.clone()).build();
        self.beans.write().insert(name, recipe);
    }

    pub fn remove_bean(&self, name: &str) -> bool {
        self.beans.write().shift_remove(name).is_some()
    }

    pub fn add_contributor(&self, contributor: Arc<dyn BeanContributor>) {
        self.contributors.write().push(contributor);
    }

    pub fn remove_contributor(&self, contributor: &Arc<dyn BeanContributor>) {
        self.contributors
            .write()
            .retain(|c| !std::ptr::addr_eq(Arc::as_ptr(c), Arc::as_ptr(contributor)));
    }

    pub fn set_parent(&self, parent: Option<&Arc<dyn BeanStore>>) {
        *self.parent.write() = parent.map(Arc::downgrade);
    }

    pub fn set_conversion_helper(&self, helper: Option<Arc<ConversionHelper>>) {
        *self.conversion.write() = helper;
    }

    fn contributed(&self, name: &str) -> Option<Arc<Recipe>> {
        let contributors = self.contributors.read().clone();
        contributors
            .iter()
            .find_map(|c| c.bean(name))
            .map(|bean| Recipe::constant_bean(bean).named(name).build())
    }
}

impl BeanStore for SimpleBeanStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn recipe(&self, name: &str) -> Option<Arc<Recipe>> {
        if let Some(recipe) = self.beans.read().get(name) {
            return Some(recipe.clone());
        }
        self.contributed(name)
    }

    fn provider_names(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self.beans.read().keys().cloned().collect();
        for contributor in self.contributors.read().iter() {
            names.extend(contributor.bean_names());
        }
        names
    }

    fn parent(&self) -> Option<Arc<dyn BeanStore>> {
        self.parent.read().as_ref().and_then(Weak::upgrade)
    }

    fn conversion_helper(&self) -> Option<Arc<ConversionHelper>> {
        self.conversion.read().clone()
    }

    fn recipes(&self) -> Vec<(String, Arc<Recipe>)> {
        self.beans
            .read()
            .iter()
            .map(|(name, recipe)| (name.clone(), recipe.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean::{bean, downcast};
    use parking_lot::Mutex;

    struct Params(Mutex<Vec<(String, i32)>>);

    impl BeanContributor for Params {
        fn bean_names(&self) -> Vec<String> {
            self.0.lock().iter().map(|(n, _)| n.clone()).collect()
        }

        fn bean(&self, name: &str) -> Option<Bean> {
            self.0
                .lock()
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| bean(*v))
        }
    }

    #[test]
    fn contributors_are_asked_on_every_lookup() {
        let store = SimpleBeanStore::new("simple");
        let params = Arc::new(Params(Mutex::new(vec![("x".to_string(), 1)])));
        store.add_contributor(params.clone());
        store.add_bean("y", bean(2i32));

        assert_eq!(
            store.provider_names().into_iter().collect::<Vec<_>>(),
            vec!["x", "y"]
        );
        assert!(store.recipe("z").is_none());

        params.0.lock().push(("z".to_string(), 3));
        let recipe = store.recipe("z").unwrap();
        match recipe.creator() {
            crate::recipe::Creator::Constant(c) => {
                assert_eq!(*downcast::<i32>(c.value()).unwrap(), 3)
            }
            other => panic!("unexpected creator {:?}", other),
        }

        let as_dyn: Arc<dyn BeanContributor> = params;
        store.remove_contributor(&as_dyn);
        assert!(store.recipe("x").is_none());
    }
}
