use std::collections::BTreeSet;
use std::sync::Arc;

use super::{same_store, BeanStore};
use crate::recipe::Recipe;
use crate::types::ConversionHelper;

/// Read-only view over an ordered list of stores.
///
/// Lookups try the children in order and the first match wins; the listed
/// names are the union of the children's names. The parent is the common
/// parent of the children; children with several distinct parents get a
/// combined store over those parents.
///
/// ```rust
/// use beanwire::{BeanStore, CombinedBeanStore, DefaultBeanStore, Recipe};
/// use std::sync::Arc;
///
/// let first = Arc::new(DefaultBeanStore::new("first"));
/// first.add("a", Recipe::constant(1i32).build());
/// let second = Arc::new(DefaultBeanStore::new("second"));
/// second.add("a", Recipe::constant(2i32).build());
/// second.add("b", Recipe::constant(3i32).build());
///
/// let combined = CombinedBeanStore::new(
///     "both",
///     vec![first.clone() as Arc<dyn BeanStore>, second as Arc<dyn BeanStore>],
/// );
/// assert_eq!(combined.recipe("a").unwrap().id(), first.recipe("a").unwrap().id());
/// assert_eq!(combined.provider_names().len(), 2);
/// ```
pub struct CombinedBeanStore {
    name: String,
    children: Vec<Arc<dyn BeanStore>>,
}

impl CombinedBeanStore {
    pub fn new(name: impl Into<String>, children: Vec<Arc<dyn BeanStore>>) -> Self {
        CombinedBeanStore {
            name: name.into(),
            children,
        }
    }

    pub fn children(&self) -> &[Arc<dyn BeanStore>] {
        &self.children
    }
}

impl BeanStore for CombinedBeanStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn recipe(&self, name: &str) -> Option<Arc<Recipe>> {
        self.children.iter().find_map(|child| child.recipe(name))
    }

    fn provider_names(&self) -> BTreeSet<String> {
        self.children
            .iter()
            .flat_map(|child| child.provider_names())
            .collect()
    }

    fn parent(&self) -> Option<Arc<dyn BeanStore>> {
        let mut parents: Vec<Arc<dyn BeanStore>> = Vec::new();
        for parent in self.children.iter().filter_map(|child| child.parent()) {
            if !parents.iter().any(|p| same_store(p, &parent)) {
                parents.push(parent);
            }
        }
        match parents.len() {
            0 => None,
            1 => parents.pop(),
            _ => Some(Arc::new(CombinedBeanStore::new(
                format!("{} (parents)", self.name),
                parents,
            ))),
        }
    }

    fn conversion_helper(&self) -> Option<Arc<ConversionHelper>> {
        self.children
            .iter()
            .find_map(|child| child.conversion_helper())
    }

    fn recipes(&self) -> Vec<(String, Arc<Recipe>)> {
        let mut seen = BTreeSet::new();
        let mut recipes = Vec::new();
        for child in &self.children {
            for (name, recipe) in child.recipes() {
                if seen.insert(name.clone()) {
                    recipes.push((name, recipe));
                }
            }
        }
        recipes
    }
}
