//! Build units: the host-side entry point for registering recipes.
//!
//! A [`BuildUnit`] collects recipes into named stores, then produces a
//! [`BuildResult`] holding the stores, the services actually used and the
//! bean context. Releasing the result runs the shutdown sweep.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::bean::Args;
use crate::bean_context::BeanContext;
use crate::config::EngineConfig;
use crate::error::{BoxError, DiError, DiResult, ShutdownErrors};
use crate::key::Dependency;
use crate::lifecycle::{release_stores, BeanCreationListener, CreationListeners};
use crate::lifetime::Scope;
use crate::observer::{DiObserver, Observers};
use crate::provider::Engine;
use crate::recipe::Recipe;
use crate::store::{BeanStore, DefaultBeanStore};
use crate::types::{ConversionHelper, TypeLoader, TypeRegistry};

pub mod module_system;
pub use module_system::*;

/// Name of the store every build unit starts with.
pub const ROOT_STORE: &str = "root";

/// Collects recipes into named stores.
///
/// Every unit owns a root store named [`ROOT_STORE`]; recipes added without a
/// store name land there and the bean context resolves against it. Further
/// stores are chained to the root (or to another named store) and can be
/// handed to derived contexts.
///
/// # Examples
///
/// ```rust
/// use beanwire::{BuildUnit, Dependency};
///
/// let mut unit = BuildUnit::new();
/// unit.add_singleton("greeting", "hello".to_string())
///     .unwrap()
///     .add_store("admin", None)
///     .unwrap();
/// unit.add_singleton_fn("banner", vec![Dependency::name("greeting")], |args| {
///     Ok(format!("{}, admin", args.get::<String>(0)?))
/// })
/// .unwrap();
///
/// let result = unit.build();
/// let admin = result.bean_context().derive(result.store("admin").unwrap());
/// assert_eq!(*admin.get_as::<String>("greeting").unwrap(), "hello");
/// assert!(result.bean_context().contains_bean("banner"));
/// ```
pub struct BuildUnit {
    root: Arc<DefaultBeanStore>,
    stores: IndexMap<String, Arc<dyn BeanStore>>,
    writable: IndexMap<String, Arc<DefaultBeanStore>>,
    parent_store: Option<Arc<dyn BeanStore>>,
    listeners: Vec<Arc<dyn BeanCreationListener>>,
    observers: Observers,
    type_loader: Option<Arc<dyn TypeLoader>>,
    conversion: Option<Arc<ConversionHelper>>,
    config: EngineConfig,
}

impl BuildUnit {
    pub fn new() -> Self {
        let root = Arc::new(DefaultBeanStore::new(ROOT_STORE));
        let mut stores: IndexMap<String, Arc<dyn BeanStore>> = IndexMap::new();
        stores.insert(ROOT_STORE.to_string(), root.clone());
        let mut writable = IndexMap::new();
        writable.insert(ROOT_STORE.to_string(), root.clone());
        BuildUnit {
            root,
            stores,
            writable,
            parent_store: None,
            listeners: Vec::new(),
            observers: Observers::new(),
            type_loader: None,
            conversion: None,
            config: EngineConfig::default(),
        }
    }

    /// Chains the root store to `parent`. The unit and its result keep the
    /// parent alive.
    pub fn with_parent_store(&mut self, parent: Arc<dyn BeanStore>) -> &mut Self {
        self.root.set_parent(Some(&parent));
        self.parent_store = Some(parent);
        self
    }

    pub fn with_type_loader(&mut self, loader: Arc<dyn TypeLoader>) -> &mut Self {
        self.type_loader = Some(loader);
        self
    }

    pub fn with_conversion_helper(&mut self, helper: Arc<ConversionHelper>) -> &mut Self {
        self.conversion = Some(helper);
        self
    }

    pub fn with_config(&mut self, config: EngineConfig) -> &mut Self {
        self.config = config;
        self
    }

    // ----- Stores -----

    /// Adds an empty store chained to `parent`, or to the root store.
    pub fn add_store(&mut self, name: &str, parent: Option<&str>) -> DiResult<&mut Self> {
        self.ensure_free(name)?;
        let parent = self.lookup(parent.unwrap_or(ROOT_STORE))?.clone();
        let store = Arc::new(DefaultBeanStore::with_parent(name, &parent));
        self.stores.insert(name.to_string(), store.clone());
        self.writable.insert(name.to_string(), store);
        Ok(self)
    }

    /// Registers an externally built store under `name`. Recipes cannot be
    /// added to it through the unit.
    pub fn register_store(&mut self, name: &str, store: Arc<dyn BeanStore>) -> DiResult<&mut Self> {
        self.ensure_free(name)?;
        self.stores.insert(name.to_string(), store);
        Ok(self)
    }

    /// Makes the store `target` reachable under `alias` as well.
    pub fn alias_store(&mut self, alias: &str, target: &str) -> DiResult<&mut Self> {
        self.ensure_free(alias)?;
        let store = self.lookup(target)?.clone();
        if let Some(writable) = self.writable.get(target).cloned() {
            self.writable.insert(alias.to_string(), writable);
        }
        self.stores.insert(alias.to_string(), store);
        Ok(self)
    }

    fn ensure_free(&self, name: &str) -> DiResult<()> {
        if self.stores.contains_key(name) {
            return Err(DiError::DuplicateStore(name.to_string()));
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> DiResult<&Arc<dyn BeanStore>> {
        self.stores
            .get(name)
            .ok_or_else(|| DiError::UnknownStore(name.to_string()))
    }

    fn writable(&self, store: Option<&str>) -> DiResult<&Arc<DefaultBeanStore>> {
        let name = store.unwrap_or(ROOT_STORE);
        match self.writable.get(name) {
            Some(store) => Ok(store),
            None if self.stores.contains_key(name) => Err(DiError::InvalidRecipe(format!(
                "store {} does not accept recipes",
                name
            ))),
            None => Err(DiError::UnknownStore(name.to_string())),
        }
    }

    // ----- Recipes -----

    /// Registers `recipe` under `name` in `store`, or in the root store.
    /// A recipe already registered under that name is replaced.
    pub fn add_recipe(
        &mut self,
        store: Option<&str>,
        name: impl Into<String>,
        recipe: Arc<Recipe>,
    ) -> DiResult<&mut Self> {
        let name = name.into();
        let target = self.writable(store)?;
        if target.add(name.clone(), recipe).is_some() {
            debug!(bean = %name, store = target.name(), "recipe replaced");
        }
        Ok(self)
    }

    /// Registers `recipe` under a generated name and returns that name.
    pub fn add_anonymous(&mut self, store: Option<&str>, recipe: Arc<Recipe>) -> DiResult<String> {
        Ok(self.writable(store)?.add_anonymous(recipe))
    }

    /// Registers a ready-made value in the root store.
    pub fn add_singleton<T: Any + Send + Sync>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) -> DiResult<&mut Self> {
        let name = name.into();
        let recipe = Recipe::constant(value).named(name.clone()).build();
        self.add_recipe(None, name, recipe)
    }

    /// Registers a singleton built by `f` from the resolved `params`.
    pub fn add_singleton_fn<T, F>(
        &mut self,
        name: impl Into<String>,
        params: Vec<Dependency>,
        f: F,
    ) -> DiResult<&mut Self>
    where
        T: Any + Send + Sync,
        F: Fn(&Args<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.add_fn(name.into(), Scope::Singleton, params, f)
    }

    /// Registers a factory: `f` runs for every request.
    pub fn add_factory_fn<T, F>(
        &mut self,
        name: impl Into<String>,
        params: Vec<Dependency>,
        f: F,
    ) -> DiResult<&mut Self>
    where
        T: Any + Send + Sync,
        F: Fn(&Args<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.add_fn(name.into(), Scope::Factory, params, f)
    }

    fn add_fn<T, F>(
        &mut self,
        name: String,
        scope: Scope,
        params: Vec<Dependency>,
        f: F,
    ) -> DiResult<&mut Self>
    where
        T: Any + Send + Sync,
        F: Fn(&Args<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let recipe = Recipe::from_fn(params, f)
            .named(name.clone())
            .scope(scope)
            .build();
        self.add_recipe(None, name, recipe)
    }

    // ----- Hooks -----

    /// Adds a creation listener to the built context. Listeners fire in the
    /// order they were added.
    pub fn add_listener(&mut self, listener: Arc<dyn BeanCreationListener>) -> &mut Self {
        self.listeners.push(listener);
        self
    }

    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    pub fn add_module<M: RecipeModule>(&mut self, module: M) -> DiResult<&mut Self> {
        module.register(self)?;
        Ok(self)
    }

    pub fn store_names(&self) -> Vec<&str> {
        self.stores.keys().map(String::as_str).collect()
    }

    // ----- Build -----

    /// Builds a root context over the root store with its own engine.
    pub fn build(self) -> BuildResult {
        let type_loader = self
            .type_loader
            .clone()
            .unwrap_or_else(|| Arc::new(TypeRegistry::new()) as Arc<dyn TypeLoader>);
        let conversion = self
            .conversion
            .clone()
            .unwrap_or_else(|| Arc::new(ConversionHelper::new()));
        let listeners = Arc::new(CreationListeners::new());
        for listener in &self.listeners {
            listeners.add(listener.clone());
        }
        let engine = Arc::new(Engine::new(
            type_loader,
            conversion,
            listeners,
            self.observers.clone(),
            self.config.clone(),
        ));
        let root: Arc<dyn BeanStore> = self.root.clone();
        let context = BeanContext::root(root, engine);
        debug!(stores = self.stores.len(), "build unit built");
        self.into_result(context)
    }

    /// Builds a context derived from `parent`: the root store is chained to
    /// the parent's store and the parent's engine is shared, so the unit's
    /// own type loader, conversion helper, observers and configuration are
    /// not used.
    pub fn build_over(mut self, parent: &BeanContext) -> BuildResult {
        self.with_parent_store(parent.default_store().clone());
        let root: Arc<dyn BeanStore> = self.root.clone();
        let context = parent.derive(root);
        for listener in &self.listeners {
            context.add_creation_listener(listener.clone());
        }
        debug!(stores = self.stores.len(), "build unit built over a parent context");
        self.into_result(context)
    }

    fn into_result(self, context: BeanContext) -> BuildResult {
        BuildResult {
            stores: self.stores,
            root: self.root,
            parent_store: self.parent_store,
            context,
            released: AtomicBool::new(false),
        }
    }
}

impl Default for BuildUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BuildUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildUnit")
            .field("stores", &self.store_names())
            .field("listeners", &self.listeners.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Outcome of a build.
///
/// # Examples
///
/// ```rust
/// use beanwire::{BuildUnit, Recipe, Shutdown};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// static CLOSED: AtomicUsize = AtomicUsize::new(0);
///
/// let mut unit = BuildUnit::new();
/// unit.add_recipe(
///     None,
///     "pool",
///     Recipe::from_fn(vec![], |_| Ok(vec![0u8; 4]))
///         .shutdown(Shutdown::handler(|_| {
///             CLOSED.fetch_add(1, Ordering::SeqCst);
///             Ok(())
///         }))
///         .build(),
/// )
/// .unwrap();
///
/// let result = unit.build();
/// result.bean_context().get("pool").unwrap();
/// result.release().unwrap();
/// result.release().unwrap();
/// assert_eq!(CLOSED.load(Ordering::SeqCst), 1);
/// assert!(result.bean_context().is_closed());
/// ```
pub struct BuildResult {
    stores: IndexMap<String, Arc<dyn BeanStore>>,
    root: Arc<DefaultBeanStore>,
    parent_store: Option<Arc<dyn BeanStore>>,
    context: BeanContext,
    released: AtomicBool,
}

impl BuildResult {
    pub fn bean_context(&self) -> BeanContext {
        self.context.clone()
    }

    pub fn store(&self, name: &str) -> Option<Arc<dyn BeanStore>> {
        self.stores.get(name).cloned()
    }

    pub fn store_names(&self) -> Vec<&str> {
        self.stores.keys().map(String::as_str).collect()
    }

    pub fn root_store(&self) -> &Arc<DefaultBeanStore> {
        &self.root
    }

    pub fn parent_store(&self) -> Option<&Arc<dyn BeanStore>> {
        self.parent_store.as_ref()
    }

    pub fn type_loader(&self) -> Arc<dyn TypeLoader> {
        self.context.type_loader()
    }

    pub fn conversion_helper(&self) -> Arc<ConversionHelper> {
        self.context.conversion_helper()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Runs the shutdown sweep over every store of the build, then closes
    /// the context. Only the first call does anything.
    pub fn release(&self) -> Result<(), ShutdownErrors> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let stores: Vec<Arc<dyn BeanStore>> = self.stores.values().cloned().collect();
        let engine = self.context.engine().clone();
        let outcome = {
            let _pass = engine.lock_pass();
            release_stores(&stores, &engine)
        };
        self.context.close();
        debug!(ok = outcome.is_ok(), "build released");
        outcome
    }
}

impl fmt::Debug for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildResult")
            .field("stores", &self.store_names())
            .field("context", &self.context)
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_names_are_checked() {
        let mut unit = BuildUnit::new();
        unit.add_store("web", None).unwrap();
        assert!(matches!(
            unit.add_store("web", None),
            Err(DiError::DuplicateStore(_))
        ));
        assert!(matches!(
            unit.add_store("api", Some("nope")),
            Err(DiError::UnknownStore(_))
        ));
        assert!(matches!(
            unit.add_singleton_fn("x", vec![], |_| Ok(1u8))
                .and_then(|u| u.add_recipe(Some("nope"), "y", Recipe::constant(1u8).build())),
            Err(DiError::UnknownStore(_))
        ));
    }

    #[test]
    fn registered_stores_are_read_only() {
        let mut unit = BuildUnit::new();
        unit.register_store("external", Arc::new(DefaultBeanStore::new("external")))
            .unwrap();
        let err = unit
            .add_recipe(Some("external"), "x", Recipe::constant(1u8).build())
            .unwrap_err();
        assert!(matches!(err, DiError::InvalidRecipe(_)));
    }

    #[test]
    fn aliases_share_the_store() {
        let mut unit = BuildUnit::new();
        unit.add_store("web", None).unwrap();
        unit.alias_store("www", "web").unwrap();
        unit.add_recipe(Some("www"), "page", Recipe::constant(1u8).build())
            .unwrap();
        let result = unit.build();
        let web = result.store("web").unwrap();
        assert!(web.recipe("page").is_some());
        assert_eq!(result.store_names(), vec![ROOT_STORE, "web", "www"]);
    }
}
