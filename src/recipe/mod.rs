//! Construction recipes.
//!
//! A [`Recipe`] describes how to obtain one bean: a [`Creator`] producing the
//! bare instance, an ordered list of [`InitStep`]s populating it, and an
//! optional [`Shutdown`] strategy run when the build is released. Recipes are
//! immutable once built and shared as `Arc<Recipe>`; the [`RecipeId`] assigned
//! at build time is the identity used for singleton caching and cycle
//! detection.

mod creator;
mod init;
mod shutdown;

pub use creator::{Constant, Creator, Invocation};
pub use init::InitStep;
pub use shutdown::Shutdown;

use init::InitChain;

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::bean::{downcast, Args, Bean};
use crate::bean_context::WeakBeanContext;
use crate::error::{BoxError, DiError, DiResult};
use crate::key::{Dependency, TypeKey};
use crate::lifecycle::BeanContextClient;
use crate::lifetime::Scope;
use crate::traits::{Dispose, ResolverCore};
use crate::types::{ClassDescription, TypeLoader};

pub(crate) type ClientHook = Arc<dyn Fn(&Bean, WeakBeanContext) -> DiResult<()> + Send + Sync>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a built recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecipeId(u64);

impl RecipeId {
    fn next() -> Self {
        RecipeId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Declarative description of one bean.
///
/// ```rust
/// use beanwire::{BuildUnit, Dependency, Recipe, Scope};
///
/// let mut unit = BuildUnit::new();
/// unit.add_singleton("greeting", "hello".to_string()).unwrap();
/// unit.add_recipe(
///     None,
///     "message",
///     Recipe::from_fn(vec![Dependency::name("greeting")], |args| {
///         Ok(format!("{}, world", args.get::<String>(0)?))
///     })
///     .scope(Scope::Factory)
///     .build(),
/// )
/// .unwrap();
///
/// let ctx = unit.build().bean_context();
/// assert_eq!(*ctx.get_as::<String>("message").unwrap(), "hello, world");
/// ```
pub struct Recipe {
    id: RecipeId,
    name: Option<String>,
    scope: Scope,
    creator: Creator,
    init: Vec<InitStep>,
    shutdown: Option<Shutdown>,
    context_client: Option<ClientHook>,
    bean_type: Option<TypeKey>,
}

impl Recipe {
    /// Recipe handing out a precomputed value.
    pub fn constant<T: Any + Send + Sync>(value: T) -> RecipeBuilder {
        RecipeBuilder::new(Creator::Constant(Constant::new(value)))
    }

    /// Recipe handing out an existing bean.
    pub fn constant_bean(bean: Bean) -> RecipeBuilder {
        RecipeBuilder::new(Creator::Constant(Constant::from_bean(bean)))
    }

    /// Recipe calling a constructor of `class` with `params`.
    pub fn constructor(class: impl Into<ClassDescription>, params: Vec<Dependency>) -> RecipeBuilder {
        RecipeBuilder::new(Creator::Invocation(Invocation::Constructor {
            class: class.into(),
            params,
        }))
    }

    /// Recipe calling a static factory method of `class`.
    pub fn static_factory(
        class: impl Into<ClassDescription>,
        method: impl Into<String>,
        params: Vec<Dependency>,
    ) -> RecipeBuilder {
        RecipeBuilder::new(Creator::Invocation(Invocation::StaticFactory {
            class: class.into(),
            method: method.into(),
            params,
        }))
    }

    /// Recipe calling a factory method on the bean `target` resolves to.
    pub fn instance_factory(
        target: impl Into<Dependency>,
        method: impl Into<String>,
        params: Vec<Dependency>,
    ) -> RecipeBuilder {
        RecipeBuilder::new(Creator::Invocation(Invocation::InstanceFactory {
            target: target.into(),
            method: method.into(),
            params,
        }))
    }

    /// Recipe calling `f` with the resolved `params`.
    pub fn from_fn<T, F>(params: Vec<Dependency>, f: F) -> RecipeBuilder
    where
        T: Any + Send + Sync,
        F: Fn(&Args<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        RecipeBuilder::new(Creator::Invocation(Invocation::Function {
            params,
            produces: TypeKey::of::<T>(),
            call: Arc::new(move |args: &Args<'_>| f(args).map(|v| Arc::new(v) as Bean)),
        }))
    }

    /// Recipe driving the resolver itself.
    pub fn from_resolver<T, F>(f: F) -> RecipeBuilder
    where
        T: Any + Send + Sync,
        F: Fn(&mut dyn ResolverCore) -> DiResult<T> + Send + Sync + 'static,
    {
        RecipeBuilder::new(Creator::Resolver {
            produces: TypeKey::of::<T>(),
            call: Arc::new(move |resolver: &mut dyn ResolverCore| {
                f(resolver).map(|v| Arc::new(v) as Bean)
            }),
        })
    }

    /// Recipe producing a `Vec<Bean>` of the resolved elements.
    pub fn list(elements: Vec<Dependency>) -> RecipeBuilder {
        RecipeBuilder::new(Creator::List(elements))
    }

    /// Recipe producing a [`BeanSet`](crate::BeanSet).
    pub fn set(elements: Vec<Dependency>, ordered: bool) -> RecipeBuilder {
        RecipeBuilder::new(Creator::Set { elements, ordered })
    }

    /// Recipe producing a [`BeanMap`](crate::BeanMap).
    pub fn map(entries: Vec<(Dependency, Dependency)>, ordered: bool) -> RecipeBuilder {
        RecipeBuilder::new(Creator::Map { entries, ordered })
    }

    pub fn id(&self) -> RecipeId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name for diagnostics; anonymous recipes show their identity.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("<anonymous {}>", self.id),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn creator(&self) -> &Creator {
        &self.creator
    }

    pub fn init_steps(&self) -> &[InitStep] {
        &self.init
    }

    pub fn shutdown(&self) -> Option<&Shutdown> {
        self.shutdown.as_ref()
    }

    pub fn has_shutdown(&self) -> bool {
        self.shutdown.is_some()
    }

    pub fn is_context_client(&self) -> bool {
        self.context_client.is_some()
    }

    /// Type of the produced bean: the declared type, else whatever the
    /// creator can tell. Named classes are resolved through `loader`.
    pub fn bean_type(&self, loader: Option<&dyn TypeLoader>) -> Option<TypeKey> {
        self.bean_type.or_else(|| self.creator.produces(loader))
    }

    /// Dependencies of the creation phase.
    pub fn dependencies(&self) -> Vec<&Dependency> {
        self.creator.dependencies()
    }

    /// Dependencies of the initialization phase.
    pub fn init_dependencies(&self) -> Vec<&Dependency> {
        self.init.iter().flat_map(|step| step.dependencies()).collect()
    }

    pub(crate) fn class_hint(&self) -> Option<&ClassDescription> {
        self.creator.class()
    }

    /// Creates the bare instance.
    pub(crate) fn create(&self, resolver: &mut dyn ResolverCore) -> DiResult<Bean> {
        self.creator.create(resolver)
    }

    /// Runs the initialization steps against `bean`.
    pub(crate) fn initialize(&self, bean: &Bean, resolver: &mut dyn ResolverCore) -> DiResult<()> {
        if self.init.is_empty() {
            return Ok(());
        }
        InitChain::new(resolver).run(&self.init, bean, self.class_hint())
    }

    pub(crate) fn inject_context(&self, bean: &Bean, context: WeakBeanContext) -> DiResult<()> {
        match &self.context_client {
            Some(hook) => hook(bean, context),
            None => Ok(()),
        }
    }

    pub(crate) fn run_shutdown(&self, bean: &Bean, resolver: &mut dyn ResolverCore) -> DiResult<()> {
        match &self.shutdown {
            Some(shutdown) => shutdown.run(bean, self.class_hint(), resolver),
            None => Ok(()),
        }
    }

    /// Copy of this recipe under another name, keeping every strategy but
    /// taking a fresh identity.
    pub fn renamed(&self, name: impl Into<String>) -> Arc<Recipe> {
        Arc::new(Recipe {
            id: RecipeId::next(),
            name: Some(name.into()),
            scope: self.scope,
            creator: self.creator.clone(),
            init: self.init.clone(),
            shutdown: self.shutdown.clone(),
            context_client: self.context_client.clone(),
            bean_type: self.bean_type,
        })
    }
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipe")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("creator", &self.creator)
            .field("init", &self.init)
            .field("shutdown", &self.shutdown)
            .finish()
    }
}

/// Fluent builder for [`Recipe`].
pub struct RecipeBuilder {
    name: Option<String>,
    scope: Scope,
    creator: Creator,
    init: Vec<InitStep>,
    shutdown: Option<Shutdown>,
    context_client: Option<ClientHook>,
    bean_type: Option<TypeKey>,
}

impl RecipeBuilder {
    pub fn new(creator: Creator) -> Self {
        RecipeBuilder {
            name: None,
            scope: Scope::default(),
            creator,
            init: Vec::new(),
            shutdown: None,
            context_client: None,
            bean_type: None,
        }
    }

    /// Name carried by the recipe itself. Stores register recipes under their
    /// own key; this name is what diagnostics and nested recipes show.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn step(mut self, step: InitStep) -> Self {
        self.init.push(step);
        self
    }

    pub fn set_property(self, property: impl Into<String>, value: impl Into<Dependency>) -> Self {
        self.step(InitStep::set_property(property, value))
    }

    pub fn invoke(self, method: impl Into<String>, params: Vec<Dependency>) -> Self {
        self.step(InitStep::invoke(method, params))
    }

    pub fn bind_variable(self, variable: impl Into<String>, value: impl Into<Dependency>) -> Self {
        self.step(InitStep::bind_variable(variable, value))
    }

    pub fn shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Shutdown through [`Dispose`] on the bean, which must be a `T`.
    pub fn dispose_with<T: Dispose>(self) -> Self {
        self.shutdown(Shutdown::handler(|bean: &Bean| {
            let target = downcast::<T>(bean).ok_or_else(|| {
                format!("bean is not a {}", std::any::type_name::<T>())
            })?;
            target.dispose()
        }))
    }

    /// Marks the bean as a [`BeanContextClient`]; it receives the requesting
    /// context after initialization.
    pub fn context_client<T: BeanContextClient>(mut self) -> Self {
        let hook: ClientHook = Arc::new(|bean: &Bean, context: WeakBeanContext| -> DiResult<()> {
            let client = downcast::<T>(bean).ok_or_else(|| DiError::TypeMismatch {
                bean: "context client".to_string(),
                expected: std::any::type_name::<T>(),
            })?;
            client.set_bean_context(context);
            Ok(())
        });
        self.context_client = Some(hook);
        self
    }

    /// Declares the produced type, used by type lookups.
    pub fn bean_type<T: ?Sized + 'static>(mut self) -> Self {
        self.bean_type = Some(TypeKey::of::<T>());
        self
    }

    pub fn build(self) -> Arc<Recipe> {
        Arc::new(Recipe {
            id: RecipeId::next(),
            name: self.name,
            scope: self.scope,
            creator: self.creator,
            init: self.init,
            shutdown: self.shutdown,
            context_client: self.context_client,
            bean_type: self.bean_type,
        })
    }
}
