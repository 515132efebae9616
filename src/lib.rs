//! # beanwire
//!
//! Recipe-driven object graph construction: declare how each bean is made,
//! let the engine wire the graph on demand.
//!
//! ## Features
//!
//! - **Recipes**: constants, constructors, static and instance factories,
//!   closures, and list/set/map literals, each with ordered initialization
//!   steps and an optional shutdown strategy
//! - **Layered stores**: named stores chained to parents, combined stores,
//!   and stores backed by ready-made beans
//! - **Cycle-safe singletons**: a singleton is visible to its own
//!   initialization graph before it is populated; unresolvable cycles fail
//!   with the full path
//! - **Lifecycle hooks**: context injection and creation listeners after
//!   initialization, a collect-all shutdown sweep on release
//!
//! ## Quick Start
//!
//! ```rust
//! use beanwire::{BuildUnit, Dependency};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut unit = BuildUnit::new();
//! unit.add_singleton("url", "postgres://localhost".to_string()).unwrap();
//! unit.add_singleton_fn("db", vec![Dependency::name("url")], |args| {
//!     Ok(Database { url: args.value::<String>(0)? })
//! })
//! .unwrap();
//! unit.add_factory_fn("users", vec![Dependency::name("db")], |args| {
//!     Ok(UserService { db: args.get::<Database>(0)? })
//! })
//! .unwrap();
//!
//! let result = unit.build();
//! let users = result.bean_context().get_as::<UserService>("users").unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//! result.release().unwrap();
//! ```
//!
//! ## Cyclic singletons
//!
//! Property injection lets two singletons refer to each other: the second
//! one receives the first while it is still being populated.
//!
//! ```rust
//! use beanwire::{BeanClass, BuildUnit, Dependency, Recipe, TypeRegistry};
//! use std::sync::{Arc, Mutex, Weak};
//!
//! #[derive(Default)]
//! struct Node {
//!     peer: Mutex<Weak<Node>>,
//! }
//!
//! let registry = Arc::new(TypeRegistry::new());
//! registry.register(
//!     BeanClass::builder::<Node>("Node")
//!         .constructor(&[], |_| Ok(Node::default()))
//!         .property::<Node, _>("peer", |this, peer| {
//!             *this.peer.lock().unwrap() = Arc::downgrade(&peer);
//!             Ok(())
//!         })
//!         .build(),
//! );
//!
//! let mut unit = BuildUnit::new();
//! unit.with_type_loader(registry);
//! for (name, peer) in [("a", "b"), ("b", "a")] {
//!     let recipe = Recipe::constructor("Node", vec![])
//!         .set_property("peer", Dependency::name(peer))
//!         .build();
//!     unit.add_recipe(None, name, recipe).unwrap();
//! }
//!
//! let ctx = unit.build().bean_context();
//! let a = ctx.get_as::<Node>("a").unwrap();
//! let b = a.peer.lock().unwrap().upgrade().unwrap();
//! let back = b.peer.lock().unwrap().upgrade().unwrap();
//! assert!(Arc::ptr_eq(&a, &back));
//! ```

// Module declarations
pub mod bean;
pub mod bean_context;
pub mod collection;
pub mod config;
pub mod descriptors;
pub mod error;
pub mod key;
pub mod lifecycle;
pub mod lifetime;
pub mod literal;
pub mod observer;
pub mod recipe;
pub mod store;
pub mod traits;
pub mod types;

// Internal modules
mod internal;
mod provider;

// Re-export core types
pub use bean::{bean, downcast, Args, Bean};
pub use bean_context::{BeanContext, WeakBeanContext};
pub use collection::{BuildResult, BuildUnit, BuildUnitExt, RecipeModule, ROOT_STORE};
pub use config::EngineConfig;
pub use descriptors::RecipeDescriptor;
pub use error::{BoxError, DiError, DiResult, ShutdownErrors, ShutdownFailure};
pub use key::{key_of_type, Dependency, TypeKey};
pub use lifecycle::{BeanContextClient, BeanCreationEvent, BeanCreationListener, CreationListeners};
pub use lifetime::Scope;
pub use literal::{BeanKey, BeanMap, BeanSet};
pub use observer::{DiObserver, LoggingObserver};
pub use provider::Phase;
pub use recipe::{Constant, Creator, InitStep, Invocation, Recipe, RecipeBuilder, RecipeId, Shutdown};
pub use store::{BeanContributor, BeanStore, CombinedBeanStore, DefaultBeanStore, SimpleBeanStore};
pub use traits::{Dispose, Resolver, ResolverCore};
pub use types::{
    BeanClass, BeanClassBuilder, ClassDescription, ConversionHelper, InvocationError, TypeLoader,
    TypeRegistry,
};
