//! Recipe modules for grouping registrations.

use crate::collection::BuildUnit;
use crate::error::DiResult;

/// A reusable group of registrations.
///
/// # Example
///
/// ```rust
/// use beanwire::{BuildUnit, DiResult, Dependency, RecipeModule};
///
/// struct Greeter {
///     greeting: String,
/// }
///
/// struct GreetingModule {
///     language: &'static str,
/// }
///
/// impl RecipeModule for GreetingModule {
///     fn register(self, unit: &mut BuildUnit) -> DiResult<()> {
///         let greeting = match self.language {
///             "fr" => "bonjour",
///             _ => "hello",
///         };
///         unit.add_singleton("greeting", greeting.to_string())?;
///         unit.add_singleton_fn("greeter", vec![Dependency::name("greeting")], |args| {
///             Ok(Greeter { greeting: args.value::<String>(0)? })
///         })?;
///         Ok(())
///     }
/// }
///
/// # fn main() -> DiResult<()> {
/// let mut unit = BuildUnit::new();
/// unit.add_module(GreetingModule { language: "fr" })?;
/// let ctx = unit.build().bean_context();
/// assert_eq!(ctx.get_as::<Greeter>("greeter")?.greeting, "bonjour");
/// # Ok(())
/// # }
/// ```
pub trait RecipeModule {
    /// Adds this module's stores and recipes to `unit`.
    fn register(self, unit: &mut BuildUnit) -> DiResult<()>;
}

/// Consuming flavor of [`BuildUnit::add_module`] for chained setup.
///
/// ```rust
/// use beanwire::{BuildUnit, BuildUnitExt, DiResult, RecipeModule};
///
/// struct Ports;
/// impl RecipeModule for Ports {
///     fn register(self, unit: &mut BuildUnit) -> DiResult<()> {
///         unit.add_singleton("http", 80u16)?;
///         Ok(())
///     }
/// }
///
/// struct Admin;
/// impl RecipeModule for Admin {
///     fn register(self, unit: &mut BuildUnit) -> DiResult<()> {
///         unit.add_store("admin", None)?;
///         Ok(())
///     }
/// }
///
/// # fn main() -> DiResult<()> {
/// let result = BuildUnit::new().with_module(Ports)?.with_module(Admin)?.build();
/// assert!(result.store("admin").is_some());
/// # Ok(())
/// # }
/// ```
pub trait BuildUnitExt {
    fn with_module<M: RecipeModule>(self, module: M) -> DiResult<Self>
    where
        Self: Sized;
}

impl BuildUnitExt for BuildUnit {
    fn with_module<M: RecipeModule>(mut self, module: M) -> DiResult<Self> {
        module.register(&mut self)?;
        Ok(self)
    }
}
