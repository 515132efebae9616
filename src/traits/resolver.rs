//! Resolver traits used by recipes to obtain their dependencies.

use std::any::Any;
use std::sync::Arc;

use crate::bean::{downcast, Bean};
use crate::error::{DiError, DiResult};
use crate::key::{Dependency, TypeKey};
use crate::types::{ConversionHelper, TypeLoader};

/// Object-safe resolution interface handed to recipes.
///
/// The resolution context implements it for a full pass; the release sweep
/// hands shutdown handlers a restricted implementation that only resolves
/// literal values.
pub trait ResolverCore {
    /// Resolves one dependency reference.
    fn resolve_dependency(&mut self, dependency: &Dependency) -> DiResult<Bean>;

    /// Loader used for named class references.
    fn type_loader(&self) -> &dyn TypeLoader;

    /// Conversion service used for arguments and property values.
    fn conversion(&self) -> &ConversionHelper;
}

/// Typed convenience methods on top of [`ResolverCore`].
///
/// ```
/// use beanwire::{BuildUnit, Dependency, Recipe, Resolver};
///
/// let mut unit = BuildUnit::new();
/// unit.add_singleton("port", "8080").unwrap();
/// unit.add_recipe(
///     None,
///     "address",
///     Recipe::from_resolver(|r| {
///         let port = r.get_converted::<u16>(&Dependency::name("port"))?;
///         Ok(format!("localhost:{}", port))
///     })
///     .build(),
/// )
/// .unwrap();
///
/// let ctx = unit.build().bean_context();
/// assert_eq!(*ctx.get_as::<String>("address").unwrap(), "localhost:8080");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves the bean named `name` and downcasts it to `T`.
    fn get<T: Any + Send + Sync>(&mut self, name: &str) -> DiResult<Arc<T>> {
        let bean = self.resolve_dependency(&Dependency::name(name))?;
        downcast::<T>(&bean).ok_or_else(|| DiError::TypeMismatch {
            bean: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Resolves the bean whose recipe produces `T`.
    fn get_by_type<T: Any + Send + Sync>(&mut self) -> DiResult<Arc<T>> {
        let bean = self.resolve_dependency(&Dependency::of_type::<T>())?;
        downcast::<T>(&bean).ok_or_else(|| DiError::TypeMismatch {
            bean: std::any::type_name::<T>().to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Resolves `dependency` and converts the result to `T`.
    fn get_converted<T: Any + Send + Sync>(&mut self, dependency: &Dependency) -> DiResult<Arc<T>> {
        let bean = self.resolve_dependency(dependency)?;
        self.conversion().convert_to::<T>(bean)
    }

    /// Resolves `dependency` and converts the result to the type of `target`.
    fn resolve_as(&mut self, dependency: &Dependency, target: TypeKey) -> DiResult<Bean> {
        let bean = self.resolve_dependency(dependency)?;
        self.conversion().convert(bean, target)
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
