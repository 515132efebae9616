//! Disposal trait for resource cleanup.

use crate::error::BoxError;

/// Synchronous teardown of a bean.
///
/// A recipe opts in with [`Recipe::dispose_with`](crate::RecipeBuilder::dispose_with);
/// the handler runs once when the build that created the bean is released.
///
/// # Examples
///
/// ```
/// use beanwire::{BoxError, BuildUnit, Dispose, Recipe};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// struct Cache {
///     flushed: Arc<AtomicBool>,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) -> Result<(), BoxError> {
///         self.flushed.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// let flushed = Arc::new(AtomicBool::new(false));
/// let flag = flushed.clone();
/// let mut unit = BuildUnit::new();
/// unit.add_recipe(
///     None,
///     "cache",
///     Recipe::from_fn(vec![], move |_| Ok(Cache { flushed: flag.clone() }))
///         .dispose_with::<Cache>()
///         .build(),
/// )
/// .unwrap();
///
/// let result = unit.build();
/// result.bean_context().get("cache").unwrap();
/// result.release().unwrap();
/// assert!(flushed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Releases the resources held by this bean.
    fn dispose(&self) -> Result<(), BoxError>;
}
