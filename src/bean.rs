//! Type-erased bean handles and invocation arguments.

use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::error::BoxError;

/// A managed object instance.
pub type Bean = Arc<dyn Any + Send + Sync>;

/// Wraps a value as a bean.
pub fn bean<T: Any + Send + Sync>(value: T) -> Bean {
    Arc::new(value)
}

/// Downcasts a bean to a concrete type, sharing the allocation.
pub fn downcast<T: Any + Send + Sync>(bean: &Bean) -> Option<Arc<T>> {
    bean.clone().downcast::<T>().ok()
}

/// `TypeId` of the value behind the handle (not of the `Arc`).
pub fn type_of(bean: &Bean) -> TypeId {
    Any::type_id(&**bean)
}

/// Address of the shared allocation, used as the identity of a bean.
pub fn identity(bean: &Bean) -> usize {
    Arc::as_ptr(bean) as *const () as usize
}

/// `true` if both handles point at the same instance.
pub fn same_bean(a: &Bean, b: &Bean) -> bool {
    identity(a) == identity(b)
}

/// Resolved, already converted arguments handed to constructors, methods and
/// factory closures.
#[derive(Clone, Copy)]
pub struct Args<'a> {
    values: &'a [Bean],
}

impl<'a> Args<'a> {
    pub fn new(values: &'a [Bean]) -> Self {
        Args { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw access to argument `index`.
    pub fn raw(&self, index: usize) -> Result<&'a Bean, BoxError> {
        self.values
            .get(index)
            .ok_or_else(|| format!("missing argument {} (got {})", index, self.values.len()).into())
    }

    /// Argument `index` downcast to `T`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, BoxError> {
        let raw = self.raw(index)?;
        downcast::<T>(raw).ok_or_else(|| {
            format!(
                "argument {} is not of type {}",
                index,
                std::any::type_name::<T>()
            )
            .into()
        })
    }

    /// Argument `index` downcast to `T` and cloned out of the bean.
    pub fn value<T: Any + Send + Sync + Clone>(&self, index: usize) -> Result<T, BoxError> {
        self.get::<T>(index).map(|v| (*v).clone())
    }

    pub fn as_slice(&self) -> &'a [Bean] {
        self.values
    }
}
