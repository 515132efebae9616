//! Shutdown strategies run by the release sweep.

use std::fmt;
use std::sync::Arc;

use crate::bean::{Args, Bean};
use crate::error::{BoxError, DiError, DiResult};
use crate::key::Dependency;
use crate::traits::ResolverCore;
use crate::types::ClassDescription;

use super::creator::{instance_class, resolve_args};

pub(crate) type ShutdownFn = Arc<dyn Fn(&Bean) -> Result<(), BoxError> + Send + Sync>;

/// How a live bean is torn down.
#[derive(Clone)]
pub enum Shutdown {
    /// Instance method of the bean's class; parameters must be literals
    Method {
        method: String,
        params: Vec<Dependency>,
    },
    /// Closure receiving the bean
    Handler(ShutdownFn),
}

impl Shutdown {
    pub fn method(method: impl Into<String>) -> Self {
        Shutdown::Method {
            method: method.into(),
            params: Vec::new(),
        }
    }

    pub fn handler<F>(f: F) -> Self
    where
        F: Fn(&Bean) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Shutdown::Handler(Arc::new(f))
    }

    pub(crate) fn run(
        &self,
        bean: &Bean,
        class_hint: Option<&ClassDescription>,
        resolver: &mut dyn ResolverCore,
    ) -> DiResult<()> {
        match self {
            Shutdown::Method { method, params } => {
                let class = instance_class(resolver.type_loader(), bean, class_hint)?;
                let member = class
                    .method(method, params.len())
                    .map_err(DiError::instantiation)?;
                let args = resolve_args(resolver, params, member.params())?;
                (member.call())(bean, &Args::new(&args))
                    .map(|_| ())
                    .map_err(DiError::instantiation_boxed)
            }
            Shutdown::Handler(f) => f(bean).map_err(DiError::instantiation_boxed),
        }
    }
}

impl fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shutdown::Method { method, params } => {
                write!(f, "Method({}/{})", method, params.len())
            }
            Shutdown::Handler(_) => f.write_str("Handler"),
        }
    }
}
