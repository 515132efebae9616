//! Resolver handed to shutdown strategies.

use crate::bean::Bean;
use crate::error::{DiError, DiResult};
use crate::key::Dependency;
use crate::traits::ResolverCore;
use crate::types::{ConversionHelper, TypeLoader};

use super::Engine;

/// Resolver that only grants the type services: literal values resolve,
/// every reference into the store chain is refused.
pub(crate) struct RestrictedResolver<'e> {
    engine: &'e Engine,
}

impl<'e> RestrictedResolver<'e> {
    pub(crate) fn new(engine: &'e Engine) -> Self {
        RestrictedResolver { engine }
    }
}

impl ResolverCore for RestrictedResolver<'_> {
    fn resolve_dependency(&mut self, dependency: &Dependency) -> DiResult<Bean> {
        match dependency {
            Dependency::Value(constant) => constant.resolve(self.engine.conversion()),
            other => Err(DiError::Restricted(other.to_string())),
        }
    }

    fn type_loader(&self) -> &dyn TypeLoader {
        self.engine.type_loader()
    }

    fn conversion(&self) -> &ConversionHelper {
        self.engine.conversion()
    }
}
