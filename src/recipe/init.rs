//! Initialization steps run against a freshly created bean.

use std::collections::HashMap;
use std::fmt;

use crate::bean::{Args, Bean};
use crate::error::{DiError, DiResult};
use crate::key::Dependency;
use crate::traits::ResolverCore;
use crate::types::{ClassDescription, ConversionHelper, InvocationError, TypeLoader};

use super::creator::{instance_class, resolve_args};

/// One step of a bean's initialization sequence.
#[derive(Clone)]
pub enum InitStep {
    /// Converts `value` to the property type and calls the setter
    SetProperty { property: String, value: Dependency },
    /// Calls a method on the bean, or on a chain variable when `target` is set.
    /// A returned value is stored in the `result` variable if one is named.
    InvokeMethod {
        method: String,
        params: Vec<Dependency>,
        target: Option<String>,
        result: Option<String>,
    },
    /// Resolves `value` and binds it to a chain variable
    BindVariable { variable: String, value: Dependency },
}

impl InitStep {
    pub fn set_property(property: impl Into<String>, value: impl Into<Dependency>) -> Self {
        InitStep::SetProperty {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn invoke(method: impl Into<String>, params: Vec<Dependency>) -> Self {
        InitStep::InvokeMethod {
            method: method.into(),
            params,
            target: None,
            result: None,
        }
    }

    pub fn bind_variable(variable: impl Into<String>, value: impl Into<Dependency>) -> Self {
        InitStep::BindVariable {
            variable: variable.into(),
            value: value.into(),
        }
    }

    /// Dependencies this step resolves.
    pub fn dependencies(&self) -> Vec<&Dependency> {
        match self {
            InitStep::SetProperty { value, .. } | InitStep::BindVariable { value, .. } => {
                vec![value]
            }
            InitStep::InvokeMethod { params, .. } => params.iter().collect(),
        }
    }

    fn apply(
        &self,
        chain: &mut InitChain<'_>,
        bean: &Bean,
        class_hint: Option<&ClassDescription>,
    ) -> DiResult<()> {
        match self {
            InitStep::SetProperty { property, value } => {
                let class = instance_class(chain.type_loader(), bean, class_hint)?;
                let setter = class.property(property).map_err(DiError::instantiation)?;
                let value = chain.resolve_dependency(value)?;
                let value = chain
                    .conversion()
                    .convert(value, setter.target())
                    .map_err(|source| {
                        DiError::instantiation(InvocationError::Argument { index: 0, source })
                    })?;
                (setter.setter())(bean, value).map_err(DiError::instantiation_boxed)
            }
            InitStep::InvokeMethod {
                method,
                params,
                target,
                result,
            } => {
                let receiver = match target {
                    Some(variable) => chain.variable(variable)?,
                    None => bean.clone(),
                };
                let hint = if target.is_some() { None } else { class_hint };
                let class = instance_class(chain.type_loader(), &receiver, hint)?;
                let member = class
                    .method(method, params.len())
                    .map_err(DiError::instantiation)?;
                let args = resolve_args(chain, params, member.params())?;
                let returned = (member.call())(&receiver, &Args::new(&args))
                    .map_err(DiError::instantiation_boxed)?;
                if let Some(variable) = result {
                    let value = returned.ok_or_else(|| {
                        DiError::instantiation(InvocationError::NoResult(method.clone()))
                    })?;
                    chain.variables.insert(variable.clone(), value);
                }
                Ok(())
            }
            InitStep::BindVariable { variable, value } => {
                let value = chain.resolve_dependency(value)?;
                chain.variables.insert(variable.clone(), value);
                Ok(())
            }
        }
    }
}

impl fmt::Debug for InitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitStep::SetProperty { property, value } => write!(f, "set {} = {}", property, value),
            InitStep::InvokeMethod {
                method,
                params,
                target,
                result,
            } => {
                if let Some(target) = target {
                    write!(f, "${}.", target)?;
                }
                write!(f, "{}/{}", method, params.len())?;
                if let Some(result) = result {
                    write!(f, " -> ${}", result)?;
                }
                Ok(())
            }
            InitStep::BindVariable { variable, value } => write!(f, "${} = {}", variable, value),
        }
    }
}

/// Resolver for one initialization run: chain variables are local to the run,
/// every other dependency goes to the enclosing resolver.
pub(crate) struct InitChain<'r> {
    inner: &'r mut dyn ResolverCore,
    variables: HashMap<String, Bean>,
}

impl<'r> InitChain<'r> {
    pub(crate) fn new(inner: &'r mut dyn ResolverCore) -> Self {
        InitChain {
            inner,
            variables: HashMap::new(),
        }
    }

    fn variable(&self, name: &str) -> DiResult<Bean> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| DiError::InvalidRecipe(format!("unbound chain variable ${}", name)))
    }

    /// Runs `steps` in order against `bean`, stopping at the first failure.
    pub(crate) fn run(
        &mut self,
        steps: &[InitStep],
        bean: &Bean,
        class_hint: Option<&ClassDescription>,
    ) -> DiResult<()> {
        for step in steps {
            step.apply(self, bean, class_hint)?;
        }
        Ok(())
    }
}

impl ResolverCore for InitChain<'_> {
    fn resolve_dependency(&mut self, dependency: &Dependency) -> DiResult<Bean> {
        match dependency {
            Dependency::Variable(name) => self.variable(name),
            other => self.inner.resolve_dependency(other),
        }
    }

    fn type_loader(&self) -> &dyn TypeLoader {
        self.inner.type_loader()
    }

    fn conversion(&self) -> &ConversionHelper {
        self.inner.conversion()
    }
}
