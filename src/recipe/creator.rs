//! Creation strategies: how a recipe obtains its bare instance.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::bean::{type_of, Args, Bean};
use crate::error::{BoxError, DiError, DiResult};
use crate::key::{Dependency, TypeKey};
use crate::literal::{BeanMap, BeanSet};
use crate::traits::ResolverCore;
use crate::types::{BeanClass, ClassDescription, ConversionHelper, InvocationError, TypeLoader};

pub(crate) type ArgBuffer = SmallVec<[Bean; 4]>;

pub(crate) type FnCreator = Arc<dyn Fn(&Args<'_>) -> Result<Bean, BoxError> + Send + Sync>;
pub(crate) type ResolverFn = Arc<dyn Fn(&mut dyn ResolverCore) -> DiResult<Bean> + Send + Sync>;

/// A precomputed value, optionally converted to a declared type on access.
#[derive(Clone)]
pub struct Constant {
    value: Bean,
    source: TypeKey,
    target: Option<TypeKey>,
}

impl Constant {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Constant {
            value: Arc::new(value),
            source: TypeKey::of::<T>(),
            target: None,
        }
    }

    /// Wraps an existing bean; its type name is not known statically.
    pub fn from_bean(bean: Bean) -> Self {
        let source = TypeKey::from_id(type_of(&bean), "<bean>");
        Constant {
            value: bean,
            source,
            target: None,
        }
    }

    /// Declares the type the value is converted to when resolved.
    pub fn convert_to<T: Any + Send + Sync>(self) -> Self {
        self.with_target(TypeKey::of::<T>())
    }

    pub fn with_target(mut self, target: TypeKey) -> Self {
        self.target = Some(target);
        self
    }

    pub fn value(&self) -> &Bean {
        &self.value
    }

    pub fn target(&self) -> Option<TypeKey> {
        self.target
    }

    /// Type of the resolved value.
    pub fn produces(&self) -> TypeKey {
        self.target.unwrap_or(self.source)
    }

    /// Returns the value, converted to the declared target type if any.
    pub fn resolve(&self, conversion: &ConversionHelper) -> DiResult<Bean> {
        match self.target {
            Some(target) => conversion.convert(self.value.clone(), target),
            None => Ok(self.value.clone()),
        }
    }
}

impl fmt::Debug for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            Some(target) => write!(f, "{} as {}", self.source.name(), target.name()),
            None => f.write_str(self.source.name()),
        }
    }
}

/// Invocation strategy of a constructor or factory recipe.
#[derive(Clone)]
pub enum Invocation {
    /// Constructor of a class, selected by arity
    Constructor {
        class: ClassDescription,
        params: Vec<Dependency>,
    },
    /// Static factory method of a class
    StaticFactory {
        class: ClassDescription,
        method: String,
        params: Vec<Dependency>,
    },
    /// Factory method invoked on another resolved bean
    InstanceFactory {
        target: Dependency,
        method: String,
        params: Vec<Dependency>,
    },
    /// Closure receiving the resolved parameters
    Function {
        params: Vec<Dependency>,
        produces: TypeKey,
        call: FnCreator,
    },
}

impl Invocation {
    pub fn params(&self) -> &[Dependency] {
        match self {
            Invocation::Constructor { params, .. }
            | Invocation::StaticFactory { params, .. }
            | Invocation::InstanceFactory { params, .. }
            | Invocation::Function { params, .. } => params,
        }
    }

    fn invoke(&self, resolver: &mut dyn ResolverCore) -> DiResult<Bean> {
        match self {
            Invocation::Constructor { class, params } => {
                let class = class.resolve(resolver.type_loader())?;
                let member = class
                    .constructor(params.len())
                    .map_err(DiError::instantiation)?;
                let args = resolve_args(resolver, params, member.params())?;
                (member.call())(&Args::new(&args)).map_err(DiError::instantiation_boxed)
            }
            Invocation::StaticFactory {
                class,
                method,
                params,
            } => {
                let class = class.resolve(resolver.type_loader())?;
                let member = class
                    .static_method(method, params.len())
                    .map_err(DiError::instantiation)?;
                let args = resolve_args(resolver, params, member.params())?;
                (member.call())(&Args::new(&args)).map_err(DiError::instantiation_boxed)
            }
            Invocation::InstanceFactory {
                target,
                method,
                params,
            } => {
                let receiver = resolver.resolve_dependency(target)?;
                let class = instance_class(resolver.type_loader(), &receiver, None)?;
                let member = class
                    .method(method, params.len())
                    .map_err(DiError::instantiation)?;
                let args = resolve_args(resolver, params, member.params())?;
                (member.call())(&receiver, &Args::new(&args))
                    .map_err(DiError::instantiation_boxed)?
                    .ok_or_else(|| DiError::instantiation(InvocationError::NoResult(method.clone())))
            }
            Invocation::Function { params, call, .. } => {
                let mut args = ArgBuffer::with_capacity(params.len());
                for param in params {
                    args.push(resolver.resolve_dependency(param)?);
                }
                call(&Args::new(&args)).map_err(DiError::instantiation_boxed)
            }
        }
    }

    fn produces(&self, loader: Option<&dyn TypeLoader>) -> Option<TypeKey> {
        match self {
            Invocation::Constructor { class, .. } => match loader {
                Some(loader) => class.resolve(loader).ok().map(|c| c.key()),
                None => class.known_key(),
            },
            Invocation::Function { produces, .. } => Some(*produces),
            Invocation::StaticFactory { .. } | Invocation::InstanceFactory { .. } => None,
        }
    }

    fn class(&self) -> Option<&ClassDescription> {
        match self {
            Invocation::Constructor { class, .. } => Some(class),
            _ => None,
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Constructor { class, params } => {
                write!(f, "{}::new/{}", class.name(), params.len())
            }
            Invocation::StaticFactory {
                class,
                method,
                params,
            } => write!(f, "{}::{}/{}", class.name(), method, params.len()),
            Invocation::InstanceFactory {
                target,
                method,
                params,
            } => write!(f, "{}.{}/{}", target, method, params.len()),
            Invocation::Function {
                params, produces, ..
            } => write!(f, "fn/{} -> {}", params.len(), produces.name()),
        }
    }
}

/// How a recipe obtains its instance before initialization.
#[derive(Clone)]
pub enum Creator {
    Constant(Constant),
    Invocation(Invocation),
    /// Ordered sequence of element beans (`Vec<Bean>`)
    List(Vec<Dependency>),
    /// Duplicate-free collection ([`BeanSet`])
    Set {
        elements: Vec<Dependency>,
        ordered: bool,
    },
    /// Key/value collection ([`BeanMap`])
    Map {
        entries: Vec<(Dependency, Dependency)>,
        ordered: bool,
    },
    /// Closure driving the resolver directly
    Resolver {
        produces: TypeKey,
        call: ResolverFn,
    },
}

impl Creator {
    pub(crate) fn create(&self, resolver: &mut dyn ResolverCore) -> DiResult<Bean> {
        match self {
            Creator::Constant(constant) => constant.resolve(resolver.conversion()),
            Creator::Invocation(invocation) => invocation.invoke(resolver),
            Creator::List(elements) => {
                let mut list: Vec<Bean> = Vec::with_capacity(elements.len());
                for element in elements {
                    list.push(resolver.resolve_dependency(element)?);
                }
                Ok(Arc::new(list) as Bean)
            }
            Creator::Set { elements, ordered } => {
                let mut set = BeanSet::with_capacity(*ordered, elements.len());
                for element in elements {
                    set.insert(resolver.resolve_dependency(element)?);
                }
                Ok(Arc::new(set) as Bean)
            }
            Creator::Map { entries, ordered } => {
                let mut map = BeanMap::with_capacity(*ordered, entries.len());
                for (key, value) in entries {
                    let key = resolver.resolve_dependency(key)?;
                    let value = resolver.resolve_dependency(value)?;
                    map.insert(key, value);
                }
                Ok(Arc::new(map) as Bean)
            }
            Creator::Resolver { call, .. } => call(resolver),
        }
    }

    /// Every dependency consulted while creating the bare instance.
    pub fn dependencies(&self) -> Vec<&Dependency> {
        match self {
            Creator::Constant(_) | Creator::Resolver { .. } => Vec::new(),
            Creator::Invocation(invocation) => {
                let mut deps: Vec<&Dependency> = invocation.params().iter().collect();
                if let Invocation::InstanceFactory { target, .. } = invocation {
                    deps.insert(0, target);
                }
                deps
            }
            Creator::List(elements) | Creator::Set { elements, .. } => elements.iter().collect(),
            Creator::Map { entries, .. } => entries.iter().flat_map(|(k, v)| [k, v]).collect(),
        }
    }

    /// Type of the created bean, if it can be told without creating it.
    pub fn produces(&self, loader: Option<&dyn TypeLoader>) -> Option<TypeKey> {
        match self {
            Creator::Constant(constant) => Some(constant.produces()),
            Creator::Invocation(invocation) => invocation.produces(loader),
            Creator::List(_) => Some(TypeKey::of::<Vec<Bean>>()),
            Creator::Set { .. } => Some(TypeKey::of::<BeanSet>()),
            Creator::Map { .. } => Some(TypeKey::of::<BeanMap>()),
            Creator::Resolver { produces, .. } => Some(*produces),
        }
    }

    pub(crate) fn class(&self) -> Option<&ClassDescription> {
        match self {
            Creator::Invocation(invocation) => invocation.class(),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Creator::Constant(_))
    }
}

impl fmt::Debug for Creator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Creator::Constant(constant) => write!(f, "Constant({:?})", constant),
            Creator::Invocation(invocation) => write!(f, "Invocation({:?})", invocation),
            Creator::List(elements) => write!(f, "List({})", elements.len()),
            Creator::Set { elements, ordered } => {
                write!(f, "Set({}, ordered: {})", elements.len(), ordered)
            }
            Creator::Map { entries, ordered } => {
                write!(f, "Map({}, ordered: {})", entries.len(), ordered)
            }
            Creator::Resolver { produces, .. } => write!(f, "Resolver({})", produces.name()),
        }
    }
}

/// Resolves `params` and converts each value to the declared member type.
pub(crate) fn resolve_args(
    resolver: &mut dyn ResolverCore,
    params: &[Dependency],
    types: &[TypeKey],
) -> DiResult<ArgBuffer> {
    let mut args = ArgBuffer::with_capacity(params.len());
    for (index, (param, target)) in params.iter().zip(types).enumerate() {
        let value = resolver.resolve_dependency(param)?;
        let value = resolver
            .conversion()
            .convert(value, *target)
            .map_err(|source| DiError::instantiation(InvocationError::Argument { index, source }))?;
        args.push(value);
    }
    Ok(args)
}

/// Class descriptor for a live bean: the registered class of its runtime
/// type, else the class named by the recipe.
pub(crate) fn instance_class(
    loader: &dyn TypeLoader,
    bean: &Bean,
    fallback: Option<&ClassDescription>,
) -> DiResult<Arc<BeanClass>> {
    if let Some(class) = loader.class_of(type_of(bean)) {
        return Ok(class);
    }
    match fallback {
        Some(description) => description.resolve(loader),
        None => Err(DiError::instantiation(InvocationError::UnknownClass(
            "bean".to_string(),
        ))),
    }
}
