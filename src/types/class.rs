//! Bean class descriptors.
//!
//! A [`BeanClass`] lists the members of a Rust type that recipes may invoke:
//! constructors, static factory methods, instance methods and property
//! setters. Members are selected by name and arity; the declared parameter
//! types drive argument conversion before the call.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::bean::{downcast, Args, Bean};
use crate::error::{BoxError, DiError};
use crate::key::TypeKey;

pub(crate) type ConstructorFn = Arc<dyn Fn(&Args<'_>) -> Result<Bean, BoxError> + Send + Sync>;
pub(crate) type MethodFn =
    Arc<dyn Fn(&Bean, &Args<'_>) -> Result<Option<Bean>, BoxError> + Send + Sync>;
pub(crate) type SetterFn = Arc<dyn Fn(&Bean, Bean) -> Result<(), BoxError> + Send + Sync>;

/// Reasons a member invocation can fail before or around user code.
#[derive(thiserror::Error, Debug)]
pub enum InvocationError {
    #[error("{class} has no constructor taking {arity} argument(s)")]
    NoConstructor { class: String, arity: usize },
    #[error("{class} has no static method {method} taking {arity} argument(s)")]
    NoStaticMethod {
        class: String,
        method: String,
        arity: usize,
    },
    #[error("{class} has no method {method} taking {arity} argument(s)")]
    NoMethod {
        class: String,
        method: String,
        arity: usize,
    },
    #[error("{class} has no property {property}")]
    NoProperty { class: String, property: String },
    #[error("no bean class registered for the type of this {0}")]
    UnknownClass(String),
    #[error("method {0} returned no value")]
    NoResult(String),
    #[error("receiver is not a {0}")]
    WrongReceiver(&'static str),
    #[error("argument {index}: {source}")]
    Argument { index: usize, source: DiError },
}

/// One invocable member: its name, declared parameter types and entry point.
pub struct Member<F> {
    name: String,
    params: Vec<TypeKey>,
    call: F,
}

impl<F> Member<F> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &[TypeKey] {
        &self.params
    }

    pub(crate) fn call(&self) -> &F {
        &self.call
    }
}

/// Property setter with the type its value is converted to.
pub struct Property {
    target: TypeKey,
    set: SetterFn,
}

impl Property {
    pub fn target(&self) -> TypeKey {
        self.target
    }

    pub(crate) fn setter(&self) -> &SetterFn {
        &self.set
    }
}

/// Descriptor of the members of one Rust type.
pub struct BeanClass {
    name: String,
    key: TypeKey,
    constructors: Vec<Member<ConstructorFn>>,
    static_methods: Vec<Member<ConstructorFn>>,
    methods: Vec<Member<MethodFn>>,
    properties: HashMap<String, Property>,
}

impl BeanClass {
    /// Starts a descriptor for `T`, registered under `name`.
    ///
    /// ```rust
    /// use beanwire::{BeanClass, TypeKey};
    /// use std::sync::Mutex;
    ///
    /// #[derive(Default)]
    /// struct Greeter {
    ///     greeting: Mutex<String>,
    /// }
    ///
    /// let class = BeanClass::builder::<Greeter>("Greeter")
    ///     .constructor(&[], |_| Ok(Greeter::default()))
    ///     .property::<String, _>("greeting", |this, value| {
    ///         *this.greeting.lock().unwrap() = (*value).clone();
    ///         Ok(())
    ///     })
    ///     .build();
    ///
    /// assert_eq!(class.name(), "Greeter");
    /// assert_eq!(class.key(), TypeKey::of::<Greeter>());
    /// assert!(class.property("greeting").is_ok());
    /// ```
    pub fn builder<T: Any + Send + Sync>(name: impl Into<String>) -> BeanClassBuilder<T> {
        BeanClassBuilder {
            class: BeanClass {
                name: name.into(),
                key: TypeKey::of::<T>(),
                constructors: Vec::new(),
                static_methods: Vec::new(),
                methods: Vec::new(),
                properties: HashMap::new(),
            },
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn constructor(&self, arity: usize) -> Result<&Member<ConstructorFn>, InvocationError> {
        self.constructors
            .iter()
            .find(|m| m.arity() == arity)
            .ok_or_else(|| InvocationError::NoConstructor {
                class: self.name.clone(),
                arity,
            })
    }

    pub fn static_method(
        &self,
        method: &str,
        arity: usize,
    ) -> Result<&Member<ConstructorFn>, InvocationError> {
        self.static_methods
            .iter()
            .find(|m| m.name == method && m.arity() == arity)
            .ok_or_else(|| InvocationError::NoStaticMethod {
                class: self.name.clone(),
                method: method.to_string(),
                arity,
            })
    }

    pub fn method(&self, method: &str, arity: usize) -> Result<&Member<MethodFn>, InvocationError> {
        self.methods
            .iter()
            .find(|m| m.name == method && m.arity() == arity)
            .ok_or_else(|| InvocationError::NoMethod {
                class: self.name.clone(),
                method: method.to_string(),
                arity,
            })
    }

    pub fn property(&self, property: &str) -> Result<&Property, InvocationError> {
        self.properties
            .get(property)
            .ok_or_else(|| InvocationError::NoProperty {
                class: self.name.clone(),
                property: property.to_string(),
            })
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m.name == method)
    }
}

impl fmt::Debug for BeanClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanClass")
            .field("name", &self.name)
            .field("type", &self.key.name())
            .field("constructors", &self.constructors.len())
            .field("static_methods", &self.static_methods.len())
            .field("methods", &self.methods.len())
            .field("properties", &self.properties.len())
            .finish()
    }
}

/// Fluent builder for [`BeanClass`].
pub struct BeanClassBuilder<T> {
    class: BeanClass,
    _marker: PhantomData<fn() -> T>,
}

fn constructor_fn<F>(f: F) -> ConstructorFn
where
    F: Fn(&Args<'_>) -> Result<Bean, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn method_fn<F>(f: F) -> MethodFn
where
    F: Fn(&Bean, &Args<'_>) -> Result<Option<Bean>, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn setter_fn<F>(f: F) -> SetterFn
where
    F: Fn(&Bean, Bean) -> Result<(), BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn receiver<T: Any + Send + Sync>(bean: &Bean) -> Result<Arc<T>, BoxError> {
    downcast::<T>(bean)
        .ok_or_else(|| Box::new(InvocationError::WrongReceiver(std::any::type_name::<T>())) as BoxError)
}

impl<T: Any + Send + Sync> BeanClassBuilder<T> {
    pub fn constructor<F>(mut self, params: &[TypeKey], f: F) -> Self
    where
        F: Fn(&Args<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.class.constructors.push(Member {
            name: "new".to_string(),
            params: params.to_vec(),
            call: constructor_fn(move |args| f(args).map(|v| Arc::new(v) as Bean)),
        });
        self
    }

    /// Static factory method returning any type.
    pub fn static_factory<R, F>(mut self, name: impl Into<String>, params: &[TypeKey], f: F) -> Self
    where
        R: Any + Send + Sync,
        F: Fn(&Args<'_>) -> Result<R, BoxError> + Send + Sync + 'static,
    {
        self.class.static_methods.push(Member {
            name: name.into(),
            params: params.to_vec(),
            call: constructor_fn(move |args| f(args).map(|v| Arc::new(v) as Bean)),
        });
        self
    }

    /// Instance method invoked for its side effect.
    pub fn method<F>(mut self, name: impl Into<String>, params: &[TypeKey], f: F) -> Self
    where
        F: Fn(&T, &Args<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.class.methods.push(Member {
            name: name.into(),
            params: params.to_vec(),
            call: method_fn(move |bean, args| {
                let this = receiver::<T>(bean)?;
                f(&this, args)?;
                Ok(None)
            }),
        });
        self
    }

    /// Instance method producing a value, usable as an instance factory.
    pub fn factory_method<R, F>(mut self, name: impl Into<String>, params: &[TypeKey], f: F) -> Self
    where
        R: Any + Send + Sync,
        F: Fn(&T, &Args<'_>) -> Result<R, BoxError> + Send + Sync + 'static,
    {
        self.class.methods.push(Member {
            name: name.into(),
            params: params.to_vec(),
            call: method_fn(move |bean, args| {
                let this = receiver::<T>(bean)?;
                f(&this, args).map(|v| Some(Arc::new(v) as Bean))
            }),
        });
        self
    }

    /// Property setter; values are converted to `V` before the call.
    pub fn property<V, F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        V: Any + Send + Sync,
        F: Fn(&T, Arc<V>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.class.properties.insert(
            name.into(),
            Property {
                target: TypeKey::of::<V>(),
                set: setter_fn(move |bean, value| {
                    let this = receiver::<T>(bean)?;
                    let value = downcast::<V>(&value).ok_or_else(|| {
                        format!("property value is not a {}", std::any::type_name::<V>())
                    })?;
                    f(&this, value)
                }),
            },
        );
        self
    }

    pub fn build(self) -> Arc<BeanClass> {
        Arc::new(self.class)
    }
}
