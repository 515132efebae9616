//! Error types for the bean engine.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Boxed error returned by user callbacks (constructors, setters, listeners,
/// shutdown handlers, converters).
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Shared error source, kept behind an `Arc` so [`DiError`] stays `Clone`.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Errors raised while registering recipes, resolving beans or releasing a
/// build.
///
/// # Examples
///
/// ```rust
/// use beanwire::{BuildUnit, DiError};
///
/// let result = BuildUnit::new().build();
/// match result.bean_context().get("missing") {
///     Err(DiError::NotFound(name)) => assert_eq!(name, "missing"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(thiserror::Error, Debug, Clone)]
pub enum DiError {
    /// A referenced name or type cannot be found anywhere in the store chain
    #[error("Bean not found: {0}")]
    NotFound(String),
    /// A recipe that has no bare instance to hand out takes part in a cycle
    #[error("Unresolvable cyclic dependency: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),
    /// Construction or initialization of a bean failed
    #[error("Failed to create bean '{}': {source}", .bean.as_deref().unwrap_or("<unknown>"))]
    Instantiation {
        bean: Option<String>,
        source: SharedError,
    },
    /// A creation listener rejected a bean, aborting the resolution
    #[error("Creation listener failed for bean '{bean}': {source}")]
    ListenerFailure { bean: String, source: SharedError },
    /// One or more shutdown strategies failed during release
    #[error(transparent)]
    Shutdown(#[from] ShutdownErrors),
    /// A bean could not be downcast to the requested type
    #[error("Type mismatch for bean '{bean}': expected {expected}")]
    TypeMismatch { bean: String, expected: &'static str },
    /// A value could not be converted to a target type
    #[error("Cannot convert value to {target}: {reason}")]
    Conversion { target: &'static str, reason: String },
    /// The bean context was closed
    #[error("Bean context is closed")]
    ContextClosed,
    /// The active resolver does not grant access to this dependency
    #[error("Dependency not accessible from a restricted resolver: {0}")]
    Restricted(String),
    /// Maximum resolution depth exceeded
    #[error("Max resolution depth {0} exceeded")]
    DepthExceeded(usize),
    /// A build unit refers to a store it does not know
    #[error("Unknown bean store: {0}")]
    UnknownStore(String),
    /// A build unit already has a store with this name
    #[error("A bean store with this name already exists: {0}")]
    DuplicateStore(String),
    /// A recipe is structurally invalid
    #[error("Invalid recipe: {0}")]
    InvalidRecipe(String),
}

impl DiError {
    /// Wraps an arbitrary cause as an instantiation failure whose bean name is
    /// filled in later by the resolution context.
    pub fn instantiation<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        DiError::Instantiation {
            bean: None,
            source: Arc::new(source),
        }
    }

    pub(crate) fn instantiation_boxed(source: BoxError) -> Self {
        DiError::Instantiation {
            bean: None,
            source: Arc::from(source),
        }
    }

    /// Attaches a bean name to an instantiation failure that does not carry
    /// one yet. Other errors pass through unchanged.
    pub(crate) fn attach_bean(self, name: &str) -> Self {
        match self {
            DiError::Instantiation { bean: None, source } => DiError::Instantiation {
                bean: Some(name.to_string()),
                source,
            },
            other => other,
        }
    }

    /// Returns `true` for [`DiError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, DiError::NotFound(_))
    }

    /// Returns `true` for [`DiError::CyclicDependency`].
    pub fn is_cyclic(&self) -> bool {
        matches!(self, DiError::CyclicDependency(_))
    }
}

/// A single failed shutdown strategy.
#[derive(Debug, Clone)]
pub struct ShutdownFailure {
    /// Name under which the failing recipe was found
    pub bean: String,
    /// What went wrong
    pub error: DiError,
}

/// Aggregate outcome of a release sweep in which at least one shutdown failed.
///
/// Every failure is collected; the sweep never stops at the first one.
#[derive(thiserror::Error, Debug, Clone)]
pub struct ShutdownErrors {
    pub failures: Vec<ShutdownFailure>,
}

impl ShutdownErrors {
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Names of the beans whose shutdown failed, in sweep order.
    pub fn beans(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.bean.as_str()).collect()
    }
}

impl fmt::Display for ShutdownErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut display = Vec::with_capacity(self.failures.len() + 1);
        display.push(format!("{} shutdown handler(s) failed:", self.failures.len()));
        for failure in &self.failures {
            display.push(format!("- {}: {}", failure.bean, failure.error));
        }
        f.write_str(&display.join("\n"))
    }
}

/// Result type for bean engine operations
///
/// ```rust
/// use beanwire::{DiResult, DiError};
///
/// fn lookup() -> DiResult<()> {
///     Err(DiError::NotFound("config".to_string()))
/// }
///
/// assert!(lookup().unwrap_err().is_not_found());
/// ```
pub type DiResult<T> = Result<T, DiError>;
