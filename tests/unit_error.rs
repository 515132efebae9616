/// Unit tests for DiError Display and helper methods

use beanwire::{DiError, ShutdownErrors, ShutdownFailure};
use std::error::Error;

#[test]
fn test_not_found_display() {
    let error = DiError::NotFound("config".to_string());
    assert_eq!(error.to_string(), "Bean not found: config");
    assert!(error.is_not_found());
    assert!(!error.is_cyclic());
}

#[test]
fn test_cyclic_display_joins_the_path() {
    let error = DiError::CyclicDependency(vec!["x".into(), "y".into(), "x".into()]);
    assert_eq!(error.to_string(), "Unresolvable cyclic dependency: x -> y -> x");
    assert!(error.is_cyclic());
    assert!(!error.is_not_found());
}

#[test]
fn test_instantiation_display() {
    let unnamed = DiError::instantiation(std::fmt::Error);
    assert_eq!(
        unnamed.to_string(),
        "Failed to create bean '<unknown>': an error occurred when formatting an argument"
    );
    assert!(unnamed.source().is_some());
}

#[test]
fn test_simple_variant_displays() {
    assert_eq!(DiError::ContextClosed.to_string(), "Bean context is closed");
    assert_eq!(
        DiError::DepthExceeded(1024).to_string(),
        "Max resolution depth 1024 exceeded"
    );
    assert_eq!(
        DiError::UnknownStore("web".into()).to_string(),
        "Unknown bean store: web"
    );
    assert_eq!(
        DiError::DuplicateStore("web".into()).to_string(),
        "A bean store with this name already exists: web"
    );
    assert_eq!(
        DiError::Restricted("db".into()).to_string(),
        "Dependency not accessible from a restricted resolver: db"
    );
    assert_eq!(
        DiError::InvalidRecipe("empty".into()).to_string(),
        "Invalid recipe: empty"
    );
    assert_eq!(
        DiError::TypeMismatch { bean: "port".into(), expected: "u16" }.to_string(),
        "Type mismatch for bean 'port': expected u16"
    );
    assert_eq!(
        DiError::Conversion { target: "u32", reason: "not a number".into() }.to_string(),
        "Cannot convert value to u32: not a number"
    );
}

#[test]
fn test_shutdown_errors_list_every_failure() {
    let errors = ShutdownErrors {
        failures: vec![
            ShutdownFailure { bean: "a".into(), error: DiError::ContextClosed },
            ShutdownFailure { bean: "c".into(), error: DiError::NotFound("x".into()) },
        ],
    };
    assert_eq!(errors.len(), 2);
    assert!(!errors.is_empty());
    assert_eq!(errors.beans(), vec!["a", "c"]);
    assert_eq!(
        errors.to_string(),
        "2 shutdown handler(s) failed:\n- a: Bean context is closed\n- c: Bean not found: x"
    );

    let wrapped: DiError = errors.into();
    assert!(wrapped.to_string().starts_with("2 shutdown handler(s) failed:"));
    assert!(matches!(wrapped, DiError::Shutdown(ref e) if e.len() == 2));
}

#[test]
fn test_errors_are_clone() {
    let error = DiError::instantiation(std::fmt::Error);
    let copy = error.clone();
    assert_eq!(error.to_string(), copy.to_string());
}
