/// Tests for grouping registrations into recipe modules

use beanwire::{BuildUnit, BuildUnitExt, Dependency, DiError, DiResult, RecipeModule, Scope, Recipe};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Config {
    name: String,
    value: u32,
}

#[derive(Debug)]
struct DatabaseService {
    config: Arc<Config>,
    connection_id: String,
}

impl DatabaseService {
    fn new(config: Arc<Config>) -> Self {
        Self {
            connection_id: format!("conn-{}", config.value),
            config,
        }
    }

    fn get_data(&self) -> String {
        format!("Data from {} ({})", self.config.name, self.connection_id)
    }
}

struct ConfigModule {
    value: u32,
}

impl RecipeModule for ConfigModule {
    fn register(self, unit: &mut BuildUnit) -> DiResult<()> {
        unit.add_singleton(
            "config",
            Config {
                name: "test-config".to_string(),
                value: self.value,
            },
        )?;
        Ok(())
    }
}

struct DatabaseModule;

impl RecipeModule for DatabaseModule {
    fn register(self, unit: &mut BuildUnit) -> DiResult<()> {
        unit.add_singleton_fn("database", vec![Dependency::name("config")], |args| {
            Ok(DatabaseService::new(args.get::<Config>(0)?))
        })?;
        Ok(())
    }
}

struct AdminModule;

impl RecipeModule for AdminModule {
    fn register(self, unit: &mut BuildUnit) -> DiResult<()> {
        unit.add_store("admin", None)?;
        unit.add_recipe(
            Some("admin"),
            "report",
            Recipe::from_fn(vec![Dependency::name("database")], |args| {
                Ok(format!("report: {}", args.get::<DatabaseService>(0)?.get_data()))
            })
            .scope(Scope::Factory)
            .build(),
        )?;
        Ok(())
    }
}

/// Registers into a store that does not exist.
struct BrokenModule;

impl RecipeModule for BrokenModule {
    fn register(self, unit: &mut BuildUnit) -> DiResult<()> {
        unit.add_recipe(Some("missing"), "x", Recipe::constant(1u8).build())?;
        Ok(())
    }
}

#[test]
fn test_modules_in_place() {
    let mut unit = BuildUnit::new();
    unit.add_module(ConfigModule { value: 42 })
        .unwrap()
        .add_module(DatabaseModule)
        .unwrap();

    let ctx = unit.build().bean_context();
    let db = ctx.get_as::<DatabaseService>("database").unwrap();
    assert_eq!(db.get_data(), "Data from test-config (conn-42)");
}

#[test]
fn test_modules_chained_by_value() {
    let result = BuildUnit::new()
        .with_module(ConfigModule { value: 7 })
        .and_then(|u| u.with_module(DatabaseModule))
        .and_then(|u| u.with_module(AdminModule))
        .unwrap()
        .build();

    let admin = result.bean_context().derive(result.store("admin").unwrap());
    assert_eq!(
        *admin.get_as::<String>("report").unwrap(),
        "report: Data from test-config (conn-7)"
    );
    assert!(result.bean_context().get("report").unwrap_err().is_not_found());
}

#[test]
fn test_module_errors_propagate() {
    let mut unit = BuildUnit::new();
    match unit.add_module(BrokenModule) {
        Err(DiError::UnknownStore(name)) => assert_eq!(name, "missing"),
        other => panic!("expected UnknownStore, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_module_registering_a_store_twice_fails() {
    let mut unit = BuildUnit::new();
    unit.add_module(AdminModule).unwrap();
    assert!(matches!(
        unit.add_module(AdminModule),
        Err(DiError::DuplicateStore(_))
    ));
}
