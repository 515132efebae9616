use beanwire::{
    BeanCreationEvent, BeanCreationListener, BeanStore, BoxError, BuildUnit, DefaultBeanStore,
    Dependency, DiError, Recipe, Scope, ROOT_STORE,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn counting_listener(count: &Arc<AtomicUsize>) -> Arc<dyn BeanCreationListener> {
    let count = count.clone();
    Arc::new(move |_event: &BeanCreationEvent<'_>| -> Result<(), BoxError> {
        count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

#[test]
fn test_derived_context_shares_singletons() {
    let mut unit = BuildUnit::new();
    unit.add_singleton_fn("shared", vec![], |_| Ok(String::from("one")))
        .unwrap();
    let result = unit.build();
    let root = result.bean_context();

    let root_store = result.store(ROOT_STORE).unwrap();
    let child_store: Arc<dyn BeanStore> =
        Arc::new(DefaultBeanStore::with_parent("child", &root_store));
    let child = root.derive(child_store);

    let a = root.get_as::<String>("shared").unwrap();
    let b = child.get_as::<String>("shared").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(child.parent().unwrap().same_context(&root));
}

#[test]
fn test_derived_listeners_see_engine_beans_until_closed() {
    let parent_count = Arc::new(AtomicUsize::new(0));
    let child_count = Arc::new(AtomicUsize::new(0));

    let mut unit = BuildUnit::new();
    unit.add_factory_fn("item", vec![], |_| Ok(0u8)).unwrap();
    unit.add_listener(counting_listener(&parent_count));
    let result = unit.build();
    let root = result.bean_context();

    let child = root.derive(result.store(ROOT_STORE).unwrap());
    child.add_creation_listener(counting_listener(&child_count));

    root.get("item").unwrap();
    child.get("item").unwrap();
    assert_eq!(parent_count.load(Ordering::SeqCst), 2);
    assert_eq!(child_count.load(Ordering::SeqCst), 2);

    child.close();
    assert!(matches!(child.get("item"), Err(DiError::ContextClosed)));
    root.get("item").unwrap();
    assert_eq!(parent_count.load(Ordering::SeqCst), 3);
    assert_eq!(child_count.load(Ordering::SeqCst), 2);
}

#[test]
fn test_closing_the_parent_closes_children() {
    let mut unit = BuildUnit::new();
    unit.add_singleton("x", 1u8).unwrap();
    let result = unit.build();
    let root = result.bean_context();
    let child = root.derive(result.store(ROOT_STORE).unwrap());

    root.close();
    assert!(child.is_closed());
    assert!(matches!(child.get("x"), Err(DiError::ContextClosed)));
}

#[test]
fn test_build_over_a_parent_context() {
    let mut base = BuildUnit::new();
    base.add_singleton("greeting", "hello".to_string()).unwrap();
    let base = base.build();

    let mut plugin = BuildUnit::new();
    plugin
        .add_recipe(
            None,
            "message",
            Recipe::from_fn(vec![Dependency::name("greeting")], |args| {
                Ok(format!("{} from the plugin", args.get::<String>(0)?))
            })
            .scope(Scope::Factory)
            .build(),
        )
        .unwrap();
    let plugin = plugin.build_over(&base.bean_context());

    let ctx = plugin.bean_context();
    assert_eq!(*ctx.get_as::<String>("message").unwrap(), "hello from the plugin");
    assert!(base.bean_context().get("message").unwrap_err().is_not_found());

    plugin.release().unwrap();
    assert!(ctx.is_closed());
    assert!(!base.bean_context().is_closed());
}

#[test]
fn test_releasing_a_plugin_leaves_base_singletons_alone() {
    let shutdowns = Arc::new(AtomicUsize::new(0));
    let counter = shutdowns.clone();

    let mut base = BuildUnit::new();
    base.add_recipe(
        None,
        "db",
        Recipe::from_fn(vec![], |_| Ok(7u32))
            .shutdown(beanwire::Shutdown::handler(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .build(),
    )
    .unwrap();
    let base = base.build();

    let mut plugin = BuildUnit::new();
    plugin
        .add_singleton_fn("user", vec![Dependency::name("db")], |args| {
            Ok(args.value::<u32>(0)? + 1)
        })
        .unwrap();
    let plugin = plugin.build_over(&base.bean_context());

    assert_eq!(*plugin.bean_context().get_as::<u32>("user").unwrap(), 8);
    plugin.release().unwrap();
    assert_eq!(shutdowns.load(Ordering::SeqCst), 0);

    base.release().unwrap();
    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
}
