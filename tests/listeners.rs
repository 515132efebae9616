use beanwire::{
    BeanClass, BeanContextClient, BeanCreationEvent, BeanCreationListener, BoxError, BuildUnit,
    Dependency, DiError, Recipe, Scope, TypeRegistry, WeakBeanContext,
};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

struct Recorder {
    tag: &'static str,
    log: Log,
}

impl BeanCreationListener for Recorder {
    fn bean_created(&self, event: &BeanCreationEvent<'_>) -> Result<(), BoxError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.tag, event.name));
        Ok(())
    }
}

#[derive(Default)]
struct Widget {
    label: Mutex<Option<String>>,
}

fn widget_registry() -> Arc<TypeRegistry> {
    let registry = Arc::new(TypeRegistry::new());
    registry.register(
        BeanClass::builder::<Widget>("Widget")
            .constructor(&[], |_| Ok(Widget::default()))
            .property::<String, _>("label", |this, label| {
                *this.label.lock().unwrap() = Some((*label).clone());
                Ok(())
            })
            .build(),
    );
    registry
}

#[test]
fn test_listeners_fire_once_in_order() {
    let log: Log = Arc::default();
    let mut unit = BuildUnit::new();
    for tag in ["first", "second", "third"] {
        unit.add_listener(Arc::new(Recorder { tag, log: log.clone() }));
    }
    unit.add_singleton_fn("service", vec![], |_| Ok(1u8)).unwrap();

    let ctx = unit.build().bean_context();
    ctx.get("service").unwrap();
    ctx.get("service").unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["first:service", "second:service", "third:service"]
    );
}

#[test]
fn test_listeners_fire_for_every_factory_instance() {
    let log: Log = Arc::default();
    let mut unit = BuildUnit::new();
    unit.add_listener(Arc::new(Recorder { tag: "l", log: log.clone() }));
    unit.add_factory_fn("item", vec![], |_| Ok(1u8)).unwrap();

    let ctx = unit.build().bean_context();
    ctx.get("item").unwrap();
    ctx.get("item").unwrap();
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[test]
fn test_listeners_see_initialized_beans() {
    let seen: Arc<Mutex<Option<String>>> = Arc::default();
    let sink = seen.clone();
    let mut unit = BuildUnit::new();
    unit.with_type_loader(widget_registry());
    unit.add_recipe(
        None,
        "widget",
        Recipe::constructor("Widget", vec![])
            .set_property("label", Dependency::value("ready".to_string()))
            .build(),
    )
    .unwrap();
    unit.add_listener(Arc::new(move |event: &BeanCreationEvent<'_>| -> Result<(), BoxError> {
        let widget = beanwire::downcast::<Widget>(event.bean).ok_or("not a widget")?;
        *sink.lock().unwrap() = widget.label.lock().unwrap().clone();
        Ok(())
    }));

    unit.build().bean_context().get("widget").unwrap();
    assert_eq!(seen.lock().unwrap().as_deref(), Some("ready"));
}

#[test]
fn test_plain_constants_do_not_fire() {
    let log: Log = Arc::default();
    let mut unit = BuildUnit::new();
    unit.add_listener(Arc::new(Recorder { tag: "l", log: log.clone() }));
    unit.add_singleton("value", 1u8).unwrap();

    unit.build().bean_context().get("value").unwrap();
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_failing_listener_aborts_resolution() {
    let mut unit = BuildUnit::new();
    unit.add_listener(Arc::new(|event: &BeanCreationEvent<'_>| -> Result<(), BoxError> {
        if event.name == "rejected" {
            return Err("not allowed".into());
        }
        Ok(())
    }));
    unit.add_singleton_fn("rejected", vec![], |_| Ok(1u8)).unwrap();
    unit.add_singleton_fn("accepted", vec![], |_| Ok(2u8)).unwrap();

    let ctx = unit.build().bean_context();
    match ctx.get("rejected") {
        Err(DiError::ListenerFailure { bean, .. }) => assert_eq!(bean, "rejected"),
        other => panic!("expected ListenerFailure, got {:?}", other.map(|_| ())),
    }
    assert!(ctx.get("rejected").is_err());
    assert!(ctx.get("accepted").is_ok());
}

#[test]
fn test_listener_added_and_removed_on_context() {
    let log: Log = Arc::default();
    let mut unit = BuildUnit::new();
    unit.add_factory_fn("item", vec![], |_| Ok(1u8)).unwrap();
    let ctx = unit.build().bean_context();

    let listener: Arc<dyn BeanCreationListener> = Arc::new(Recorder { tag: "late", log: log.clone() });
    ctx.add_creation_listener(listener.clone());
    ctx.get("item").unwrap();
    assert!(ctx.remove_creation_listener(&listener));
    ctx.get("item").unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["late:item"]);
}

#[derive(Default)]
struct Client {
    context: Mutex<Option<WeakBeanContext>>,
}

impl BeanContextClient for Client {
    fn set_bean_context(&self, context: WeakBeanContext) {
        *self.context.lock().unwrap() = Some(context);
    }
}

#[test]
fn test_context_client_receives_context_before_listeners() {
    let order: Log = Arc::default();
    let listener_order = order.clone();
    let mut unit = BuildUnit::new();
    unit.add_recipe(
        None,
        "client",
        Recipe::from_fn(vec![], |_| Ok(Client::default()))
            .scope(Scope::Factory)
            .context_client::<Client>()
            .build(),
    )
    .unwrap();
    unit.add_listener(Arc::new(move |event: &BeanCreationEvent<'_>| -> Result<(), BoxError> {
        let client = beanwire::downcast::<Client>(event.bean).ok_or("not a client")?;
        let injected = client.context.lock().unwrap().is_some();
        listener_order.lock().unwrap().push(format!("injected={}", injected));
        Ok(())
    }));

    let ctx = unit.build().bean_context();
    let client = ctx.get_as::<Client>("client").unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["injected=true"]);

    let weak = client.context.lock().unwrap().clone().unwrap();
    assert!(weak.upgrade().unwrap().same_context(&ctx));
    drop(ctx);
    assert!(weak.upgrade().is_none());
}

struct Service {
    dep: Arc<String>,
}

#[test]
fn test_listener_lookups_reuse_singletons_of_the_running_request() {
    let seen: Arc<Mutex<Option<Arc<String>>>> = Arc::default();
    let mut unit = BuildUnit::new();
    let sink = seen.clone();
    unit.add_listener(Arc::new(move |event: &BeanCreationEvent<'_>| -> Result<(), BoxError> {
        if event.name == "svc" {
            *sink.lock().unwrap() = Some(event.context.get_as::<String>("dep")?);
        }
        Ok(())
    }));
    unit.add_singleton_fn("dep", vec![], |_| Ok("shared".to_string()))
        .unwrap();
    unit.add_singleton_fn("svc", vec![Dependency::name("dep")], |args| {
        Ok(Service { dep: args.get::<String>(0)? })
    })
    .unwrap();

    let ctx = unit.build().bean_context();
    let svc = ctx.get_as::<Service>("svc").unwrap();
    let from_listener = seen.lock().unwrap().clone().unwrap();
    let later = ctx.get_as::<String>("dep").unwrap();

    assert!(Arc::ptr_eq(&svc.dep, &from_listener));
    assert!(Arc::ptr_eq(&svc.dep, &later));
}

#[test]
fn test_listener_requesting_the_announced_singleton_gets_it() {
    let calls = Arc::new(Mutex::new(0usize));
    let mut unit = BuildUnit::new();
    let counter = calls.clone();
    unit.add_listener(Arc::new(move |event: &BeanCreationEvent<'_>| -> Result<(), BoxError> {
        *counter.lock().unwrap() += 1;
        let again = event.context.get(event.name)?;
        if !beanwire::bean::same_bean(&again, event.bean) {
            return Err("a second instance was created".into());
        }
        Ok(())
    }));
    unit.add_singleton_fn("svc", vec![], |_| Ok(1u8)).unwrap();

    let ctx = unit.build().bean_context();
    let first = ctx.get("svc").unwrap();
    assert!(beanwire::bean::same_bean(&first, &ctx.get("svc").unwrap()));
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[test]
fn test_listener_requesting_the_announced_factory_is_a_cycle() {
    let mut unit = BuildUnit::new();
    unit.add_listener(Arc::new(|event: &BeanCreationEvent<'_>| -> Result<(), BoxError> {
        event.context.get(event.name)?;
        Ok(())
    }));
    unit.add_factory_fn("item", vec![], |_| Ok(1u8)).unwrap();

    let ctx = unit.build().bean_context();
    match ctx.get("item") {
        Err(DiError::ListenerFailure { bean, source }) => {
            assert_eq!(bean, "item");
            assert_eq!(source.to_string(), "Unresolvable cyclic dependency: item -> item");
        }
        other => panic!("expected a cycle reported by the listener, got {:?}", other.map(|_| ())),
    }
    // The aborted request left nothing in flight, so the next one reports
    // the same cycle instead of a stale state.
    let again = ctx.get("item").unwrap_err();
    assert!(again.to_string().ends_with("item -> item"), "unexpected error: {}", again);
}
