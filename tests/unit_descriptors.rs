/// Unit tests for recipe descriptors listed by a bean context

use beanwire::{
    BeanSet, BuildUnit, Dependency, Recipe, RecipeDescriptor, Scope, Shutdown, TypeKey, ROOT_STORE,
};

fn find<'a>(descriptors: &'a [RecipeDescriptor], name: &str) -> &'a RecipeDescriptor {
    descriptors
        .iter()
        .find(|d| d.name == name)
        .unwrap_or_else(|| panic!("no descriptor for {}", name))
}

#[test]
fn test_descriptor_of_a_constant() {
    let mut unit = BuildUnit::new();
    unit.add_singleton("port", 8080u16).unwrap();
    let ctx = unit.build().bean_context();

    let descriptors = ctx.descriptors();
    let port = find(&descriptors, "port");
    assert_eq!(port.store, ROOT_STORE);
    assert!(port.is_singleton());
    assert!(!port.has_shutdown);
    assert_eq!(port.bean_type, Some(TypeKey::of::<u16>()));
    assert_eq!(port.type_name(), Some("u16"));
}

#[test]
fn test_descriptor_of_a_factory_with_shutdown() {
    let mut unit = BuildUnit::new();
    unit.add_recipe(
        None,
        "buffer",
        Recipe::from_fn(vec![], |_| Ok(String::new()))
            .scope(Scope::Factory)
            .shutdown(Shutdown::handler(|_| Ok(())))
            .build(),
    )
    .unwrap();
    let ctx = unit.build().bean_context();

    let descriptors = ctx.descriptors();
    let buffer = find(&descriptors, "buffer");
    assert_eq!(buffer.scope, Scope::Factory);
    assert!(!buffer.is_singleton());
    assert!(buffer.has_shutdown);
    assert_eq!(buffer.bean_type, Some(TypeKey::of::<String>()));
}

#[test]
fn test_descriptor_of_literal_collections() {
    let mut unit = BuildUnit::new();
    unit.add_recipe(None, "set", Recipe::set(vec![Dependency::value(1u8)], false).build())
        .unwrap();
    let ctx = unit.build().bean_context();

    let descriptors = ctx.descriptors();
    assert_eq!(find(&descriptors, "set").bean_type, Some(TypeKey::of::<BeanSet>()));
}

#[test]
fn test_declared_bean_type_wins() {
    let mut unit = BuildUnit::new();
    unit.add_recipe(
        None,
        "resolved",
        Recipe::from_resolver(|_| Ok(5i32)).bean_type::<i64>().build(),
    )
    .unwrap();
    let ctx = unit.build().bean_context();

    let descriptors = ctx.descriptors();
    assert_eq!(find(&descriptors, "resolved").bean_type, Some(TypeKey::of::<i64>()));
}

#[test]
fn test_descriptor_ids_match_registered_recipes() {
    let recipe = Recipe::constant("value").build();
    let mut unit = BuildUnit::new();
    unit.add_recipe(None, "a", recipe.clone()).unwrap();
    unit.add_recipe(None, "b", recipe.clone()).unwrap();
    let ctx = unit.build().bean_context();

    let descriptors = ctx.descriptors();
    assert_eq!(find(&descriptors, "a").id, recipe.id());
    assert_eq!(find(&descriptors, "b").id, recipe.id());
}

#[test]
fn test_descriptors_list_nearest_store_first_without_shadowed_names() {
    let mut unit = BuildUnit::new();
    unit.add_singleton("shared", 1u8).unwrap();
    unit.add_singleton("base_only", 2u8).unwrap();
    unit.add_store("web", None).unwrap();
    unit.add_recipe(Some("web"), "shared", Recipe::constant(3u8).build())
        .unwrap();
    let result = unit.build();
    let web = result.bean_context().derive(result.store("web").unwrap());

    let descriptors = web.descriptors();
    let names: Vec<(&str, &str)> = descriptors
        .iter()
        .map(|d| (d.store.as_str(), d.name.as_str()))
        .collect();
    assert_eq!(
        names,
        vec![("web", "shared"), (ROOT_STORE, "base_only")]
    );
}

#[test]
fn test_anonymous_recipes_are_not_listed() {
    let mut unit = BuildUnit::new();
    let anonymous = unit.add_anonymous(None, Recipe::constant(9u8).build()).unwrap();
    let ctx = unit.build().bean_context();

    assert!(ctx.descriptors().iter().all(|d| d.name != anonymous));
    assert_eq!(*ctx.get_as::<u8>(&anonymous).unwrap(), 9);
}
