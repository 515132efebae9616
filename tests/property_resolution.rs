/// Property-based tests for resolution
///
/// These tests check that resolution behaves the same way whatever the
/// registered values and graph shapes are.

use beanwire::{downcast, Bean, BeanSet, BuildUnit, Dependency, Recipe, Scope, Shutdown};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

proptest! {
    #[test]
    fn singleton_resolution_consistency(value in "\\PC{0,50}") {
        let mut unit = BuildUnit::new();
        let captured = value.clone();
        unit.add_singleton_fn("service", vec![], move |_| Ok(captured.clone())).unwrap();
        let ctx = unit.build().bean_context();

        let first = ctx.get_as::<String>("service").unwrap();
        let second = ctx.get_as::<String>("service").unwrap();
        prop_assert!(Arc::ptr_eq(&first, &second));
        prop_assert_eq!(&*first, &value);
    }
}

proptest! {
    #[test]
    fn lists_preserve_elements(values in prop::collection::vec(any::<i64>(), 0..20)) {
        let mut unit = BuildUnit::new();
        let elements = values.iter().map(|v| Dependency::value(*v)).collect();
        unit.add_recipe(None, "list", Recipe::list(elements).build()).unwrap();
        let ctx = unit.build().bean_context();

        let list = ctx.get_as::<Vec<Bean>>("list").unwrap();
        let resolved: Vec<i64> = list.iter().map(|b| *downcast::<i64>(b).unwrap()).collect();
        prop_assert_eq!(resolved, values);
    }
}

proptest! {
    #[test]
    fn ordered_sets_keep_first_occurrences(values in prop::collection::vec(0u16..50, 0..30)) {
        let mut unit = BuildUnit::new();
        let elements = values.iter().map(|v| Dependency::value(*v)).collect();
        unit.add_recipe(None, "set", Recipe::set(elements, true).build()).unwrap();
        let ctx = unit.build().bean_context();

        let mut seen = HashSet::new();
        let expected: Vec<u16> = values.iter().copied().filter(|v| seen.insert(*v)).collect();
        let set = ctx.get_as::<BeanSet>("set").unwrap();
        let resolved: Vec<u16> = set.iter().map(|b| *downcast::<u16>(b).unwrap()).collect();
        prop_assert_eq!(resolved, expected);
    }
}

proptest! {
    #[test]
    fn chains_resolve_regardless_of_length(length in 1usize..40) {
        let mut unit = BuildUnit::new();
        unit.add_singleton("n0", 0usize).unwrap();
        for i in 1..length {
            unit.add_singleton_fn(
                format!("n{}", i),
                vec![Dependency::name(format!("n{}", i - 1))],
                |args| Ok(args.value::<usize>(0)? + 1),
            )
            .unwrap();
        }
        let ctx = unit.build().bean_context();
        let last = ctx.get_as::<usize>(&format!("n{}", length - 1)).unwrap();
        prop_assert_eq!(*last, length - 1);
    }
}

proptest! {
    #[test]
    fn factory_instances_are_distinct(requests in 1usize..10) {
        let mut unit = BuildUnit::new();
        unit.add_recipe(
            None,
            "item",
            Recipe::from_fn(vec![], |_| Ok(vec![0u8])).scope(Scope::Factory).build(),
        )
        .unwrap();
        let ctx = unit.build().bean_context();

        let items: Vec<Bean> = (0..requests).map(|_| ctx.get("item").unwrap()).collect();
        let distinct: HashSet<usize> = items.iter().map(beanwire::bean::identity).collect();
        prop_assert_eq!(distinct.len(), requests);
    }
}

proptest! {
    #[test]
    fn release_shuts_down_each_used_singleton_once(used in prop::collection::vec(any::<bool>(), 1..12)) {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let mut unit = BuildUnit::new();
        for i in 0..used.len() {
            let counter = shutdowns.clone();
            unit.add_recipe(
                None,
                format!("s{}", i),
                Recipe::from_fn(vec![], move |_| Ok(i))
                    .shutdown(Shutdown::handler(move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }))
                    .build(),
            )
            .unwrap();
        }
        let result = unit.build();
        let ctx = result.bean_context();
        for (i, requested) in used.iter().enumerate() {
            if *requested {
                ctx.get(&format!("s{}", i)).unwrap();
                ctx.get(&format!("s{}", i)).unwrap();
            }
        }

        result.release().unwrap();
        let expected = used.iter().filter(|u| **u).count();
        prop_assert_eq!(shutdowns.load(Ordering::SeqCst), expected);
    }
}
