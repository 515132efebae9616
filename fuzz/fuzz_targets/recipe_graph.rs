#![no_main]

use beanwire::{BuildUnit, Dependency, DiError, EngineConfig, Recipe, Scope, Shutdown};
use libfuzzer_sys::fuzz_target;

// Each input byte pair describes one recipe: its scope and up to two
// references to other recipes. Whatever the graph looks like, resolution must
// end in a value or a structured error and release must not panic.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let count = (data.len() / 2).min(32);

    let mut unit = BuildUnit::new();
    unit.with_config(EngineConfig::new().max_depth(64));
    for i in 0..count {
        let shape = data[i * 2];
        let target = data[i * 2 + 1] as usize;
        let scope = if shape & 1 == 0 { Scope::Singleton } else { Scope::Factory };

        let mut params = Vec::new();
        if shape & 2 != 0 {
            params.push(Dependency::name(format!("n{}", target % count)));
        }
        if shape & 4 != 0 {
            params.push(Dependency::name(format!("n{}", target / 7 % (count + 1))));
        }
        if shape & 8 != 0 {
            params.push(Dependency::value(u64::from(shape)));
        }

        let mut builder = Recipe::from_fn(params, |args| Ok(args.len())).scope(scope);
        if shape & 16 != 0 {
            builder = builder.shutdown(Shutdown::handler(|_| Ok(())));
        }
        let _ = unit.add_recipe(None, format!("n{}", i), builder.build());
    }

    let result = unit.build();
    let ctx = result.bean_context();
    for i in 0..count {
        match ctx.get(&format!("n{}", i)) {
            Ok(_) => {}
            Err(DiError::CyclicDependency(path)) => assert!(path.len() >= 2),
            Err(DiError::NotFound(_)) | Err(DiError::DepthExceeded(_)) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }
    let _ = result.release();
});
