//! Registry lifecycle: the load/unload pipelines, dependency graph
//! invariants, and validation boundaries.

#![allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity

use kernos_mods::prelude::*;
use kernos_mods::registry::HookContext;

fn registry() -> ModuleRegistry {
    ModuleRegistry::new(RegistryConfig::default())
}

fn simple_image(name: &str, version: u32) -> Vec<u8> {
    ImageBuilder::new(name, version)
        .code(&[0x90, 0x90, 0xc3])
        .export(&format!("{name}_entry"), 0, 3)
        .build()
}

#[test]
fn load_publishes_exports_and_unload_retracts() {
    let mut reg = registry();
    let id = reg
        .load(&simple_image("mod_a", 1), LoadOptions::default(), 0)
        .unwrap();
    assert_eq!(reg.state_of(id), Some(ModuleState::Loaded));

    let binding = reg.resolve("mod_a_entry").unwrap();
    assert_eq!(binding.module, id);
    let base = reg.module(id).unwrap().base_address();
    assert_eq!(binding.address, base);

    reg.unload(id, 1).unwrap();
    assert_eq!(reg.state_of(id), None);
    // Property 7: no former export resolves after unload.
    assert!(reg.resolve("mod_a_entry").is_none());
}

#[test]
fn duplicate_name_is_refused() {
    let mut reg = registry();
    reg.load(&simple_image("mod_a", 1), LoadOptions::default(), 0)
        .unwrap();
    let err = reg
        .load(&simple_image("mod_a", 2), LoadOptions::default(), 0)
        .unwrap_err();
    assert!(matches!(err, ModuleError::AlreadyLoaded { .. }));
    assert_eq!(reg.stats().failed_loads, 1);
}

#[test]
fn oversized_code_section_fails_validation() {
    let mut reg = registry();
    let image = ImageBuilder::new("mod_big", 1)
        .code(&vec![0u8; 1024 * 1024 + 1])
        .build();
    let err = reg.load(&image, LoadOptions::default(), 0).unwrap_err();
    assert!(matches!(
        err,
        ModuleError::Validation(ImageError::SectionTooLarge { section: "code", .. })
    ));
}

#[test]
fn bss_counts_toward_image_cap() {
    let mut reg = registry();
    let image = ImageBuilder::new("mod_bss", 1)
        .code(&[0u8; 1024])
        .bss(1024 * 1024)
        .build();
    let err = reg.load(&image, LoadOptions::default(), 0).unwrap_err();
    assert!(matches!(
        err,
        ModuleError::Validation(ImageError::ImageTooLarge { .. })
    ));
}

#[test]
fn autostart_flag_transitions_to_running() {
    let mut reg = registry();
    let image = ImageBuilder::new("mod_auto", 1)
        .flags(ModuleFlags::AUTO_START)
        .code(&[0xc3])
        .build();
    let id = reg.load(&image, LoadOptions::default(), 0).unwrap();
    assert_eq!(reg.state_of(id), Some(ModuleState::Running));
}

#[test]
fn bss_region_is_zero_filled() {
    let mut reg = registry();
    let image = ImageBuilder::new("mod_zeroes", 1)
        .code(&[0xff; 4])
        .data(&[0xee; 4])
        .bss(8)
        .build();
    let id = reg.load(&image, LoadOptions::default(), 0).unwrap();
    let record = reg.module(id).unwrap();
    assert_eq!(record.region_len(), 16);
    assert_eq!(record.accounting.memory_bytes, 16);
}

fn failing_init(_cx: &mut HookContext<'_>) -> i32 {
    -1
}

#[test]
fn failed_init_unwinds_completely() {
    let mut reg = registry();
    let image = simple_image("mod_bad_init", 1);
    let options = LoadOptions {
        hooks: ModuleHooks {
            init: Some(failing_init),
            ..ModuleHooks::default()
        },
        ..LoadOptions::default()
    };
    let err = reg.load(&image, options, 0).unwrap_err();
    assert_eq!(
        err,
        ModuleError::InitFailed {
            name: "mod_bad_init".to_owned(),
            code: -1
        }
    );
    // Unwound: nothing observable remains.
    assert!(reg.is_empty());
    assert!(reg.resolve("mod_bad_init_entry").is_none());
    assert!(reg.find("mod_bad_init").is_none());
}

#[test]
fn core_module_cannot_be_unloaded() {
    let mut reg = registry();
    let image = ImageBuilder::new("mod_core", 1)
        .module_type(ModuleType::Core)
        .flags(ModuleFlags::CORE)
        .code(&[0xc3])
        .build();
    let id = reg.load(&image, LoadOptions::default(), 0).unwrap();
    let err = reg.unload(id, 1).unwrap_err();
    assert!(matches!(err, ModuleError::CoreUnload { .. }));
    assert_eq!(reg.state_of(id), Some(ModuleState::Loaded));
}

#[test]
fn dependency_edges_are_mirrored() {
    let mut reg = registry();
    let base = reg
        .load(&simple_image("mod_base", 3), LoadOptions::default(), 0)
        .unwrap();
    let dependent_image = ImageBuilder::new("mod_dep", 1)
        .code(&[0xc3])
        .depends_on("mod_base", 1, 5)
        .build();
    let dependent = reg
        .load(&dependent_image, LoadOptions::default(), 0)
        .unwrap();

    // Back-edge present.
    assert_eq!(reg.module(base).unwrap().dependents(), &[dependent]);

    // Property 6: a module with dependents cannot unload.
    let err = reg.unload(base, 1).unwrap_err();
    assert!(matches!(err, ModuleError::HasDependents { count: 1, .. }));

    // Unloading the dependent clears the back-edge; then the base goes.
    reg.unload(dependent, 2).unwrap();
    assert!(reg.module(base).unwrap().dependents().is_empty());
    reg.unload(base, 3).unwrap();
}

#[test]
fn unsatisfied_required_dependency_fails_load() {
    let mut reg = registry();
    let image = ImageBuilder::new("mod_needy", 1)
        .code(&[0xc3])
        .depends_on("mod_missing", 1, 9)
        .build();
    let err = reg.load(&image, LoadOptions::default(), 0).unwrap_err();
    assert!(matches!(err, ModuleError::DependencyUnsatisfied { .. }));
    assert!(reg.is_empty());
}

#[test]
fn version_range_is_enforced() {
    let mut reg = registry();
    reg.load(&simple_image("mod_base", 7), LoadOptions::default(), 0)
        .unwrap();
    let image = ImageBuilder::new("mod_picky", 1)
        .code(&[0xc3])
        .depends_on("mod_base", 1, 6)
        .build();
    let err = reg.load(&image, LoadOptions::default(), 0).unwrap_err();
    match err {
        ModuleError::DependencyUnsatisfied { reason, .. } => {
            assert!(reason.contains("outside"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_optional_dependency_loads_anyway() {
    let mut reg = registry();
    let image = ImageBuilder::new("mod_flex", 1)
        .code(&[0xc3])
        .depends_optionally_on("mod_extra", 1, 9)
        .build();
    let id = reg.load(&image, LoadOptions::default(), 0).unwrap();
    let record = reg.module(id).unwrap();
    assert_eq!(record.dependencies().len(), 1);
    assert!(record.dependencies()[0].module.is_none());
}

#[test]
fn cross_module_symbol_collision_rejected() {
    let mut reg = registry();
    let first = ImageBuilder::new("mod_one", 1)
        .code(&[0xc3])
        .export("shared_fn", 0, 1)
        .build();
    reg.load(&first, LoadOptions::default(), 0).unwrap();

    let second = ImageBuilder::new("mod_two", 1)
        .code(&[0xc3])
        .export("shared_fn", 0, 1)
        .build();
    let err = reg.load(&second, LoadOptions::default(), 0).unwrap_err();
    assert!(matches!(err, ModuleError::SymbolCollision { .. }));
    // The failed load left nothing behind.
    assert!(reg.find("mod_two").is_none());
    assert_eq!(reg.len(), 1);
}

#[test]
fn default_security_levels_derive_from_type() {
    let mut reg = registry();
    let driver = ImageBuilder::new("mod_drv", 1)
        .module_type(ModuleType::Driver)
        .code(&[0xc3])
        .build();
    let custom = ImageBuilder::new("mod_cst", 1)
        .module_type(ModuleType::Custom)
        .code(&[0xc3])
        .build();
    let shell = ImageBuilder::new("mod_sh", 1)
        .module_type(ModuleType::Shell)
        .code(&[0xc3])
        .build();

    let driver = reg.load(&driver, LoadOptions::default(), 0).unwrap();
    let custom = reg.load(&custom, LoadOptions::default(), 0).unwrap();
    let shell = reg.load(&shell, LoadOptions::default(), 0).unwrap();

    assert_eq!(
        reg.module(driver).unwrap().sandbox.level(),
        SecurityLevel::Trusted
    );
    assert_eq!(
        reg.module(custom).unwrap().sandbox.level(),
        SecurityLevel::Untrusted
    );
    assert_eq!(
        reg.module(shell).unwrap().sandbox.level(),
        SecurityLevel::User
    );
}

#[test]
fn health_check_suspends_error_prone_module() {
    let mut reg = registry();
    let id = reg
        .load(&simple_image("mod_flaky", 1), LoadOptions::default(), 0)
        .unwrap();
    reg.module_mut(id).unwrap().accounting.error_count = 3;
    let health = reg.periodic_check(10);
    assert_eq!(health.checked, 1);
    assert_eq!(health.suspended, vec![id]);
    assert_eq!(reg.state_of(id), Some(ModuleState::Suspended));

    // Operator resume restores it.
    reg.module_mut(id).unwrap().accounting.error_count = 0;
    reg.resume(id).unwrap();
    assert_eq!(reg.state_of(id), Some(ModuleState::Running));
}
