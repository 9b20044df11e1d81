//! Hot-swap: atomic symbol flip at a quiescent point, rollback on a
//! failed init, and the busy path.

#![allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity

use kernos_mods::prelude::*;
use kernos_mods::registry::HookContext;

fn swappable(name: &str, version: u32, code: &[u8]) -> Vec<u8> {
    ImageBuilder::new(name, version)
        .flags(ModuleFlags::HOT_SWAP | ModuleFlags::AUTO_START)
        .code(code)
        .export("f", 0, code.len() as u32)
        .build()
}

#[test]
fn s6_hot_swap_switches_symbol_to_new_image() {
    let mut reg = ModuleRegistry::new(RegistryConfig::default());
    let id = reg
        .load(&swappable("mod_v1", 1, &[0x90, 0xc3]), LoadOptions::default(), 0)
        .unwrap();

    let old_base = reg.module(id).unwrap().base_address();
    let old_addr = reg.resolve("f").unwrap().address;
    assert_eq!(old_addr, old_base);

    reg.swap(
        id,
        &swappable("mod_v1", 2, &[0x90, 0x90, 0x90, 0xc3]),
        ModuleHooks::default(),
        5,
    )
    .unwrap();

    // Post-swap, "f" resolves into the new image's code region.
    let record = reg.module(id).unwrap();
    let new_base = record.base_address();
    let binding = reg.resolve("f").unwrap();
    assert_eq!(binding.address, new_base);
    assert_ne!(new_base, old_base);
    assert!(reg.module(id).unwrap().owns_code_address(binding.address));

    // The record now carries the new version and region size.
    let record = reg.module(id).unwrap();
    assert_eq!(record.version, 2);
    assert_eq!(record.region_len(), 4);
    assert_eq!(record.state, ModuleState::Running);
    assert_eq!(reg.stats().swaps, 1);
}

#[test]
fn swap_requires_hot_swap_flag() {
    let mut reg = ModuleRegistry::new(RegistryConfig::default());
    let image = ImageBuilder::new("mod_fixed", 1)
        .flags(ModuleFlags::AUTO_START)
        .code(&[0xc3])
        .export("g", 0, 1)
        .build();
    let id = reg.load(&image, LoadOptions::default(), 0).unwrap();
    let err = reg
        .swap(id, &swappable("mod_fixed", 2, &[0xc3]), ModuleHooks::default(), 1)
        .unwrap_err();
    assert!(matches!(err, ModuleError::SwapNotAllowed { .. }));
}

#[test]
fn swap_with_call_in_flight_is_busy() {
    let mut reg = ModuleRegistry::new(RegistryConfig::default());
    let id = reg
        .load(&swappable("mod_busy", 1, &[0xc3]), LoadOptions::default(), 0)
        .unwrap();

    reg.enter(id).unwrap();
    let err = reg
        .swap(id, &swappable("mod_busy", 2, &[0xc3]), ModuleHooks::default(), 1)
        .unwrap_err();
    assert_eq!(
        err,
        ModuleError::HotSwapBusy {
            name: "mod_busy".to_owned(),
            in_flight: 1
        }
    );

    // Retry at the next yield boundary, after the call returns.
    reg.leave(id);
    reg.swap(id, &swappable("mod_busy", 2, &[0xc3]), ModuleHooks::default(), 2)
        .unwrap();
    assert_eq!(reg.module(id).unwrap().version, 2);
}

#[test]
fn swap_image_must_name_the_same_module() {
    let mut reg = ModuleRegistry::new(RegistryConfig::default());
    let id = reg
        .load(&swappable("mod_v1", 1, &[0xc3]), LoadOptions::default(), 0)
        .unwrap();
    let err = reg
        .swap(id, &swappable("mod_other", 2, &[0xc3]), ModuleHooks::default(), 1)
        .unwrap_err();
    assert_eq!(
        err,
        ModuleError::NameMismatch {
            expected: "mod_v1".to_owned(),
            found: "mod_other".to_owned(),
        }
    );
}

fn failing_init(_cx: &mut HookContext<'_>) -> i32 {
    7
}

#[test]
fn failed_init_rolls_back_to_old_image() {
    let mut reg = ModuleRegistry::new(RegistryConfig::default());
    let id = reg
        .load(&swappable("mod_roll", 1, &[0x90, 0xc3]), LoadOptions::default(), 0)
        .unwrap();
    let old_addr = reg.resolve("f").unwrap().address;

    let err = reg
        .swap(
            id,
            &swappable("mod_roll", 2, &[0xc3]),
            ModuleHooks {
                init: Some(failing_init),
                ..ModuleHooks::default()
            },
            1,
        )
        .unwrap_err();
    assert_eq!(
        err,
        ModuleError::InitFailed {
            name: "mod_roll".to_owned(),
            code: 7
        }
    );

    // Old image intact, old exports restored, version unchanged.
    let record = reg.module(id).unwrap();
    assert_eq!(record.version, 1);
    assert_eq!(reg.resolve("f").unwrap().address, old_addr);
    assert_eq!(reg.stats().failed_swaps, 1);
    assert_eq!(reg.stats().swaps, 0);
}

#[test]
fn swap_keeps_sandbox_and_violation_history() {
    let mut reg = ModuleRegistry::new(RegistryConfig::default());
    let id = reg
        .load(
            &swappable("mod_history", 1, &[0xc3]),
            LoadOptions {
                level: Some(SecurityLevel::User),
                ..LoadOptions::default()
            },
            0,
        )
        .unwrap();
    reg.module_mut(id)
        .unwrap()
        .sandbox
        .check_function_call("fs_write", 0)
        .unwrap_err();
    assert_eq!(reg.module(id).unwrap().sandbox.violation_count(), 1);

    reg.swap(id, &swappable("mod_history", 2, &[0xc3]), ModuleHooks::default(), 1)
        .unwrap();

    // The security context survives the code swap.
    let record = reg.module(id).unwrap();
    assert_eq!(record.sandbox.level(), SecurityLevel::User);
    assert_eq!(record.sandbox.violation_count(), 1);
}
