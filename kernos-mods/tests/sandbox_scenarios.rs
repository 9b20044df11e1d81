//! Sandbox end-to-end scenarios: capability denial on a gated call and
//! quarantine escalation under strict enforcement.

#![allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity

use kernos_mods::prelude::*;

fn kernel() -> Kernel {
    Kernel::boot(KernelConfig::default()).unwrap()
}

fn user_module(name: &str, export: &str) -> Vec<u8> {
    ImageBuilder::new(name, 1)
        .flags(ModuleFlags::AUTO_START)
        .code(&[0x90, 0x90, 0xc3])
        .export(export, 0, 3)
        .build()
}

#[test]
fn s4_load_plus_capability_deny() {
    let mut kernel = kernel();
    let image = user_module("mod_user", "fs_write");
    let id = kernel
        .load_module(
            &image,
            LoadOptions {
                level: Some(SecurityLevel::User),
                ..LoadOptions::default()
            },
        )
        .unwrap();
    assert_eq!(kernel.registry().state_of(id), Some(ModuleState::Running));

    // A User-level sandbox has no FsWrite capability.
    let err = kernel.call_module("fs_write").unwrap_err();
    assert!(matches!(
        err,
        KernelError::Sandbox(SandboxError::CapabilityDenied {
            cap: Capability::FsWrite,
            ..
        })
    ));

    // Exactly one new violation, of kind Capability.
    let record = kernel.registry().module(id).unwrap();
    let violations: Vec<_> = record.sandbox.violations().collect();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::Capability);
    assert_eq!(violations[0].capability, Some(Capability::FsWrite));

    // The module's state is unchanged, and no call is left in flight.
    assert_eq!(kernel.registry().state_of(id), Some(ModuleState::Running));
    assert_eq!(record.entry_count(), 0);
}

#[test]
fn s5_quarantine_escalation() {
    let mut kernel = kernel();
    let image = user_module("mod_bad", "fs_write");
    let id = kernel
        .load_module(
            &image,
            LoadOptions {
                level: Some(SecurityLevel::User),
                ..LoadOptions::default()
            },
        )
        .unwrap();

    // Provoke six capability violations; strict enforcement is on by
    // default and the threshold is five.
    for i in 0..6 {
        let err = kernel.call_module("fs_write").unwrap_err();
        assert!(matches!(err, KernelError::Sandbox(_)), "violation {i}");
    }

    let record = kernel.registry().module(id).unwrap();
    assert_eq!(record.sandbox.level(), SecurityLevel::Quarantine);
    assert_eq!(
        record.sandbox.granted().bits(),
        Capability::ModuleQuery.bit()
    );
    let memory = record.sandbox.limit(ResourceType::Memory).unwrap();
    assert!(memory.limit <= 512 * 1024);
    assert_eq!(record.sandbox.stats().quarantines, 1);
}

#[test]
fn quarantine_blocks_further_grants_until_lifted() {
    let mut kernel = kernel();
    let image = user_module("mod_locked", "fs_write");
    let id = kernel
        .load_module(
            &image,
            LoadOptions {
                level: Some(SecurityLevel::User),
                ..LoadOptions::default()
            },
        )
        .unwrap();
    kernel.quarantine_module(id).unwrap();
    assert_eq!(kernel.status(), KernelStatus::Degraded);

    // Quarantine is monotonic from inside the sandbox.
    let err = kernel
        .registry_mut()
        .module_mut(id)
        .unwrap()
        .sandbox
        .grant(Capability::FsWrite)
        .unwrap_err();
    assert!(matches!(err, SandboxError::QuarantineLocked { .. }));

    // Host operator restore (no caller module): allowed.
    kernel
        .lift_quarantine(id, SecurityLevel::User, None)
        .unwrap();
    let record = kernel.registry().module(id).unwrap();
    assert_eq!(record.sandbox.level(), SecurityLevel::User);
}

#[test]
fn lift_quarantine_requires_security_override() {
    let mut kernel = kernel();
    let victim = kernel
        .load_module(&user_module("mod_victim", "victim_fn"), LoadOptions::default())
        .unwrap();
    let unprivileged = kernel
        .load_module(
            &user_module("mod_plain", "plain_fn"),
            LoadOptions {
                level: Some(SecurityLevel::User),
                ..LoadOptions::default()
            },
        )
        .unwrap();
    let privileged = kernel
        .load_module(
            &user_module("mod_admin", "admin_fn"),
            LoadOptions {
                level: Some(SecurityLevel::Unrestricted),
                ..LoadOptions::default()
            },
        )
        .unwrap();

    kernel.quarantine_module(victim).unwrap();

    // A module without SecurityOverride cannot lift quarantine.
    let err = kernel
        .lift_quarantine(victim, SecurityLevel::User, Some(unprivileged))
        .unwrap_err();
    assert!(matches!(
        err,
        KernelError::Sandbox(SandboxError::CapabilityDenied {
            cap: Capability::SecurityOverride,
            ..
        })
    ));
    assert!(kernel
        .registry()
        .module(victim)
        .unwrap()
        .sandbox
        .is_quarantined());

    // An Unrestricted module holds SecurityOverride.
    kernel
        .lift_quarantine(victim, SecurityLevel::User, Some(privileged))
        .unwrap();
    assert!(!kernel
        .registry()
        .module(victim)
        .unwrap()
        .sandbox
        .is_quarantined());
}

#[test]
fn deny_listed_function_is_rejected_even_when_privileged() {
    let mut kernel = kernel();
    let image = ImageBuilder::new("mod_sys", 1)
        .flags(ModuleFlags::AUTO_START)
        .code(&[0xc3])
        .export("reboot", 0, 1)
        .build();
    kernel
        .load_module(
            &image,
            LoadOptions {
                level: Some(SecurityLevel::Unrestricted),
                ..LoadOptions::default()
            },
        )
        .unwrap();

    let err = kernel.call_module("reboot").unwrap_err();
    assert!(matches!(
        err,
        KernelError::Sandbox(SandboxError::FunctionDenied { .. })
    ));
}

#[test]
fn capability_denial_never_unloads_or_finishes() {
    let mut kernel = kernel();
    let image = user_module("mod_sturdy", "fs_write");
    let id = kernel
        .load_module(
            &image,
            LoadOptions {
                level: Some(SecurityLevel::User),
                ..LoadOptions::default()
            },
        )
        .unwrap();

    for _ in 0..20 {
        let _ = kernel.call_module("fs_write");
    }
    // Property 8: denials isolate (quarantine), they never unload.
    let record = kernel.registry().module(id).unwrap();
    assert_eq!(record.state, ModuleState::Running);
    assert!(record.sandbox.is_quarantined());
    assert!(kernel.registry().find("mod_sturdy").is_some());
}
