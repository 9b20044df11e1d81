//! Function-call gate: the deny-list and the name-to-capability map.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::capability::Capability;

/// Function names no module may call, regardless of capabilities.
pub const DENY_LIST: &[&str] = &[
    "system", "exec", "fork", "kill", "reboot", "shutdown", "outb", "inb",
];

/// Prefix map from function names to the capability they require. First
/// match wins; longer prefixes are listed before their shorter siblings.
const PREFIX_CAPS: &[(&str, Capability)] = &[
    ("fs_read", Capability::FsRead),
    ("fs_write", Capability::FsWrite),
    ("fs_create", Capability::FsCreate),
    ("fs_delete", Capability::FsDelete),
    ("vga_clear", Capability::VgaClear),
    ("vga_cursor", Capability::VgaCursor),
    ("vga_", Capability::VgaWrite),
    ("net_send", Capability::NetSend),
    ("net_recv", Capability::NetRecv),
    ("net_", Capability::NetSocket),
    ("ai_configure", Capability::AiConfigure),
    ("ai_", Capability::AiQuery),
    ("module_load", Capability::ModuleLoad),
    ("module_unload", Capability::ModuleUnload),
    ("module_", Capability::ModuleQuery),
    ("actor_create", Capability::ActorCreate),
    ("actor_destroy", Capability::ActorDestroy),
    ("actor_", Capability::ActorSignal),
    ("mem_alloc", Capability::MemoryAlloc),
    ("mem_free", Capability::MemoryFree),
    ("mem_map", Capability::MemoryMap),
    ("mem_unmap", Capability::MemoryUnmap),
    ("mem_protect", Capability::MemoryProtect),
    ("timer_", Capability::TimerAccess),
    ("irq_", Capability::InterruptHandle),
    ("io_", Capability::HwIo),
    ("debug_", Capability::DebugAccess),
];

/// Whether the name is categorically denied.
pub fn is_denied(name: &str) -> bool {
    DENY_LIST.contains(&name)
}

/// The capability a function name requires, if its prefix names one.
/// Unmapped names require no capability beyond the `ModuleCalls` charge.
pub fn required_capability(name: &str) -> Option<Capability> {
    PREFIX_CAPS
        .iter()
        .find(|(prefix, _)| name.starts_with(prefix))
        .map(|&(_, cap)| cap)
}
