//! The per-module security context.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use serde::Serialize;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::capability::{CapSet, Capability};
use super::gate;
use super::levels::SecurityLevel;
use super::limits::{LimitTable, ResourceType};
use super::violation::{ViolationKind, ViolationLog, ViolationRecord};
use crate::error::SandboxError;
use crate::ids::ModuleId;
use kernos_rt::Tick;

/// Violations tolerated before strict enforcement quarantines a sandbox.
pub const DEFAULT_QUARANTINE_THRESHOLD: u64 = 5;

/// Aggregate sandbox counters.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct SandboxStats {
    /// Capability checks performed.
    pub cap_checks: u64,
    /// Checks that failed.
    pub denials: u64,
    /// Violations recorded (all kinds).
    pub violations: u64,
    /// Quarantine escalations (0 or 1; a sandbox is quarantined once).
    pub quarantines: u64,
}

/// Security context bound 1:1 to a module.
///
/// Holds the capability masks (denied wins over granted), the resource-limit
/// table, and the bounded violation ring. Every privileged operation a
/// module attempts passes through here; a failing check records a violation
/// and fails the operation. The kernel never panics on a denial, and the
/// module is not terminated unless strict enforcement escalates it to
/// quarantine.
#[derive(Debug, Clone)]
pub struct Sandbox {
    module: ModuleId,
    level: SecurityLevel,
    granted: CapSet,
    denied: CapSet,
    limits: LimitTable,
    violations: ViolationLog,
    strict: bool,
    quarantine_threshold: u64,
    stats: SandboxStats,
    image_region: (u64, usize),
    allocations: Vec<(u64, usize)>,
}

impl Sandbox {
    /// Create a sandbox at `level` with that level's default capabilities
    /// and limits.
    pub fn new(module: ModuleId, level: SecurityLevel, strict: bool) -> Self {
        let mut limits = LimitTable::new();
        limits.reapply(&level.default_limits());
        Self {
            module,
            level,
            granted: level.default_caps(),
            denied: CapSet::EMPTY,
            limits,
            violations: ViolationLog::default(),
            strict,
            quarantine_threshold: DEFAULT_QUARANTINE_THRESHOLD,
            stats: SandboxStats::default(),
            image_region: (0, 0),
            allocations: Vec::new(),
        }
    }

    /// Override the strict-enforcement quarantine threshold.
    pub fn with_quarantine_threshold(mut self, threshold: u64) -> Self {
        self.quarantine_threshold = threshold;
        self
    }

    /// Bind the module's image region for memory-access validation.
    pub(crate) fn set_image_region(&mut self, base: u64, len: usize) {
        self.image_region = (base, len);
    }

    // ------------------------------------------------------------------
    // Capabilities
    // ------------------------------------------------------------------

    /// The effective mask: granted AND NOT denied.
    pub fn effective(&self) -> CapSet {
        self.granted.effective(self.denied)
    }

    /// Granted mask (before denials).
    pub fn granted(&self) -> CapSet {
        self.granted
    }

    /// Capability check. A failing check records a `Capability` violation
    /// and returns false; it never terminates the module by itself.
    pub fn has_cap(&mut self, cap: Capability, now: Tick) -> bool {
        self.stats.cap_checks += 1;
        if self.effective().contains(cap) {
            return true;
        }
        self.stats.denials += 1;
        self.violate(
            ViolationKind::Capability,
            Some(cap),
            None,
            format!("capability {cap} not held"),
            now,
        );
        false
    }

    /// `has_cap` as a `Result` for call sites that propagate.
    pub fn require_cap(&mut self, cap: Capability, now: Tick) -> Result<(), SandboxError> {
        if self.has_cap(cap, now) {
            Ok(())
        } else {
            Err(SandboxError::CapabilityDenied {
                module: self.module,
                cap,
            })
        }
    }

    /// Add a capability to the granted mask and clear it from the denied
    /// mask. Idempotent. Refused while quarantined.
    pub fn grant(&mut self, cap: Capability) -> Result<(), SandboxError> {
        self.check_not_quarantined()?;
        self.granted = self.granted.with(cap);
        self.denied = self.denied.without(cap);
        Ok(())
    }

    /// Deny a capability; denied wins over granted. Always permitted, since
    /// revocation only ever narrows authority.
    pub fn revoke(&mut self, cap: Capability) {
        self.denied = self.denied.with(cap);
    }

    /// Replace the granted mask and clear all denials. Refused while
    /// quarantined.
    pub fn set_caps(&mut self, caps: CapSet) -> Result<(), SandboxError> {
        self.check_not_quarantined()?;
        self.granted = caps;
        self.denied = CapSet::EMPTY;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Resource limits
    // ------------------------------------------------------------------

    /// Install or replace an enforced limit.
    pub fn set_limit(&mut self, resource: ResourceType, limit: u64) {
        self.limits.set(resource, limit, true);
    }

    /// Whether `delta` more of `resource` stays within the limit. A denial
    /// records a `Resource` violation.
    pub fn check_limit(
        &mut self,
        resource: ResourceType,
        delta: u64,
        now: Tick,
    ) -> Result<(), SandboxError> {
        match self.limits.check(resource, delta) {
            Ok(()) => Ok(()),
            Err((limit, attempted)) => {
                self.violate(
                    ViolationKind::Resource,
                    None,
                    Some(resource),
                    format!("{resource} {attempted} over limit {limit}"),
                    now,
                );
                Err(SandboxError::ResourceExceeded {
                    module: self.module,
                    resource,
                    limit,
                    attempted,
                })
            }
        }
    }

    /// Commit a resource charge; updates use and peak.
    pub fn account(&mut self, resource: ResourceType, delta: u64) {
        self.limits.account(resource, delta);
    }

    /// Return part of a resource charge.
    pub fn release(&mut self, resource: ResourceType, delta: u64) {
        self.limits.release(resource, delta);
    }

    /// Check-then-account in one step.
    pub fn charge(
        &mut self,
        resource: ResourceType,
        delta: u64,
        now: Tick,
    ) -> Result<(), SandboxError> {
        self.check_limit(resource, delta, now)?;
        self.account(resource, delta);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Memory and call gating
    // ------------------------------------------------------------------

    /// Attribute an allocation to this module for memory-access checks.
    pub fn attribute_allocation(&mut self, base: u64, len: usize) {
        self.allocations.push((base, len));
    }

    /// Drop an attributed allocation.
    pub fn remove_allocation(&mut self, base: u64) {
        self.allocations.retain(|&(b, _)| b != base);
    }

    /// Validate that `[addr, addr+len)` lies within the module's image
    /// region or an allocation attributed to it, and that the module holds
    /// the memory capability.
    pub fn check_memory_access(
        &mut self,
        addr: u64,
        len: usize,
        write: bool,
        now: Tick,
    ) -> Result<(), SandboxError> {
        self.require_cap(Capability::MemoryAlloc, now)?;
        let in_image = range_contains(self.image_region, addr, len);
        let in_alloc = self
            .allocations
            .iter()
            .any(|&region| range_contains(region, addr, len));
        if in_image || in_alloc {
            return Ok(());
        }
        let what = if write { "write" } else { "read" };
        self.violate(
            ViolationKind::Memory,
            None,
            None,
            format!("{what} of {addr:#x}+{len} outside owned memory"),
            now,
        );
        Err(SandboxError::MemoryAccessDenied {
            module: self.module,
            addr,
            len,
        })
    }

    /// Gate a call into the module: rejects deny-listed names (an
    /// `Execution` violation), enforces the capability the name's prefix
    /// requires, and charges `ModuleCalls`.
    pub fn check_function_call(&mut self, name: &str, now: Tick) -> Result<(), SandboxError> {
        if gate::is_denied(name) {
            self.violate(
                ViolationKind::Execution,
                None,
                None,
                format!("call to deny-listed '{name}'"),
                now,
            );
            return Err(SandboxError::FunctionDenied {
                module: self.module,
                name: name.to_owned(),
            });
        }
        if let Some(cap) = gate::required_capability(name) {
            self.require_cap(cap, now)?;
        }
        self.charge(ResourceType::ModuleCalls, 1, now)
    }

    // ------------------------------------------------------------------
    // Violations and quarantine
    // ------------------------------------------------------------------

    /// Record a violation. Escalates to quarantine when strict enforcement
    /// is on and the lifetime count crosses the threshold. Returns the
    /// total violation count.
    pub fn violate(
        &mut self,
        kind: ViolationKind,
        capability: Option<Capability>,
        resource: Option<ResourceType>,
        description: String,
        now: Tick,
    ) -> u64 {
        self.stats.violations += 1;
        self.violations
            .push(now, self.module, kind, capability, resource, description);
        let total = self.violations.total();
        debug!(module = %self.module, %kind, total, "sandbox violation");
        if self.strict
            && self.level != SecurityLevel::Quarantine
            && total > self.quarantine_threshold
        {
            self.quarantine(now);
        }
        total
    }

    /// Collapse to the quarantine level: quarantine default capabilities,
    /// cleared denials, and the tight quarantine limits. Monotonic: only
    /// [`Sandbox::lift_quarantine`] restores the sandbox, and that is a
    /// privileged kernel operation.
    pub fn quarantine(&mut self, now: Tick) {
        if self.level == SecurityLevel::Quarantine {
            return;
        }
        warn!(module = %self.module, tick = now, "sandbox quarantined");
        self.level = SecurityLevel::Quarantine;
        self.granted = SecurityLevel::Quarantine.default_caps();
        self.denied = CapSet::EMPTY;
        self.limits.reapply(&SecurityLevel::Quarantine.default_limits());
        self.stats.quarantines += 1;
    }

    /// Privileged restore out of quarantine to `level`. Callers must hold
    /// `SecurityOverride`; the kernel facade is the only caller.
    pub fn lift_quarantine(&mut self, level: SecurityLevel) {
        self.level = level;
        self.granted = level.default_caps();
        self.denied = CapSet::EMPTY;
        self.limits.reapply(&level.default_limits());
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The bound module.
    pub fn module(&self) -> ModuleId {
        self.module
    }

    /// Current security level.
    pub fn level(&self) -> SecurityLevel {
        self.level
    }

    /// Whether the sandbox is quarantined.
    pub fn is_quarantined(&self) -> bool {
        self.level == SecurityLevel::Quarantine
    }

    /// Retained violation records, oldest first.
    pub fn violations(&self) -> impl Iterator<Item = &ViolationRecord> {
        self.violations.records()
    }

    /// Lifetime violation count, including evicted records.
    pub fn violation_count(&self) -> u64 {
        self.violations.total()
    }

    /// The limit record for a resource, if any.
    pub fn limit(&self, resource: ResourceType) -> Option<super::limits::ResourceLimit> {
        self.limits.get(resource)
    }

    /// Aggregate counters.
    pub fn stats(&self) -> SandboxStats {
        self.stats
    }

    fn check_not_quarantined(&self) -> Result<(), SandboxError> {
        if self.is_quarantined() {
            return Err(SandboxError::QuarantineLocked {
                module: self.module,
            });
        }
        Ok(())
    }
}

fn range_contains(region: (u64, usize), addr: u64, len: usize) -> bool {
    let (base, size) = region;
    if size == 0 {
        return false;
    }
    let end = base.saturating_add(size as u64);
    let Some(access_end) = addr.checked_add(len as u64) else {
        return false;
    };
    addr >= base && access_end <= end
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to use unwrap for simplicity
mod tests {
    use super::*;

    fn sandbox(level: SecurityLevel) -> Sandbox {
        Sandbox::new(ModuleId::from_index(1), level, true)
    }

    #[test]
    fn test_effective_denied_wins() {
        let mut sb = sandbox(SecurityLevel::Trusted);
        assert!(sb.has_cap(Capability::VgaWrite, 0));
        sb.revoke(Capability::VgaWrite);
        assert!(!sb.has_cap(Capability::VgaWrite, 1));
        // grant clears the denial again
        sb.grant(Capability::VgaWrite).unwrap();
        assert!(sb.has_cap(Capability::VgaWrite, 2));
    }

    #[test]
    fn test_failed_check_logs_capability_violation() {
        let mut sb = sandbox(SecurityLevel::User);
        assert!(!sb.has_cap(Capability::FsWrite, 7));
        let records: Vec<_> = sb.violations().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ViolationKind::Capability);
        assert_eq!(records[0].capability, Some(Capability::FsWrite));
        assert_eq!(records[0].tick, 7);
    }

    #[test]
    fn test_grant_then_revoke_leaves_denied() {
        let mut sb = sandbox(SecurityLevel::User);
        sb.grant(Capability::FsRead).unwrap();
        sb.revoke(Capability::FsRead);
        assert!(!sb.effective().contains(Capability::FsRead));
    }

    #[test]
    fn test_charge_over_limit_denied_and_logged() {
        let mut sb = sandbox(SecurityLevel::User);
        sb.set_limit(ResourceType::ChildActors, 1);
        sb.charge(ResourceType::ChildActors, 1, 0).unwrap();
        let err = sb.charge(ResourceType::ChildActors, 1, 1).unwrap_err();
        assert!(matches!(err, SandboxError::ResourceExceeded { .. }));
        assert_eq!(
            sb.violations().last().map(|r| r.kind),
            Some(ViolationKind::Resource)
        );
    }

    #[test]
    fn test_memory_access_in_image_allowed() {
        let mut sb = sandbox(SecurityLevel::User);
        sb.set_image_region(0x1000, 0x100);
        assert!(sb.check_memory_access(0x1000, 0x100, false, 0).is_ok());
        assert!(sb.check_memory_access(0x10ff, 1, true, 0).is_ok());
        let err = sb.check_memory_access(0x1100, 1, false, 0).unwrap_err();
        assert!(matches!(err, SandboxError::MemoryAccessDenied { .. }));
    }

    #[test]
    fn test_memory_access_in_attributed_allocation() {
        let mut sb = sandbox(SecurityLevel::User);
        sb.attribute_allocation(0x8000, 64);
        assert!(sb.check_memory_access(0x8010, 8, true, 0).is_ok());
        sb.remove_allocation(0x8000);
        assert!(sb.check_memory_access(0x8010, 8, true, 0).is_err());
    }

    #[test]
    fn test_deny_listed_call_is_execution_violation() {
        let mut sb = sandbox(SecurityLevel::Trusted);
        let err = sb.check_function_call("exec", 0).unwrap_err();
        assert!(matches!(err, SandboxError::FunctionDenied { .. }));
        assert_eq!(
            sb.violations().last().map(|r| r.kind),
            Some(ViolationKind::Execution)
        );
    }

    #[test]
    fn test_function_call_charges_module_calls() {
        let mut sb = sandbox(SecurityLevel::User);
        sb.check_function_call("helper", 0).unwrap();
        sb.check_function_call("helper", 1).unwrap();
        assert_eq!(
            sb.limit(ResourceType::ModuleCalls).map(|l| l.used),
            Some(2)
        );
    }

    #[test]
    fn test_strict_mode_quarantines_after_threshold() {
        let mut sb = sandbox(SecurityLevel::User);
        for i in 0..5 {
            assert!(!sb.has_cap(Capability::FsWrite, i));
            assert!(!sb.is_quarantined());
        }
        // Sixth violation crosses the default threshold of 5.
        assert!(!sb.has_cap(Capability::FsWrite, 5));
        assert!(sb.is_quarantined());
        assert_eq!(sb.stats().quarantines, 1);
        assert_eq!(sb.granted().bits(), Capability::ModuleQuery.bit());
    }

    #[test]
    fn test_lenient_mode_never_quarantines() {
        let mut sb = Sandbox::new(ModuleId::from_index(1), SecurityLevel::User, false);
        for i in 0..20 {
            sb.has_cap(Capability::FsWrite, i);
        }
        assert!(!sb.is_quarantined());
    }

    #[test]
    fn test_quarantine_is_monotonic() {
        let mut sb = sandbox(SecurityLevel::User);
        sb.quarantine(0);
        assert!(matches!(
            sb.grant(Capability::FsRead),
            Err(SandboxError::QuarantineLocked { .. })
        ));
        assert!(matches!(
            sb.set_caps(CapSet::ALL),
            Err(SandboxError::QuarantineLocked { .. })
        ));
        // The privileged path restores it.
        sb.lift_quarantine(SecurityLevel::User);
        assert!(!sb.is_quarantined());
        assert!(sb.grant(Capability::FsRead).is_ok());
    }

    #[test]
    fn test_quarantine_applies_tight_limits() {
        let mut sb = sandbox(SecurityLevel::Trusted);
        sb.quarantine(0);
        let memory = sb.limit(ResourceType::Memory).unwrap();
        assert_eq!(memory.limit, super::super::levels::QUARANTINE_MEMORY_LIMIT);
        let children = sb.limit(ResourceType::ChildActors).unwrap();
        assert_eq!(children.limit, 0);
    }
}
