//! Supervisor trait: the contract of the external AI supervisor.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::types::{AnomalyKind, BehaviorReport, Intervention};

/// Consumer of behavior reports, invoked from the periodic sweep.
///
/// The real supervisor lives outside the core; it reads reports and answers
/// with interventions, which the scheduler applies through its ordinary
/// lifecycle operations. Nothing here runs ML.
pub trait Supervisor {
    /// Inspect one sweep's reports and decide interventions.
    fn sweep(&mut self, reports: &[BehaviorReport]) -> Vec<Intervention>;
}

/// Supervisor that never intervenes; the default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSupervisor;

impl Supervisor for NoopSupervisor {
    fn sweep(&mut self, _reports: &[BehaviorReport]) -> Vec<Intervention> {
        Vec::new()
    }
}

/// Reference supervisor built on fixed thresholds.
///
/// Flags a `NetworkFlood` when a mailbox sits at or above the flood
/// fraction of its capacity, and suspends an actor once its behavior score
/// falls to the suspend threshold. Deliberately simple: it exists to
/// exercise the intervention path, not to detect anything subtle.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdSupervisor {
    /// Score at or below which the actor is suspended.
    pub suspend_below: u8,
    /// Mailbox fill percentage treated as a flood.
    pub flood_pct: u8,
}

impl Default for ThresholdSupervisor {
    fn default() -> Self {
        Self {
            suspend_below: 20,
            flood_pct: 90,
        }
    }
}

impl Supervisor for ThresholdSupervisor {
    fn sweep(&mut self, reports: &[BehaviorReport]) -> Vec<Intervention> {
        let mut actions = Vec::new();
        for report in reports {
            if report.behavior_score <= self.suspend_below {
                actions.push(Intervention::Suspend(report.actor));
                continue;
            }
            if report.mailbox_capacity > 0 {
                let fill = report.mailbox_depth * 100 / report.mailbox_capacity;
                if fill >= usize::from(self.flood_pct) {
                    actions.push(Intervention::Flag(report.actor, AnomalyKind::NetworkFlood));
                }
            }
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ActorId;
    use chrono::Utc;

    fn report(score: u8, depth: usize, cap: usize) -> BehaviorReport {
        BehaviorReport {
            actor: ActorId::from_index(1),
            behavior_score: score,
            cpu_ticks: 0,
            messages_sent: 0,
            mailbox_depth: depth,
            mailbox_capacity: cap,
            memory_used: 0,
            anomalies: 0,
            tick: 0,
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn test_noop_never_intervenes() {
        let mut sup = NoopSupervisor;
        assert!(sup.sweep(&[report(0, 64, 64)]).is_empty());
    }

    #[test]
    fn test_threshold_suspends_low_score() {
        let mut sup = ThresholdSupervisor::default();
        let actions = sup.sweep(&[report(10, 0, 64)]);
        assert_eq!(actions, vec![Intervention::Suspend(ActorId::from_index(1))]);
    }

    #[test]
    fn test_threshold_flags_flooded_mailbox() {
        let mut sup = ThresholdSupervisor::default();
        let actions = sup.sweep(&[report(90, 60, 64)]);
        assert_eq!(
            actions,
            vec![Intervention::Flag(
                ActorId::from_index(1),
                AnomalyKind::NetworkFlood
            )]
        );
    }

    #[test]
    fn test_healthy_report_passes() {
        let mut sup = ThresholdSupervisor::default();
        assert!(sup.sweep(&[report(90, 1, 64)]).is_empty());
    }
}
