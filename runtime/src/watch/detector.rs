//! Presence state machine.
//!
//! | stored  | observed | next    | alert                            |
//! |---------|----------|---------|----------------------------------|
//! | Unknown | present  | Present | —                                |
//! | Unknown | absent   | Absent  | Changed (none, `unknown_silent`) |
//! | Present | present  | Present | —                                |
//! | Present | absent   | Absent  | Changed                          |
//! | Absent  | present  | Present | Restored                         |
//! | Absent  | absent   | Absent  | —                                |
//!
//! `Unknown` is only stored under the `unknown_*` policies. Whether the
//! `Unknown → Absent` step alerts is the one thing that separates them.

use super::store::PresenceStore;
use crate::config::InitialState;
use crate::notify::NotificationKind;
use crate::target::{Presence, Target};
use tracing::info;

/// Outcome of feeding one observation into the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub previous: Presence,
    pub next: Presence,
    /// `Changed` or `Restored` when the transition warrants an alert.
    pub alert: Option<NotificationKind>,
}

impl Decision {
    pub fn is_transition(&self) -> bool {
        self.previous != self.next
    }
}

/// Decide the next state and alert for a stored state and a fresh observation.
pub fn decide(stored: Presence, present: bool, policy: InitialState) -> Decision {
    let (next, alert) = match (stored, present) {
        (Presence::Unknown, true) => (Presence::Present, None),
        (Presence::Unknown, false) => (
            Presence::Absent,
            policy
                .notifies_missing_baseline()
                .then_some(NotificationKind::Changed),
        ),
        (Presence::Present, true) => (Presence::Present, None),
        (Presence::Present, false) => (Presence::Absent, Some(NotificationKind::Changed)),
        (Presence::Absent, true) => (Presence::Present, Some(NotificationKind::Restored)),
        (Presence::Absent, false) => (Presence::Absent, None),
    };
    Decision {
        previous: stored,
        next,
        alert,
    }
}

/// Owns the presence store and applies [`decide`] to it.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    store: PresenceStore,
    policy: InitialState,
}

impl ChangeDetector {
    pub fn new(targets: &[Target], policy: InitialState) -> Self {
        Self {
            store: PresenceStore::new(targets, policy.presence()),
            policy,
        }
    }

    pub fn policy(&self) -> InitialState {
        self.policy
    }

    /// Record an observation and commit the resulting state.
    ///
    /// The commit happens here, before any alert is delivered; a failed
    /// delivery does not undo it.
    pub fn observe(&mut self, target: &Target, present: bool) -> Decision {
        let decision = decide(self.store.get(&target.name), present, self.policy);
        if decision.is_transition() {
            info!(
                target_name = %target.name,
                from = %decision.previous,
                to = %decision.next,
                "presence changed"
            );
            self.store.set(&target.name, decision.next);
        }
        decision
    }

    pub fn presence(&self, name: &str) -> Presence {
        self.store.get(name)
    }

    pub fn store(&self) -> &PresenceStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> Target {
        Target::new("Widget", "http://x", "IN STOCK")
    }

    fn alerts(policy: InitialState, observations: &[bool]) -> Vec<Option<NotificationKind>> {
        let target = widget();
        let mut detector = ChangeDetector::new(std::slice::from_ref(&target), policy);
        observations
            .iter()
            .map(|&present| detector.observe(&target, present).alert)
            .collect()
    }

    #[test]
    fn test_transition_table() {
        use NotificationKind::*;
        use Presence::*;

        let cases = [
            (Unknown, true, Present, None),
            (Unknown, false, Absent, Some(Changed)),
            (Present, true, Present, None),
            (Present, false, Absent, Some(Changed)),
            (Absent, true, Present, Some(Restored)),
            (Absent, false, Absent, None),
        ];
        for (stored, observed, next, alert) in cases {
            let d = decide(stored, observed, InitialState::UnknownNotify);
            assert_eq!(d.next, next, "{stored:?} + {observed}");
            assert_eq!(d.alert, alert, "{stored:?} + {observed}");
            assert_eq!(d.previous, stored);
        }
    }

    #[test]
    fn test_silent_baseline_only_mutes_unknown_to_absent() {
        let d = decide(Presence::Unknown, false, InitialState::UnknownSilent);
        assert_eq!(d.next, Presence::Absent);
        assert_eq!(d.alert, None);

        // Every other row is policy independent.
        for stored in [Presence::Present, Presence::Absent] {
            for observed in [true, false] {
                assert_eq!(
                    decide(stored, observed, InitialState::UnknownSilent),
                    decide(stored, observed, InitialState::UnknownNotify)
                );
            }
        }
        assert_eq!(
            decide(Presence::Unknown, true, InitialState::UnknownSilent),
            decide(Presence::Unknown, true, InitialState::UnknownNotify)
        );
    }

    #[test]
    fn test_repeated_observation_is_silent() {
        for policy in [
            InitialState::Present,
            InitialState::UnknownNotify,
            InitialState::UnknownSilent,
        ] {
            let got = alerts(policy, &[false, false, false]);
            assert_eq!(got[1], None);
            assert_eq!(got[2], None);
            let got = alerts(policy, &[true, true]);
            assert_eq!(got, vec![None, None]);
        }
    }

    #[test]
    fn test_round_trip_changed_then_restored() {
        let got = alerts(InitialState::Present, &[true, false, true]);
        assert_eq!(
            got,
            vec![None, Some(NotificationKind::Changed), Some(NotificationKind::Restored)]
        );
    }

    #[test]
    fn test_optimistic_first_absence_notifies_changed() {
        let got = alerts(InitialState::Present, &[false]);
        assert_eq!(got, vec![Some(NotificationKind::Changed)]);
    }

    #[test]
    fn test_first_observation_policy() {
        assert_eq!(alerts(InitialState::UnknownNotify, &[true]), vec![None]);
        assert_eq!(
            alerts(InitialState::UnknownNotify, &[false]),
            vec![Some(NotificationKind::Changed)]
        );
    }

    #[test]
    fn test_policies_yield_different_alerts_for_missing_baseline() {
        use NotificationKind::*;

        // Marker missing from the start, then restored.
        let seq = [false, false, true];
        assert_eq!(alerts(InitialState::Present, &seq), vec![Some(Changed), None, Some(Restored)]);
        assert_eq!(
            alerts(InitialState::UnknownNotify, &seq),
            vec![Some(Changed), None, Some(Restored)]
        );
        assert_eq!(
            alerts(InitialState::UnknownSilent, &seq),
            vec![None, None, Some(Restored)]
        );

        // A present baseline behaves the same under every policy.
        let seq = [true, false];
        for policy in [
            InitialState::Present,
            InitialState::UnknownNotify,
            InitialState::UnknownSilent,
        ] {
            assert_eq!(alerts(policy, &seq), vec![None, Some(Changed)], "{policy:?}");
        }
    }

    #[test]
    fn test_alerts_alternate_for_any_sequence() {
        // Starting from a present baseline, alerts alternate and match the flips.
        let seq = [true, true, false, false, true, false, true, true, false];
        let got: Vec<_> = alerts(InitialState::Present, &seq)
            .into_iter()
            .flatten()
            .collect();
        let flips = seq.windows(2).filter(|w| w[0] != w[1]).count();
        assert_eq!(got.len(), flips);
        assert!(got.windows(2).all(|w| w[0] != w[1]));
        assert_eq!(got[0], NotificationKind::Changed);
    }

    #[test]
    fn test_state_committed() {
        let target = widget();
        let mut detector =
            ChangeDetector::new(std::slice::from_ref(&target), InitialState::UnknownSilent);
        assert_eq!(detector.policy(), InitialState::UnknownSilent);
        assert_eq!(detector.presence("Widget"), Presence::Unknown);
        detector.observe(&target, true);
        assert_eq!(detector.presence("Widget"), Presence::Present);
        detector.observe(&target, false);
        assert_eq!(detector.presence("Widget"), Presence::Absent);
        assert_eq!(detector.store().len(), 1);
    }
}
