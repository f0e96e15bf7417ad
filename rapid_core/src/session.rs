//! Session registry: the roster of emergencies tracked during a shift.
//!
//! Every operation is total over the id space. Commands that name an
//! unknown emergency, or that would repeat a completed action, are absorbed
//! as no-ops. Callers observe effects by re-reading the registry; mutating
//! operations also return whether anything changed.

use crate::{ActivationRequest, Emergency, EmergencyKind, EmergencyStatus};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Owns every emergency created during the shift, in activation order
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionRegistry {
    emergencies: Vec<Emergency>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new active emergency with the given checklist
    ///
    /// Always succeeds. Several active emergencies of the same kind may
    /// coexist.
    pub fn activate(&mut self, kind: EmergencyKind, required_actions: Vec<String>) -> Emergency {
        self.activate_with(ActivationRequest::new(kind, required_actions))
    }

    /// Create a new active emergency, including optional location and patient details
    pub fn activate_with(&mut self, request: ActivationRequest) -> Emergency {
        let emergency = Emergency {
            id: Uuid::new_v4(),
            kind: request.kind,
            started_at: Utc::now(),
            status: EmergencyStatus::Active,
            required_actions: request.required_actions,
            completed_actions: Vec::new(),
            location: request.location,
            patient: request.patient,
        };

        tracing::debug!("Activated {} emergency {}", emergency.kind, emergency.id);
        self.emergencies.push(emergency.clone());
        emergency
    }

    /// Mark an action as completed
    ///
    /// Any label is accepted, whether or not it appears in the checklist,
    /// and regardless of status. Returns `false` when the id is unknown or
    /// the label was already recorded.
    pub fn record_action_completed(&mut self, emergency_id: Uuid, label: &str) -> bool {
        let Some(emergency) = self.get_mut(emergency_id) else {
            tracing::debug!("Ignoring action '{}' for unknown emergency {}", label, emergency_id);
            return false;
        };

        if emergency.is_completed(label) {
            tracing::trace!("Action '{}' already recorded for {}", label, emergency_id);
            return false;
        }

        emergency.completed_actions.push(label.to_string());
        tracing::debug!("Recorded '{}' for emergency {}", label, emergency_id);
        true
    }

    /// Transition an active emergency to `Resolved`
    pub fn resolve(&mut self, emergency_id: Uuid) -> bool {
        self.finish(emergency_id, EmergencyStatus::Resolved)
    }

    /// Transition an active emergency to `Transferred`
    pub fn transfer(&mut self, emergency_id: Uuid) -> bool {
        self.finish(emergency_id, EmergencyStatus::Transferred)
    }

    fn finish(&mut self, emergency_id: Uuid, terminal: EmergencyStatus) -> bool {
        match self.get_mut(emergency_id) {
            Some(emergency) if emergency.is_active() => {
                emergency.status = terminal;
                tracing::debug!("Emergency {} is now {:?}", emergency_id, terminal);
                true
            }
            Some(emergency) => {
                tracing::debug!(
                    "Emergency {} already {:?}, ignoring {:?}",
                    emergency_id,
                    emergency.status,
                    terminal
                );
                false
            }
            None => false,
        }
    }

    /// Snapshot of the active emergencies, in activation order
    pub fn list_active(&self) -> Vec<Emergency> {
        self.emergencies
            .iter()
            .filter(|e| e.is_active())
            .cloned()
            .collect()
    }

    /// The earliest-activated emergency of `kind` that is still active
    pub fn find_active(&self, kind: EmergencyKind) -> Option<&Emergency> {
        self.emergencies
            .iter()
            .find(|e| e.kind == kind && e.is_active())
    }

    pub fn get(&self, emergency_id: Uuid) -> Option<&Emergency> {
        self.emergencies.iter().find(|e| e.id == emergency_id)
    }

    fn get_mut(&mut self, emergency_id: Uuid) -> Option<&mut Emergency> {
        self.emergencies.iter_mut().find(|e| e.id == emergency_id)
    }

    /// Every emergency of the shift, terminal ones included
    pub fn all(&self) -> &[Emergency] {
        &self.emergencies
    }

    pub fn len(&self) -> usize {
        self.emergencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emergencies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn checklist() -> Vec<String> {
        vec!["Call Code".into(), "Start CPR".into(), "Get Cart".into()]
    }

    #[test]
    fn test_activations_get_distinct_ids() {
        let mut registry = SessionRegistry::new();
        let ids: HashSet<Uuid> = (0..20)
            .map(|_| registry.activate(EmergencyKind::CodeBlue, checklist()))
            .inspect(|e| assert_eq!(e.status, EmergencyStatus::Active))
            .map(|e| e.id)
            .collect();

        assert_eq!(ids.len(), 20);
        // Same-kind activations are all kept active
        assert_eq!(registry.list_active().len(), 20);
    }

    #[test]
    fn test_record_action_is_idempotent() {
        let mut registry = SessionRegistry::new();
        let emergency = registry.activate(EmergencyKind::CodeBlue, checklist());

        assert!(registry.record_action_completed(emergency.id, "Start CPR"));
        assert!(!registry.record_action_completed(emergency.id, "Start CPR"));

        let stored = registry.get(emergency.id).unwrap();
        assert_eq!(stored.completed_actions, vec!["Start CPR".to_string()]);
    }

    #[test]
    fn test_record_action_accepts_unlisted_labels() {
        let mut registry = SessionRegistry::new();
        let emergency = registry.activate(EmergencyKind::RapidResponse, checklist());

        assert!(registry.record_action_completed(emergency.id, "Family notified"));

        let stored = registry.get(emergency.id).unwrap();
        assert!(stored.is_completed("Family notified"));
        assert_eq!(
            stored.outstanding_actions(),
            vec!["Call Code", "Start CPR", "Get Cart"]
        );
    }

    #[test]
    fn test_unknown_ids_are_no_ops() {
        let mut registry = SessionRegistry::new();
        registry.activate(EmergencyKind::CodeStroke, checklist());
        let before = registry.all().to_vec();

        let missing = Uuid::new_v4();
        assert!(!registry.record_action_completed(missing, "Start CPR"));
        assert!(!registry.resolve(missing));
        assert!(!registry.transfer(missing));

        assert_eq!(registry.all(), before.as_slice());
    }

    #[test]
    fn test_resolve_is_one_way() {
        let mut registry = SessionRegistry::new();
        let emergency = registry.activate(EmergencyKind::CodeBlue, checklist());

        assert!(registry.resolve(emergency.id));
        assert!(!registry.resolve(emergency.id));
        assert!(!registry.transfer(emergency.id));

        // Completions are still recorded after resolution
        assert!(registry.record_action_completed(emergency.id, "Get Cart"));

        let stored = registry.get(emergency.id).unwrap();
        assert_eq!(stored.status, EmergencyStatus::Resolved);
        assert!(stored.is_completed("Get Cart"));
        assert!(registry.list_active().is_empty());
    }

    #[test]
    fn test_transfer_marks_terminal() {
        let mut registry = SessionRegistry::new();
        let emergency = registry.activate(EmergencyKind::CodeWhite, vec![]);

        assert!(registry.transfer(emergency.id));
        assert!(!registry.resolve(emergency.id));
        assert_eq!(
            registry.get(emergency.id).unwrap().status,
            EmergencyStatus::Transferred
        );
    }

    #[test]
    fn test_list_active_preserves_order_and_is_a_copy() {
        let mut registry = SessionRegistry::new();
        let first = registry.activate(EmergencyKind::CodeBlue, checklist());
        let second = registry.activate(EmergencyKind::CodeStroke, vec![]);
        let third = registry.activate(EmergencyKind::RapidResponse, vec![]);
        registry.resolve(second.id);

        let mut active = registry.list_active();
        let ids: Vec<Uuid> = active.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![first.id, third.id]);

        active[0].completed_actions.push("Tampered".into());
        assert!(registry.get(first.id).unwrap().completed_actions.is_empty());
    }

    #[test]
    fn test_find_active_returns_earliest_of_kind() {
        let mut registry = SessionRegistry::new();
        let first = registry.activate(EmergencyKind::CodeBlue, checklist());
        let second = registry.activate(EmergencyKind::CodeBlue, checklist());

        assert_eq!(registry.find_active(EmergencyKind::CodeBlue).unwrap().id, first.id);

        registry.resolve(first.id);
        assert_eq!(registry.find_active(EmergencyKind::CodeBlue).unwrap().id, second.id);
        assert!(registry.find_active(EmergencyKind::CodeStroke).is_none());
    }

    #[test]
    fn test_activate_with_patient_details() {
        let mut registry = SessionRegistry::new();
        let request = ActivationRequest {
            location: Some("4 West, Bed 12".into()),
            patient: Some(crate::PatientInfo {
                name: None,
                mrn: Some("00123456".into()),
                age: Some(67),
            }),
            ..ActivationRequest::new(EmergencyKind::CodeBlue, checklist())
        };

        let emergency = registry.activate_with(request);
        assert_eq!(emergency.location.as_deref(), Some("4 West, Bed 12"));
        assert_eq!(emergency.patient.unwrap().age, Some(67));
    }
}
