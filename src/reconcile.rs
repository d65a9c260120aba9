//! Optimistic state reconciler
//!
//! A command's target state is written into the view before the backend
//! answers. The reconciler remembers exactly which leaves each pending command
//! touched and what they held before, so a failure restores those leaves and
//! nothing else.
//!
//! Per field: `Idle -> Applying -> {Confirmed | RolledBack} -> Idle`.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::view::EssStatus;
use crate::models::{FieldPath, FieldValue, ViewModel};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("A command is already in flight for {field}")]
    Busy { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Applying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Confirmed,
    RolledBack,
}

/// One optimistic leaf write
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Change {
    pub field: FieldPath,
    pub target: FieldValue,
}

impl Change {
    pub fn new(field: FieldPath, target: FieldValue) -> Self {
        Self { field, target }
    }

    /// Engine switch, running state and nominal frequency move together
    pub fn diesel_engine(on: bool) -> Vec<Change> {
        vec![
            Change::new(FieldPath::DieselEngineSwitch, FieldValue::Flag(on)),
            Change::new(FieldPath::DieselState, FieldValue::Code(u8::from(on))),
            Change::new(
                FieldPath::DieselFrequency,
                FieldValue::Number(if on { 50.0 } else { 0.0 }),
            ),
        ]
    }

    pub fn ess_power(on: bool) -> Vec<Change> {
        vec![
            Change::new(FieldPath::EssSwitch, FieldValue::Flag(on)),
            Change::new(FieldPath::EssStatus, FieldValue::Ess(EssStatus::from_switch(on))),
        ]
    }

    pub fn pcs_frequency(value: f64) -> Vec<Change> {
        vec![Change::new(FieldPath::PcsFrequency, FieldValue::Number(value))]
    }
}

/// Handle for one pending command; settle it exactly once
#[derive(Debug)]
#[must_use = "a ticket must be settled or its fields stay held"]
pub struct Ticket {
    id: u64,
    prior: Vec<(FieldPath, FieldValue)>,
}

impl Ticket {
    pub fn fields(&self) -> impl Iterator<Item = FieldPath> + '_ {
        self.prior.iter().map(|(field, _)| *field)
    }
}

#[derive(Debug, Default)]
pub struct Reconciler {
    next_id: u64,
    touched: BTreeMap<FieldPath, u64>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter `Applying` for every field in `changes` and write the targets
    pub fn begin(&mut self, view: &mut ViewModel, changes: &[Change]) -> Result<Ticket, ReconcileError> {
        if let Some(busy) = changes.iter().find(|c| self.touched.contains_key(&c.field)) {
            return Err(ReconcileError::Busy {
                field: busy.field.key().to_string(),
            });
        }

        self.next_id += 1;
        let id = self.next_id;

        let mut prior = Vec::with_capacity(changes.len());
        for change in changes {
            prior.push((change.field, view.get(change.field)));
            view.set(change.field, change.target);
            self.touched.insert(change.field, id);
        }

        Ok(Ticket { id, prior })
    }

    /// Resolve a ticket. On failure only the ticket's own fields are restored.
    pub fn settle(&mut self, view: &mut ViewModel, ticket: Ticket, success: bool) -> Outcome {
        self.touched.retain(|_, owner| *owner != ticket.id);

        if success {
            return Outcome::Confirmed;
        }

        for (field, value) in ticket.prior {
            view.set(field, value);
        }
        Outcome::RolledBack
    }

    pub fn phase(&self, field: FieldPath) -> Phase {
        if self.touched.contains_key(&field) {
            Phase::Applying
        } else {
            Phase::Idle
        }
    }

    /// Fields a poll must not overwrite right now
    pub fn held_fields(&self) -> impl Iterator<Item = &FieldPath> {
        self.touched.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_view() -> ViewModel {
        let mut view = ViewModel::default();
        view.diesel.status.frequency = 0.0;
        view.ess.pcs.frequency = 59.9;
        view.skysails.wind_speed = 8.0;
        view
    }

    #[test]
    fn test_rollback_restores_prior_view() {
        let mut reconciler = Reconciler::new();
        let mut view = sample_view();
        let before = view.clone();

        let ticket = reconciler
            .begin(&mut view, &Change::diesel_engine(true))
            .unwrap();
        assert!(view.diesel.engine_switch);
        assert_eq!(view.diesel.status.state, 1);
        assert_eq!(view.diesel.status.frequency, 50.0);
        assert_eq!(reconciler.phase(FieldPath::DieselEngineSwitch), Phase::Applying);

        let outcome = reconciler.settle(&mut view, ticket, false);

        assert_eq!(outcome, Outcome::RolledBack);
        assert_eq!(view, before);
        assert_eq!(reconciler.phase(FieldPath::DieselEngineSwitch), Phase::Idle);
    }

    #[test]
    fn test_success_keeps_target() {
        let mut reconciler = Reconciler::new();
        let mut view = sample_view();

        let ticket = reconciler.begin(&mut view, &Change::ess_power(true)).unwrap();
        let outcome = reconciler.settle(&mut view, ticket, true);

        assert_eq!(outcome, Outcome::Confirmed);
        assert!(view.ess.switch);
        assert_eq!(view.ess.status, EssStatus::Active);
        assert_eq!(reconciler.held_fields().count(), 0);
    }

    #[test]
    fn test_rollback_leaves_unrelated_updates() {
        let mut reconciler = Reconciler::new();
        let mut view = sample_view();

        let ticket = reconciler.begin(&mut view, &Change::ess_power(true)).unwrap();
        view.skysails.wind_speed = 11.5;
        view.ess.pcs.frequency = 59.95;

        reconciler.settle(&mut view, ticket, false);

        assert!(!view.ess.switch);
        assert_eq!(view.skysails.wind_speed, 11.5);
        assert_eq!(view.ess.pcs.frequency, 59.95);
    }

    #[test]
    fn test_overlapping_apply_rejected() {
        let mut reconciler = Reconciler::new();
        let mut view = sample_view();

        let first = reconciler
            .begin(&mut view, &Change::diesel_engine(true))
            .unwrap();
        let snapshot = view.clone();

        let err = reconciler
            .begin(&mut view, &Change::diesel_engine(false))
            .unwrap_err();
        assert_eq!(
            err,
            ReconcileError::Busy {
                field: "diesel_engineSwitch".to_string()
            }
        );
        assert_eq!(view, snapshot);

        // different subtree is independent
        let second = reconciler.begin(&mut view, &Change::ess_power(true)).unwrap();

        reconciler.settle(&mut view, first, true);
        assert_eq!(reconciler.phase(FieldPath::EssSwitch), Phase::Applying);
        reconciler.settle(&mut view, second, true);
        assert_eq!(reconciler.phase(FieldPath::EssSwitch), Phase::Idle);
    }
}
