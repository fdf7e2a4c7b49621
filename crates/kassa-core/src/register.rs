//! # Register Navigation
//!
//! The cashier's department → table → check flow as an explicit state
//! machine, plus the per-shift context that holds the current aggregates.
//!
//! ## Views
//! ```text
//!                 DepartmentSelected
//!  ┌──────────────────────┐ ─────────► ┌────────────────────┐
//!  │ SelectingDepartment  │            │  SelectingTable    │◄──┐ DepartmentSelected
//!  └──────────────────────┘ ◄───────── └─────────┬──────────┘───┘ (switch tab)
//!                              Back              │ ▲
//!                                  TableSelected │ │ Back / CheckClosed
//!                                                ▼ │
//!                                      ┌────────────────────┐
//!                                      │   EditingCheck     │◄──┐ CheckLoaded
//!                                      └────────────────────┘───┘
//! ```
//!
//! [`transition`] never performs I/O; it returns the [`RegisterCommand`]
//! the caller must run. Results come back as whole aggregates and are
//! folded in with [`RegisterContext::fold_check`] / [`RegisterContext::fold_shift`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::types::{Check, Shift};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum RegisterView {
    SelectingDepartment,
    SelectingTable {
        department_id: String,
    },
    EditingCheck {
        department_id: String,
        table_id: String,
        /// Unknown until open/resume returns.
        check_id: Option<String>,
    },
}

impl RegisterView {
    fn name(&self) -> &'static str {
        match self {
            RegisterView::SelectingDepartment => "selecting department",
            RegisterView::SelectingTable { .. } => "selecting table",
            RegisterView::EditingCheck { .. } => "editing check",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegisterEvent {
    DepartmentSelected { department_id: String },
    TableSelected { table_id: String, table_name: String },
    CheckLoaded { check_id: String },
    /// The edited check was paid or voided.
    CheckClosed,
    Back,
}

impl RegisterEvent {
    fn name(&self) -> &'static str {
        match self {
            RegisterEvent::DepartmentSelected { .. } => "department selected",
            RegisterEvent::TableSelected { .. } => "table selected",
            RegisterEvent::CheckLoaded { .. } => "check loaded",
            RegisterEvent::CheckClosed => "check closed",
            RegisterEvent::Back => "back",
        }
    }
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RegisterCommand {
    None,
    FetchDepartments,
    FetchTables {
        department_id: String,
    },
    OpenOrResumeCheck {
        department_id: String,
        table_id: String,
        table_name: String,
    },
}

/// Computes the next view and the command to run.
pub fn transition(view: &RegisterView, event: RegisterEvent) -> CoreResult<(RegisterView, RegisterCommand)> {
    use RegisterEvent as E;
    use RegisterView as V;

    let next = match (view, event) {
        (V::SelectingDepartment, E::DepartmentSelected { department_id })
        | (V::SelectingTable { .. }, E::DepartmentSelected { department_id }) => (
            V::SelectingTable {
                department_id: department_id.clone(),
            },
            RegisterCommand::FetchTables { department_id },
        ),

        (V::SelectingTable { department_id }, E::TableSelected { table_id, table_name }) => (
            V::EditingCheck {
                department_id: department_id.clone(),
                table_id: table_id.clone(),
                check_id: None,
            },
            RegisterCommand::OpenOrResumeCheck {
                department_id: department_id.clone(),
                table_id,
                table_name,
            },
        ),

        (V::SelectingTable { .. }, E::Back) => (V::SelectingDepartment, RegisterCommand::FetchDepartments),

        (
            V::EditingCheck {
                department_id,
                table_id,
                ..
            },
            E::CheckLoaded { check_id },
        ) => (
            V::EditingCheck {
                department_id: department_id.clone(),
                table_id: table_id.clone(),
                check_id: Some(check_id),
            },
            RegisterCommand::None,
        ),

        (V::EditingCheck { department_id, .. }, E::Back | E::CheckClosed) => (
            V::SelectingTable {
                department_id: department_id.clone(),
            },
            RegisterCommand::FetchTables {
                department_id: department_id.clone(),
            },
        ),

        (view, event) => {
            return Err(CoreError::InvalidTransition {
                view: view.name().to_string(),
                event: event.name().to_string(),
            })
        }
    };

    Ok(next)
}

// =============================================================================
// Register Context
// =============================================================================

/// Everything the register screen holds for one shift.
///
/// Created from an open shift and dropped when the shift closes.
#[derive(Debug, Clone)]
pub struct RegisterContext {
    shift: Shift,
    view: RegisterView,
    current_check: Option<Check>,
}

impl RegisterContext {
    /// Starts a context on an open shift; the first command fetches departments.
    pub fn start(shift: Shift) -> CoreResult<(Self, RegisterCommand)> {
        if !shift.is_open() {
            return Err(CoreError::ShiftNotOpen { shift_id: shift.id });
        }
        let ctx = Self {
            shift,
            view: RegisterView::SelectingDepartment,
            current_check: None,
        };
        Ok((ctx, RegisterCommand::FetchDepartments))
    }

    pub fn shift(&self) -> &Shift {
        &self.shift
    }

    pub fn active_staff(&self) -> &[String] {
        &self.shift.active_staff_ids
    }

    pub fn view(&self) -> &RegisterView {
        &self.view
    }

    pub fn current_check(&self) -> Option<&Check> {
        self.current_check.as_ref()
    }

    pub fn dispatch(&mut self, event: RegisterEvent) -> CoreResult<RegisterCommand> {
        let leaving_check = matches!(event, RegisterEvent::Back | RegisterEvent::CheckClosed);
        let (view, command) = transition(&self.view, event)?;
        if leaving_check {
            self.current_check = None;
        }
        debug!(from = self.view.name(), to = view.name(), "Register transition");
        self.view = view;
        Ok(command)
    }

    /// Folds a check returned by any mutating call.
    ///
    /// A result for a table the cashier has already left is discarded.
    /// A check that came back paid or void ends the editing view.
    pub fn fold_check(&mut self, check: Check) -> CoreResult<RegisterCommand> {
        let RegisterView::EditingCheck { table_id, check_id, .. } = &self.view else {
            debug!(check_id = %check.id, "Discarding check result outside editing view");
            return Ok(RegisterCommand::None);
        };
        if *table_id != check.table_id || check_id.as_ref().is_some_and(|id| *id != check.id) {
            debug!(check_id = %check.id, "Discarding check result for another table");
            return Ok(RegisterCommand::None);
        }

        if !check.is_open() {
            return self.dispatch(RegisterEvent::CheckClosed);
        }

        let loaded = check_id.is_none();
        let id = check.id.clone();
        self.current_check = Some(check);
        if loaded {
            self.dispatch(RegisterEvent::CheckLoaded { check_id: id })
        } else {
            Ok(RegisterCommand::None)
        }
    }

    /// Folds a shift returned by any mutating call. Returns `None` once
    /// the shift is closed, tearing the context down.
    pub fn fold_shift(mut self, shift: Shift) -> Option<Self> {
        if shift.id != self.shift.id {
            return Some(self);
        }
        if !shift.is_open() {
            return None;
        }
        self.shift = shift;
        Some(self)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{CheckLedger, OpenCheckRequest};
    use crate::shift::{CloseShiftRequest, OpenShiftRequest, ShiftManager};
    use crate::Money;
    use chrono::Utc;

    fn open_shift() -> Shift {
        ShiftManager::default()
            .open_shift(
                None,
                OpenShiftRequest {
                    start_balance: Money::zero(),
                    cashier_id: "staff-1".into(),
                    cashier_name: "Olena".into(),
                },
                1,
                Utc::now(),
            )
            .unwrap()
    }

    fn check_for(shift: &Shift, table_id: &str) -> Check {
        CheckLedger::default()
            .open_check(
                None,
                shift,
                OpenCheckRequest {
                    table_id: table_id.into(),
                    table_name: table_id.into(),
                    department_id: "hall".into(),
                    shift_id: shift.id.clone(),
                    guests_count: 1,
                    waiter_id: None,
                    waiter_name: None,
                },
                Utc::now(),
            )
            .unwrap()
            .into_check()
    }

    #[test]
    fn test_happy_path_commands() {
        let (view, cmd) = transition(
            &RegisterView::SelectingDepartment,
            RegisterEvent::DepartmentSelected {
                department_id: "hall".into(),
            },
        )
        .unwrap();
        assert_eq!(cmd, RegisterCommand::FetchTables { department_id: "hall".into() });

        let (view, cmd) = transition(
            &view,
            RegisterEvent::TableSelected {
                table_id: "t-1".into(),
                table_name: "Table 1".into(),
            },
        )
        .unwrap();
        assert!(matches!(cmd, RegisterCommand::OpenOrResumeCheck { ref table_id, .. } if table_id == "t-1"));

        let (view, _) = transition(&view, RegisterEvent::Back).unwrap();
        assert_eq!(view, RegisterView::SelectingTable { department_id: "hall".into() });
    }

    #[test]
    fn test_invalid_transition() {
        let err = transition(
            &RegisterView::SelectingDepartment,
            RegisterEvent::TableSelected {
                table_id: "t-1".into(),
                table_name: "Table 1".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_context_folds_check_and_discards_stale_results() {
        let shift = open_shift();
        let (mut ctx, first) = RegisterContext::start(shift.clone()).unwrap();
        assert_eq!(first, RegisterCommand::FetchDepartments);

        ctx.dispatch(RegisterEvent::DepartmentSelected { department_id: "hall".into() })
            .unwrap();
        ctx.dispatch(RegisterEvent::TableSelected {
            table_id: "t-1".into(),
            table_name: "Table 1".into(),
        })
        .unwrap();

        // a late result for another table is ignored
        ctx.fold_check(check_for(&shift, "t-9")).unwrap();
        assert!(ctx.current_check().is_none());

        let check = check_for(&shift, "t-1");
        ctx.fold_check(check.clone()).unwrap();
        assert_eq!(ctx.current_check().map(|c| c.id.clone()), Some(check.id.clone()));
        assert!(matches!(
            ctx.view(),
            RegisterView::EditingCheck { check_id: Some(id), .. } if *id == check.id
        ));

        let voided = CheckLedger::default().void_check(check, Utc::now()).unwrap();
        let cmd = ctx.fold_check(voided).unwrap();
        assert_eq!(cmd, RegisterCommand::FetchTables { department_id: "hall".into() });
        assert!(ctx.current_check().is_none());
    }

    #[test]
    fn test_context_torn_down_on_close() {
        let manager = ShiftManager::default();
        let shift = open_shift();
        let (ctx, _) = RegisterContext::start(shift.clone()).unwrap();

        let shift = manager.update_active_staff(shift, vec!["staff-1".into(), "staff-2".into()]).unwrap();
        let ctx = ctx.fold_shift(shift.clone()).unwrap();
        assert_eq!(ctx.active_staff().len(), 2);

        let closed = manager
            .close_shift(shift, CloseShiftRequest::default(), Money::zero(), Utc::now())
            .unwrap();
        assert!(ctx.fold_shift(closed).is_none());
    }
}
