//! Appointment status vocabulary and transition rules.
//!
//! This module is the single authority on which appointment states exist and
//! which transitions between them are legal. UI layers must not hard-code
//! their own status checks; they ask this module instead.
//!
//! Responsibilities:
//! - Define the fixed vocabulary of appointment states
//! - Provide the authoritative from-state → allowed-to-states table
//! - Provide display metadata (label, severity, advance flag) for any raw
//!   status string, including unrecognised ones
//!
//! Notes:
//! - Status transitions are requested fire-and-forget; callers report a
//!   failed request and leave local state unchanged.

use serde::{Deserialize, Serialize};

/// The lifecycle state of an appointment.
///
/// The forward clinical pipeline runs pending → confirmed → checked-in →
/// in-progress → waiting-for-results → in-treatment → back to in-progress →
/// completed. `NoShow`, `Cancelled` and `OnHold` are escapes reachable only
/// from specific earlier states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    /// Booked but not yet confirmed by the clinic.
    Pending,
    /// Confirmed by reception.
    Confirmed,
    /// Patient has arrived and checked in.
    CheckedIn,
    /// Visit paused at the chair; resumes to in-progress.
    OnHold,
    /// Clinician is actively examining or treating.
    InProgress,
    /// Patient sent to the lab/imaging; visit parked until results arrive.
    WaitingForResults,
    /// Patient transferred to a treatment room.
    InTreatment,
    /// Visit finished; the record is immutable from here on.
    Completed,
    /// Patient never arrived. Terminal.
    NoShow,
    /// Appointment cancelled before the visit. Terminal.
    Cancelled,
}

/// Display severity for a status, used by UI layers to pick a colour class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusSeverity {
    /// Neutral/informational (pending, on-hold).
    Neutral,
    /// Work is progressing normally.
    Active,
    /// Finished successfully.
    Success,
    /// Patient-attention state (waiting for results, in treatment).
    Attention,
    /// Terminal without completion (no-show, cancelled).
    Lapsed,
}

/// Display metadata for a status string.
///
/// Produced for *any* input via [`describe_status`]; unknown strings get a
/// fallback descriptor instead of an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusDescriptor {
    /// Human-readable label. Never empty.
    pub label: String,
    /// Colour/severity class for display.
    pub severity: StatusSeverity,
    /// Whether forward-advance actions are enabled from this state.
    pub advance_enabled: bool,
}

impl AppointmentStatus {
    /// Parses a raw status string from the server.
    ///
    /// Returns `None` for unrecognised strings; callers that only need
    /// display metadata should use [`describe_status`], which never fails.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "checked-in" => Some(Self::CheckedIn),
            "on-hold" => Some(Self::OnHold),
            "in-progress" => Some(Self::InProgress),
            "waiting-for-results" => Some(Self::WaitingForResults),
            "in-treatment" => Some(Self::InTreatment),
            "completed" => Some(Self::Completed),
            "no-show" => Some(Self::NoShow),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns the wire representation of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::CheckedIn => "checked-in",
            Self::OnHold => "on-hold",
            Self::InProgress => "in-progress",
            Self::WaitingForResults => "waiting-for-results",
            Self::InTreatment => "in-treatment",
            Self::Completed => "completed",
            Self::NoShow => "no-show",
            Self::Cancelled => "cancelled",
        }
    }

    /// The authoritative transition table.
    ///
    /// Returns every state legally reachable from `self` in one step. The
    /// table is the only place transition rules live; [`can_transition`] and
    /// the workflow controller both consult it.
    pub fn allowed_transitions(self) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled, NoShow],
            Confirmed => &[CheckedIn, Cancelled, NoShow],
            CheckedIn => &[InProgress, OnHold, NoShow],
            OnHold => &[InProgress],
            InProgress => &[WaitingForResults, InTreatment, Completed],
            WaitingForResults => &[InTreatment, InProgress],
            InTreatment => &[InProgress, Completed],
            Completed | NoShow | Cancelled => &[],
        }
    }

    /// Whether `self` is a terminal state.
    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Human-readable display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::CheckedIn => "Checked in",
            Self::OnHold => "On hold",
            Self::InProgress => "In progress",
            Self::WaitingForResults => "Waiting for results",
            Self::InTreatment => "In treatment",
            Self::Completed => "Completed",
            Self::NoShow => "No-show",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Display severity for this status.
    pub fn severity(self) -> StatusSeverity {
        match self {
            Self::Pending | Self::OnHold => StatusSeverity::Neutral,
            Self::Confirmed | Self::CheckedIn | Self::InProgress => StatusSeverity::Active,
            Self::WaitingForResults | Self::InTreatment => StatusSeverity::Attention,
            Self::Completed => StatusSeverity::Success,
            Self::NoShow | Self::Cancelled => StatusSeverity::Lapsed,
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks whether a one-step transition from `from` to `to` is legal.
pub fn can_transition(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    from.allowed_transitions().contains(&to)
}

/// Produces display metadata for any raw status string.
///
/// Known statuses get their canonical label, severity and advance flag.
/// Unknown strings get a fallback descriptor carrying the raw value so the
/// UI renders *something* rather than failing: the server vocabulary may grow
/// ahead of deployed clients.
pub fn describe_status(raw: &str) -> StatusDescriptor {
    match AppointmentStatus::parse(raw) {
        Some(status) => StatusDescriptor {
            label: status.label().to_owned(),
            severity: status.severity(),
            advance_enabled: !status.is_terminal(),
        },
        None => {
            let trimmed = raw.trim();
            let label = if trimmed.is_empty() {
                "Unknown status".to_owned()
            } else {
                format!("Unknown status ({trimmed})")
            };
            StatusDescriptor {
                label,
                severity: StatusSeverity::Neutral,
                advance_enabled: false,
            }
        }
    }
}
