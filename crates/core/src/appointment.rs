//! Appointment snapshots and stage-patch bodies.
//!
//! The server owns the appointment record; Chairside reads full snapshots
//! (`GET /doctor/appointments/:id`) and writes stage-specific partial updates
//! (`PATCH /doctor/appointments/:id`). Fields that a patch does not touch are
//! omitted from the JSON body entirely, never sent as `null`.
//!
//! The status field stays a raw string on the snapshot so that vocabulary
//! added server-side does not break deployed clients; use
//! [`Appointment::status`] or [`crate::status::describe_status`] to interpret
//! it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::prescription::PrescriptionEntry;
use crate::status::AppointmentStatus;

/// Follow-up visit category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FollowUpKind {
    /// Routine re-examination of the treated area.
    ReExamination,
    /// Continuation of a multi-visit treatment plan.
    TreatmentContinuation,
    /// Anything else; details go in the instructions.
    Other,
}

/// The follow-up plan captured at the end of a visit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpPlan {
    /// Scheduled follow-up date.
    pub date: NaiveDate,
    /// Follow-up category, when the clinician picked one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FollowUpKind>,
    /// Instructions for the patient between now and the follow-up.
    pub instructions: String,
    /// Warning signs that should bring the patient back early.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<String>,
}

/// A full appointment snapshot as returned by the server.
///
/// Clinical fields accumulate across the five workflow stages; absent fields
/// mean the corresponding stage has not been saved yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<Uuid>,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,

    /// Raw status string; may name a state this client does not know.
    pub status: String,

    // Stage 0 — clinical examination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chief_complaint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oral_examination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occlusion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_findings: Option<String>,

    // Stage 1 — lab/imaging test selection.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_service_ids: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_instructions: Option<String>,

    // Stage 2 — diagnosis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_result_narrative: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub result_image_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_diagnosis: Option<String>,

    // Stage 3 — treatment & services.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub treatment_service_ids: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_care_instructions: Option<String>,

    // Stage 4 — prescription & follow-up.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prescriptions: Vec<PrescriptionEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<FollowUpPlan>,
}

impl Appointment {
    /// Parses the raw status string, if this client recognises it.
    pub fn status(&self) -> Option<AppointmentStatus> {
        AppointmentStatus::parse(&self.status)
    }

    /// Whether the record is immutable (completed or otherwise terminal).
    pub fn is_closed(&self) -> bool {
        self.status().is_some_and(AppointmentStatus::is_terminal)
    }
}

/// Partial-update body for `PATCH /doctor/appointments/:id`.
///
/// Every field is optional; only fields the current stage touches are
/// serialised. `status` rides along when the save also transitions the
/// appointment.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chief_complaint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oral_examination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occlusion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_findings: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_service_ids: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_instructions: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_result_narrative: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_image_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_diagnosis: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment_service_ids: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_care_instructions: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescriptions: Option<Vec<PrescriptionEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<FollowUpPlan>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_snapshot_json() -> serde_json::Value {
        serde_json::json!({
            "id": "7f4c2e9d-4b0a-4f3a-9a2c-0e9a6b5d1c88",
            "patientId": "a4f91c6d-3b2e-4c5f-9d7a-1e8b6c0a9f12",
            "doctorId": "2b1f0a3c-5d4e-4f6a-8b9c-0d1e2f3a4b5c",
            "scheduledStart": "2026-03-02T08:30:00Z",
            "scheduledEnd": "2026-03-02T09:00:00Z",
            "status": "checked-in"
        })
    }

    #[test]
    fn deserializes_minimal_snapshot_with_defaults() {
        let appointment: Appointment =
            serde_json::from_value(minimal_snapshot_json()).expect("minimal snapshot should parse");

        assert_eq!(appointment.status(), Some(AppointmentStatus::CheckedIn));
        assert!(appointment.chief_complaint.is_none());
        assert!(appointment.test_service_ids.is_empty());
        assert!(appointment.prescriptions.is_empty());
        assert!(!appointment.is_closed());
    }

    #[test]
    fn preserves_unrecognised_status_strings() {
        let mut json = minimal_snapshot_json();
        json["status"] = serde_json::json!("triaged");

        let appointment: Appointment =
            serde_json::from_value(json).expect("unknown status should not fail parsing");
        assert_eq!(appointment.status, "triaged");
        assert_eq!(appointment.status(), None);
        assert!(!appointment.is_closed());
    }

    #[test]
    fn completed_snapshot_is_closed() {
        let mut json = minimal_snapshot_json();
        json["status"] = serde_json::json!("completed");

        let appointment: Appointment = serde_json::from_value(json).expect("snapshot should parse");
        assert!(appointment.is_closed());
    }

    #[test]
    fn stage_patch_omits_untouched_fields() {
        let patch = StagePatch {
            chief_complaint: Some("Đau răng hàm dưới".to_owned()),
            oral_examination: Some("Cavity on tooth 36".to_owned()),
            status: Some(AppointmentStatus::InProgress),
            ..StagePatch::default()
        };

        let body = serde_json::to_value(&patch).expect("serialize patch");
        let object = body.as_object().expect("patch should be a JSON object");
        assert_eq!(object.len(), 3, "only touched fields should be present");
        assert_eq!(object["status"], "in-progress");
        assert_eq!(object["chiefComplaint"], "Đau răng hàm dưới");
        assert!(!object.contains_key("finalDiagnosis"));
        assert!(!object.contains_key("prescriptions"));
    }

    #[test]
    fn follow_up_plan_round_trips() {
        let plan = FollowUpPlan {
            date: NaiveDate::from_ymd_opt(2026, 3, 16).expect("valid date"),
            kind: Some(FollowUpKind::ReExamination),
            instructions: "Return for suture removal".to_owned(),
            warnings: None,
        };

        let json = serde_json::to_value(&plan).expect("serialize plan");
        assert_eq!(json["kind"], "re-examination");
        assert_eq!(json["date"], "2026-03-16");

        let back: FollowUpPlan = serde_json::from_value(json).expect("deserialize plan");
        assert_eq!(back, plan);
    }
}
