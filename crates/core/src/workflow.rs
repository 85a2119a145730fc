//! The five-stage clinical visit workflow.
//!
//! A clinician walks one appointment through clinical examination, test
//! selection, diagnosis, treatment, and prescription/follow-up. Each stage
//! validates locally, persists through a single `PATCH`, and only then
//! advances. Backward navigation to any visited stage is free (read-only
//! review); forward movement happens exclusively by completing the current
//! stage.
//!
//! Responsibilities:
//! - Per-stage required-field validation before any network call
//! - One persistence call per stage save; on failure the controller stays on
//!   the current stage with the form state intact
//! - Status transitions requested alongside the stage fields, validated
//!   against the central transition table
//! - Result-image upload/removal with the persisted URL list as truth
//! - The cross-stage completeness gate at final submission
//! - Resuming from a server snapshot after a reload

use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use crate::appointment::{Appointment, FollowUpKind, FollowUpPlan, StagePatch};
use crate::backend::{BackendError, ClinicalBackend, FileBackend};
use crate::prescription::PrescriptionEntry;
use crate::status::{can_transition, AppointmentStatus};

/// Upper bound on uploaded result images per visit.
pub const MAX_RESULT_IMAGES: usize = 8;

/// One field-level validation problem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldViolation {
    /// Display label of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub problem: String,
}

impl FieldViolation {
    pub fn required(field: &str) -> Self {
        Self {
            field: field.to_owned(),
            problem: "is required".to_owned(),
        }
    }

    pub fn invalid(field: &str, problem: &str) -> Self {
        Self {
            field: field.to_owned(),
            problem: problem.to_owned(),
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.field, self.problem)
    }
}

fn list_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The five ordered stages of a visit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum VisitStage {
    ClinicalExamination,
    TestSelection,
    Diagnosis,
    Treatment,
    Prescription,
}

impl VisitStage {
    pub fn title(self) -> &'static str {
        match self {
            Self::ClinicalExamination => "Clinical Examination",
            Self::TestSelection => "Test Selection",
            Self::Diagnosis => "Diagnosis",
            Self::Treatment => "Treatment & Services",
            Self::Prescription => "Prescription & Follow-up",
        }
    }
}

impl std::fmt::Display for VisitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// Errors from workflow operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The current stage's form failed local validation. No network call was
    /// made.
    #[error("validation failed: {}", list_violations(.0))]
    Validation(Vec<FieldViolation>),
    /// Forward navigation is only possible by completing the current stage.
    #[error("cannot jump ahead to {target}; complete {current} first")]
    ForwardJump {
        current: VisitStage,
        target: VisitStage,
    },
    /// A save action was invoked for a stage other than the current one.
    #[error("the {action_stage} form cannot be saved while on {current}")]
    StageMismatch {
        action_stage: VisitStage,
        current: VisitStage,
    },
    /// A save action was invoked while reviewing an already-completed stage.
    #[error("{stage} has already been completed and is open for review only")]
    ReadOnlyReview { stage: VisitStage },
    /// The visit was completed or transferred out; no further edits.
    #[error("the visit is closed and can no longer be modified")]
    VisitClosed,
    /// The requested status change is not in the transition table.
    #[error("illegal status transition: {from} → {to}")]
    IllegalTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    /// The per-visit result image limit was reached.
    #[error("the limit of {MAX_RESULT_IMAGES} result images has been reached")]
    ImageLimitReached,
    /// The referenced result image is not on the appointment.
    #[error("no such result image: {0}")]
    UnknownImage(String),
    /// The final submission gate found required clinical fields missing.
    #[error("missing required clinical fields: {}", .0.join(", "))]
    IncompleteRecord(Vec<String>),
    /// There is no prescription at the given position.
    #[error("no prescription entry at position {0}")]
    UnknownPrescription(usize),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;

/// Stage 0 input: the clinical examination.
#[derive(Clone, Debug, Default)]
pub struct ClinicalExamForm {
    pub chief_complaint: String,
    pub medical_history: Option<String>,
    pub oral_examination: String,
    pub occlusion: Option<String>,
    pub other_findings: Option<String>,
}

impl ClinicalExamForm {
    fn validate(&self) -> Result<(), Vec<FieldViolation>> {
        let mut violations = Vec::new();
        if self.chief_complaint.trim().is_empty() {
            violations.push(FieldViolation::required("Chief complaint"));
        }
        if self.oral_examination.trim().is_empty() {
            violations.push(FieldViolation::required("Oral examination"));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Stage 1 input: lab/imaging test selection.
#[derive(Clone, Debug, Default)]
pub struct TestSelectionForm {
    pub test_service_ids: Vec<Uuid>,
    pub instructions: Option<String>,
}

impl TestSelectionForm {
    fn validate(&self) -> Result<(), Vec<FieldViolation>> {
        if self.test_service_ids.is_empty() {
            Err(vec![FieldViolation::invalid(
                "Test selection",
                "must include at least one test",
            )])
        } else {
            Ok(())
        }
    }
}

/// Stage 2 input: test results and the final diagnosis. Result images are
/// managed separately through the upload/remove operations.
#[derive(Clone, Debug, Default)]
pub struct DiagnosisForm {
    pub test_result_narrative: Option<String>,
    pub final_diagnosis: String,
}

impl DiagnosisForm {
    fn validate(&self) -> Result<(), Vec<FieldViolation>> {
        if self.final_diagnosis.trim().is_empty() {
            Err(vec![FieldViolation::required("Final diagnosis")])
        } else {
            Ok(())
        }
    }
}

/// Stage 3 input: treatment services and home-care instructions.
#[derive(Clone, Debug, Default)]
pub struct TreatmentForm {
    pub treatment_service_ids: Vec<Uuid>,
    pub treatment_notes: Option<String>,
    pub home_care_instructions: String,
}

impl TreatmentForm {
    fn validate(&self) -> Result<(), Vec<FieldViolation>> {
        let mut violations = Vec::new();
        if self.treatment_service_ids.is_empty() {
            violations.push(FieldViolation::invalid(
                "Treatment services",
                "must include at least one service",
            ));
        }
        if self.home_care_instructions.trim().is_empty() {
            violations.push(FieldViolation::required("Home-care instructions"));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Stage 4 input: the follow-up plan. Prescriptions are managed on the
/// controller and ride along at final submission.
#[derive(Clone, Debug)]
pub struct FollowUpForm {
    pub date: NaiveDate,
    pub kind: Option<FollowUpKind>,
    pub instructions: String,
    pub warnings: Option<String>,
}

impl FollowUpForm {
    fn validate(&self, today: NaiveDate) -> Result<(), Vec<FieldViolation>> {
        let mut violations = Vec::new();
        if self.date < today {
            violations.push(FieldViolation::invalid(
                "Follow-up date",
                "must not be in the past",
            ));
        }
        if self.instructions.trim().is_empty() {
            violations.push(FieldViolation::required("Follow-up instructions"));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Controller walking one appointment through the five visit stages.
///
/// Construct with [`VisitWorkflow::open`] (fetches the snapshot) or
/// [`VisitWorkflow::resume`] (from a snapshot already in hand); both infer
/// the correct stage, so a page reload lands exactly where the clinician
/// left off.
pub struct VisitWorkflow {
    clinical: Arc<dyn ClinicalBackend>,
    files: Arc<dyn FileBackend>,
    appointment: Appointment,
    stage: VisitStage,
    furthest: VisitStage,
    prescriptions: Vec<PrescriptionEntry>,
    exited: bool,
}

impl VisitWorkflow {
    /// Fetches the appointment snapshot and resumes from it.
    pub async fn open(
        clinical: Arc<dyn ClinicalBackend>,
        files: Arc<dyn FileBackend>,
        appointment_id: Uuid,
    ) -> WorkflowResult<Self> {
        let snapshot = clinical.fetch_appointment(appointment_id).await?;
        Ok(Self::resume(clinical, files, snapshot))
    }

    /// Rebuilds the controller from a server snapshot.
    ///
    /// The first incomplete stage becomes both the current stage and the
    /// edit frontier; a closed appointment opens in review-only mode at the
    /// last stage.
    pub fn resume(
        clinical: Arc<dyn ClinicalBackend>,
        files: Arc<dyn FileBackend>,
        snapshot: Appointment,
    ) -> Self {
        let exited = snapshot.is_closed();
        let stage = if exited {
            VisitStage::Prescription
        } else {
            infer_stage(&snapshot)
        };
        let prescriptions = snapshot.prescriptions.clone();
        tracing::debug!(appointment = %snapshot.id, ?stage, "resuming visit workflow");
        Self {
            clinical,
            files,
            appointment: snapshot,
            stage,
            furthest: stage,
            prescriptions,
            exited,
        }
    }

    pub fn appointment(&self) -> &Appointment {
        &self.appointment
    }

    /// The stage currently shown.
    pub fn stage(&self) -> VisitStage {
        self.stage
    }

    /// The edit frontier: the furthest stage reached so far.
    pub fn furthest_stage(&self) -> VisitStage {
        self.furthest
    }

    /// Whether the workflow has been exited (transfer or completion).
    pub fn is_exited(&self) -> bool {
        self.exited
    }

    /// Whether the controller is showing an already-completed stage.
    pub fn in_review(&self) -> bool {
        self.stage < self.furthest
    }

    /// Navigates to a stage.
    ///
    /// Any visited stage can be revisited; stages beyond the edit frontier
    /// are rejected — forward movement happens only through stage saves.
    pub fn go_to(&mut self, target: VisitStage) -> WorkflowResult<()> {
        if target > self.furthest {
            tracing::warn!(?target, current = ?self.stage, "rejected forward jump");
            return Err(WorkflowError::ForwardJump {
                current: self.stage,
                target,
            });
        }
        self.stage = target;
        Ok(())
    }

    /// Saves the clinical examination, moves the appointment to
    /// `in-progress`, and advances to test selection.
    pub async fn save_clinical_exam(&mut self, form: &ClinicalExamForm) -> WorkflowResult<()> {
        self.ensure_editable(VisitStage::ClinicalExamination)?;
        form.validate().map_err(WorkflowError::Validation)?;

        let status = self.stage_transition(AppointmentStatus::InProgress)?;
        let patch = StagePatch {
            chief_complaint: Some(form.chief_complaint.trim().to_owned()),
            medical_history: trimmed(&form.medical_history),
            oral_examination: Some(form.oral_examination.trim().to_owned()),
            occlusion: trimmed(&form.occlusion),
            other_findings: trimmed(&form.other_findings),
            status,
            ..StagePatch::default()
        };
        self.persist(patch).await?;
        self.advance(VisitStage::TestSelection);
        Ok(())
    }

    /// Saves the test selection and advances to diagnosis without touching
    /// the appointment status.
    pub async fn save_test_selection(&mut self, form: &TestSelectionForm) -> WorkflowResult<()> {
        self.ensure_editable(VisitStage::TestSelection)?;
        form.validate().map_err(WorkflowError::Validation)?;

        let patch = StagePatch {
            test_service_ids: Some(form.test_service_ids.clone()),
            test_instructions: trimmed(&form.instructions),
            ..StagePatch::default()
        };
        self.persist(patch).await?;
        self.advance(VisitStage::Diagnosis);
        Ok(())
    }

    /// Saves the test selection, parks the appointment at
    /// `waiting-for-results`, and exits the workflow so the clinician can
    /// take another patient.
    pub async fn transfer_to_testing(&mut self, form: &TestSelectionForm) -> WorkflowResult<()> {
        self.ensure_editable(VisitStage::TestSelection)?;
        form.validate().map_err(WorkflowError::Validation)?;

        let status = self.stage_transition(AppointmentStatus::WaitingForResults)?;
        let patch = StagePatch {
            test_service_ids: Some(form.test_service_ids.clone()),
            test_instructions: trimmed(&form.instructions),
            status,
            ..StagePatch::default()
        };
        self.persist(patch).await?;
        tracing::info!(appointment = %self.appointment.id, "visit transferred to testing");
        self.exited = true;
        Ok(())
    }

    /// Uploads one result image and appends it to the persisted URL list.
    ///
    /// The upload and the list rewrite are two independent round trips, in
    /// that order; a failed rewrite leaves the uploaded file orphaned
    /// server-side rather than the list pointing at a missing file.
    pub async fn upload_result_image(
        &mut self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> WorkflowResult<String> {
        self.ensure_editable(VisitStage::Diagnosis)?;
        if self.appointment.result_image_urls.len() >= MAX_RESULT_IMAGES {
            return Err(WorkflowError::ImageLimitReached);
        }

        let url = self
            .files
            .upload_result_image(self.appointment.id, filename, bytes)
            .await?;

        let mut urls = self.appointment.result_image_urls.clone();
        urls.push(url.clone());
        let patch = StagePatch {
            result_image_urls: Some(urls),
            ..StagePatch::default()
        };
        self.persist(patch).await?;
        Ok(url)
    }

    /// Removes a result image: deletes it server-side, then rewrites the
    /// persisted URL list without it.
    pub async fn remove_result_image(&mut self, url: &str) -> WorkflowResult<()> {
        self.ensure_editable(VisitStage::Diagnosis)?;
        if !self.appointment.result_image_urls.iter().any(|u| u == url) {
            return Err(WorkflowError::UnknownImage(url.to_owned()));
        }

        self.files
            .delete_result_image(self.appointment.id, url)
            .await?;

        let urls: Vec<String> = self
            .appointment
            .result_image_urls
            .iter()
            .filter(|u| u.as_str() != url)
            .cloned()
            .collect();
        let patch = StagePatch {
            result_image_urls: Some(urls),
            ..StagePatch::default()
        };
        self.persist(patch).await?;
        Ok(())
    }

    /// Saves the diagnosis fields and advances to treatment.
    pub async fn save_diagnosis(&mut self, form: &DiagnosisForm) -> WorkflowResult<()> {
        self.ensure_editable(VisitStage::Diagnosis)?;
        form.validate().map_err(WorkflowError::Validation)?;

        let patch = StagePatch {
            test_result_narrative: trimmed(&form.test_result_narrative),
            final_diagnosis: Some(form.final_diagnosis.trim().to_owned()),
            ..StagePatch::default()
        };
        self.persist(patch).await?;
        self.advance(VisitStage::Treatment);
        Ok(())
    }

    /// Saves the treatment plan and advances to prescription & follow-up.
    pub async fn save_treatment(&mut self, form: &TreatmentForm) -> WorkflowResult<()> {
        self.ensure_editable(VisitStage::Treatment)?;
        form.validate().map_err(WorkflowError::Validation)?;

        let patch = StagePatch {
            treatment_service_ids: Some(form.treatment_service_ids.clone()),
            treatment_notes: trimmed(&form.treatment_notes),
            home_care_instructions: Some(form.home_care_instructions.trim().to_owned()),
            ..StagePatch::default()
        };
        self.persist(patch).await?;
        self.advance(VisitStage::Prescription);
        Ok(())
    }

    /// Saves the treatment plan, moves the appointment to `in-treatment`,
    /// and exits the workflow.
    pub async fn transfer_to_treatment(&mut self, form: &TreatmentForm) -> WorkflowResult<()> {
        self.ensure_editable(VisitStage::Treatment)?;
        form.validate().map_err(WorkflowError::Validation)?;

        let status = self.stage_transition(AppointmentStatus::InTreatment)?;
        let patch = StagePatch {
            treatment_service_ids: Some(form.treatment_service_ids.clone()),
            treatment_notes: trimmed(&form.treatment_notes),
            home_care_instructions: Some(form.home_care_instructions.trim().to_owned()),
            status,
            ..StagePatch::default()
        };
        self.persist(patch).await?;
        tracing::info!(appointment = %self.appointment.id, "visit transferred to treatment");
        self.exited = true;
        Ok(())
    }

    /// The local prescription list for stage 4.
    pub fn prescriptions(&self) -> &[PrescriptionEntry] {
        &self.prescriptions
    }

    /// Adds a prescription entry after validating it. Local only; the list
    /// is persisted at final submission.
    pub fn add_prescription(&mut self, entry: PrescriptionEntry) -> WorkflowResult<()> {
        self.ensure_editable(VisitStage::Prescription)?;
        entry.validate().map_err(WorkflowError::Validation)?;
        self.prescriptions.push(entry);
        Ok(())
    }

    /// Removes the prescription entry at `index`. Local only.
    pub fn remove_prescription(&mut self, index: usize) -> WorkflowResult<()> {
        self.ensure_editable(VisitStage::Prescription)?;
        if index >= self.prescriptions.len() {
            return Err(WorkflowError::UnknownPrescription(index));
        }
        self.prescriptions.remove(index);
        Ok(())
    }

    /// Final submission: runs the cross-stage completeness gate, validates
    /// the follow-up form, persists prescriptions and follow-up, and moves
    /// the appointment to `completed`.
    ///
    /// `today` anchors the not-in-the-past rule for the follow-up date.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::IncompleteRecord`] naming every missing
    /// clinical field when chief complaint, oral examination, or final
    /// diagnosis are absent from the record; nothing is submitted in that
    /// case.
    pub async fn finalise_visit(
        &mut self,
        form: &FollowUpForm,
        today: NaiveDate,
    ) -> WorkflowResult<()> {
        self.ensure_editable(VisitStage::Prescription)?;

        let missing = self.missing_required_fields();
        if !missing.is_empty() {
            tracing::warn!(appointment = %self.appointment.id, ?missing, "final submission rejected");
            return Err(WorkflowError::IncompleteRecord(missing));
        }

        form.validate(today).map_err(WorkflowError::Validation)?;

        let status = self.stage_transition(AppointmentStatus::Completed)?;
        let patch = StagePatch {
            prescriptions: Some(self.prescriptions.clone()),
            follow_up: Some(FollowUpPlan {
                date: form.date,
                kind: form.kind,
                instructions: form.instructions.trim().to_owned(),
                warnings: trimmed(&form.warnings),
            }),
            status,
            ..StagePatch::default()
        };
        self.persist(patch).await?;
        tracing::info!(appointment = %self.appointment.id, "visit completed");
        self.exited = true;
        Ok(())
    }

    /// Lists the cross-stage required fields missing from the record, each
    /// labelled with the stage that captures it.
    fn missing_required_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if is_blank(&self.appointment.chief_complaint) {
            missing.push("Chief complaint (Clinical Examination)".to_owned());
        }
        if is_blank(&self.appointment.oral_examination) {
            missing.push("Oral examination (Clinical Examination)".to_owned());
        }
        if is_blank(&self.appointment.final_diagnosis) {
            missing.push("Final diagnosis (Diagnosis)".to_owned());
        }
        missing
    }

    fn ensure_editable(&self, action_stage: VisitStage) -> WorkflowResult<()> {
        if self.exited || self.appointment.is_closed() {
            return Err(WorkflowError::VisitClosed);
        }
        if self.in_review() {
            return Err(WorkflowError::ReadOnlyReview { stage: self.stage });
        }
        if self.stage != action_stage {
            return Err(WorkflowError::StageMismatch {
                action_stage,
                current: self.stage,
            });
        }
        Ok(())
    }

    /// Resolves the status to send with a stage save.
    ///
    /// Returns `None` when the appointment already holds the target status,
    /// the status when the transition table allows it, and an error when it
    /// does not. An unrecognised current status defers to the server.
    fn stage_transition(
        &self,
        target: AppointmentStatus,
    ) -> WorkflowResult<Option<AppointmentStatus>> {
        match self.appointment.status() {
            Some(current) if current == target => Ok(None),
            Some(current) if can_transition(current, target) => Ok(Some(target)),
            Some(current) => Err(WorkflowError::IllegalTransition {
                from: current,
                to: target,
            }),
            None => Ok(Some(target)),
        }
    }

    async fn persist(&mut self, patch: StagePatch) -> WorkflowResult<()> {
        let updated = self
            .clinical
            .patch_appointment(self.appointment.id, &patch)
            .await?;
        self.appointment = updated;
        Ok(())
    }

    fn advance(&mut self, next: VisitStage) {
        self.stage = next;
        self.furthest = self.furthest.max(next);
    }
}

/// Infers the first incomplete stage from a snapshot.
///
/// The parked statuses override field inference: `waiting-for-results`
/// resumes at diagnosis (the results are what the clinician is coming back
/// for) and `in-treatment` resumes at prescription & follow-up.
fn infer_stage(appointment: &Appointment) -> VisitStage {
    match appointment.status() {
        Some(AppointmentStatus::WaitingForResults) => return VisitStage::Diagnosis,
        Some(AppointmentStatus::InTreatment) => return VisitStage::Prescription,
        _ => {}
    }

    if is_blank(&appointment.chief_complaint) || is_blank(&appointment.oral_examination) {
        VisitStage::ClinicalExamination
    } else if appointment.test_service_ids.is_empty() {
        VisitStage::TestSelection
    } else if is_blank(&appointment.final_diagnosis) {
        VisitStage::Diagnosis
    } else if appointment.treatment_service_ids.is_empty()
        || is_blank(&appointment.home_care_instructions)
    {
        VisitStage::Treatment
    } else {
        VisitStage::Prescription
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}
