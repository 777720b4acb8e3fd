//! In-memory stores and fixtures shared by the unit tests.
//!
//! The repositories enforce the same uniqueness rules as the database schema
//! and can be told to fail, so partial-failure paths are testable without
//! Postgres or MinIO.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fake::faker::lorem::en::Word;
use fake::Fake;

use crate::core::config::UploadConfig;
use crate::core::error::{AppError, Result};
use crate::features::attachments::models::{
    Attachment, FileUpload, NewAttachment, OwnerKind, OwnerRef,
};
use crate::features::attachments::repositories::AttachmentRepository;
use crate::features::attachments::services::{AttachmentConfig, AttachmentCoordinator};
use crate::features::auth::model::{AuthenticatedUser, UserRole};
use crate::features::evaluations::models::{CreateEvaluation, Evaluation, EvaluationStatus};
use crate::features::evaluations::repositories::EvaluationRepository;
use crate::features::evaluations::services::EvaluationService;
use crate::features::reports::models::{Report, ReportStatus};
use crate::features::reports::repositories::ReportRepository;
use crate::features::reports::services::ReportService;
use crate::modules::storage::BlobStore;

// =============================================================================
// FIXTURES
// =============================================================================

pub fn user(user_id: i64) -> AuthenticatedUser {
    AuthenticatedUser::new(user_id, UserRole::User)
}

pub fn evaluator(user_id: i64) -> AuthenticatedUser {
    AuthenticatedUser::new(user_id, UserRole::Evaluator)
}

pub fn admin(user_id: i64) -> AuthenticatedUser {
    AuthenticatedUser::new(user_id, UserRole::Admin)
}

/// Evaluation in `created` with no evaluator
pub fn sample_evaluation(id: i64, requester_id: i64) -> Evaluation {
    let now = Utc::now();
    Evaluation {
        id,
        requester_id,
        evaluator_id: None,
        city_id: 1,
        vehicle_make: "Toyota".to_string(),
        vehicle_model: "Corolla".to_string(),
        vehicle_year: Some(2018),
        vehicle_plate: Some("B-1234-XYZ".to_string()),
        status: EvaluationStatus::Created,
        notes: None,
        version: 1,
        created_at: now,
        updated_at: now,
    }
}

/// Draft report
pub fn sample_report(id: i64, evaluation_id: i64, evaluator_id: i64) -> Report {
    let now = Utc::now();
    Report {
        id,
        evaluation_id,
        evaluator_id,
        summary: None,
        status: ReportStatus::Draft,
        version: 1,
        created_at: now,
        updated_at: now,
    }
}

pub fn fake_create_evaluation() -> CreateEvaluation {
    CreateEvaluation {
        city_id: (1..500).fake::<i64>(),
        vehicle_make: Word().fake(),
        vehicle_model: Word().fake(),
        vehicle_year: Some((1990..2025).fake::<i32>()),
        vehicle_plate: Some(format!("B-{}", (1000..9999).fake::<u32>())),
        notes: None,
    }
}

pub fn photo_upload(size: usize) -> FileUpload {
    FileUpload {
        data: vec![0xFF; size],
        content_type: "image/jpeg".to_string(),
        filename: Some("front.jpg".to_string()),
    }
}

pub fn pdf_upload(size: usize) -> FileUpload {
    FileUpload {
        data: vec![0x25; size],
        content_type: "application/pdf".to_string(),
        filename: Some("report.pdf".to_string()),
    }
}

fn simulated_db_failure() -> AppError {
    AppError::Database(sqlx::Error::PoolTimedOut)
}

// =============================================================================
// EVALUATIONS
// =============================================================================

#[derive(Default)]
pub struct InMemoryEvaluationRepository {
    rows: Mutex<BTreeMap<i64, Evaluation>>,
    race_next_update: AtomicBool,
}

impl InMemoryEvaluationRepository {
    pub fn seed(&self, evaluation: Evaluation) -> Evaluation {
        self.rows
            .lock()
            .unwrap()
            .insert(evaluation.id, evaluation.clone());
        evaluation
    }

    pub fn get(&self, id: i64) -> Option<Evaluation> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    /// Make another writer win the race for the next update
    pub fn simulate_concurrent_write(&self) {
        self.race_next_update.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl EvaluationRepository for InMemoryEvaluationRepository {
    async fn insert(&self, requester_id: i64, data: &CreateEvaluation) -> Result<Evaluation> {
        let mut rows = self.rows.lock().unwrap();
        let id = rows.keys().next_back().copied().unwrap_or(0) + 1;
        let mut evaluation = sample_evaluation(id, requester_id);
        evaluation.city_id = data.city_id;
        evaluation.vehicle_make = data.vehicle_make.clone();
        evaluation.vehicle_model = data.vehicle_model.clone();
        evaluation.vehicle_year = data.vehicle_year;
        evaluation.vehicle_plate = data.vehicle_plate.clone();
        evaluation.notes = data.notes.clone();
        rows.insert(id, evaluation.clone());
        Ok(evaluation)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Evaluation>> {
        Ok(self.get(id))
    }

    async fn list(
        &self,
        status: Option<EvaluationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Evaluation>> {
        let mut matching: Vec<Evaluation> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|e| status.map_or(true, |s| e.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self, status: Option<EvaluationStatus>) -> Result<i64> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .filter(|e| status.map_or(true, |s| e.status == s))
            .count() as i64)
    }

    async fn update(&self, evaluation: &Evaluation) -> Result<Option<Evaluation>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(stored) = rows.get_mut(&evaluation.id) else {
            return Ok(None);
        };

        if self.race_next_update.swap(false, Ordering::SeqCst) {
            stored.version += 1;
        }
        if stored.version != evaluation.version {
            return Ok(None);
        }

        stored.evaluator_id = evaluation.evaluator_id;
        stored.status = evaluation.status;
        stored.notes = evaluation.notes.clone();
        stored.version += 1;
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }
}

// =============================================================================
// REPORTS
// =============================================================================

#[derive(Default)]
pub struct InMemoryReportRepository {
    rows: Mutex<BTreeMap<i64, Report>>,
    race_next_update: AtomicBool,
}

impl InMemoryReportRepository {
    pub fn seed(&self, report: Report) -> Report {
        self.rows.lock().unwrap().insert(report.id, report.clone());
        report
    }

    pub fn get(&self, id: i64) -> Option<Report> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    pub fn simulate_concurrent_write(&self) {
        self.race_next_update.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn insert(
        &self,
        evaluation_id: i64,
        evaluator_id: i64,
        summary: Option<&str>,
    ) -> Result<Report> {
        let mut rows = self.rows.lock().unwrap();
        if rows.values().any(|r| r.evaluation_id == evaluation_id) {
            return Err(AppError::Conflict(format!(
                "a report already exists for evaluation {}",
                evaluation_id
            )));
        }

        let id = rows.keys().next_back().copied().unwrap_or(0) + 1;
        let mut report = sample_report(id, evaluation_id, evaluator_id);
        report.summary = summary.map(str::to_string);
        rows.insert(id, report.clone());
        Ok(report)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Report>> {
        Ok(self.get(id))
    }

    async fn find_by_evaluation_id(&self, evaluation_id: i64) -> Result<Option<Report>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|r| r.evaluation_id == evaluation_id)
            .cloned())
    }

    async fn update(&self, report: &Report) -> Result<Option<Report>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(stored) = rows.get_mut(&report.id) else {
            return Ok(None);
        };

        if self.race_next_update.swap(false, Ordering::SeqCst) {
            stored.version += 1;
        }
        if stored.version != report.version {
            return Ok(None);
        }

        stored.summary = report.summary.clone();
        stored.status = report.status;
        stored.version += 1;
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }
}

// =============================================================================
// ATTACHMENTS
// =============================================================================

#[derive(Default)]
pub struct InMemoryAttachmentRepository {
    rows: Mutex<Vec<Attachment>>,
    next_id: AtomicI64,
    fail_inserts: AtomicBool,
}

impl InMemoryAttachmentRepository {
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<Attachment> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttachmentRepository for InMemoryAttachmentRepository {
    async fn insert(&self, data: &NewAttachment) -> Result<Attachment> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(simulated_db_failure());
        }

        let mut rows = self.rows.lock().unwrap();
        // Mirrors UNIQUE (owner_kind, owner_id, blob_key) and the one-file-per-report index
        let clashes = rows.iter().any(|a| {
            a.owner() == data.owner
                && (a.blob_key == data.blob_key || data.owner.kind == OwnerKind::Report)
        });
        if clashes {
            return Err(AppError::Conflict(format!(
                "{} already has an attachment '{}'",
                data.owner, data.blob_key
            )));
        }

        let attachment = Attachment {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            owner_kind: data.owner.kind,
            owner_id: data.owner.id,
            bucket: data.bucket.clone(),
            blob_key: data.blob_key.clone(),
            content_type: data.content_type.clone(),
            size_bytes: data.size_bytes,
            created_at: Utc::now(),
        };
        rows.push(attachment.clone());
        Ok(attachment)
    }

    async fn list_by_owner(&self, owner: OwnerRef) -> Result<Vec<Attachment>> {
        let mut matching: Vec<Attachment> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.owner() == owner)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matching)
    }

    async fn find_latest_by_owner(&self, owner: OwnerRef) -> Result<Option<Attachment>> {
        Ok(self.list_by_owner(owner).await?.into_iter().next())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|a| a.id != id);
        Ok(rows.len() < before)
    }
}

// =============================================================================
// BLOB STORE
// =============================================================================

/// Blob store that keeps objects in a map and records every call
#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    puts: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
}

impl InMemoryBlobStore {
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// Keys successfully written, in call order
    pub fn put_keys(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }

    /// Keys a delete was attempted for, in call order
    pub fn deleted_keys(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    fn bucket_name(&self) -> String {
        TestStores::BUCKET.to_string()
    }

    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(AppError::Storage(format!("simulated failure writing '{}'", key)));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data, content_type.to_string()));
        self.puts.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deletes.lock().unwrap().push(key.to_string());
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::Storage(format!("simulated failure deleting '{}'", key)));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn presign(&self, key: &str, ttl: Duration) -> Result<String> {
        Ok(format!(
            "https://storage.test/{}/{}?expires={}",
            self.bucket_name(),
            key,
            ttl.as_secs()
        ))
    }
}

// =============================================================================
// WIRING
// =============================================================================

/// All in-memory stores, plus builders for the services on top of them
#[derive(Default)]
pub struct TestStores {
    pub evaluations: Arc<InMemoryEvaluationRepository>,
    pub reports: Arc<InMemoryReportRepository>,
    pub attachments: Arc<InMemoryAttachmentRepository>,
    pub blobs: Arc<InMemoryBlobStore>,
}

impl TestStores {
    pub const BUCKET: &'static str = "test-bucket";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn coordinator(&self) -> Arc<AttachmentCoordinator> {
        self.coordinator_with_url_ttl(Duration::from_secs(3600))
    }

    pub fn coordinator_with_url_ttl(&self, default_url_ttl: Duration) -> Arc<AttachmentCoordinator> {
        Arc::new(AttachmentCoordinator::new(
            self.attachments.clone(),
            self.evaluations.clone(),
            self.reports.clone(),
            self.blobs.clone(),
            AttachmentConfig {
                bucket: Self::BUCKET.to_string(),
                default_url_ttl,
            },
        ))
    }

    pub fn evaluation_service(&self) -> Arc<EvaluationService> {
        Arc::new(EvaluationService::new(
            self.evaluations.clone(),
            self.coordinator(),
            UploadConfig::default(),
        ))
    }

    pub fn report_service(&self) -> Arc<ReportService> {
        Arc::new(ReportService::new(
            self.reports.clone(),
            self.evaluations.clone(),
            self.coordinator(),
            UploadConfig::default(),
        ))
    }
}
