//! In-process data service over the local database. Used by the server's
//! handlers and by tests; errors come out already translated to SQLSTATE
//! codes.

use async_trait::async_trait;
use db::{
    DBService,
    models::{
        feedback::{Feedback, FeedbackInput},
        staff::{StaffInput, StaffMember},
        student::{Student, StudentInput},
        transaction::{Transaction, TransactionInput},
    },
};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::{
    data_service::{
        DataError, DataErrorKind, FeedbackSink, FunctionInvoker, Repository, codes, functions,
    },
    recommendations::{RecommendationError, RecommendationService},
    staff_accounts::{CreateStaffUserRequest, create_staff_user},
};

#[derive(Clone)]
pub struct SqliteDataService {
    db: DBService,
    /// Account performing the writes, recorded on transactions and feedback.
    actor: Option<Uuid>,
    recommendations: Option<RecommendationService>,
}

impl SqliteDataService {
    pub fn new(db: DBService) -> Self {
        Self {
            db,
            actor: None,
            recommendations: None,
        }
    }

    pub fn acting_as(mut self, user_id: Uuid) -> Self {
        self.actor = Some(user_id);
        self
    }

    pub fn with_recommendations(mut self, service: Option<RecommendationService>) -> Self {
        self.recommendations = service;
        self
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }
}

fn removed(rows: u64) -> Result<(), DataError> {
    if rows == 0 {
        Err(DataError::not_found())
    } else {
        Ok(())
    }
}

#[async_trait]
impl Repository<Student> for SqliteDataService {
    async fn list(&self) -> Result<Vec<Student>, DataError> {
        Ok(Student::find_all(&self.db.pool).await?)
    }

    async fn insert(&self, input: &StudentInput) -> Result<Student, DataError> {
        Ok(Student::create(&self.db.pool, input, Uuid::new_v4()).await?)
    }

    async fn update(&self, id: Uuid, input: &StudentInput) -> Result<Student, DataError> {
        Student::update(&self.db.pool, id, input)
            .await?
            .ok_or_else(DataError::not_found)
    }

    async fn remove(&self, id: Uuid) -> Result<(), DataError> {
        removed(Student::delete(&self.db.pool, id).await?)
    }
}

#[async_trait]
impl Repository<StaffMember> for SqliteDataService {
    async fn list(&self) -> Result<Vec<StaffMember>, DataError> {
        Ok(StaffMember::find_all(&self.db.pool).await?)
    }

    async fn insert(&self, input: &StaffInput) -> Result<StaffMember, DataError> {
        Ok(StaffMember::create(&self.db.pool, input, None, Uuid::new_v4()).await?)
    }

    async fn update(&self, id: Uuid, input: &StaffInput) -> Result<StaffMember, DataError> {
        StaffMember::update(&self.db.pool, id, input)
            .await?
            .ok_or_else(DataError::not_found)
    }

    async fn remove(&self, id: Uuid) -> Result<(), DataError> {
        removed(StaffMember::delete(&self.db.pool, id).await?)
    }
}

#[async_trait]
impl Repository<Transaction> for SqliteDataService {
    async fn list(&self) -> Result<Vec<Transaction>, DataError> {
        Ok(Transaction::find_all(&self.db.pool).await?)
    }

    async fn insert(&self, input: &TransactionInput) -> Result<Transaction, DataError> {
        Ok(Transaction::create(&self.db.pool, input, self.actor, Uuid::new_v4()).await?)
    }

    async fn update(&self, id: Uuid, input: &TransactionInput) -> Result<Transaction, DataError> {
        Transaction::update(&self.db.pool, id, input)
            .await?
            .ok_or_else(DataError::not_found)
    }

    async fn remove(&self, id: Uuid) -> Result<(), DataError> {
        removed(Transaction::delete(&self.db.pool, id).await?)
    }
}

#[async_trait]
impl FeedbackSink for SqliteDataService {
    async fn submit_feedback(&self, input: &FeedbackInput) -> Result<(), DataError> {
        let user_id = self.actor.ok_or_else(|| {
            DataError::new(DataErrorKind::Auth, "feedback requires a signed-in user")
                .with_code(codes::JWT_REJECTED)
                .with_status(401)
        })?;
        Feedback::create(&self.db.pool, user_id, input, Uuid::new_v4()).await?;
        Ok(())
    }
}

fn decode_error(e: serde_json::Error) -> DataError {
    DataError::new(DataErrorKind::Function, e.to_string())
        .with_code(codes::VALIDATION_FAILED)
        .with_status(400)
}

#[async_trait]
impl FunctionInvoker for SqliteDataService {
    async fn invoke(&self, name: &str, payload: Value) -> Result<Value, DataError> {
        debug!(function = name, "invoke");
        match name {
            functions::CREATE_STAFF_USER => {
                let request: CreateStaffUserRequest =
                    serde_json::from_value(payload).map_err(decode_error)?;
                let created = create_staff_user(&self.db.pool, &request).await?;
                serde_json::to_value(created).map_err(|e| DataError::new(DataErrorKind::Decode, e.to_string()))
            }
            functions::AI_RECOMMENDATIONS => {
                let service = self.recommendations.as_ref().ok_or_else(|| {
                    DataError::new(DataErrorKind::Function, "AI_API_KEY not configured").with_status(503)
                })?;
                let result = service.generate(&self.db.pool).await.map_err(|e| match e {
                    RecommendationError::Database(e) => DataError::from(e),
                    RecommendationError::Ai(e) => {
                        let status = e.upstream_status();
                        DataError::new(DataErrorKind::Function, e.to_string()).with_status(status)
                    }
                })?;
                serde_json::to_value(result).map_err(|e| DataError::new(DataErrorKind::Decode, e.to_string()))
            }
            other => Err(DataError::new(DataErrorKind::Function, format!("unknown function {other}"))
                .with_status(404)),
        }
    }
}
