//! Staff members who can sign in: login account, staff row and staff role
//! are created in one database transaction.

use db::models::{
    staff::{StaffInput, StaffMember},
    user_account::{CreateUserAccount, UserAccount, UserRole},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    auth::{AuthServiceError, hash_password},
    data_service::{DataError, DataErrorKind, codes},
    validation::{FieldError, Form, StaffForm},
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateStaffUserRequest {
    #[serde(flatten)]
    #[ts(flatten)]
    pub staff: StaffInput,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct CreatedStaffUser {
    pub user_id: Uuid,
    pub email: String,
    pub staff: StaffMember,
}

#[derive(Debug, Error)]
pub enum StaffAccountError {
    #[error("invalid request")]
    Validation(Vec<FieldError>),
    #[error(transparent)]
    Auth(#[from] AuthServiceError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<StaffAccountError> for DataError {
    fn from(err: StaffAccountError) -> Self {
        match err {
            StaffAccountError::Validation(_) => {
                DataError::new(DataErrorKind::Function, "invalid request")
                    .with_code(codes::VALIDATION_FAILED)
                    .with_status(400)
            }
            StaffAccountError::Auth(e) => e.into(),
            StaffAccountError::Database(e) => e.into(),
        }
    }
}

pub async fn create_staff_user(
    pool: &SqlitePool,
    request: &CreateStaffUserRequest,
) -> Result<CreatedStaffUser, StaffAccountError> {
    let mut form = StaffForm::from(&request.staff);
    form.password = request.password.clone();
    let submission = form.validate().map_err(StaffAccountError::Validation)?;
    let password = submission.password.unwrap_or_default();
    if password.is_empty() {
        return Err(StaffAccountError::Validation(vec![FieldError::new(
            "password",
            "Senha deve ter pelo menos 8 caracteres",
        )]));
    }
    let staff = submission.staff;
    let password_hash = hash_password(&password)?;

    let mut tx = pool.begin().await?;
    let account = UserAccount::create(
        &mut *tx,
        &CreateUserAccount {
            email: staff.email.clone(),
            password_hash,
            full_name: Some(staff.name.clone()),
            role: None,
        },
        Uuid::new_v4(),
    )
    .await?;
    let member = StaffMember::create(&mut *tx, &staff, Some(account.id), Uuid::new_v4()).await?;
    UserAccount::set_role(&mut *tx, account.id, UserRole::Staff).await?;
    tx.commit().await?;

    info!(user_id = %account.id, staff_id = %member.id, "created staff login");
    Ok(CreatedStaffUser {
        user_id: account.id,
        email: account.email,
        staff: member,
    })
}

#[cfg(test)]
mod tests {
    use db::{DBService, models::staff::StaffStatus};

    use super::*;

    fn request(email: &str, password: &str) -> CreateStaffUserRequest {
        CreateStaffUserRequest {
            staff: StaffInput {
                name: "Joana".into(),
                email: email.into(),
                phone: None,
                position: "Secretaria".into(),
                department_id: None,
                salary: Some(1200.0),
                status: StaffStatus::Active,
            },
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn creates_account_staff_and_role() {
        let db = DBService::new_in_memory().await.unwrap();
        let created = create_staff_user(&db.pool, &request("joana@escola.pt", "12345678"))
            .await
            .unwrap();
        let account = UserAccount::find_by_id(&db.pool, created.user_id).await.unwrap().unwrap();
        assert_eq!(account.role, Some(UserRole::Staff));
        assert_eq!(created.staff.user_id, Some(account.id));
    }

    #[tokio::test]
    async fn failure_rolls_back_the_account() {
        let db = DBService::new_in_memory().await.unwrap();
        let mut req = request("joana@escola.pt", "12345678");
        // Unknown department: staff insert fails after the account insert.
        req.staff.department_id = Some(Uuid::new_v4());
        let err = create_staff_user(&db.pool, &req).await.unwrap_err();
        let data: DataError = err.into();
        assert!(data.is_code(codes::FOREIGN_KEY_VIOLATION));
        assert!(UserAccount::find_by_email(&db.pool, "joana@escola.pt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn short_password_is_rejected_before_touching_the_db() {
        let db = DBService::new_in_memory().await.unwrap();
        let err = create_staff_user(&db.pool, &request("joana@escola.pt", "short"))
            .await
            .unwrap_err();
        assert!(matches!(err, StaffAccountError::Validation(_)));
        let err = create_staff_user(&db.pool, &request("joana@escola.pt", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, StaffAccountError::Validation(_)));
    }
}
