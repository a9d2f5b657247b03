//! Form controllers for the list views: load the table, submit the create or
//! edit form, and delete behind an explicit confirmation.
//!
//! Every create, update or delete emits exactly one [`Notification`]. After a
//! successful mutation the whole list is fetched again; rows are never
//! patched locally.

use std::sync::{Arc, Mutex};

use db::models::{staff::StaffMember, student::Student, transaction::Transaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    data_service::{DataError, DataErrorKind, FeedbackSink, FunctionInvoker, Record, Repository, functions},
    error_classifier::{ClientError, classify},
    staff_accounts::CreateStaffUserRequest,
    table::Sortable,
    validation::{FeedbackForm, FieldError, Form, StaffForm},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            title: "Sucesso".to_string(),
            message: message.into(),
        }
    }

    pub fn error(err: &ClientError) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: "Erro".to_string(),
            message: err.user_message().to_string(),
        }
    }
}

/// Toast sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: Mutex<Vec<Notification>>,
}

impl NotificationLog {
    pub fn entries(&self) -> Vec<Notification> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<Notification> {
        self.entries.lock().ok().and_then(|e| e.last().cloned())
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: Notification) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(notification);
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EntityMessages {
    pub created: &'static str,
    pub updated: &'static str,
    pub deleted: &'static str,
}

pub trait Entity: Record + Sortable {
    const MESSAGES: EntityMessages;
}

impl Entity for Student {
    const MESSAGES: EntityMessages = EntityMessages {
        created: "Aluno criado com sucesso",
        updated: "Aluno atualizado com sucesso",
        deleted: "Aluno eliminado com sucesso",
    };
}

impl Entity for StaffMember {
    const MESSAGES: EntityMessages = EntityMessages {
        created: "Funcionário criado com sucesso",
        updated: "Funcionário atualizado com sucesso",
        deleted: "Funcionário eliminado com sucesso",
    };
}

impl Entity for Transaction {
    const MESSAGES: EntityMessages = EntityMessages {
        created: "Transação criada com sucesso",
        updated: "Transação atualizada com sucesso",
        deleted: "Transação eliminada com sucesso",
    };
}

/// Proof that the user was asked before deleting. Only
/// [`CrudController::request_delete`] creates one and it is consumed by
/// confirming or cancelling.
#[derive(Debug)]
pub struct DeleteConfirmation {
    id: Uuid,
}

impl DeleteConfirmation {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

pub struct CrudController<R: Entity, D: Repository<R> + ?Sized> {
    data: Arc<D>,
    notifier: Arc<dyn Notifier>,
    rows: Vec<R>,
}

impl<R: Entity, D: Repository<R> + ?Sized> CrudController<R, D> {
    pub fn new(data: Arc<D>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            data,
            notifier,
            rows: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Fetch the list. A failed load shows an error toast and keeps the
    /// previous rows.
    pub async fn load(&mut self) -> Result<&[R], ClientError> {
        match self.data.list().await {
            Ok(rows) => {
                self.rows = rows;
                Ok(&self.rows)
            }
            Err(e) => {
                let err = classify(&e);
                self.notifier.notify(Notification::error(&err));
                Err(err)
            }
        }
    }

    async fn reload_quietly(&mut self) {
        match self.data.list().await {
            Ok(rows) => self.rows = rows,
            Err(e) => warn!(table = R::TABLE, error = %e, "reload after mutation failed"),
        }
    }

    fn reject(&self, err: ClientError) -> ClientError {
        self.notifier.notify(Notification::error(&err));
        err
    }

    async fn run_mutation<T>(
        &mut self,
        result: Result<T, DataError>,
        success: &'static str,
    ) -> Result<T, ClientError> {
        match result {
            Ok(value) => {
                self.notifier.notify(Notification::success(success));
                self.reload_quietly().await;
                Ok(value)
            }
            Err(e) => Err(self.reject(classify(&e))),
        }
    }

    /// Validate and save the form: create when `editing` is `None`,
    /// otherwise update that row.
    pub async fn submit<F>(&mut self, editing: Option<Uuid>, form: &F) -> Result<R, ClientError>
    where
        F: Form<Output = R::Input>,
    {
        let input = form
            .validate()
            .map_err(|errors| self.reject(ClientError::Validation(errors)))?;
        self.persist(editing, &input).await
    }

    /// Save already-validated input.
    pub async fn persist(&mut self, editing: Option<Uuid>, input: &R::Input) -> Result<R, ClientError> {
        match editing {
            None => {
                let result = self.data.insert(input).await;
                self.run_mutation(result, R::MESSAGES.created).await
            }
            Some(id) => {
                let result = self.data.update(id, input).await;
                self.run_mutation(result, R::MESSAGES.updated).await
            }
        }
    }

    pub fn request_delete(&self, id: Uuid) -> DeleteConfirmation {
        debug!(table = R::TABLE, %id, "delete requested");
        DeleteConfirmation { id }
    }

    pub async fn confirm_delete(&mut self, confirmation: DeleteConfirmation) -> Result<(), ClientError> {
        let result = self.data.remove(confirmation.id).await;
        self.run_mutation(result, R::MESSAGES.deleted).await
    }

    pub fn cancel_delete(&self, confirmation: DeleteConfirmation) {
        debug!(table = R::TABLE, id = %confirmation.id, "delete cancelled");
    }
}

pub type StudentController<D> = CrudController<Student, D>;
pub type FinanceController<D> = CrudController<Transaction, D>;

impl<D: Repository<Transaction> + ?Sized> CrudController<Transaction, D> {
    /// Revenue minus expenses over the loaded rows.
    pub fn balance(&self) -> f64 {
        self.rows.iter().map(Transaction::signed_amount).sum()
    }
}

pub const PASSWORD_ON_EDIT: &str = "A palavra-passe só pode ser definida ao criar o funcionário";

/// Staff form controller. Creating a member with a password goes through the
/// `create-staff-user` function so the login account is made as well. Editing
/// never touches the login account, so a password there is rejected.
pub struct StaffController<D: Repository<StaffMember> + ?Sized> {
    crud: CrudController<StaffMember, D>,
    functions: Arc<dyn FunctionInvoker>,
}

impl<D: Repository<StaffMember> + ?Sized> StaffController<D> {
    pub fn new(data: Arc<D>, functions: Arc<dyn FunctionInvoker>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            crud: CrudController::new(data, notifier),
            functions,
        }
    }

    pub fn rows(&self) -> &[StaffMember] {
        self.crud.rows()
    }

    pub async fn load(&mut self) -> Result<&[StaffMember], ClientError> {
        self.crud.load().await
    }

    pub async fn submit(&mut self, editing: Option<Uuid>, form: &StaffForm) -> Result<(), ClientError> {
        let submission = form
            .validate()
            .map_err(|errors| self.crud.reject(ClientError::Validation(errors)))?;

        match (editing, submission.password) {
            (None, Some(password)) => {
                let request = CreateStaffUserRequest {
                    staff: submission.staff,
                    password,
                };
                let payload = serde_json::to_value(&request)
                    .map_err(|e| self.crud.reject(classify(&DataError::new(DataErrorKind::Decode, e.to_string()))))?;
                let result = self.functions.invoke(functions::CREATE_STAFF_USER, payload).await;
                self.crud
                    .run_mutation(result, StaffMember::MESSAGES.created)
                    .await
                    .map(|_| ())
            }
            (Some(_), Some(_)) => Err(self.crud.reject(ClientError::Validation(vec![FieldError::new(
                "password",
                PASSWORD_ON_EDIT,
            )]))),
            (editing, None) => self.crud.persist(editing, &submission.staff).await.map(|_| ()),
        }
    }

    pub fn request_delete(&self, id: Uuid) -> DeleteConfirmation {
        self.crud.request_delete(id)
    }

    pub async fn confirm_delete(&mut self, confirmation: DeleteConfirmation) -> Result<(), ClientError> {
        self.crud.confirm_delete(confirmation).await
    }

    pub fn cancel_delete(&self, confirmation: DeleteConfirmation) {
        self.crud.cancel_delete(confirmation)
    }
}

pub const FEEDBACK_SENT: &str = "Obrigado pelo seu feedback. Iremos analisá-lo em breve.";

pub struct FeedbackController {
    sink: Arc<dyn FeedbackSink>,
    notifier: Arc<dyn Notifier>,
}

impl FeedbackController {
    pub fn new(sink: Arc<dyn FeedbackSink>, notifier: Arc<dyn Notifier>) -> Self {
        Self { sink, notifier }
    }

    pub async fn submit(&self, form: &FeedbackForm) -> Result<(), ClientError> {
        let outcome = match form.validate() {
            Ok(input) => self.sink.submit_feedback(&input).await.map_err(|e| classify(&e)),
            Err(errors) => Err(ClientError::Validation(errors)),
        };
        match &outcome {
            Ok(()) => self.notifier.notify(Notification {
                level: NotificationLevel::Success,
                title: "Feedback enviado!".to_string(),
                message: FEEDBACK_SENT.to_string(),
            }),
            Err(err) => self.notifier.notify(Notification::error(err)),
        }
        outcome
    }
}
