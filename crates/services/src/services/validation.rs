//! Declarative field rules for the entity forms.
//!
//! Forms hold raw text as typed by the user. `validate` either returns the
//! typed record to send to the data service or every field that failed, with
//! the first failing rule per field. Fields without a `required` rule may be
//! left empty, in which case their remaining rules are skipped.

use chrono::NaiveDate;
use db::models::{
    feedback::{FeedbackCategory, FeedbackInput},
    staff::{StaffInput, StaffStatus},
    student::{StudentInput, StudentStatus},
    transaction::{TransactionInput, TransactionType},
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::data_service::Credentials;

pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<FieldError> for utils::response::FieldIssue {
    fn from(err: FieldError) -> Self {
        Self {
            field: err.field,
            message: err.message,
        }
    }
}

#[derive(Debug, Clone)]
enum Rule {
    Required(&'static str),
    MinLen(usize, &'static str),
    MaxLen(usize, &'static str),
    Email(&'static str),
    Numeric(&'static str),
    Positive(&'static str),
    NonNegative(&'static str),
    OneOf(&'static [&'static str], &'static str),
    Date(&'static str),
    Uuid(&'static str),
}

impl Rule {
    fn check(&self, value: &str) -> Result<(), &'static str> {
        let ok = match self {
            Rule::Required(_) => !value.is_empty(),
            Rule::MinLen(n, _) => value.chars().count() >= *n,
            Rule::MaxLen(n, _) => value.chars().count() <= *n,
            Rule::Email(_) => EMAIL.is_match(value),
            Rule::Numeric(_) => parse_number(value).is_some(),
            Rule::Positive(_) => parse_number(value).is_some_and(|n| n > 0.0),
            Rule::NonNegative(_) => parse_number(value).is_some_and(|n| n >= 0.0),
            Rule::OneOf(allowed, _) => allowed.contains(&value),
            Rule::Date(_) => {
                DATE.is_match(value) && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
            }
            Rule::Uuid(_) => Uuid::parse_str(value).is_ok(),
        };
        if ok { Ok(()) } else { Err(self.message()) }
    }

    fn message(&self) -> &'static str {
        match self {
            Rule::Required(m)
            | Rule::MinLen(_, m)
            | Rule::MaxLen(_, m)
            | Rule::Email(m)
            | Rule::Numeric(m)
            | Rule::Positive(m)
            | Rule::NonNegative(m)
            | Rule::OneOf(_, m)
            | Rule::Date(m)
            | Rule::Uuid(m) => m,
        }
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Rule chain for one field.
pub struct FieldCheck<'a> {
    name: &'static str,
    value: &'a str,
    trim: bool,
    rules: Vec<Rule>,
}

pub fn field<'a>(name: &'static str, value: &'a str) -> FieldCheck<'a> {
    FieldCheck {
        name,
        value,
        trim: false,
        rules: Vec::new(),
    }
}

impl<'a> FieldCheck<'a> {
    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    pub fn required(mut self, msg: &'static str) -> Self {
        self.rules.push(Rule::Required(msg));
        self
    }

    pub fn min_len(mut self, n: usize, msg: &'static str) -> Self {
        self.rules.push(Rule::MinLen(n, msg));
        self
    }

    pub fn max_len(mut self, n: usize, msg: &'static str) -> Self {
        self.rules.push(Rule::MaxLen(n, msg));
        self
    }

    pub fn email(mut self, msg: &'static str) -> Self {
        self.rules.push(Rule::Email(msg));
        self
    }

    pub fn numeric(mut self, msg: &'static str) -> Self {
        self.rules.push(Rule::Numeric(msg));
        self
    }

    pub fn positive(mut self, msg: &'static str) -> Self {
        self.rules.push(Rule::Positive(msg));
        self
    }

    pub fn non_negative(mut self, msg: &'static str) -> Self {
        self.rules.push(Rule::NonNegative(msg));
        self
    }

    pub fn one_of(mut self, allowed: &'static [&'static str], msg: &'static str) -> Self {
        self.rules.push(Rule::OneOf(allowed, msg));
        self
    }

    pub fn date(mut self, msg: &'static str) -> Self {
        self.rules.push(Rule::Date(msg));
        self
    }

    pub fn uuid(mut self, msg: &'static str) -> Self {
        self.rules.push(Rule::Uuid(msg));
        self
    }

    /// Run the rules, recording the first failure. Returns the (possibly
    /// trimmed) value, or `None` when the field is empty or invalid.
    pub fn check(self, errors: &mut Vec<FieldError>) -> Option<&'a str> {
        let value = if self.trim { self.value.trim() } else { self.value };
        let required = self.rules.iter().any(|r| matches!(r, Rule::Required(_)));
        if value.is_empty() && !required {
            return None;
        }
        for rule in &self.rules {
            if let Err(msg) = rule.check(value) {
                errors.push(FieldError::new(self.name, msg));
                return None;
            }
        }
        Some(value)
    }
}

pub trait Form {
    type Output;

    fn validate(&self) -> Result<Self::Output, Vec<FieldError>>;
}

fn finish<T>(errors: Vec<FieldError>, build: impl FnOnce() -> T) -> Result<T, Vec<FieldError>> {
    if errors.is_empty() { Ok(build()) } else { Err(errors) }
}

fn opt(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl Form for LoginForm {
    type Output = Credentials;

    fn validate(&self) -> Result<Credentials, Vec<FieldError>> {
        let mut errors = Vec::new();
        let email = field("email", &self.email)
            .trim()
            .required("Email é obrigatório")
            .email("Email inválido")
            .max_len(255, "Email não pode ter mais de 255 caracteres")
            .check(&mut errors);
        let password = field("password", &self.password)
            .required("Palavra-passe é obrigatória")
            .min_len(
                MIN_PASSWORD_LEN,
                "Palavra-passe deve ter pelo menos 8 caracteres",
            )
            .check(&mut errors);
        finish(errors, || Credentials {
            email: email.unwrap_or_default().to_lowercase(),
            password: password.unwrap_or_default().to_string(),
        })
    }
}

const STUDENT_STATUSES: &[&str] = &["active", "inactive", "graduated"];
const STAFF_STATUSES: &[&str] = &["active", "inactive", "terminated"];
const TRANSACTION_TYPES: &[&str] = &["revenue", "expense"];
const FEEDBACK_CATEGORIES: &[&str] = &["bug", "suggestion", "other"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct StudentForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub course: String,
    pub status: String,
}

impl Form for StudentForm {
    type Output = StudentInput;

    fn validate(&self) -> Result<StudentInput, Vec<FieldError>> {
        let mut errors = Vec::new();
        let name = field("name", &self.name)
            .trim()
            .required("Nome é obrigatório")
            .max_len(100, "Nome não pode ter mais de 100 caracteres")
            .check(&mut errors);
        let email = field("email", &self.email)
            .trim()
            .max_len(255, "Email não pode ter mais de 255 caracteres")
            .email("Email inválido")
            .check(&mut errors);
        let phone = field("phone", &self.phone)
            .trim()
            .max_len(20, "Telefone não pode ter mais de 20 caracteres")
            .check(&mut errors);
        let course = field("course", &self.course)
            .trim()
            .max_len(100, "Curso não pode ter mais de 100 caracteres")
            .check(&mut errors);
        let status = field("status", &self.status)
            .required("Estado inválido")
            .one_of(STUDENT_STATUSES, "Estado inválido")
            .check(&mut errors)
            .and_then(|s| s.parse::<StudentStatus>().ok());
        finish(errors, || StudentInput {
            name: name.unwrap_or_default().to_string(),
            email: opt(email),
            phone: opt(phone),
            course: opt(course),
            status: status.unwrap_or_default(),
        })
    }
}

impl From<&StudentInput> for StudentForm {
    fn from(input: &StudentInput) -> Self {
        Self {
            name: input.name.clone(),
            email: input.email.clone().unwrap_or_default(),
            phone: input.phone.clone().unwrap_or_default(),
            course: input.course.clone().unwrap_or_default(),
            status: input.status.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct StaffForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub position: String,
    pub department_id: String,
    pub salary: String,
    pub status: String,
    /// When set on create, a login account is created for the member too.
    pub password: String,
}

/// Validated staff form: the record plus an optional initial password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct StaffSubmission {
    #[serde(flatten)]
    #[ts(flatten)]
    pub staff: StaffInput,
    pub password: Option<String>,
}

impl Form for StaffForm {
    type Output = StaffSubmission;

    fn validate(&self) -> Result<StaffSubmission, Vec<FieldError>> {
        let mut errors = Vec::new();
        let name = field("name", &self.name)
            .trim()
            .required("Nome é obrigatório")
            .max_len(100, "Nome não pode ter mais de 100 caracteres")
            .check(&mut errors);
        let email = field("email", &self.email)
            .trim()
            .required("Email inválido")
            .email("Email inválido")
            .max_len(255, "Email não pode ter mais de 255 caracteres")
            .check(&mut errors);
        let phone = field("phone", &self.phone)
            .trim()
            .max_len(20, "Telefone não pode ter mais de 20 caracteres")
            .check(&mut errors);
        let position = field("position", &self.position)
            .trim()
            .required("Cargo é obrigatório")
            .max_len(100, "Cargo não pode ter mais de 100 caracteres")
            .check(&mut errors);
        let department_id = field("department_id", &self.department_id)
            .trim()
            .uuid("Departamento inválido")
            .check(&mut errors)
            .and_then(|s| Uuid::parse_str(s).ok());
        let salary = field("salary", &self.salary)
            .trim()
            .numeric("Salário inválido")
            .non_negative("Salário não pode ser negativo")
            .check(&mut errors)
            .and_then(parse_number);
        let status = field("status", &self.status)
            .required("Estado inválido")
            .one_of(STAFF_STATUSES, "Estado inválido")
            .check(&mut errors)
            .and_then(|s| s.parse::<StaffStatus>().ok());
        let password = field("password", &self.password)
            .min_len(MIN_PASSWORD_LEN, "Senha deve ter pelo menos 8 caracteres")
            .check(&mut errors);
        finish(errors, || StaffSubmission {
            staff: StaffInput {
                name: name.unwrap_or_default().to_string(),
                email: email.unwrap_or_default().to_lowercase(),
                phone: opt(phone),
                position: position.unwrap_or_default().to_string(),
                department_id,
                salary,
                status: status.unwrap_or_default(),
            },
            password: opt(password),
        })
    }
}

impl From<&StaffInput> for StaffForm {
    fn from(input: &StaffInput) -> Self {
        Self {
            name: input.name.clone(),
            email: input.email.clone(),
            phone: input.phone.clone().unwrap_or_default(),
            position: input.position.clone(),
            department_id: input.department_id.map(|id| id.to_string()).unwrap_or_default(),
            salary: input.salary.map(|s| s.to_string()).unwrap_or_default(),
            status: input.status.to_string(),
            password: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct TransactionForm {
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub category: String,
    pub amount: String,
    pub description: String,
    pub transaction_date: String,
}

impl Form for TransactionForm {
    type Output = TransactionInput;

    fn validate(&self) -> Result<TransactionInput, Vec<FieldError>> {
        let mut errors = Vec::new();
        let transaction_type = field("type", &self.transaction_type)
            .required("Tipo inválido")
            .one_of(TRANSACTION_TYPES, "Tipo inválido")
            .check(&mut errors)
            .and_then(|s| s.parse::<TransactionType>().ok());
        let category = field("category", &self.category)
            .trim()
            .required("Categoria é obrigatória")
            .max_len(100, "Categoria não pode ter mais de 100 caracteres")
            .check(&mut errors);
        let amount = field("amount", &self.amount)
            .trim()
            .required("Valor inválido")
            .numeric("Valor inválido")
            .positive("Valor deve ser maior que zero")
            .check(&mut errors)
            .and_then(parse_number);
        let description = field("description", &self.description)
            .trim()
            .max_len(500, "Descrição não pode ter mais de 500 caracteres")
            .check(&mut errors);
        let transaction_date = field("transaction_date", &self.transaction_date)
            .trim()
            .required("Data inválida")
            .date("Data inválida")
            .check(&mut errors)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());

        if !errors.is_empty() {
            return Err(errors);
        }
        match (transaction_type, amount, transaction_date) {
            (Some(transaction_type), Some(amount), Some(transaction_date)) => Ok(TransactionInput {
                transaction_type,
                category: category.unwrap_or_default().to_string(),
                amount,
                description: opt(description),
                transaction_date,
            }),
            _ => Err(vec![FieldError::new("type", "Erro de validação")]),
        }
    }
}

impl From<&TransactionInput> for TransactionForm {
    fn from(input: &TransactionInput) -> Self {
        Self {
            transaction_type: input.transaction_type.to_string(),
            category: input.category.clone(),
            amount: input.amount.to_string(),
            description: input.description.clone().unwrap_or_default(),
            transaction_date: input.transaction_date.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct FeedbackForm {
    pub category: String,
    pub message: String,
}

impl Form for FeedbackForm {
    type Output = FeedbackInput;

    fn validate(&self) -> Result<FeedbackInput, Vec<FieldError>> {
        let mut errors = Vec::new();
        let category = field("category", &self.category)
            .required("Por favor, selecione uma categoria")
            .one_of(FEEDBACK_CATEGORIES, "Por favor, selecione uma categoria")
            .check(&mut errors)
            .and_then(|s| s.parse::<FeedbackCategory>().ok());
        let message = field("message", &self.message)
            .trim()
            .required("Mensagem é obrigatória")
            .max_len(2000, "Mensagem não pode ter mais de 2000 caracteres")
            .check(&mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }
        match category {
            Some(category) => Ok(FeedbackInput {
                category,
                message: message.unwrap_or_default().to_string(),
            }),
            None => Err(vec![FieldError::new(
                "category",
                "Por favor, selecione uma categoria",
            )]),
        }
    }
}

impl From<&FeedbackInput> for FeedbackForm {
    fn from(input: &FeedbackInput) -> Self {
        Self {
            category: input.category.to_string(),
            message: input.message.clone(),
        }
    }
}
