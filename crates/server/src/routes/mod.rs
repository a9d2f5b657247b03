use axum::{Router, middleware::from_fn_with_state};
use services::services::validation::Form;

use crate::{error::ApiError, middleware::auth::require_session, state::AppState};

pub mod auth;
pub mod dashboard;
pub mod departments;
pub mod feedback;
pub mod finances;
pub mod functions;
pub mod health;
pub mod staff;
pub mod students;

/// Re-run the form rules on a JSON body, so the server enforces the same
/// constraints as the client forms.
pub(crate) fn validated<F, I>(input: &I) -> Result<F::Output, ApiError>
where
    F: Form + for<'a> From<&'a I>,
{
    F::from(input).validate().map_err(ApiError::Validation)
}

/// Every route, mounted under `/api`.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(auth::router(&state))
        .merge(students::router(&state))
        .merge(staff::router(&state))
        .merge(departments::router(&state))
        .merge(finances::router(&state))
        .merge(dashboard::router(&state))
        .merge(feedback::router(&state))
        .merge(functions::router(&state))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    let api = Router::new()
        .merge(health::router())
        .merge(auth::public_router())
        .merge(protected);

    Router::new().nest("/api", api).with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use std::sync::Arc;

    use chrono::Duration;
    use db::{
        DBService,
        models::{
            student::{StudentInput, StudentStatus},
            user_account::{CreateUserAccount, UserAccount, UserRole},
        },
    };
    use serde_json::{Value, json};
    use services::services::{
        auth::{AuthService, hash_password},
        client_config::ClientConfig,
        crud::{CrudController, NotificationLog, StudentController},
        data_service::Credentials,
        error_classifier::{AuthError, ClientError, Conflict, messages},
        http_data::HttpDataService,
        session::{SessionHolder, SessionState},
        token_store::{MemoryTokenStore, TokenStore},
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;

    const PASSWORD: &str = "segredo123";

    async fn app() -> (Router, AppState) {
        let db = DBService::new_in_memory().await.unwrap();
        let auth = AuthService::new(db.pool.clone(), "test-secret", Duration::minutes(30));
        auth.ensure_admin("admin@escola.pt", PASSWORD).await.unwrap();
        let account = CreateUserAccount {
            email: "prof@escola.pt".into(),
            password_hash: hash_password(PASSWORD).unwrap(),
            full_name: None,
            role: Some(UserRole::Staff),
        };
        UserAccount::create(&db.pool, &account, Uuid::new_v4()).await.unwrap();
        let state = AppState::new(db, auth, None);
        (router(state.clone()), state)
    }

    async fn token(state: &AppState, email: &str) -> String {
        state.auth().login(email, PASSWORD).await.unwrap().access_token
    }

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn get(path: &str, token: &str) -> Request<Body> {
        Request::get(path)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    fn send_json(method: &str, path: &str, token: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _) = app().await;
        let request = Request::get("/api/health").body(Body::empty()).unwrap();
        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn token_endpoint_takes_a_form() {
        let (app, _) = app().await;
        let request = Request::post("/api/auth/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("username=admin%40escola.pt&password={PASSWORD}")))
            .unwrap();
        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["token_type"], "bearer");

        let request = Request::post("/api/auth/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("username=admin%40escola.pt&password=errada123"))
            .unwrap();
        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], messages::INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let (app, _) = app().await;
        let request = Request::get("/api/students").body(Body::empty()).unwrap();
        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, _) = call(&app, get("/api/students", "not-a-jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn session_reports_role() {
        let (app, state) = app().await;
        let staff = token(&state, "prof@escola.pt").await;
        let (status, body) = call(&app, get("/api/auth/session", &staff)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "prof@escola.pt");
        assert_eq!(body["data"]["role"], "staff");
    }

    #[tokio::test]
    async fn staff_role_never_sees_finances() {
        let (app, state) = app().await;
        let admin = token(&state, "admin@escola.pt").await;
        let staff = token(&state, "prof@escola.pt").await;

        let revenue = json!({
            "type": "revenue",
            "category": "Propinas",
            "amount": 150.0,
            "description": null,
            "transaction_date": "2025-03-01",
        });
        let (status, _) = call(&app, send_json("POST", "/api/finances/transactions", &admin, revenue)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, get("/api/finances/transactions", &staff)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["data"].is_null());
        assert_eq!(body["message"], messages::PERMISSION_DENIED);

        let (_, body) = call(&app, get("/api/dashboard/stats", &staff)).await;
        assert!(body["data"].get("finances").is_none());
        let (_, body) = call(&app, get("/api/dashboard/stats", &admin)).await;
        assert_eq!(body["data"]["finances"]["total_revenue"], 150.0);

        let (status, body) = call(&app, get("/api/finances/balance/monthly?year=2025&month=3", &admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["balance"], 150.0);
        let (status, _) = call(&app, get("/api/finances/balance/monthly?year=2025&month=13", &admin)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn student_crud_with_admin_only_delete() {
        let (app, state) = app().await;
        let admin = token(&state, "admin@escola.pt").await;
        let staff = token(&state, "prof@escola.pt").await;
        let student = json!({
            "name": "  Marta ",
            "email": "marta@escola.pt",
            "phone": null,
            "course": "Informática",
            "status": "active",
        });

        let (status, body) = call(&app, send_json("POST", "/api/students", &staff, student.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Marta");
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = call(&app, send_json("POST", "/api/students", &staff, student)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error_data"]["code"], "23505");
        assert_eq!(body["message"], messages::UNIQUE);

        let path = format!("/api/students/{id}");
        let delete = |token: &str| {
            Request::delete(path.as_str())
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap()
        };
        let (status, _) = call(&app, delete(&staff)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = call(&app, delete(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(&app, delete(&admin)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error_data"]["code"], "PGRST116");
    }

    #[tokio::test]
    async fn invalid_bodies_list_field_errors() {
        let (app, state) = app().await;
        let admin = token(&state, "admin@escola.pt").await;
        let expense = json!({
            "type": "expense",
            "category": "Luz",
            "amount": -5.0,
            "description": null,
            "transaction_date": "2025-03-01",
        });
        let (status, body) = call(&app, send_json("POST", "/api/finances/transactions", &admin, expense)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_data"]["code"], "validation_failed");
        assert_eq!(body["error_data"]["fields"][0]["field"], "amount");
    }

    #[tokio::test]
    async fn create_staff_user_function_is_admin_only() {
        let (app, state) = app().await;
        let admin = token(&state, "admin@escola.pt").await;
        let staff = token(&state, "prof@escola.pt").await;
        let payload = json!({
            "name": "Nuno",
            "email": "nuno@escola.pt",
            "phone": null,
            "position": "Professor",
            "department_id": null,
            "salary": 1500.0,
            "status": "active",
            "password": PASSWORD,
        });

        let path = "/api/functions/create-staff-user";
        let (status, _) = call(&app, send_json("POST", path, &staff, payload.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = call(&app, send_json("POST", path, &admin, payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "nuno@escola.pt");

        // The new member can sign in straight away.
        assert!(state.auth().login("nuno@escola.pt", PASSWORD).await.is_ok());

        let (status, _) = call(&app, send_json("POST", "/api/functions/ai-recommendations", &admin, json!({}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn feedback_is_recorded_for_the_caller() {
        let (app, state) = app().await;
        let staff = token(&state, "prof@escola.pt").await;
        let body = json!({ "category": "suggestion", "message": "Exportar para Excel" });
        let (status, _) = call(&app, send_json("POST", "/api/feedback", &staff, body)).await;
        assert_eq!(status, StatusCode::OK);
        let recent = db::models::feedback::Feedback::find_recent(&state.db().pool, 5).await.unwrap();
        assert_eq!(recent.len(), 1);
    }

    #[tokio::test]
    async fn http_client_round_trip() {
        let (app, _) = app().await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let config = ClientConfig {
            api_base_url: format!("http://{addr}"),
            ..ClientConfig::default()
        };
        let tokens = Arc::new(MemoryTokenStore::default());
        let http = Arc::new(HttpDataService::new(&config, tokens.clone()).unwrap());
        let holder = SessionHolder::new(http.clone(), tokens.clone());
        holder.init();

        let wrong = Credentials {
            email: "admin@escola.pt".into(),
            password: "errada123".into(),
        };
        assert_eq!(holder.login(&wrong).await.unwrap_err(), AuthError::InvalidCredentials);
        assert_eq!(tokens.load(), None);
        assert_eq!(holder.state(), SessionState::Anonymous);

        let right = Credentials {
            email: "admin@escola.pt".into(),
            password: PASSWORD.into(),
        };
        let session = holder.login(&right).await.unwrap();
        assert_eq!(session.role, Some(UserRole::GlobalAdmin));
        assert!(tokens.load().is_some());

        let log = Arc::new(NotificationLog::default());
        let mut students: StudentController<HttpDataService> = CrudController::new(http.clone(), log.clone());
        let input = StudentInput {
            name: "Marta".into(),
            email: Some("marta@escola.pt".into()),
            phone: None,
            course: Some("Informática".into()),
            status: StudentStatus::Active,
        };
        let created = students.persist(None, &input).await.unwrap();
        assert_eq!(students.rows().len(), 1);

        let err = students.persist(None, &input).await.unwrap_err();
        assert_eq!(err, ClientError::DataConflict(Conflict::Unique));
        assert_eq!(log.last().unwrap().message, messages::UNIQUE);

        let confirmation = students.request_delete(created.id);
        students.confirm_delete(confirmation).await.unwrap();
        assert!(students.rows().is_empty());

        let refreshed = holder.refresh().await.unwrap();
        assert_eq!(refreshed.session().unwrap().identity, "admin@escola.pt");
    }
}
