//! Writes the TypeScript declarations of every API type to
//! `shared/types.ts`. Pass `--check` to fail instead when the file is stale.

use std::{env, fs, path::PathBuf, process::ExitCode};

use ts_rs::TS;

fn generate_types_content() -> String {
    let decls = [
        db::models::student::StudentStatus::decl(),
        db::models::student::Student::decl(),
        db::models::student::StudentInput::decl(),
        db::models::staff::StaffStatus::decl(),
        db::models::staff::StaffMember::decl(),
        db::models::staff::StaffInput::decl(),
        db::models::transaction::TransactionType::decl(),
        db::models::transaction::Transaction::decl(),
        db::models::transaction::TransactionInput::decl(),
        db::models::transaction::CategoryTotal::decl(),
        db::models::department::Department::decl(),
        db::models::feedback::FeedbackCategory::decl(),
        db::models::feedback::FeedbackInput::decl(),
        db::models::user_account::UserRole::decl(),
        utils::response::ApiResponse::<()>::decl(),
        utils::response::ErrorInfo::decl(),
        utils::response::FieldIssue::decl(),
        services::services::validation::FieldError::decl(),
        services::services::validation::LoginForm::decl(),
        services::services::validation::StudentForm::decl(),
        services::services::validation::StaffForm::decl(),
        services::services::validation::TransactionForm::decl(),
        services::services::validation::FeedbackForm::decl(),
        services::services::data_service::SessionInfo::decl(),
        services::services::auth::IssuedToken::decl(),
        services::services::session::Session::decl(),
        services::services::route_guard::AppRoute::decl(),
        services::services::route_guard::GuardDecision::decl(),
        services::services::table::SortDirection::decl(),
        services::services::table::PageItem::decl(),
        services::services::crud::NotificationLevel::decl(),
        services::services::crud::Notification::decl(),
        services::services::staff_accounts::CreateStaffUserRequest::decl(),
        services::services::staff_accounts::CreatedStaffUser::decl(),
        services::services::stats::StudentCounts::decl(),
        services::services::stats::StaffCounts::decl(),
        services::services::stats::FinanceSummary::decl(),
        services::services::stats::InstitutionStats::decl(),
        services::services::finance_report::BalanceReport::decl(),
        services::services::recommendations::Recommendations::decl(),
        server::routes::departments::CreateDepartment::decl(),
    ];
    let body = decls
        .iter()
        .map(|decl| format!("export {decl}"))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("// This file was generated by `generate_types`. Do not edit.\n\n{body}\n")
}

fn main() -> ExitCode {
    let check = env::args().any(|arg| arg == "--check");
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../shared/types.ts");
    let content = generate_types_content();

    if check {
        let current = fs::read_to_string(&path).unwrap_or_default();
        if current == content {
            println!("{} is up to date", path.display());
            return ExitCode::SUCCESS;
        }
        eprintln!("{} is stale, run generate_types", path.display());
        return ExitCode::FAILURE;
    }

    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("cannot create {}: {e}", dir.display());
            return ExitCode::FAILURE;
        }
    }
    match fs::write(&path, content) {
        Ok(()) => {
            println!("wrote {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("cannot write {}: {e}", path.display());
            ExitCode::FAILURE
        }
    }
}
