pub mod ai_client;
pub mod auth;
pub mod client_config;
pub mod crud;
pub mod data_service;
pub mod database_validator;
pub mod error_classifier;
pub mod finance_report;
pub mod http_data;
pub mod recommendations;
pub mod route_guard;
pub mod session;
pub mod sqlite_data;
pub mod staff_accounts;
pub mod stats;
pub mod table;
pub mod token_store;
pub mod validation;
