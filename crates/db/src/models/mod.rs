pub mod department;
pub mod feedback;
pub mod staff;
pub mod student;
pub mod transaction;
pub mod user_account;
