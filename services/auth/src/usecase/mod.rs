pub mod challenge;
pub mod credentials;
pub mod login;
pub mod token;
pub mod twofactor;
