pub mod confirm;
pub mod password;
pub mod token;
