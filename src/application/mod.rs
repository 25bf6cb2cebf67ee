pub mod cascade;
pub mod error;
pub mod ids;
pub mod notebooks;
pub mod notes;
pub mod peers;
pub mod repos;
pub mod retry;
pub mod validation;
