pub mod extract;
pub mod generate;
pub mod mail;
pub mod retry;
