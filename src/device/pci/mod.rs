pub mod address;
pub mod config_space;
pub mod constants;
pub mod diagnostic;
pub mod doorbell;
pub mod error;
pub mod interrupts;
pub mod mpt3sas;
pub mod registers;
pub mod traits;
