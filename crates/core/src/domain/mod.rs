pub mod contract;
pub mod expense;
