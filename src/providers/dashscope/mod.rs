mod backend;
pub mod types;

pub use backend::{DashScopeBackend, DashScopeParser};
