// Domain-specific error types
pub mod errors;

// Feature schema shared by reducer and exports
pub mod ml;

// Return statistics
pub mod performance;

// Core pipeline entities
pub mod types;

// Input validation
pub mod validation;
