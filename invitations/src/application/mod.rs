// Application layer - the lifecycle manager and its driven ports
// Orchestrates domain logic, depends on domain layer only

pub mod filter;
pub mod manager;
pub mod ports;
pub mod timers;
