//! Repository implementations for receivables persistence

pub mod receivables;

pub use receivables::ReceivablesRepository;
