//! Core logic: value conversion, settings reconciliation and the record service.

pub mod configuration;
pub mod convert;
pub mod reconcile;
