//! Admission control over the opportunity feed

mod listener;

pub use listener::{AdmissionListener, ProcessFn};
