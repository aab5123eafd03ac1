//! Error types for constructor-time contract violations.
//!
//! Per-tick faults (clamped arguments, missing targets, exhausted
//! non-blocking slots, stale play references, draw-order lookup misses) are
//! never surfaced as `Err` — they are absorbed locally as documented on the
//! relevant operation. Only host-service-absent failures at construction
//! time use this error type.

#[derive(thiserror::Error, Debug)]
pub enum SteinaError {
    #[error("required runtime service is missing: {service}")]
    MissingService { service: &'static str },

    #[error("target id {id:?} does not resolve to a video target")]
    NotAVideoTarget { id: crate::target::TargetId },

    #[error("target id {id:?} does not resolve to an audio target")]
    NotAnAudioTarget { id: crate::target::TargetId },
}

pub type Result<T> = std::result::Result<T, SteinaError>;
