//! Progress reporting port for UI integration.

use crate::domain::{OverallStatus, SessionId};

/// Events emitted as a session moves through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum StageEvent {
    /// A session was created.
    SessionStarted {
        /// Session id.
        session: SessionId,
    },
    /// The document image was stored and OCR is starting.
    DocumentReceived {
        /// Session id.
        session: SessionId,
    },
    /// A date of birth was extracted.
    DobExtracted {
        /// Session id.
        session: SessionId,
        /// Extraction confidence.
        confidence: u8,
        /// Derived age.
        age: u32,
    },
    /// No usable date of birth was found.
    DobMissing {
        /// Session id.
        session: SessionId,
        /// Reason.
        reason: String,
    },
    /// The selfie was stored and checks are starting.
    SelfieReceived {
        /// Session id.
        session: SessionId,
    },
    /// Selfie quality was assessed.
    QualityAssessed {
        /// Session id.
        session: SessionId,
        /// Number of issues found.
        issues: usize,
    },
    /// Faces were compared.
    FacesCompared {
        /// Session id.
        session: SessionId,
        /// Match verdict.
        verified: bool,
        /// Match confidence.
        confidence: f64,
        /// Whether the verdict is a neutral stand-in.
        degraded: bool,
    },
    /// Visual age was estimated.
    AgeEstimated {
        /// Session id.
        session: SessionId,
        /// Calibrated age, if any.
        age: Option<u32>,
        /// Whether the estimate is a stand-in.
        degraded: bool,
    },
    /// The final verdict was recorded.
    Verdict {
        /// Session id.
        session: SessionId,
        /// Verdict.
        status: OverallStatus,
    },
    /// Expired sessions were evicted.
    SessionsSwept {
        /// Number of sessions removed.
        evicted: usize,
    },
}

/// Port for receiving progress events.
pub trait ProgressSink: Send + Sync {
    /// Called when a progress event occurs.
    fn on_event(&self, event: StageEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn on_event(&self, _event: StageEvent) {}
}
