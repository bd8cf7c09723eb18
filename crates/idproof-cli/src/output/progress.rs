//! Stage progress adapter using indicatif.

use indicatif::{ProgressBar, ProgressStyle};
use idproof_core::{ProgressSink, StageEvent};

/// Reports pipeline stages on stderr.
///
/// With a spinner, each stage replaces the spinner message. Without one,
/// only notable events are printed as plain lines.
pub struct StageProgress {
    spinner: Option<ProgressBar>,
    quiet: bool,
}

impl StageProgress {
    /// Creates a progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, suppress all output
    /// * `show_spinner` - If true, show a spinner; otherwise print plain lines
    #[must_use]
    pub fn new(quiet: bool, show_spinner: bool) -> Self {
        if quiet {
            return Self {
                spinner: None,
                quiet: true,
            };
        }

        let spinner = show_spinner.then(|| {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}")
            {
                bar.set_style(style);
            }
            bar
        });

        Self { spinner, quiet }
    }

    fn message(event: &StageEvent) -> Option<String> {
        let text = match event {
            StageEvent::SessionStarted { session } => format!("session {session} started"),
            StageEvent::DocumentReceived { .. } => "reading document".to_string(),
            StageEvent::DobExtracted {
                confidence, age, ..
            } => format!("date of birth found (age {age}, confidence {confidence})"),
            StageEvent::DobMissing { reason, .. } => format!("no date of birth: {reason}"),
            StageEvent::SelfieReceived { .. } => "checking selfie".to_string(),
            StageEvent::QualityAssessed { issues, .. } => {
                format!("quality assessed ({issues} issue(s))")
            }
            StageEvent::FacesCompared {
                verified,
                confidence,
                degraded,
                ..
            } => {
                let suffix = if *degraded { ", degraded" } else { "" };
                format!("faces compared (match {verified}, confidence {confidence}{suffix})")
            }
            StageEvent::AgeEstimated { age, degraded, .. } => match (age, degraded) {
                (Some(a), false) => format!("visual age {a}"),
                (Some(a), true) => format!("visual age {a} (fallback)"),
                (None, _) => "visual age unavailable".to_string(),
            },
            StageEvent::Verdict { status, .. } => format!("verdict: {status:?}"),
            StageEvent::SessionsSwept { evicted } => {
                if *evicted == 0 {
                    return None;
                }
                format!("{evicted} expired session(s) removed")
            }
        };
        Some(text)
    }
}

impl ProgressSink for StageProgress {
    fn on_event(&self, event: StageEvent) {
        if self.quiet {
            return;
        }

        let Some(message) = Self::message(&event) else {
            return;
        };

        match (&self.spinner, &event) {
            (Some(bar), StageEvent::Verdict { .. }) => bar.finish_with_message(message),
            (Some(bar), _) => {
                bar.set_message(message);
                bar.tick();
            }
            (None, StageEvent::DobMissing { .. } | StageEvent::Verdict { .. }) => {
                eprintln!("{message}");
            }
            (None, _) => {}
        }
    }
}
