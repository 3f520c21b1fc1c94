use std::fmt;

use crate::analysis::domain::analyzer_error::{AnalyzerError, ModelHint};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardState {
    Normal,
    Tripped,
}

/// Operator instructions for fetching a model the analyzer could not download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Remediation {
    pub hint: ModelHint,
    pub failures: u32,
}

impl fmt::Display for Remediation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Model download failed {} times; stopping.",
            self.failures
        )?;
        writeln!(f, "Download {} manually from:", self.hint.model_name)?;
        writeln!(f, "  {}", self.hint.url)?;
        writeln!(f, "and place it at:")?;
        write!(f, "  {}", self.hint.destination.display())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardVerdict {
    Continue,
    Tripped(Remediation),
}

/// Circuit breaker over analyzer failures.
///
/// Counts download-related failures and trips once the count reaches the
/// threshold. Other failures are logged and ignored. A tripped guard never
/// recovers.
#[derive(Debug)]
pub struct FailureGuard {
    threshold: u32,
    failures: u32,
    reset_on_success: bool,
    default_hint: ModelHint,
    tripped: Option<Remediation>,
}

impl FailureGuard {
    pub fn new(threshold: u32, default_hint: ModelHint) -> Result<Self, &'static str> {
        if threshold < 1 {
            return Err("failure threshold must be >= 1");
        }
        Ok(Self {
            threshold,
            failures: 0,
            reset_on_success: false,
            default_hint,
            tripped: None,
        })
    }

    pub fn with_reset_on_success(mut self, reset: bool) -> Self {
        self.reset_on_success = reset;
        self
    }

    pub fn record(&mut self, error: &AnalyzerError) -> GuardVerdict {
        if let Some(remediation) = &self.tripped {
            return GuardVerdict::Tripped(remediation.clone());
        }

        if !error.is_download_related() {
            log::warn!("Analysis failed: {error}");
            return GuardVerdict::Continue;
        }

        self.failures += 1;
        log::warn!(
            "Model download failed ({}/{}): {error}",
            self.failures,
            self.threshold
        );
        if self.failures < self.threshold {
            return GuardVerdict::Continue;
        }

        let remediation = Remediation {
            hint: error
                .model_hint()
                .cloned()
                .unwrap_or_else(|| self.default_hint.clone()),
            failures: self.failures,
        };
        self.tripped = Some(remediation.clone());
        GuardVerdict::Tripped(remediation)
    }

    /// Clears the failure count, but only when reset-on-success is enabled.
    pub fn record_success(&mut self) {
        if self.reset_on_success && self.tripped.is_none() && self.failures > 0 {
            log::debug!("Analysis succeeded; clearing {} download failures", self.failures);
            self.failures = 0;
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn state(&self) -> GuardState {
        if self.tripped.is_some() {
            GuardState::Tripped
        } else {
            GuardState::Normal
        }
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.is_some()
    }
}
