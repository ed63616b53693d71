use tokio::time::Instant;

/// Result of executing one module action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Whether the action succeeded.
    pub ok: bool,

    /// Value produced by a reading action. Present on a failed expectation
    /// check too, so callers can log what was actually read.
    pub extracted: Option<String>,

    /// Diagnostic message for a failed action.
    pub detail: Option<String>,

    /// Wall time of the action including its pre-wait.
    pub latency_ms: u64,
}

impl ActionOutcome {
    pub fn success(extracted: Option<String>) -> Self {
        Self {
            ok: true,
            extracted,
            ..Self::default()
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: Some(detail.into()),
            ..Self::default()
        }
    }

    pub fn with_extracted(mut self, extracted: impl Into<String>) -> Self {
        self.extracted = Some(extracted.into());
        self
    }

    pub fn finish(mut self, started: Instant) -> Self {
        self.latency_ms = started.elapsed().as_millis() as u64;
        self
    }
}
