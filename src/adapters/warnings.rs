use crate::domain::model::Warning;
use crate::domain::ports::WarningSink;
use std::sync::Mutex;

/// Emits every warning as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWarningSink;

impl WarningSink for TracingWarningSink {
    fn report(&self, warning: &Warning) {
        match warning {
            Warning::OrphanedReference { .. } | Warning::IndexDrift { .. } => {
                tracing::warn!(kind = "data_integrity", "⚠️ {}", warning)
            }
            Warning::FacetsUnavailable { .. } => {
                tracing::warn!(kind = "degraded", "⚠️ {}", warning)
            }
        }
    }
}

/// Keeps reported warnings in memory and forwards them to tracing.
#[derive(Debug, Default)]
pub struct RecordingWarningSink {
    warnings: Mutex<Vec<Warning>>,
}

impl RecordingWarningSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn take(&self) -> Vec<Warning> {
        std::mem::take(&mut *self.warnings.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl WarningSink for RecordingWarningSink {
    fn report(&self, warning: &Warning) {
        TracingWarningSink.report(warning);
        self.warnings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(warning.clone());
    }
}
