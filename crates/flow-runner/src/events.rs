use recordflow_core_types::RunId;

/// Lifecycle and log events published during a run.
///
/// Delivered on a `tokio::sync::broadcast` channel so any number of
/// observers (UI, logs, tests) can subscribe without coupling the engine to
/// a toolkit.
#[derive(Clone, Debug)]
pub enum FlowEvent {
    /// A run was accepted and its worker spawned.
    Started { run_id: RunId, total: usize },

    /// One record finished, successfully or not. The run continues either
    /// way.
    RecordFinished {
        run_id: RunId,
        /// 1-based position in source order.
        index: usize,
        total: usize,
        ok: bool,
        detail: Option<String>,
    },

    /// The worker exited: records exhausted or the run was stopped.
    Finished { run_id: RunId, processed: usize },
}

impl FlowEvent {
    /// Human-readable log line for observers that only display text.
    pub fn message(&self) -> String {
        match self {
            FlowEvent::Started { total, .. } => {
                format!("run started: {total} record(s)")
            }
            FlowEvent::RecordFinished {
                index,
                total,
                ok,
                detail,
                ..
            } => match detail {
                Some(detail) => format!(
                    "record {index}/{total}: {} ({detail})",
                    if *ok { "ok" } else { "failed" }
                ),
                None => format!("record {index}/{total}: {}", if *ok { "ok" } else { "failed" }),
            },
            FlowEvent::Finished { processed, .. } => {
                format!("run finished: {processed} record(s) processed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_read_as_log_lines() {
        let run_id = RunId::new();
        assert_eq!(
            FlowEvent::Started {
                run_id: run_id.clone(),
                total: 2
            }
            .message(),
            "run started: 2 record(s)"
        );

        let failed = FlowEvent::RecordFinished {
            run_id: run_id.clone(),
            index: 1,
            total: 2,
            ok: false,
            detail: Some("element not found: #gone".to_string()),
        };
        assert_eq!(
            failed.message(),
            "record 1/2: failed (element not found: #gone)"
        );

        assert_eq!(
            FlowEvent::Finished { run_id, processed: 2 }.message(),
            "run finished: 2 record(s) processed"
        );
    }
}
