use crate::{config::LoggerConfig, redactor::IdentifierRedactor};

/// Target every decision event is emitted on, so hosts can route audit records
/// separately (`RUST_LOG=rebac::audit=info`).
pub const AUDIT_TARGET: &str = "rebac::audit";

/// One authorization decision as seen by the audit log
#[derive(Debug, Clone, Copy)]
pub struct DecisionRecord<'a> {
    pub object_type: &'a str,
    pub object_id: &'a str,
    pub relation: &'a str,
    pub subject_type: &'a str,
    pub subject_id: &'a str,
    pub allowed: bool,
    /// Short machine-readable outcome name, e.g. `relation_granted`
    pub outcome: &'a str,
    /// Human-readable reason returned to the caller
    pub reason: &'a str,
}

/// Writes decision audit events, redacting identifiers when configured to
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionAuditor {
    redactor: IdentifierRedactor,
}

impl DecisionAuditor {
    pub fn new(redactor: IdentifierRedactor) -> Self {
        Self { redactor }
    }

    pub fn from_config(config: &LoggerConfig) -> Self {
        Self::new(IdentifierRedactor::new(config.redact_identifiers))
    }

    pub fn redactor(&self) -> &IdentifierRedactor {
        &self.redactor
    }

    pub fn record(&self, record: &DecisionRecord<'_>) {
        let object_id = self.redactor.redact(record.object_id);
        let subject_id = self.redactor.redact(record.subject_id);
        let reason = self
            .redactor
            .redact_in(record.reason, &[record.object_id, record.subject_id]);

        if record.allowed {
            tracing::info!(
                target: AUDIT_TARGET,
                object_type = record.object_type,
                object_id = %object_id,
                relation = record.relation,
                subject_type = record.subject_type,
                subject_id = %subject_id,
                outcome = record.outcome,
                reason = %reason,
                "access granted"
            );
        } else {
            tracing::info!(
                target: AUDIT_TARGET,
                object_type = record.object_type,
                object_id = %object_id,
                relation = record.relation,
                subject_type = record.subject_type,
                subject_id = %subject_id,
                outcome = record.outcome,
                reason = %reason,
                "access denied"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture(auditor: DecisionAuditor, record: DecisionRecord<'_>) -> String {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || auditor.record(&record));
        buffer.contents()
    }

    fn owner_grant() -> DecisionRecord<'static> {
        DecisionRecord {
            object_type: "AUDIENCE",
            object_id: "AUD-1",
            relation: "owner",
            subject_type: "USER",
            subject_id: "USER-1",
            allowed: true,
            outcome: "relation_granted",
            reason: "USER 'UUID-1' is the owner of resource 'UUID-1'",
        }
    }

    #[test]
    fn test_grant_is_logged_on_audit_target() {
        let output = capture(DecisionAuditor::default(), owner_grant());

        assert!(output.contains("access granted"));
        assert!(output.contains(AUDIT_TARGET));
        assert!(output.contains("USER-1"));
    }

    #[test]
    fn test_denial_with_redaction_hides_identifiers() {
        let record = DecisionRecord {
            allowed: false,
            outcome: "subject_not_found",
            reason: "USER not found with id 'USER-42'",
            subject_id: "USER-42",
            ..owner_grant()
        };
        let auditor = DecisionAuditor::new(IdentifierRedactor::new(true));
        let output = capture(auditor, record);

        assert!(output.contains("access denied"));
        assert!(!output.contains("USER-42"));
        assert!(!output.contains("AUD-1"));
    }
}
