//! # Z-Report Service
//!
//! Generates and exports reconciliation reports. The report itself is
//! DERIVED: the service fetches the session's rows once and hands them
//! to the pure aggregation in registra-core, so generating twice from
//! unchanged rows yields identical reports, open or closed.

use std::sync::Arc;

use registra_core::{build_z_report, render_text, CompanyInfo, ZReport};
use tracing::debug;

use crate::error::{EngineError, EngineResult, RepoError};
use crate::pdf::PdfRenderer;
use crate::repository::{PaymentRepository, SessionRepository, TransactionRepository};
use crate::session::SessionManager;

pub struct ZReportService {
    sessions: Arc<dyn SessionRepository>,
    transactions: Arc<dyn TransactionRepository>,
    payments: Arc<dyn PaymentRepository>,
    manager: Arc<SessionManager>,
    /// Optional; the deterministic text rendering is the fallback.
    renderer: Option<Arc<dyn PdfRenderer>>,
    company: CompanyInfo,
}

impl ZReportService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        transactions: Arc<dyn TransactionRepository>,
        payments: Arc<dyn PaymentRepository>,
        manager: Arc<SessionManager>,
        renderer: Option<Arc<dyn PdfRenderer>>,
        company: CompanyInfo,
    ) -> Self {
        ZReportService {
            sessions,
            transactions,
            payments,
            manager,
            renderer,
            company,
        }
    }

    /// Builds the report from the session's current rows.
    ///
    /// Works on any session status; on an open session this is the
    /// live drawer preview.
    pub async fn generate(&self, session_id: &str) -> EngineResult<ZReport> {
        let session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| EngineError::from(RepoError::not_found("Session", session_id)))?;
        let transactions = self.transactions.find_by_session(session_id).await?;
        let payments = self.payments.find_by_session(session_id).await?;

        debug!(
            session_number = %session.session_number,
            transactions = transactions.len(),
            payments = payments.len(),
            "Building Z-report"
        );
        Ok(build_z_report(&session, &transactions, &payments))
    }

    /// Report as pretty-printed JSON.
    pub async fn export_json(&self, session_id: &str) -> EngineResult<String> {
        let report = self.generate(session_id).await?;
        serde_json::to_string_pretty(&report)
            .map_err(|e| RepoError::Storage(e.to_string()).into())
    }

    /// Report as PDF bytes, or the plain-text rendering when no PDF
    /// renderer is configured.
    pub async fn export_pdf(&self, session_id: &str) -> EngineResult<Vec<u8>> {
        let report = self.generate(session_id).await?;
        match &self.renderer {
            Some(renderer) => Ok(renderer
                .render_z_report(&report, &self.company)
                .await
                .map_err(|e| RepoError::Storage(e.to_string()))?),
            None => Ok(render_text(&report, &self.company).into_bytes()),
        }
    }

    /// Manager sign-off on a pending variance.
    pub async fn approve_variance(
        &self,
        session_id: &str,
        actor: &str,
    ) -> EngineResult<registra_core::Session> {
        self.manager.approve_variance(session_id, actor).await
    }

    /// Manager rejection; the session reopens for a recount.
    pub async fn reject_variance(
        &self,
        session_id: &str,
        actor: &str,
    ) -> EngineResult<registra_core::Session> {
        self.manager.reject_variance(session_id, actor).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::TracingAuditLog;
    use crate::locks::LockRegistry;
    use crate::memory::{
        MemoryPaymentRepository, MemorySessionRepository, MemoryTransactionRepository,
    };
    use crate::pdf::PdfError;
    use async_trait::async_trait;
    use chrono::Utc;
    use registra_core::{Money, Payment, PaymentMethod};

    fn company() -> CompanyInfo {
        CompanyInfo {
            name: "Registra Demo Kft.".to_string(),
            tax_number: "12345678-2-42".to_string(),
            address: "Fo utca 1, Budapest".to_string(),
        }
    }

    struct Fixture {
        service: ZReportService,
        payments: Arc<MemoryPaymentRepository>,
        manager: Arc<SessionManager>,
    }

    fn fixture(renderer: Option<Arc<dyn PdfRenderer>>) -> Fixture {
        let sessions = Arc::new(MemorySessionRepository::new());
        let transactions = Arc::new(MemoryTransactionRepository::new());
        let payments = Arc::new(MemoryPaymentRepository::new());
        let manager = Arc::new(SessionManager::new(
            Arc::clone(&sessions) as Arc<dyn SessionRepository>,
            Arc::clone(&payments) as Arc<dyn PaymentRepository>,
            Arc::new(TracingAuditLog),
            Arc::new(LockRegistry::new()),
        ));
        let service = ZReportService::new(
            sessions,
            transactions,
            Arc::clone(&payments) as Arc<dyn PaymentRepository>,
            Arc::clone(&manager),
            renderer,
            company(),
        );
        Fixture {
            service,
            payments,
            manager,
        }
    }

    #[tokio::test]
    async fn test_generate_live_preview_and_after_close() {
        let fx = fixture(None);
        let session = fx
            .manager
            .open_session("tenant-1", "loc-1", Money::from_minor(50000), "user-1")
            .await
            .unwrap();
        fx.payments
            .insert(&Payment::new(
                "txn-1",
                &session.id,
                PaymentMethod::Cash,
                Money::from_minor(12700),
                Utc::now(),
            ))
            .await
            .unwrap();

        let live = fx.service.generate(&session.id).await.unwrap();
        assert_eq!(live.reconciliation.expected_balance.minor(), 62700);
        assert!(live.reconciliation.closing_balance.is_none());

        fx.manager
            .close_session(&session.id, Money::from_minor(62700), None, "user-1")
            .await
            .unwrap();

        let closed = fx.service.generate(&session.id).await.unwrap();
        assert_eq!(closed.reconciliation.closing_balance.unwrap().minor(), 62700);
        assert_eq!(closed.reconciliation.variance.unwrap().minor(), 0);

        // Same rows, same report.
        let again = fx.service.generate(&session.id).await.unwrap();
        assert_eq!(
            serde_json::to_string(&closed).unwrap(),
            serde_json::to_string(&again).unwrap()
        );
    }

    #[tokio::test]
    async fn test_export_json_is_valid() {
        let fx = fixture(None);
        let session = fx
            .manager
            .open_session("tenant-1", "loc-1", Money::zero(), "user-1")
            .await
            .unwrap();

        let json = fx.service.export_json(&session.id).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["sessionNumber"], session.session_number.as_str());
    }

    #[tokio::test]
    async fn test_export_pdf_falls_back_to_text() {
        let fx = fixture(None);
        let session = fx
            .manager
            .open_session("tenant-1", "loc-1", Money::zero(), "user-1")
            .await
            .unwrap();

        let bytes = fx.service.export_pdf(&session.id).await.unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Z-REPORT"));
        assert!(text.contains(&session.session_number));
    }

    struct StubRenderer;

    #[async_trait]
    impl PdfRenderer for StubRenderer {
        async fn render_z_report(
            &self,
            _report: &ZReport,
            _company: &CompanyInfo,
        ) -> Result<Vec<u8>, PdfError> {
            Ok(b"%PDF-stub".to_vec())
        }
    }

    #[tokio::test]
    async fn test_export_pdf_uses_configured_renderer() {
        let fx = fixture(Some(Arc::new(StubRenderer)));
        let session = fx
            .manager
            .open_session("tenant-1", "loc-1", Money::zero(), "user-1")
            .await
            .unwrap();

        let bytes = fx.service.export_pdf(&session.id).await.unwrap();
        assert_eq!(bytes, b"%PDF-stub");
    }

    #[tokio::test]
    async fn test_variance_review_delegates_to_manager() {
        let fx = fixture(None);
        let session = fx
            .manager
            .open_session("tenant-1", "loc-1", Money::from_minor(50000), "user-1")
            .await
            .unwrap();
        fx.manager
            .close_session(
                &session.id,
                Money::from_minor(52000),
                Some("till overage".to_string()),
                "user-1",
            )
            .await
            .unwrap();

        let approved = fx
            .service
            .approve_variance(&session.id, "manager-1")
            .await
            .unwrap();
        assert_eq!(approved.status, registra_core::SessionStatus::Closed);
    }
}
