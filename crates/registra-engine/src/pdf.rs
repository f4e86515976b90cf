//! # PDF Renderer
//!
//! Optional collaborator for Z-report exports. When no renderer is
//! configured the service falls back to the deterministic plain-text
//! rendering from registra-core.

use async_trait::async_trait;
use registra_core::{CompanyInfo, ZReport};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF rendering failed: {0}")]
    RenderFailed(String),
}

/// Z-report PDF renderer.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render_z_report(
        &self,
        report: &ZReport,
        company: &CompanyInfo,
    ) -> Result<Vec<u8>, PdfError>;
}
