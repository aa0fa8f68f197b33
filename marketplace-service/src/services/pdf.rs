use async_trait::async_trait;
use service_core::error::AppError;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use uuid::Uuid;

#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str) -> Result<Vec<u8>, AppError>;
}

/// Prints HTML to PDF with a headless Chromium.
///
/// Page size and margins come from the document's `@page` rule.
pub struct ChromiumPdfRenderer {
    binary: String,
    timeout: Duration,
    work_dir: PathBuf,
}

impl ChromiumPdfRenderer {
    pub fn new(binary: impl Into<String>, timeout: Duration, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            work_dir: work_dir.into(),
        }
    }

    async fn print(&self, html_path: &PathBuf, pdf_path: &PathBuf) -> Result<(), AppError> {
        let print_arg = format!("--print-to-pdf={}", pdf_path.display());
        let source = format!("file://{}", html_path.display());
        let args = [
            "--headless",
            "--disable-gpu",
            "--no-sandbox",
            "--no-pdf-header-footer",
            print_arg.as_str(),
            source.as_str(),
        ];

        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            program = %self.binary,
            timeout_secs = %self.timeout.as_secs(),
            "Rendering PDF"
        );

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                AppError::InternalError(anyhow::anyhow!(
                    "PDF rendering timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(program = %self.binary, stderr = %stderr, "PDF rendering failed");
            return Err(AppError::InternalError(anyhow::anyhow!(
                "PDF rendering failed: {}",
                stderr
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PdfRenderer for ChromiumPdfRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>, AppError> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let id = Uuid::new_v4();
        let html_path = self.work_dir.join(format!("{}.html", id));
        let pdf_path = self.work_dir.join(format!("{}.pdf", id));

        tokio::fs::write(&html_path, html).await?;
        let printed = self.print(&html_path, &pdf_path).await;
        let bytes = match printed {
            Ok(()) => tokio::fs::read(&pdf_path).await.map_err(AppError::from),
            Err(e) => Err(e),
        };

        for path in [&html_path, &pdf_path] {
            if let Err(e) = tokio::fs::remove_file(path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to clean up render file");
                }
            }
        }

        let bytes = bytes?;
        if !bytes.starts_with(b"%PDF") {
            return Err(AppError::InternalError(anyhow::anyhow!(
                "Renderer produced no PDF output"
            )));
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_an_internal_error() {
        let renderer = ChromiumPdfRenderer::new(
            "/nonexistent/chromium",
            Duration::from_secs(5),
            std::env::temp_dir().join("marketplace-pdf-test"),
        );
        let err = renderer.render("<html></html>").await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
