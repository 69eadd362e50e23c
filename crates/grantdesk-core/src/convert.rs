//! PDF conversion through a headless LibreOffice.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::AppError;
use crate::traits::DocumentConverter;

/// Runs `soffice --headless --convert-to pdf`.
#[derive(Debug, Clone)]
pub struct LibreOfficeConverter {
    binary: String,
    timeout: Duration,
}

impl LibreOfficeConverter {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Where LibreOffice writes the PDF for `docx_path`.
    pub fn expected_output(docx_path: &Path, out_dir: &Path) -> Result<PathBuf, AppError> {
        let stem = docx_path.file_stem().ok_or_else(|| {
            AppError::ConversionFailed(format!("invalid input path {}", docx_path.display()))
        })?;
        Ok(out_dir.join(stem).with_extension("pdf"))
    }

    /// Arguments for one conversion.
    ///
    /// Each run gets its own user profile under `out_dir`. Instances sharing
    /// the default profile hand their job to whichever one holds its lock.
    pub fn command_args(docx_path: &Path, out_dir: &Path) -> Vec<OsString> {
        vec![
            OsString::from(profile_arg(out_dir)),
            OsString::from("--headless"),
            OsString::from("--convert-to"),
            OsString::from("pdf"),
            OsString::from("--outdir"),
            out_dir.as_os_str().to_owned(),
            docx_path.as_os_str().to_owned(),
        ]
    }
}

fn profile_arg(out_dir: &Path) -> String {
    let profile = std::path::absolute(out_dir)
        .unwrap_or_else(|_| out_dir.to_path_buf())
        .join("lo-profile");
    format!(
        "-env:UserInstallation=file://{}",
        profile.display().to_string().replace(' ', "%20")
    )
}

impl DocumentConverter for LibreOfficeConverter {
    async fn convert_to_pdf(&self, docx_path: &Path, out_dir: &Path) -> Result<PathBuf, AppError> {
        let expected = Self::expected_output(docx_path, out_dir)?;

        let mut command = Command::new(&self.binary);
        command
            .args(Self::command_args(docx_path, out_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(binary = %self.binary, input = %docx_path.display(), "Converting to PDF");

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| AppError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| {
                AppError::ConversionFailed(format!("failed to start {}: {}", self.binary, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::ConversionFailed(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        if !tokio::fs::try_exists(&expected).await.unwrap_or(false) {
            return Err(AppError::ConversionFailed(format!(
                "no PDF produced at {}",
                expected.display()
            )));
        }

        Ok(expected)
    }
}
