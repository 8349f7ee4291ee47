//! Bridge to external model processes
//!
//! The OCR engine and the plate localization model are treated as black
//! boxes living in their own processes. The contract is the same for both:
//! the image is written to the child's stdin as PNG, and the child prints one
//! JSON document to stdout and exits with status 0.

use crate::imaging::encode_png;
use crate::{Error, Result};
use image::DynamicImage;
use serde::de::DeserializeOwned;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// An external model invocation: program, arguments and extra environment
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    argv: Vec<String>,
    envs: Vec<(String, String)>,
    timeout: Duration,
}

impl ExternalCommand {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Result<Self> {
        if argv.first().map_or(true, |p| p.trim().is_empty()) {
            return Err(Error::Config("external command is empty".to_string()));
        }
        Ok(Self {
            argv,
            envs: Vec::new(),
            timeout,
        })
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// Run the command on one image and parse its stdout as `T`.
    ///
    /// The child is killed if the time budget runs out.
    pub async fn run_on_image<T: DeserializeOwned>(&self, image: &DynamicImage) -> Result<T> {
        let png = encode_png(image)?;
        self.run_json(png).await
    }

    /// Run the command with raw stdin bytes and parse its stdout as `T`.
    pub async fn run_json<T: DeserializeOwned>(&self, input: Vec<u8>) -> Result<T> {
        match tokio::time::timeout(self.timeout, self.run_inner(input)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.timeout)),
        }
    }

    async fn run_inner<T: DeserializeOwned>(&self, input: Vec<u8>) -> Result<T> {
        let mut child = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::External(format!("failed to start {}: {}", self.program(), e)))?;

        // stdin is fed while stdout is drained
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::External("child stdin unavailable".to_string()))?;
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = child.wait_with_output().await?;

        match writer.await {
            Ok(Ok(())) => {}
            // Child may exit without reading everything; its exit status decides
            Ok(Err(e)) => debug!("{} closed stdin early: {}", self.program(), e),
            Err(e) => return Err(Error::External(format!("stdin writer failed: {}", e))),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::External(format!(
                "{} exited with {}: {}",
                self.program(),
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            Error::External(format!("{} printed malformed JSON: {}", self.program(), e))
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::Value;

    fn sh(script: &str, timeout: Duration) -> ExternalCommand {
        ExternalCommand::new(
            vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            timeout,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(ExternalCommand::new(Vec::new(), Duration::from_secs(1)).is_err());
        assert!(ExternalCommand::new(vec![" ".to_string()], Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_parses_stdout_json_and_passes_env() {
        let cmd = sh(
            r#"cat > /dev/null; printf '[{"text":"%s","confidence":0.5}]' "$GK_TEST_VALUE""#,
            Duration::from_secs(5),
        )
        .env("GK_TEST_VALUE", "A12345");

        let value: Value = cmd.run_json(b"ignored".to_vec()).await.unwrap();
        assert_eq!(value[0]["text"], "A12345");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_error() {
        let cmd = sh("echo boom >&2; exit 3", Duration::from_secs(5));
        let err = cmd.run_json::<Value>(Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::External(ref msg) if msg.contains("boom")));
    }

    #[tokio::test]
    async fn test_malformed_json_is_error() {
        let cmd = sh("echo not-json", Duration::from_secs(5));
        let err = cmd.run_json::<Value>(Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::External(_)));
    }

    #[tokio::test]
    async fn test_slow_command_times_out() {
        let cmd = sh("sleep 5; echo '[]'", Duration::from_millis(100));
        let err = cmd.run_json::<Value>(Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let cmd = ExternalCommand::new(
            vec!["/nonexistent/gk-bridge".to_string()],
            Duration::from_secs(1),
        )
        .unwrap();
        let err = cmd.run_json::<Value>(Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::External(_)));
    }
}
