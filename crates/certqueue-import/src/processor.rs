//! Import of a single queued certificate.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use certqueue_config::ImportConfig;
use certqueue_core::{Storage, get_role};
use tempfile::NamedTempFile;
use tracing::{error, info};

use crate::certificate::IssuedCertificate;
use crate::command::{run_external_command, substitute_placeholders};
use crate::error::ImportError;
use crate::job::Job;
use crate::worker::JobHandler;

/// Turns queue entries into imports.
///
/// For each job the entry is decoded, logged, handed to the role's external
/// command (if any) and deleted. The entry is deleted only after every
/// earlier step succeeded.
#[derive(Debug, Clone, Default)]
pub struct ImportProcessor {
    temp_dir: Option<PathBuf>,
    command_timeout: Option<Duration>,
}

impl ImportProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self {
            temp_dir: config.temp_dir_path(),
            command_timeout: config.command_timeout(),
        }
    }

    /// Directory for certificate files. The system temp dir when unset.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Import the entry behind `job`.
    pub async fn process(&self, job: &Job) -> Result<String, ImportError> {
        let key = job.key();
        let storage = job.storage.as_ref();

        let entry = storage
            .get(&key)
            .await
            .map_err(|source| ImportError::Fetch {
                key: key.clone(),
                source,
            })?
            .ok_or_else(|| ImportError::EntryNotFound { key: key.clone() })?;

        let cert = IssuedCertificate::from_der(&entry.value)
            .map_err(|reason| ImportError::Decode { key: key.clone(), reason })?;

        info!(
            role = %job.role_name,
            job_id = job.id,
            common_name = %cert.common_name,
            serial = %cert.serial_number,
            "Certificate issued"
        );
        info!(role = %job.role_name, job_id = job.id, "{}", cert.pem);

        let role = get_role(storage, &job.role_name)
            .await
            .map_err(|source| ImportError::Role {
                role: job.role_name.clone(),
                source,
            })?
            .ok_or_else(|| ImportError::RoleNotFound(job.role_name.clone()))?;

        if !role.external_cmd.is_empty() {
            let output = self.run_command(&role.external_cmd, &cert).await?;
            info!(
                role = %job.role_name,
                job_id = job.id,
                common_name = %cert.common_name,
                "External command output: {}",
                output
            );
        }

        if let Err(e) = storage.delete(&key).await {
            error!(
                role = %job.role_name,
                job_id = job.id,
                entry = %job.entry,
                "Imported certificate but could not remove it from the queue: {}",
                e
            );
        }

        Ok(format!(
            "Imported certificate for '{}', with serial number {}",
            cert.common_name, cert.serial_number
        ))
    }

    async fn run_command(
        &self,
        template: &[String],
        cert: &IssuedCertificate,
    ) -> Result<String, ImportError> {
        // Removed when dropped, on every return path.
        let cert_file = self.write_cert_file(cert).map_err(ImportError::TempFile)?;
        let path = cert_file.path().to_string_lossy().into_owned();

        let argv = substitute_placeholders(template, &path, &cert.common_name);
        run_external_command(&argv, self.command_timeout)
            .await
            .map_err(|e| ImportError::Command {
                cn: cert.common_name.clone(),
                serial: cert.serial_number.clone(),
                reason: e.to_string(),
            })
    }

    fn write_cert_file(&self, cert: &IssuedCertificate) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("certqueue-").suffix(".pem");
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(cert.pem.as_bytes())?;
        file.flush()?;
        Ok(file)
    }
}

#[async_trait]
impl JobHandler for ImportProcessor {
    async fn handle(&self, job: &Job) -> Result<String, ImportError> {
        self.process(job).await
    }
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
