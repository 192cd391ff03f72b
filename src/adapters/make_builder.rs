use crate::domain::model::Service;
use crate::domain::ports::ServiceBuilder;
use crate::utils::error::{Result, SapperError};
use async_trait::async_trait;
use std::io::Write;
use tokio::process::Command;

/// Drives the service's Makefile. Stdout and stderr of make end up in the given sink.
#[derive(Debug, Clone)]
pub struct MakeServiceBuilder {
    program: String,
}

impl Default for MakeServiceBuilder {
    fn default() -> Self {
        Self::new("make")
    }
}

impl MakeServiceBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn make(
        &self,
        service: &Service,
        args: &[&str],
        output: &mut (dyn Write + Send),
    ) -> Result<()> {
        let command = format!("{} {}", self.program, args.join(" "));
        tracing::debug!("Running '{}' in {}", command, service.path.display());

        let result = Command::new(&self.program)
            .args(args)
            .current_dir(&service.path)
            .output()
            .await?;

        output.write_all(&result.stdout)?;
        output.write_all(&result.stderr)?;
        output.flush()?;

        if result.status.success() {
            Ok(())
        } else {
            Err(SapperError::ProcessFailed {
                command,
                status: result.status.to_string(),
            })
        }
    }
}

#[async_trait]
impl ServiceBuilder for MakeServiceBuilder {
    async fn build(&self, service: &Service, output: &mut (dyn Write + Send)) -> Result<()> {
        self.make(service, &["build", "-B"], output).await
    }

    async fn test(&self, service: &Service, output: &mut (dyn Write + Send)) -> Result<()> {
        self.make(service, &["test"], output).await
    }

    async fn run(&self, service: &Service, output: &mut (dyn Write + Send)) -> Result<()> {
        self.make(service, &["run"], output).await
    }

    async fn deploy(&self, service: &Service, output: &mut (dyn Write + Send)) -> Result<()> {
        self.make(service, &["deploy"], output).await
    }
}
