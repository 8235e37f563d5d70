//! SSH probe adapter for CLI switches.

use async_trait::async_trait;

use crate::model::{DeviceDescriptor, DeviceKind, FactBundle, ProbeError};
use crate::probe::ssh::SshSession;
use crate::probe::traits::ProbeAdapter;

use super::dialect::SwitchDialect;

/// Probes shell-only switches: one SSH session, a version command, an
/// identity command, and dialect-specific scraping of both outputs.
///
/// The dialect is adapter-level configuration; a fleet mixing dialects
/// registers one engine per dialect or splits the fleet file.
#[derive(Debug, Clone, Default)]
pub struct SwitchCliProbe {
    dialect: SwitchDialect,
}

impl SwitchCliProbe {
    pub fn new(dialect: SwitchDialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> SwitchDialect {
        self.dialect
    }

    async fn run_queries(&self, session: &SshSession) -> Result<FactBundle, ProbeError> {
        let version_output = session.exec(self.dialect.version_command()).await?;
        let identity_output = session.exec(self.dialect.identity_command()).await?;
        self.dialect.parse(&version_output, &identity_output)
    }
}

#[async_trait]
impl ProbeAdapter for SwitchCliProbe {
    fn kind(&self) -> DeviceKind {
        DeviceKind::SwitchCli
    }

    async fn probe(&self, descriptor: &DeviceDescriptor) -> Result<Vec<FactBundle>, ProbeError> {
        tracing::debug!(
            address = %descriptor.address,
            dialect = %self.dialect,
            "Opening switch CLI session"
        );

        let session = SshSession::connect(
            &descriptor.address,
            &descriptor.credentials.username,
            &descriptor.credentials.secret,
            descriptor.timeout,
        )
        .await?;

        // The session closes on every exit path, including parse failure.
        let result = self.run_queries(&session).await;
        session.close().await;

        match &result {
            Ok(_) => tracing::debug!(address = %descriptor.address, "Switch probe successful"),
            Err(e) => {
                tracing::warn!(address = %descriptor.address, error = %e, "Switch probe failed")
            }
        }

        result.map(|bundle| vec![bundle])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_kind() {
        let probe = SwitchCliProbe::new(SwitchDialect::Nxos);
        assert_eq!(probe.kind(), DeviceKind::SwitchCli);
        assert_eq!(probe.dialect(), SwitchDialect::Nxos);
    }

    #[test]
    fn test_default_dialect_is_brocade() {
        assert_eq!(SwitchCliProbe::default().dialect(), SwitchDialect::Brocade);
    }
}
