//! Vendor CLI dialects: command pairs and output scraping.
//!
//! Shell-only switches expose no structured API, so identification is
//! scraped from documented header tokens in command output. Each dialect is
//! a pure function from captured output to a fact bundle, testable without
//! a live session. The scraping stays inside this module; nothing upstream
//! sees vendor text.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{FactBundle, ProbeError};

/// Supported switch CLI dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwitchDialect {
    /// Fibre Channel fabric switches: `version` + `switchshow`.
    #[default]
    Brocade,
    /// Nexus datacenter switches: `show version` for both identity and
    /// version, issued twice for the common command shape.
    Nxos,
    /// Arista EOS switches: `show version` carries both the model line and
    /// the software image version.
    Arista,
}

impl SwitchDialect {
    /// Version-identification command.
    pub fn version_command(&self) -> &'static str {
        match self {
            Self::Brocade => "version",
            Self::Nxos | Self::Arista => "show version",
        }
    }

    /// Device-identity command.
    pub fn identity_command(&self) -> &'static str {
        match self {
            Self::Brocade => "switchshow",
            Self::Nxos | Self::Arista => "show version",
        }
    }

    /// Join the two command outputs into one fact bundle.
    ///
    /// # Errors
    /// Returns [`ProbeError::Parse`] when a dialect's documented required
    /// token is absent from the output.
    pub fn parse(&self, version_output: &str, identity_output: &str) -> Result<FactBundle, ProbeError> {
        match self {
            Self::Brocade => parse_brocade(version_output, identity_output),
            Self::Nxos => parse_nxos(version_output),
            Self::Arista => parse_arista(version_output),
        }
    }
}

impl std::fmt::Display for SwitchDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Brocade => f.write_str("brocade"),
            Self::Nxos => f.write_str("nxos"),
            Self::Arista => f.write_str("arista"),
        }
    }
}

fn fos_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Fabric OS:\s*(v[\w.]+)").expect("failed to compile Fabric OS regex")
    })
}

fn switch_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"switchName:\s*(.+)").expect("failed to compile name regex"))
}

fn switch_type_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"switchType:\s*(.+)").expect("failed to compile type regex"))
}

/// Fabric switch output: `Fabric OS: vX` from `version` is required;
/// `switchName:`/`switchType:` from `switchshow` identify the device.
fn parse_brocade(version_output: &str, identity_output: &str) -> Result<FactBundle, ProbeError> {
    let os_version = version_output
        .lines()
        .find_map(|line| fos_version_regex().captures(line))
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| ProbeError::Parse("no 'Fabric OS:' token in version output".to_string()))?;

    let mut name = None;
    let mut hardware_type = None;
    for line in identity_output.lines() {
        if let Some(caps) = switch_name_regex().captures(line) {
            name = Some(caps[1].trim().to_string());
        }
        if let Some(caps) = switch_type_regex().captures(line) {
            hardware_type = Some(caps[1].trim().to_string());
        }
    }

    if name.is_none() && hardware_type.is_none() {
        return Err(ProbeError::Parse(
            "no switchName/switchType tokens in switchshow output".to_string(),
        ));
    }

    Ok(FactBundle::Switch {
        model: None,
        os_version,
        name,
        hardware_type,
    })
}

/// Nexus `show version`: the `NXOS:` line carries the version, the
/// `cisco Nexus` line the model. Both are required.
fn parse_nxos(output: &str) -> Result<FactBundle, ProbeError> {
    let mut os_version = None;
    let mut model = None;

    for line in output.lines() {
        let trimmed = line.trim();
        if os_version.is_none() {
            if let Some(rest) = trimmed.strip_prefix("NXOS:") {
                os_version = Some(rest.trim().to_string());
            }
        }
        if model.is_none() && trimmed.contains("cisco Nexus") {
            model = Some(trimmed.to_string());
        }
    }

    let os_version =
        os_version.ok_or_else(|| ProbeError::Parse("no 'NXOS:' token in output".to_string()))?;
    let model = model
        .ok_or_else(|| ProbeError::Parse("no 'cisco Nexus' token in output".to_string()))?;

    Ok(FactBundle::Switch {
        model: Some(model),
        os_version,
        name: None,
        hardware_type: None,
    })
}

/// EOS `show version`: the leading `Arista <model>` line and the
/// `Software image version:` line. Both are required.
fn parse_arista(output: &str) -> Result<FactBundle, ProbeError> {
    let mut model = None;
    let mut os_version = None;

    for line in output.lines() {
        let trimmed = line.trim();
        if model.is_none()
            && let Some(rest) = trimmed.strip_prefix("Arista ")
        {
            model = Some(rest.trim().to_string());
        }
        if os_version.is_none()
            && let Some(rest) = trimmed.strip_prefix("Software image version:")
        {
            os_version = Some(rest.trim().to_string());
        }
    }

    let model =
        model.ok_or_else(|| ProbeError::Parse("no 'Arista' model line in output".to_string()))?;
    let os_version = os_version.ok_or_else(|| {
        ProbeError::Parse("no 'Software image version:' token in output".to_string())
    })?;

    Ok(FactBundle::Switch {
        model: Some(model),
        os_version,
        name: None,
        hardware_type: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ErrorKind;

    const BROCADE_VERSION: &str = "\
Kernel:     2.6.14.2
Fabric OS:  v9.1.1c
Made on:    Thu Jun 15 21:40:51 2023
Flash:      Mon Oct  2 08:11:34 2023
BootProm:   3.0.26";

    const BROCADE_SWITCHSHOW: &str = "\
switchName:     edge-fc-02
switchType:     170.0
switchState:    Online
switchMode:     Native
switchRole:     Principal
switchDomain:   1";

    const NXOS_SHOW_VERSION: &str = "\
Cisco Nexus Operating System (NX-OS) Software
Software
  BIOS: version 05.47
  NXOS: version 9.3(11)
  BIOS compile time:  04/28/2022
Hardware
  cisco Nexus9000 C93180YC-EX chassis
  Intel(R) Xeon(R) CPU  @ 1.80GHz with 24632060 kB of memory.";

    const ARISTA_SHOW_VERSION: &str = "\
Arista DCS-7050TX-64-R
Hardware version:    01.02
Serial number:       JPE14080459
System MAC address:  001c.7312.2b34

Software image version: 4.20.1F
Architecture:           i386
Internal build version: 4.20.1F-6820520.4201F

Uptime:                 1 weeks, 1 days, 5 hours and 45 minutes
Total memory:           3818208 kB
Free memory:            1574736 kB";

    #[test]
    fn test_brocade_parses_captured_output() {
        let bundle = SwitchDialect::Brocade
            .parse(BROCADE_VERSION, BROCADE_SWITCHSHOW)
            .unwrap();

        match bundle {
            FactBundle::Switch {
                model,
                os_version,
                name,
                hardware_type,
            } => {
                assert_eq!(os_version, "v9.1.1c");
                assert_eq!(name.as_deref(), Some("edge-fc-02"));
                assert_eq!(hardware_type.as_deref(), Some("170.0"));
                assert_eq!(model, None);
            }
            other => panic!("expected switch bundle, got {other:?}"),
        }
    }

    #[test]
    fn test_brocade_missing_fos_token_is_parse_error() {
        let err = SwitchDialect::Brocade
            .parse("Kernel: 2.6.14.2\n", BROCADE_SWITCHSHOW)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_brocade_missing_identity_tokens_is_parse_error() {
        let err = SwitchDialect::Brocade
            .parse(BROCADE_VERSION, "switchState: Online\n")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_nxos_parses_captured_output() {
        let bundle = SwitchDialect::Nxos
            .parse(NXOS_SHOW_VERSION, NXOS_SHOW_VERSION)
            .unwrap();

        match bundle {
            FactBundle::Switch {
                model, os_version, ..
            } => {
                assert_eq!(os_version, "version 9.3(11)");
                assert_eq!(
                    model.as_deref(),
                    Some("cisco Nexus9000 C93180YC-EX chassis")
                );
            }
            other => panic!("expected switch bundle, got {other:?}"),
        }
    }

    #[test]
    fn test_nxos_missing_version_line_is_parse_error() {
        let output = "Hardware\n  cisco Nexus9000 C93180YC-EX chassis\n";
        let err = SwitchDialect::Nxos.parse(output, output).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_arista_parses_captured_output() {
        let bundle = SwitchDialect::Arista
            .parse(ARISTA_SHOW_VERSION, ARISTA_SHOW_VERSION)
            .unwrap();

        match bundle {
            FactBundle::Switch {
                model, os_version, ..
            } => {
                assert_eq!(model.as_deref(), Some("DCS-7050TX-64-R"));
                assert_eq!(os_version, "4.20.1F");
            }
            other => panic!("expected switch bundle, got {other:?}"),
        }
    }

    #[test]
    fn test_arista_missing_model_line_is_parse_error() {
        let output = "Software image version: 4.20.1F\n";
        let err = SwitchDialect::Arista.parse(output, output).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_arista_missing_version_line_is_parse_error() {
        let output = "Arista DCS-7050TX-64-R\nHardware version: 01.02\n";
        let err = SwitchDialect::Arista.parse(output, output).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_dialect_commands() {
        assert_eq!(SwitchDialect::Brocade.version_command(), "version");
        assert_eq!(SwitchDialect::Brocade.identity_command(), "switchshow");
        assert_eq!(SwitchDialect::Nxos.version_command(), "show version");
        assert_eq!(SwitchDialect::Arista.version_command(), "show version");
    }
}
