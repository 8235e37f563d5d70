//! Fleet file loading.
//!
//! The fleet is a CSV file, one device per row. Operators maintain these
//! files per device class with inconsistent header spellings, so the address
//! column accepts the aliases seen in the wild (`IP`, `Host`, `BMCip`) and
//! header matching is case-insensitive.

use std::path::Path;
use std::time::Duration;

use csv::StringRecord;

use crate::model::{Credentials, DeviceDescriptor, DeviceKind};

use super::validation::{ConfigError, parse_duration};

const ADDRESS_ALIASES: &[&str] = &["address", "ip", "host", "bmcip"];
const USERNAME_ALIASES: &[&str] = &["username", "user"];
const SECRET_ALIASES: &[&str] = &["password", "secret"];
const KIND_ALIASES: &[&str] = &["kind", "type"];
const TIMEOUT_ALIASES: &[&str] = &["timeout"];

/// Row defaults applied where the fleet file omits a column.
#[derive(Debug, Clone)]
pub struct FleetDefaults {
    /// Kind assumed when the file has no kind column. A file without a kind
    /// column and no default kind fails to load.
    pub kind: Option<DeviceKind>,
    /// Probe timeout for rows without their own.
    pub timeout: Duration,
}

/// Resolved column positions for one fleet file.
struct FleetHeader {
    address: usize,
    username: usize,
    secret: usize,
    kind: Option<usize>,
    timeout: Option<usize>,
}

impl FleetHeader {
    fn resolve(headers: &StringRecord) -> Result<Self, ConfigError> {
        let position = |aliases: &[&str]| {
            headers
                .iter()
                .position(|h| aliases.contains(&h.trim().to_ascii_lowercase().as_str()))
        };

        let required = |name: &str, aliases: &[&str]| {
            position(aliases).ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "fleet file has no {name} column (accepted headers: {})",
                    aliases.join(", ")
                ))
            })
        };

        Ok(Self {
            address: required("address", ADDRESS_ALIASES)?,
            username: required("username", USERNAME_ALIASES)?,
            secret: required("password", SECRET_ALIASES)?,
            kind: position(KIND_ALIASES),
            timeout: position(TIMEOUT_ALIASES),
        })
    }
}

/// Load a fleet CSV file into descriptors, preserving row order.
///
/// # Errors
/// Returns `ConfigError` on unreadable files, unrecognized headers, empty
/// required cells, or unparseable kind/timeout values. Errors name the
/// offending row; a fleet file is small enough that failing the whole load
/// beats silently skipping rows.
pub fn load_fleet(
    path: impl AsRef<Path>,
    defaults: &FleetDefaults,
) -> Result<Vec<DeviceDescriptor>, ConfigError> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let header = FleetHeader::resolve(reader.headers()?)?;
    let mut descriptors = Vec::new();

    for (index, row) in reader.records().enumerate() {
        let row = row?;
        // Header is line 1, first data row is line 2.
        let line = index + 2;

        let cell = |column: usize| row.get(column).unwrap_or("").trim();

        let address = cell(header.address);
        if address.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "fleet row {line}: empty address"
            )));
        }

        let username = cell(header.username);
        if username.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "fleet row {line}: empty username for {address}"
            )));
        }

        let kind = match header.kind.map(cell).filter(|v| !v.is_empty()) {
            Some(value) => value
                .parse::<DeviceKind>()
                .map_err(|e| ConfigError::ValidationError(format!("fleet row {line}: {e}")))?,
            None => defaults.kind.ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "fleet row {line}: no kind column and no default kind given"
                ))
            })?,
        };

        let timeout = match header.timeout.map(cell).filter(|v| !v.is_empty()) {
            Some(value) => parse_duration(value).map_err(|e| {
                ConfigError::ValidationError(format!("fleet row {line}: timeout: {e}"))
            })?,
            None => defaults.timeout,
        };

        descriptors.push(
            DeviceDescriptor::new(address, kind, Credentials::new(username, cell(header.secret)))
                .with_timeout(timeout),
        );
    }

    tracing::debug!(
        path = %path.display(),
        devices = descriptors.len(),
        "Loaded fleet file"
    );
    Ok(descriptors)
}
