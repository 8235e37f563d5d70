//! End-to-end collection tests: fleet file in, HTML report out, with
//! scripted adapters standing in for live devices.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fleetsnap::config::{AppConfig, FleetDefaults, load_fleet};
use fleetsnap::model::{
    Credentials, DeviceDescriptor, DeviceKind, FactBundle, PLACEHOLDER, ProbeError,
};
use fleetsnap::probe::ProbeAdapter;
use fleetsnap::report::{HtmlReport, ReportSink};
use fleetsnap::{EngineError, InventoryEngine};

/// Scripted adapter keyed by address.
struct ScriptedAdapter {
    kind: DeviceKind,
    outcomes: HashMap<String, Result<Vec<FactBundle>, ProbeError>>,
}

impl ScriptedAdapter {
    fn new(kind: DeviceKind) -> Self {
        Self {
            kind,
            outcomes: HashMap::new(),
        }
    }

    fn on(mut self, address: &str, outcome: Result<Vec<FactBundle>, ProbeError>) -> Self {
        self.outcomes.insert(address.to_string(), outcome);
        self
    }
}

#[async_trait]
impl ProbeAdapter for ScriptedAdapter {
    fn kind(&self) -> DeviceKind {
        self.kind
    }

    async fn probe(&self, descriptor: &DeviceDescriptor) -> Result<Vec<FactBundle>, ProbeError> {
        self.outcomes
            .get(&descriptor.address)
            .cloned()
            .unwrap_or_else(|| Err(ProbeError::Connect("unscripted address".to_string())))
    }
}

fn fleet_csv(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn lab_engine() -> InventoryEngine {
    let switch = ScriptedAdapter::new(DeviceKind::SwitchCli).on(
        "10.0.0.1",
        Ok(vec![FactBundle::Switch {
            model: None,
            os_version: "v9.1.1c".to_string(),
            name: Some("edge-fc-02".to_string()),
            hardware_type: Some("170.0".to_string()),
        }]),
    );
    let bmc = ScriptedAdapter::new(DeviceKind::ServerBmc).on(
        "10.4.2.17",
        Err(ProbeError::Timeout("5s elapsed".to_string())),
    );
    let hypervisor = ScriptedAdapter::new(DeviceKind::Hypervisor).on(
        "vc.lab",
        Ok(vec![
            FactBundle::HypervisorHost {
                ip_address: Some("172.16.4.10".to_string()),
                total_memory_bytes: 128 * 1024 * 1024 * 1024,
                used_memory_bytes: 32 * 1024 * 1024 * 1024,
                version: "8.0.2".to_string(),
                build: "22380479".to_string(),
            },
            FactBundle::HypervisorHost {
                ip_address: None,
                total_memory_bytes: 128 * 1024 * 1024 * 1024,
                used_memory_bytes: 64 * 1024 * 1024 * 1024,
                version: "8.0.2".to_string(),
                build: "22380479".to_string(),
            },
        ]),
    );

    InventoryEngine::builder()
        .register(Arc::new(switch))
        .register(Arc::new(bmc))
        .register(Arc::new(hypervisor))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_fleet_file_to_report() {
    let fleet_file = fleet_csv(
        "IP,Username,Password,Kind\n\
         10.0.0.1,admin,pw,switch\n\
         10.4.2.17,bmcuser,pw,bmc\n\
         vc.lab,svc,pw,hypervisor\n",
    );
    let fleet = load_fleet(
        fleet_file.path(),
        &FleetDefaults {
            kind: None,
            timeout: Duration::from_secs(2),
        },
    )
    .unwrap();

    let results = lab_engine().collect(&fleet).await.unwrap();

    // Three descriptors, four records: the hypervisor traversal found two hosts.
    assert_eq!(results.len(), 4);
    assert_eq!(results.failure_count(), 1);

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("fleet.html");
    let report = HtmlReport::new(&output, "Lab Fleet Inventory");
    report.write(&results).unwrap();

    let html = std::fs::read_to_string(&output).unwrap();
    assert!(html.contains("Lab Fleet Inventory"));
    assert!(html.contains("edge-fc-02"));
    assert!(html.contains("172.16.4.10"));
    // The timed-out BMC is present with placeholder fields, not dropped.
    assert!(html.contains("10.4.2.17"));
    assert!(html.contains(PLACEHOLDER));
    assert!(html.contains("96.00"), "free memory of the first host");
}

#[tokio::test]
async fn test_results_follow_fleet_file_order() {
    let switch = ScriptedAdapter::new(DeviceKind::SwitchCli)
        .on("10.0.0.3", Err(ProbeError::Connect("refused".to_string())))
        .on(
            "10.0.0.1",
            Ok(vec![FactBundle::Switch {
                model: None,
                os_version: "v9.1.1c".to_string(),
                name: Some("edge-fc-01".to_string()),
                hardware_type: None,
            }]),
        );
    let engine = InventoryEngine::builder()
        .register(Arc::new(switch))
        .build()
        .unwrap();

    let fleet_file = fleet_csv(
        "IP,Username,Password\n\
         10.0.0.3,admin,pw\n\
         10.0.0.1,admin,pw\n",
    );
    let fleet = load_fleet(
        fleet_file.path(),
        &FleetDefaults {
            kind: Some(DeviceKind::SwitchCli),
            timeout: Duration::from_secs(2),
        },
    )
    .unwrap();

    let results = engine.collect(&fleet).await.unwrap();
    let addresses: Vec<_> = results.iter().map(|r| r.address.as_str()).collect();
    assert_eq!(addresses, ["10.0.0.3", "10.0.0.1"]);
    assert!(!results.records()[0].ok);
    assert!(results.records()[1].ok);
}

#[tokio::test]
async fn test_config_built_engine_rejects_bmc_only_fleet_without_console() {
    let engine = AppConfig::default().build_engine().unwrap();
    let fleet = [DeviceDescriptor::new(
        "10.4.2.17",
        DeviceKind::ServerBmc,
        Credentials::new("bmcuser", "pw"),
    )];

    let result = engine.collect(&fleet).await;
    assert!(matches!(result, Err(EngineError::UnroutableFleet)));
}
