//! Recording test doubles for the dispatcher collaborators

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chaosvm::azure::{ClientProvider, VirtualMachines};
use chaosvm::machine::{InstanceStatus, RandomSource};
use chaosvm::resource::{ResourceDescriptor, ResourceFetcher};
use chaosvm::{Configuration, Secrets};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Call {
    Delete(String, String),
    PowerOff(String, String),
    Restart(String, String),
    Start(String, String),
    InstanceView(String, String),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::InstanceView(..))
    }
}

pub fn call(kind: fn(String, String) -> Call, group: &str, name: &str) -> Call {
    kind(group.to_string(), name.to_string())
}

#[derive(Clone, Default)]
pub struct MockFetcher {
    pub machines: Vec<ResourceDescriptor>,
    pub error: Option<String>,
    requests: Arc<Mutex<Vec<(Option<String>, String)>>>,
}

impl MockFetcher {
    pub fn with(machines: Vec<ResourceDescriptor>) -> Self {
        Self {
            machines,
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<(Option<String>, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceFetcher for MockFetcher {
    async fn fetch(
        &self,
        filter: Option<&str>,
        resource_type: &str,
        _secrets: &Secrets,
        _configuration: &Configuration,
    ) -> Result<Vec<ResourceDescriptor>> {
        self.requests
            .lock()
            .unwrap()
            .push((filter.map(|f| f.to_string()), resource_type.to_string()));

        match &self.error {
            Some(message) => Err(anyhow::anyhow!("{}", message)),
            None => Ok(self.machines.clone()),
        }
    }
}

#[derive(Clone, Default)]
pub struct MockClient {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub statuses: HashMap<String, Vec<InstanceStatus>>,
    pub error: Option<String>,
}

impl MockClient {
    pub fn with_statuses(statuses: Vec<(&str, Vec<&str>)>) -> Self {
        Self {
            statuses: statuses
                .into_iter()
                .map(|(name, codes)| {
                    (
                        name.to_string(),
                        codes.into_iter().map(InstanceStatus::new).collect(),
                    )
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn record(&self, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match &self.error {
            Some(message) => Err(anyhow::anyhow!("{}", message)),
            None => Ok(()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }
}

#[async_trait]
impl VirtualMachines for MockClient {
    async fn delete(&self, resource_group: &str, name: &str) -> Result<()> {
        self.record(call(Call::Delete, resource_group, name))
    }

    async fn power_off(&self, resource_group: &str, name: &str) -> Result<()> {
        self.record(call(Call::PowerOff, resource_group, name))
    }

    async fn restart(&self, resource_group: &str, name: &str) -> Result<()> {
        self.record(call(Call::Restart, resource_group, name))
    }

    async fn start(&self, resource_group: &str, name: &str) -> Result<()> {
        self.record(call(Call::Start, resource_group, name))
    }

    async fn instance_view(&self, resource_group: &str, name: &str) -> Result<Vec<InstanceStatus>> {
        self.calls
            .lock()
            .unwrap()
            .push(call(Call::InstanceView, resource_group, name));
        Ok(self.statuses.get(name).cloned().unwrap_or_default())
    }
}

#[derive(Clone, Default)]
pub struct MockProvider {
    pub client: MockClient,
    connects: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn new(client: MockClient) -> Self {
        Self {
            client,
            connects: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientProvider for MockProvider {
    type Client = MockClient;

    async fn client(&self, _secrets: &Secrets, _configuration: &Configuration) -> Result<MockClient> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.client.clone())
    }
}

/// Always returns the same index
pub struct FixedIndex(pub usize);

impl RandomSource for FixedIndex {
    fn choose_index(&mut self, _len: usize) -> usize {
        self.0
    }
}

pub fn configuration() -> Configuration {
    Configuration::from_value(json!({"azure": {"subscription_id": "sub-1"}})).unwrap()
}

pub fn secrets() -> Secrets {
    Secrets::service_principal("app", "secret", "tenant")
}

pub fn machines(names: &[(&str, &str)]) -> Vec<ResourceDescriptor> {
    names
        .iter()
        .map(|(group, name)| ResourceDescriptor::new(group, name))
        .collect()
}
