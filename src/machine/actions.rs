//! Machine actions
//!
//! Delete, stop and restart pick one machine at random from the fetched
//! candidates. Start targets every candidate that is currently stopped or
//! deallocated, so one call brings the whole group back.

use super::select::{self, RandomSource, ThreadRandom};
use super::status;
use crate::azure::auth::AzureAuthenticator;
use crate::azure::client::{AzureClientProvider, ClientProvider, VirtualMachines};
use crate::azure::http::AzureHttpClient;
use crate::config::{Configuration, Secrets};
use crate::error::ChaosError;
use crate::resource::{ResourceDescriptor, ResourceFetcher, ResourceGraph, RES_TYPE_VM};
use std::fmt;

/// Noun used in "no candidates" errors
const MACHINE_KIND: &str = "virtual machines";

/// Chaos action on virtual machines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineAction {
    Delete,
    Stop,
    Restart,
    Start,
}

impl fmt::Display for MachineAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MachineAction::Delete => "delete_machine",
            MachineAction::Stop => "stop_machine",
            MachineAction::Restart => "restart_machine",
            MachineAction::Start => "start_machine",
        };
        f.write_str(name)
    }
}

/// Actions that hit a single random machine
#[derive(Debug, Clone, Copy)]
enum Disruption {
    Delete,
    Stop,
    Restart,
}

impl From<Disruption> for MachineAction {
    fn from(d: Disruption) -> Self {
        match d {
            Disruption::Delete => MachineAction::Delete,
            Disruption::Stop => MachineAction::Stop,
            Disruption::Restart => MachineAction::Restart,
        }
    }
}

/// Dispatches chaos actions through a fetcher, a client provider and a random source
pub struct MachineActions<F, P, R = ThreadRandom> {
    fetcher: F,
    provider: P,
    rng: R,
}

impl<F, P> MachineActions<F, P, ThreadRandom>
where
    F: ResourceFetcher,
    P: ClientProvider,
{
    pub fn new(fetcher: F, provider: P) -> Self {
        Self::with_random(fetcher, provider, ThreadRandom)
    }
}

impl<F, P, R> MachineActions<F, P, R>
where
    F: ResourceFetcher,
    P: ClientProvider,
    R: RandomSource,
{
    pub fn with_random(fetcher: F, provider: P, rng: R) -> Self {
        Self {
            fetcher,
            provider,
            rng,
        }
    }

    /// Run any of the four actions
    pub async fn run(
        &mut self,
        action: MachineAction,
        filter: Option<&str>,
        configuration: &Configuration,
        secrets: &Secrets,
    ) -> Result<(), ChaosError> {
        match action {
            MachineAction::Delete => self.delete_machine(filter, configuration, secrets).await,
            MachineAction::Stop => self.stop_machine(filter, configuration, secrets).await,
            MachineAction::Restart => self.restart_machine(filter, configuration, secrets).await,
            MachineAction::Start => self.start_machine(filter, configuration, secrets).await,
        }
    }

    /// Delete one machine picked at random
    ///
    /// Deleting is irreversible: the machine cannot be recovered afterwards.
    /// Without a filter every machine in the subscription is a candidate.
    pub async fn delete_machine(
        &mut self,
        filter: Option<&str>,
        configuration: &Configuration,
        secrets: &Secrets,
    ) -> Result<(), ChaosError> {
        self.disrupt(Disruption::Delete, filter, configuration, secrets)
            .await
    }

    /// Power off one machine picked at random
    pub async fn stop_machine(
        &mut self,
        filter: Option<&str>,
        configuration: &Configuration,
        secrets: &Secrets,
    ) -> Result<(), ChaosError> {
        self.disrupt(Disruption::Stop, filter, configuration, secrets)
            .await
    }

    /// Restart one machine picked at random
    pub async fn restart_machine(
        &mut self,
        filter: Option<&str>,
        configuration: &Configuration,
        secrets: &Secrets,
    ) -> Result<(), ChaosError> {
        self.disrupt(Disruption::Restart, filter, configuration, secrets)
            .await
    }

    /// Start every matching machine that is stopped or deallocated
    ///
    /// Each machine is started at most once, however many of its status
    /// entries report it stopped.
    pub async fn start_machine(
        &mut self,
        filter: Option<&str>,
        configuration: &Configuration,
        secrets: &Secrets,
    ) -> Result<(), ChaosError> {
        log_start(MachineAction::Start, filter, configuration);

        let machines = self.fetch_machines(filter, configuration, secrets).await?;
        let client = self.provider.client(secrets, configuration).await?;

        let stopped = fetch_stopped_machines(&client, &machines).await?;
        if stopped.is_empty() {
            tracing::info!("No stopped machines among {} candidates", machines.len());
            return Ok(());
        }

        for machine in &stopped {
            tracing::info!("Starting machine: {}", machine.name);
            client.start(&machine.resource_group, &machine.name).await?;
        }

        Ok(())
    }

    async fn disrupt(
        &mut self,
        action: Disruption,
        filter: Option<&str>,
        configuration: &Configuration,
        secrets: &Secrets,
    ) -> Result<(), ChaosError> {
        log_start(action.into(), filter, configuration);

        let choice = self
            .fetch_machine_at_random(filter, configuration, secrets)
            .await?;
        let client = self.provider.client(secrets, configuration).await?;
        let (group, name) = (choice.resource_group.as_str(), choice.name.as_str());

        match action {
            Disruption::Delete => {
                tracing::info!("Deleting machine: {}", name);
                client.delete(group, name).await?;
            }
            Disruption::Stop => {
                tracing::info!("Stopping machine: {}", name);
                client.power_off(group, name).await?;
            }
            Disruption::Restart => {
                tracing::info!("Restarting machine: {}", name);
                client.restart(group, name).await?;
            }
        }

        Ok(())
    }

    async fn fetch_machines(
        &self,
        filter: Option<&str>,
        configuration: &Configuration,
        secrets: &Secrets,
    ) -> Result<Vec<ResourceDescriptor>, ChaosError> {
        let machines = self
            .fetcher
            .fetch(filter, RES_TYPE_VM, secrets, configuration)
            .await?;

        if machines.is_empty() {
            tracing::warn!("No virtual machines found");
            return Err(ChaosError::NoCandidates { kind: MACHINE_KIND });
        }

        tracing::debug!(
            "Fetched virtual machines: {:?}",
            machines.iter().map(|m| m.name.as_str()).collect::<Vec<_>>()
        );
        Ok(machines)
    }

    async fn fetch_machine_at_random(
        &mut self,
        filter: Option<&str>,
        configuration: &Configuration,
        secrets: &Secrets,
    ) -> Result<ResourceDescriptor, ChaosError> {
        let machines = self.fetch_machines(filter, configuration, secrets).await?;
        select::choose(&machines, &mut self.rng)
            .cloned()
            .ok_or(ChaosError::NoCandidates { kind: MACHINE_KIND })
    }
}

fn log_start(action: MachineAction, filter: Option<&str>, configuration: &Configuration) {
    tracing::debug!(
        "Start {}: subscription='{}', filter='{}'",
        action,
        configuration.subscription_id(),
        filter.unwrap_or("")
    );
}

/// Query each machine's instance view and keep the stopped ones
async fn fetch_stopped_machines<C: VirtualMachines>(
    client: &C,
    machines: &[ResourceDescriptor],
) -> Result<Vec<ResourceDescriptor>, ChaosError> {
    let mut stopped = Vec::new();

    for machine in machines {
        let statuses = client
            .instance_view(&machine.resource_group, &machine.name)
            .await?;
        if status::is_stopped(&statuses) {
            tracing::debug!("Found stopped machine: {}", machine.name);
            stopped.push(machine.clone());
        }
    }

    Ok(stopped)
}

/// Actions wired to Azure Resource Graph and the compute API
pub type AzureMachineActions<R = ThreadRandom> = MachineActions<
    ResourceGraph<AzureAuthenticator>,
    AzureClientProvider<AzureAuthenticator>,
    R,
>;

impl<R: RandomSource> AzureMachineActions<R> {
    /// Production wiring with a caller-supplied random source
    pub fn azure(rng: R) -> Result<Self, ChaosError> {
        let http = AzureHttpClient::new()?;
        let authenticator = AzureAuthenticator::new(http.clone());

        Ok(MachineActions::with_random(
            ResourceGraph::new(http.clone(), authenticator.clone()),
            AzureClientProvider::new(http, authenticator),
            rng,
        ))
    }
}

/// Delete a machine picked at random from the filter's matches
pub async fn delete_machine(
    filter: Option<&str>,
    configuration: &Configuration,
    secrets: &Secrets,
) -> Result<(), ChaosError> {
    AzureMachineActions::azure(ThreadRandom)?
        .delete_machine(filter, configuration, secrets)
        .await
}

/// Power off a machine picked at random from the filter's matches
pub async fn stop_machine(
    filter: Option<&str>,
    configuration: &Configuration,
    secrets: &Secrets,
) -> Result<(), ChaosError> {
    AzureMachineActions::azure(ThreadRandom)?
        .stop_machine(filter, configuration, secrets)
        .await
}

/// Restart a machine picked at random from the filter's matches
pub async fn restart_machine(
    filter: Option<&str>,
    configuration: &Configuration,
    secrets: &Secrets,
) -> Result<(), ChaosError> {
    AzureMachineActions::azure(ThreadRandom)?
        .restart_machine(filter, configuration, secrets)
        .await
}

/// Start every stopped machine among the filter's matches
pub async fn start_machine(
    filter: Option<&str>,
    configuration: &Configuration,
    secrets: &Secrets,
) -> Result<(), ChaosError> {
    AzureMachineActions::azure(ThreadRandom)?
        .start_machine(filter, configuration, secrets)
        .await
}
