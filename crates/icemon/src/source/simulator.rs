use icemon_core::feed::{FeedEvent, HostStats};
use icemon_core::model::{ATTR_MAX_JOBS, ATTR_NAME, ATTR_NO_REMOTE, ATTR_PLATFORM, ATTR_SPEED};
use icemon_core::{apply_event, HostId, JobId, Registry};
use rand::Rng;
use rand_pcg::Pcg64;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::SimulatorConfig;

pub const MAX_HOSTS: u32 = 10;
pub const MAX_JOBS: usize = 100;
pub const MAX_HOST_JOBS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    AddPendingJob,
    AddLocalJob,
    ActivateJob,
    RemoveJob,
    ChooseSourceHost,
}

const ACTIONS: [(u32, Action); 5] = [
    (5, Action::AddPendingJob),
    (1, Action::AddLocalJob),
    (5, Action::ActivateJob),
    (5, Action::RemoveJob),
    (1, Action::ChooseSourceHost),
];

pub struct Simulator {
    rng: Pcg64,
    next_host_id: HostId,
    next_job_id: JobId,
    source_host: HostId,
}

impl Simulator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg64::new(seed.into(), 0x0a02_bdbf_7bb3_c0a7),
            next_host_id: 1,
            next_job_id: 1,
            source_host: 0,
        }
    }

    pub fn initial_hosts(&mut self) -> Vec<FeedEvent> {
        (0..MAX_HOSTS).map(|_| self.add_host()).collect()
    }

    fn add_host(&mut self) -> FeedEvent {
        let id = self.next_host_id;
        self.next_host_id += 1;
        let half = MAX_HOST_JOBS / 2;
        let max_jobs = self.rng.random_range(0..half) + self.rng.random_range(0..half - 1) + 1;
        let no_remote = self.rng.random_range(0..10) == 0;
        let attributes = [
            (ATTR_NAME, format!("Host {id}")),
            (ATTR_MAX_JOBS, max_jobs.to_string()),
            (ATTR_NO_REMOTE, no_remote.to_string()),
            (ATTR_PLATFORM, "x86_64".to_string()),
            (ATTR_SPEED, "100.000".to_string()),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();
        FeedEvent::HostStats(HostStats {
            host_id: id,
            attributes,
            statmsg: None,
        })
    }

    pub fn step(&mut self, registry: &mut Registry) -> Vec<FeedEvent> {
        let total: u32 = ACTIONS.iter().map(|(weight, _)| weight).sum();
        let mut roll = self.rng.random_range(0..total);
        let mut chosen = Action::ChooseSourceHost;
        for (weight, action) in ACTIONS {
            if roll < weight {
                chosen = action;
                break;
            }
            roll -= weight;
        }

        let mut events = Vec::new();
        match chosen {
            Action::AddPendingJob => {
                let event = self.add_pending_job(registry);
                emit(registry, &mut events, event);
            }
            Action::AddLocalJob => {
                let event = self.add_local_job(registry);
                emit(registry, &mut events, event);
            }
            Action::ActivateJob => {
                let event = self.activate_job(registry);
                emit(registry, &mut events, event);
            }
            Action::RemoveJob => {
                let removed = self.remove_job(registry);
                emit(registry, &mut events, removed);
                // The freed slot can take a waiting job right away.
                let activated = self.activate_job(registry);
                emit(registry, &mut events, activated);
            }
            Action::ChooseSourceHost => self.choose_source_host(registry),
        }
        events
    }

    fn choose_source_host(&mut self, registry: &Registry) {
        let hosts: Vec<HostId> = registry.hosts().map(|host| host.id).collect();
        self.source_host = self.choose(&hosts).unwrap_or(0);
    }

    fn source_host(&mut self, registry: &Registry) -> Option<HostId> {
        if registry.find_host(self.source_host).is_none() {
            self.choose_source_host(registry);
        }
        registry.find_host(self.source_host).map(|host| host.id)
    }

    fn add_pending_job(&mut self, registry: &Registry) -> Option<FeedEvent> {
        if registry.job_count() >= MAX_JOBS || available_hosts(registry, 0).is_empty() {
            return None;
        }
        let client = self.source_host(registry)?;
        let id = self.next_job();
        Some(FeedEvent::JobAssignedClient {
            job_id: id,
            client_id: client,
            filename: format!("Job_{id}.c"),
        })
    }

    fn add_local_job(&mut self, registry: &Registry) -> Option<FeedEvent> {
        if registry.job_count() >= MAX_JOBS {
            return None;
        }
        let host = self.source_host(registry)?;
        if !has_free_slot(registry, host) {
            return None;
        }
        let id = self.next_job();
        Some(FeedEvent::LocalJobBegin {
            job_id: id,
            host_id: host,
            filename: format!("Job_{id}.c"),
        })
    }

    fn activate_job(&mut self, registry: &Registry) -> Option<FeedEvent> {
        let pending: Vec<JobId> = registry.pending_jobs().iter().copied().collect();
        let job_id = self.choose(&pending)?;
        let client = registry.find_job(job_id).map(|job| job.client_id).unwrap_or(0);
        let host = self.choose(&available_hosts(registry, client))?;
        Some(FeedEvent::RemoteJobBegin {
            job_id,
            host_id: host,
        })
    }

    fn remove_job(&mut self, registry: &Registry) -> Option<FeedEvent> {
        let active: Vec<JobId> = registry
            .active_jobs()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let job_id = self.choose(&active)?;
        let is_local = registry.find_job(job_id).is_some_and(|job| job.is_local);
        Some(if is_local {
            FeedEvent::LocalJobDone { job_id }
        } else {
            FeedEvent::RemoteJobDone { job_id }
        })
    }

    fn next_job(&mut self) -> JobId {
        let id = self.next_job_id;
        self.next_job_id += 1;
        id
    }

    fn choose<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            return None;
        }
        Some(items[self.rng.random_range(0..items.len())])
    }
}

fn emit(registry: &mut Registry, events: &mut Vec<FeedEvent>, event: Option<FeedEvent>) {
    if let Some(event) = event {
        apply_event(registry, &event);
        events.push(event);
    }
}

fn has_free_slot(registry: &Registry, host: HostId) -> bool {
    registry
        .find_host(host)
        .is_some_and(|h| registry.current_job_count(host) < h.max_jobs())
}

fn available_hosts(registry: &Registry, except: HostId) -> Vec<HostId> {
    registry
        .hosts()
        .map(|host| host.id)
        .filter(|id| *id != except && has_free_slot(registry, *id))
        .collect()
}

pub struct SimulatorSource {
    simulator: Simulator,
    ticker: Interval,
    cycles_left: Option<u64>,
    paused: bool,
}

impl SimulatorSource {
    pub fn new(config: &SimulatorConfig) -> Self {
        info!(seed = config.seed, cycles = ?config.cycles, "simulator_start");
        Self {
            simulator: Simulator::new(config.seed),
            ticker: ticker(config.tick),
            cycles_left: config.cycles,
            paused: false,
        }
    }

    pub fn start(&mut self, registry: &mut Registry) {
        for event in self.simulator.initial_hosts() {
            apply_event(registry, &event);
        }
    }

    pub fn is_running(&self) -> bool {
        !self.paused && self.cycles_left != Some(0)
    }

    pub async fn wait(&mut self) {
        if !self.is_running() {
            std::future::pending::<()>().await;
        }
        self.ticker.tick().await;
    }

    pub fn tick(&mut self, registry: &mut Registry) {
        if !self.is_running() {
            return;
        }
        let events = self.simulator.step(registry);
        debug!(events = events.len(), "simulator_tick");
        if let Some(left) = self.cycles_left.as_mut() {
            *left -= 1;
            if *left == 0 {
                info!("simulator_cycle_limit");
            }
        }
    }

    pub fn on_input(&mut self, key: char) -> bool {
        match key {
            'p' => {
                self.paused = !self.paused;
                debug!(paused = self.paused, "simulator_pause");
                // Ticks missed while paused are not replayed.
                self.ticker.reset();
                true
            }
            _ => false,
        }
    }
}

fn ticker(period: Duration) -> Interval {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}
