use crate::anon::Anonymizer;
use crate::color::ColorId;
use crate::job_graph::GraphJob;
use crate::model::{HostId, Job};
use crate::registry::Registry;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub struct HostSummary {
    pub id: HostId,
    pub name: String,
    pub color: ColorId,
    pub max_jobs: usize,
    pub no_remote: bool,
    pub pending_jobs: usize,
    pub active_jobs: usize,
    pub running: Vec<GraphJob>,
    pub total_in: u64,
    pub total_out: u64,
    pub total_local: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterTotals {
    pub hosts: usize,
    pub available_servers: usize,
    pub busy_servers: usize,
    pub total_job_slots: usize,
    pub active_jobs: usize,
    pub local_jobs: usize,
    pub pending_jobs: usize,
    pub lifetime_remote_jobs: u64,
    pub lifetime_local_jobs: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub hosts: Vec<HostSummary>,
    pub active: Vec<GraphJob>,
    pub totals: ClusterTotals,
}

impl Aggregation {
    pub fn build(registry: &Registry, anon: &Anonymizer) -> Self {
        let mut pending_by_client: BTreeMap<HostId, usize> = BTreeMap::new();
        let mut active_by_client: BTreeMap<HostId, usize> = BTreeMap::new();
        let mut running_by_host: BTreeMap<HostId, Vec<GraphJob>> = BTreeMap::new();
        let mut busy: BTreeSet<HostId> = BTreeSet::new();
        let mut active = Vec::new();
        let mut totals = ClusterTotals::default();

        for job in registry.jobs() {
            if job.active {
                *active_by_client.entry(job.client_id).or_default() += 1;
                totals.active_jobs += 1;
                let graph_job = graph_job(registry, job);
                active.push(graph_job);
                if job.host_id != 0 {
                    busy.insert(job.host_id);
                    running_by_host
                        .entry(job.host_id)
                        .or_default()
                        .push(graph_job);
                }
            } else {
                *pending_by_client.entry(job.client_id).or_default() += 1;
                totals.pending_jobs += 1;
            }
            if job.is_local {
                totals.local_jobs += 1;
            }
        }

        let mut hosts = Vec::with_capacity(registry.host_count());
        for host in registry.hosts() {
            let no_remote = host.no_remote();
            let max_jobs = host.max_jobs();
            if !no_remote {
                totals.available_servers += 1;
                totals.total_job_slots = totals.total_job_slots.saturating_add(max_jobs);
            }
            hosts.push(HostSummary {
                id: host.id,
                name: anon.host_name(host.name()).into_owned(),
                color: host.color(),
                max_jobs,
                no_remote,
                pending_jobs: pending_by_client.get(&host.id).copied().unwrap_or(0),
                active_jobs: active_by_client.get(&host.id).copied().unwrap_or(0),
                running: running_by_host.remove(&host.id).unwrap_or_default(),
                total_in: host.total_jobs_in,
                total_out: host.total_jobs_out,
                total_local: host.total_local_jobs,
            });
        }

        totals.hosts = hosts.len();
        totals.busy_servers = busy.len();
        totals.lifetime_remote_jobs = registry.total_remote_jobs();
        totals.lifetime_local_jobs = registry.total_local_jobs();

        Self {
            hosts,
            active,
            totals,
        }
    }

    pub fn host(&self, id: HostId) -> Option<&HostSummary> {
        self.hosts.iter().find(|host| host.id == id)
    }
}

fn graph_job(registry: &Registry, job: &Job) -> GraphJob {
    let color = registry
        .find_host(job.client_id)
        .map(|host| host.color())
        .unwrap_or(ColorId::DEFAULT);
    GraphJob {
        id: job.id,
        color,
        is_local: job.is_local,
    }
}
