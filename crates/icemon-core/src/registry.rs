use crate::model::{Host, HostId, Job, JobClass, JobId, ATTR_NAME};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

#[derive(Debug, Default)]
pub struct Registry {
    jobs: BTreeMap<JobId, Job>,
    hosts: BTreeMap<HostId, Host>,
    pending: BTreeSet<JobId>,
    active_local: BTreeSet<JobId>,
    active_remote: BTreeSet<JobId>,
    total_remote_jobs: u64,
    total_local_jobs: u64,
    all_expanded: bool,
    redraw_requested: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_job(&mut self, id: JobId) -> &mut Job {
        if !self.jobs.contains_key(&id) {
            self.redraw_requested = true;
        }
        self.jobs.entry(id).or_insert_with(|| Job::new(id))
    }

    pub fn create_host(&mut self, id: HostId) -> &mut Host {
        if !self.hosts.contains_key(&id) {
            self.redraw_requested = true;
        }
        let expanded = self.all_expanded;
        self.hosts.entry(id).or_insert_with(|| Host::new(id, expanded))
    }

    pub fn find_job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn find_host(&self, id: HostId) -> Option<&Host> {
        self.hosts.get(&id)
    }

    pub fn find_host_mut(&mut self, id: HostId) -> Option<&mut Host> {
        self.hosts.get_mut(&id)
    }

    pub fn remove_job(&mut self, id: JobId) -> Option<Job> {
        self.unclassify(id);
        let removed = self.jobs.remove(&id);
        if removed.is_some() {
            self.redraw_requested = true;
        }
        removed
    }

    pub fn remove_host(&mut self, id: HostId) -> Option<Host> {
        let removed = self.hosts.remove(&id);
        if removed.is_some() {
            self.redraw_requested = true;
        }
        removed
    }

    /// Moves a job into `class`, or out of every class when `None`.
    pub fn classify(&mut self, id: JobId, class: Option<JobClass>) -> bool {
        let Some(job) = self.jobs.get_mut(&id) else {
            return false;
        };
        match class {
            Some(JobClass::Pending) | None => {
                job.active = false;
                job.is_local = false;
            }
            Some(JobClass::Local) => {
                job.active = true;
                job.is_local = true;
            }
            Some(JobClass::Remote) => {
                job.active = true;
                job.is_local = false;
            }
        }
        self.unclassify(id);
        match class {
            Some(JobClass::Pending) => {
                self.pending.insert(id);
            }
            Some(JobClass::Local) => {
                self.active_local.insert(id);
            }
            Some(JobClass::Remote) => {
                self.active_remote.insert(id);
            }
            None => {}
        }
        self.redraw_requested = true;
        true
    }

    pub fn class_of(&self, id: JobId) -> Option<JobClass> {
        if self.pending.contains(&id) {
            Some(JobClass::Pending)
        } else if self.active_local.contains(&id) {
            Some(JobClass::Local)
        } else if self.active_remote.contains(&id) {
            Some(JobClass::Remote)
        } else {
            None
        }
    }

    fn unclassify(&mut self, id: JobId) {
        self.pending.remove(&id);
        self.active_local.remove(&id);
        self.active_remote.remove(&id);
    }

    pub fn job_pending(&mut self, id: JobId, client: HostId, filename: &str) {
        let job = self.create_job(id);
        job.client_id = client;
        if !filename.is_empty() {
            job.filename = filename.to_string();
        }
        match self.class_of(id) {
            None | Some(JobClass::Pending) => {
                self.classify(id, Some(JobClass::Pending));
            }
            Some(_) => {
                self.redraw_requested = true;
            }
        }
    }

    pub fn job_local(&mut self, id: JobId, host: HostId, filename: &str) {
        let job = self.create_job(id);
        job.client_id = host;
        job.host_id = host;
        job.filename = filename.to_string();
        job.start_time = Some(Instant::now());
        job.host_slot = None;
        self.classify(id, Some(JobClass::Local));
        self.total_local_jobs += 1;
        if let Some(host) = self.hosts.get_mut(&host) {
            host.total_local_jobs += 1;
        }
    }

    pub fn job_remote(&mut self, id: JobId, host: HostId) {
        let job = self.create_job(id);
        job.host_id = host;
        job.start_time = Some(Instant::now());
        job.host_slot = None;
        let client = job.client_id;
        self.classify(id, Some(JobClass::Remote));
        self.total_remote_jobs += 1;
        if let Some(executor) = self.hosts.get_mut(&host) {
            executor.total_jobs_in += 1;
        }
        if let Some(client) = self.hosts.get_mut(&client) {
            client.total_jobs_out += 1;
        }
    }

    pub fn job_done(&mut self, id: JobId) -> Option<Job> {
        self.remove_job(id)
    }

    /// Merges a stats update into host `id`. An update without a `Name`
    /// attribute means the host is gone.
    pub fn host_stats<I, K, V>(&mut self, id: HostId, attributes: I) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let attributes: Vec<(String, String)> = attributes
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        let alive = attributes.iter().any(|(key, _)| key == ATTR_NAME);
        if !alive {
            self.remove_host(id);
            self.redraw_requested = true;
            return false;
        }
        let host = self.create_host(id);
        for (key, value) in attributes {
            host.attributes.insert(key, value);
        }
        self.redraw_requested = true;
        true
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    pub fn hosts_mut(&mut self) -> impl Iterator<Item = &mut Host> {
        self.hosts.values_mut()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn pending_jobs(&self) -> &BTreeSet<JobId> {
        &self.pending
    }

    pub fn active_local_jobs(&self) -> &BTreeSet<JobId> {
        &self.active_local
    }

    pub fn active_remote_jobs(&self) -> &BTreeSet<JobId> {
        &self.active_remote
    }

    pub fn active_jobs(&self) -> impl Iterator<Item = JobId> + '_ {
        self.active_local
            .iter()
            .chain(self.active_remote.iter())
            .copied()
    }

    pub fn current_job_count(&self, host: HostId) -> usize {
        self.active_jobs()
            .filter_map(|id| self.jobs.get(&id))
            .filter(|job| job.host_id == host)
            .count()
    }

    pub fn total_remote_jobs(&self) -> u64 {
        self.total_remote_jobs
    }

    pub fn total_local_jobs(&self) -> u64 {
        self.total_local_jobs
    }

    pub fn all_expanded(&self) -> bool {
        self.all_expanded
    }

    pub fn set_all_expanded(&mut self, expanded: bool) {
        self.all_expanded = expanded;
        for host in self.hosts.values_mut() {
            host.expanded = expanded;
        }
        self.redraw_requested = true;
    }

    /// Maps the first `slots` display slots of `host` to the jobs running
    /// there. A job keeps its slot while it lives, even when that slot is
    /// past `slots`; free slots go to unplaced jobs in id order.
    pub fn assign_host_slots(&mut self, host: HostId, slots: usize) -> Vec<Option<JobId>> {
        let running: BTreeSet<JobId> = self
            .active_jobs()
            .filter(|id| self.jobs.get(id).is_some_and(|job| job.host_id == host))
            .collect();
        let mut assigned = vec![None; slots];
        let mut unplaced = Vec::new();
        for id in running {
            match self.jobs.get(&id).and_then(|job| job.host_slot) {
                Some(slot) if slot < slots && assigned[slot].is_none() => assigned[slot] = Some(id),
                Some(_) => {}
                None => unplaced.push(id),
            }
        }

        let mut unplaced = unplaced.into_iter();
        for (slot, entry) in assigned.iter_mut().enumerate() {
            if entry.is_some() {
                continue;
            }
            let Some(id) = unplaced.next() else {
                break;
            };
            if let Some(job) = self.jobs.get_mut(&id) {
                job.host_slot = Some(slot);
            }
            *entry = Some(id);
        }
        assigned
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
        self.hosts.clear();
        self.pending.clear();
        self.active_local.clear();
        self.active_remote.clear();
        self.total_remote_jobs = 0;
        self.total_local_jobs = 0;
        self.redraw_requested = true;
    }

    pub fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }

    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_hosts(ids: &[HostId]) -> Registry {
        let mut registry = Registry::new();
        for id in ids {
            registry.host_stats(*id, [("Name", format!("host-{id}")), ("MaxJobs", "4".into())]);
        }
        registry
    }

    fn memberships(registry: &Registry, id: JobId) -> usize {
        [
            registry.pending_jobs().contains(&id),
            registry.active_local_jobs().contains(&id),
            registry.active_remote_jobs().contains(&id),
        ]
        .into_iter()
        .filter(|member| *member)
        .count()
    }

    #[test]
    fn create_is_idempotent() {
        let mut registry = Registry::new();
        registry.create_job(4).filename = "a.c".to_string();
        let again = registry.create_job(4);
        assert_eq!(again.filename, "a.c");
        assert_eq!(registry.job_count(), 1);

        registry.create_host(9).total_jobs_in = 3;
        assert_eq!(registry.create_host(9).total_jobs_in, 3);
        assert_eq!(registry.host_count(), 1);
    }

    #[test]
    fn classify_keeps_exactly_one_membership() {
        let mut registry = Registry::new();
        registry.create_job(1);
        for class in [
            JobClass::Pending,
            JobClass::Remote,
            JobClass::Local,
            JobClass::Pending,
        ] {
            assert!(registry.classify(1, Some(class)));
            assert_eq!(memberships(&registry, 1), 1);
            assert_eq!(registry.class_of(1), Some(class));
            let job = registry.find_job(1).unwrap();
            assert_eq!(job.active, class.is_active());
            assert_eq!(job.is_local, class == JobClass::Local);
        }
        assert!(registry.classify(1, None));
        assert_eq!(memberships(&registry, 1), 0);
        assert!(!registry.classify(77, Some(JobClass::Remote)));
    }

    #[test]
    fn pending_job_moves_to_remote_and_counts_transfers() {
        let mut registry = registry_with_hosts(&[5, 7]);
        registry.job_pending(1, 5, "main.c");
        assert_eq!(registry.class_of(1), Some(JobClass::Pending));

        registry.job_remote(1, 7);
        assert!(!registry.pending_jobs().contains(&1));
        assert!(registry.active_remote_jobs().contains(&1));
        assert_eq!(registry.find_host(7).unwrap().total_jobs_in, 1);
        assert_eq!(registry.find_host(5).unwrap().total_jobs_out, 1);
        assert_eq!(registry.total_remote_jobs(), 1);
        assert_eq!(registry.find_job(1).unwrap().filename, "main.c");
    }

    #[test]
    fn late_client_assignment_does_not_demote_running_job() {
        let mut registry = registry_with_hosts(&[2, 3]);
        registry.job_remote(8, 3);
        registry.job_pending(8, 2, "late.c");
        assert_eq!(registry.class_of(8), Some(JobClass::Remote));
        assert_eq!(registry.find_job(8).unwrap().client_id, 2);
    }

    #[test]
    fn local_job_counts_against_its_host() {
        let mut registry = registry_with_hosts(&[2]);
        registry.job_local(3, 2, "util.c");
        let job = registry.find_job(3).unwrap();
        assert!(job.active && job.is_local);
        assert_eq!(job.client_id, 2);
        assert_eq!(registry.find_host(2).unwrap().total_local_jobs, 1);
        assert_eq!(registry.total_local_jobs(), 1);
        assert_eq!(registry.current_job_count(2), 1);
    }

    #[test]
    fn removing_job_clears_every_set() {
        let mut registry = registry_with_hosts(&[1]);
        registry.job_local(10, 1, "x.c");
        assert!(registry.remove_job(10).is_some());
        assert_eq!(memberships(&registry, 10), 0);
        assert!(registry.find_job(10).is_none());
        assert!(registry.remove_job(10).is_none());
    }

    #[test]
    fn stats_without_name_remove_host() {
        let mut registry = registry_with_hosts(&[3]);
        registry.host_stats(3, [("Platform", "x86_64")]);
        assert!(registry.find_host(3).is_none());
    }

    #[test]
    fn stats_merge_attributes() {
        let mut registry = registry_with_hosts(&[3]);
        registry.host_stats(3, [("Name", "host-3"), ("Speed", "9.5")]);
        let host = registry.find_host(3).unwrap();
        assert_eq!(host.max_jobs(), 4);
        assert_eq!(host.speed(), 9.5);
    }

    #[test]
    fn slots_stay_stable_while_jobs_live() {
        let mut registry = registry_with_hosts(&[1, 2]);
        registry.job_remote(5, 1);
        registry.job_remote(6, 1);
        assert_eq!(registry.assign_host_slots(1, 3), vec![Some(5), Some(6), None]);

        registry.job_done(5);
        registry.job_remote(4, 1);
        assert_eq!(registry.assign_host_slots(1, 3), vec![Some(4), Some(6), None]);
    }

    #[test]
    fn narrowed_slot_window_keeps_numbers() {
        let mut registry = registry_with_hosts(&[1]);
        registry.job_remote(5, 1);
        registry.job_remote(6, 1);
        registry.job_remote(7, 1);
        assert_eq!(registry.assign_host_slots(1, 4), vec![Some(5), Some(6), Some(7), None]);

        assert_eq!(registry.assign_host_slots(1, 2), vec![Some(5), Some(6)]);
        registry.job_done(5);
        registry.job_remote(8, 1);
        assert_eq!(registry.assign_host_slots(1, 2), vec![Some(8), Some(6)]);
        assert_eq!(registry.assign_host_slots(1, 4), vec![Some(8), Some(6), Some(7), None]);
    }

    #[test]
    fn huge_capacity_with_small_window_allocates_only_the_window() {
        let mut registry = Registry::new();
        registry.host_stats(1, [("Name", "big"), ("MaxJobs", "1000000000")]);
        registry.job_local(2, 1, "a.c");
        let max_jobs = registry.find_host(1).unwrap().max_jobs();
        assert_eq!(max_jobs, 1_000_000_000);
        assert_eq!(registry.assign_host_slots(1, max_jobs.min(3)), vec![Some(2), None, None]);
    }

    #[test]
    fn global_expand_applies_to_new_and_existing_hosts() {
        let mut registry = registry_with_hosts(&[1]);
        registry.set_all_expanded(true);
        assert!(registry.find_host(1).unwrap().expanded);
        registry.host_stats(2, [("Name", "late")]);
        assert!(registry.find_host(2).unwrap().expanded);
    }

    #[test]
    fn redraw_requests_coalesce_until_taken() {
        let mut registry = Registry::new();
        registry.job_pending(1, 0, "");
        registry.job_pending(2, 0, "");
        assert!(registry.take_redraw());
        assert!(!registry.take_redraw());
    }

    #[test]
    fn clear_resets_everything() {
        let mut registry = registry_with_hosts(&[1]);
        registry.job_local(1, 1, "a.c");
        registry.job_pending(2, 1, "b.c");
        registry.clear();
        assert_eq!(registry.job_count(), 0);
        assert_eq!(registry.host_count(), 0);
        assert!(registry.pending_jobs().is_empty());
        assert_eq!(registry.total_local_jobs(), 0);
    }
}
