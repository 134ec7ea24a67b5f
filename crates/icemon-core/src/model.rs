use crate::color::{self, ColorId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

pub type JobId = u32;
pub type HostId = u32;

pub const ATTR_NAME: &str = "Name";
pub const ATTR_MAX_JOBS: &str = "MaxJobs";
pub const ATTR_NO_REMOTE: &str = "NoRemote";
pub const ATTR_SPEED: &str = "Speed";
pub const ATTR_PLATFORM: &str = "Platform";
pub const ATTR_IP: &str = "IP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobClass {
    Pending,
    Local,
    Remote,
}

impl JobClass {
    pub fn as_str(self) -> &'static str {
        match self {
            JobClass::Pending => "pending",
            JobClass::Local => "local",
            JobClass::Remote => "remote",
        }
    }

    pub fn is_active(self) -> bool {
        !matches!(self, JobClass::Pending)
    }
}

impl fmt::Display for JobClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub client_id: HostId,
    pub host_id: HostId,
    pub active: bool,
    pub is_local: bool,
    pub filename: String,
    pub start_time: Option<Instant>,
    pub host_slot: Option<usize>,
}

impl Job {
    pub(crate) fn new(id: JobId) -> Self {
        Self {
            id,
            client_id: 0,
            host_id: 0,
            active: false,
            is_local: false,
            filename: String::new(),
            start_time: None,
            host_slot: None,
        }
    }

    pub fn elapsed_secs(&self, now: Instant) -> f64 {
        self.start_time
            .map(|start| now.saturating_duration_since(start).as_secs_f64())
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct Host {
    pub id: HostId,
    pub attributes: BTreeMap<String, String>,
    pub expanded: bool,
    pub highlighted: bool,
    pub current_position: usize,
    pub total_jobs_in: u64,
    pub total_jobs_out: u64,
    pub total_local_jobs: u64,
}

impl Host {
    pub(crate) fn new(id: HostId, expanded: bool) -> Self {
        Self {
            id,
            attributes: BTreeMap::new(),
            expanded,
            highlighted: false,
            current_position: 0,
            total_jobs_in: 0,
            total_jobs_out: 0,
            total_local_jobs: 0,
        }
    }

    pub fn name(&self) -> &str {
        self.string_attr(ATTR_NAME).unwrap_or("")
    }

    pub fn max_jobs(&self) -> usize {
        self.int_attr(ATTR_MAX_JOBS)
    }

    pub fn no_remote(&self) -> bool {
        self.bool_attr(ATTR_NO_REMOTE)
    }

    pub fn speed(&self) -> f64 {
        self.string_attr(ATTR_SPEED)
            .and_then(|value| value.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    pub fn platform(&self) -> &str {
        self.string_attr(ATTR_PLATFORM).unwrap_or("")
    }

    pub fn color(&self) -> ColorId {
        color::host_color(self.name())
    }

    fn string_attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    // Negative or garbled values read as zero capacity.
    fn int_attr(&self, key: &str) -> usize {
        self.string_attr(key)
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0)
    }

    fn bool_attr(&self, key: &str) -> bool {
        match self.string_attr(key).map(|value| value.trim().to_ascii_lowercase()) {
            Some(value) => matches!(value.as_str(), "true" | "1"),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_with(attrs: &[(&str, &str)]) -> Host {
        let mut host = Host::new(1, false);
        for (key, value) in attrs {
            host.attributes.insert(key.to_string(), value.to_string());
        }
        host
    }

    #[test]
    fn attribute_accessors_fall_back_to_defaults() {
        let host = host_with(&[]);
        assert_eq!(host.name(), "");
        assert_eq!(host.max_jobs(), 0);
        assert!(!host.no_remote());
        assert_eq!(host.speed(), 0.0);
        assert_eq!(host.platform(), "");
    }

    #[test]
    fn attribute_accessors_parse_values() {
        let host = host_with(&[
            ("Name", "builder-1"),
            ("MaxJobs", " 8"),
            ("NoRemote", "true"),
            ("Speed", "120.5"),
            ("Platform", "x86_64"),
        ]);
        assert_eq!(host.name(), "builder-1");
        assert_eq!(host.max_jobs(), 8);
        assert!(host.no_remote());
        assert_eq!(host.speed(), 120.5);
        assert_eq!(host.platform(), "x86_64");
    }

    #[test]
    fn garbled_capacity_reads_as_zero() {
        let host = host_with(&[("MaxJobs", "-3"), ("NoRemote", "maybe")]);
        assert_eq!(host.max_jobs(), 0);
        assert!(!host.no_remote());
    }
}
