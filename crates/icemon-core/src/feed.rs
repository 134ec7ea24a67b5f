use crate::model::{HostId, JobId};
use crate::registry::Registry;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use thiserror::Error;

pub const DEFAULT_MAX_FRAME_BYTES: usize = 256 * 1024;
pub const MONITOR_CLIENT: &str = "icemon";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    LocalJobBegin {
        job_id: JobId,
        host_id: HostId,
        #[serde(default)]
        filename: String,
    },
    LocalJobDone {
        job_id: JobId,
    },
    RemoteJobBegin {
        job_id: JobId,
        host_id: HostId,
    },
    RemoteJobDone {
        job_id: JobId,
    },
    JobAssignedClient {
        job_id: JobId,
        client_id: HostId,
        #[serde(default)]
        filename: String,
    },
    HostStats(HostStats),
    FeedEnd,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostStats {
    pub host_id: HostId,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statmsg: Option<String>,
}

impl HostStats {
    pub fn merged_attributes(&self) -> Vec<(String, String)> {
        let mut merged = self
            .statmsg
            .as_deref()
            .map(parse_statmsg)
            .unwrap_or_default();
        merged.extend(
            self.attributes
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        merged
    }
}

pub fn parse_statmsg(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    MonitorLogin { client: String, version: String },
}

impl ClientFrame {
    pub fn login(version: &str) -> Self {
        ClientFrame::MonitorLogin {
            client: MONITOR_CLIENT.to_string(),
            version: version.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    Applied,
    EndOfFeed,
    Ignored,
}

pub fn apply_event(registry: &mut Registry, event: &FeedEvent) -> FeedOutcome {
    match event {
        FeedEvent::LocalJobBegin {
            job_id,
            host_id,
            filename,
        } => registry.job_local(*job_id, *host_id, filename),
        FeedEvent::LocalJobDone { job_id } | FeedEvent::RemoteJobDone { job_id } => {
            registry.job_done(*job_id);
        }
        FeedEvent::RemoteJobBegin { job_id, host_id } => registry.job_remote(*job_id, *host_id),
        FeedEvent::JobAssignedClient {
            job_id,
            client_id,
            filename,
        } => registry.job_pending(*job_id, *client_id, filename),
        FeedEvent::HostStats(stats) => {
            registry.host_stats(stats.host_id, stats.merged_attributes());
        }
        FeedEvent::FeedEnd => return FeedOutcome::EndOfFeed,
        FeedEvent::Unknown => return FeedOutcome::Ignored,
    }
    FeedOutcome::Applied
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("line of {size} bytes exceeds the {max} byte limit")]
    TooLong { size: usize, max: usize },
    #[error("frame encode failed: {0}")]
    Encode(String),
    #[error("frame decode failed: {0}")]
    Decode(String),
}

fn check_len(size: usize, max: usize) -> Result<(), FrameError> {
    if size > max {
        return Err(FrameError::TooLong { size, max });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DecodedLines<T> {
    pub frames: Vec<T>,
    pub errors: Vec<FrameError>,
}

impl<T> Default for DecodedLines<T> {
    fn default() -> Self {
        Self {
            frames: Vec::new(),
            errors: Vec::new(),
        }
    }
}

pub fn encode_frame<T: Serialize>(value: &T, max_line_bytes: usize) -> Result<Vec<u8>, FrameError> {
    let mut line =
        serde_json::to_vec(value).map_err(|err| FrameError::Encode(err.to_string()))?;
    check_len(line.len(), max_line_bytes)?;
    line.push(b'\n');
    Ok(line)
}

/// Splits a byte stream into JSON lines. A line longer than the limit is
/// reported once and dropped up to its newline, however it was chunked.
pub struct LineDecoder<T> {
    max_line_bytes: usize,
    buf: Vec<u8>,
    discarding: bool,
    marker: PhantomData<T>,
}

impl<T> LineDecoder<T> {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            max_line_bytes,
            buf: Vec::new(),
            discarding: false,
            marker: PhantomData,
        }
    }
}

impl<T> Default for LineDecoder<T> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

impl<T: DeserializeOwned> LineDecoder<T> {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> DecodedLines<T> {
        let mut out = DecodedLines::default();
        let mut rest = chunk;
        while let Some(newline) = rest.iter().position(|byte| *byte == b'\n') {
            self.append(&rest[..newline], &mut out);
            let line = std::mem::take(&mut self.buf);
            if !std::mem::take(&mut self.discarding) {
                self.decode_line(&line, &mut out);
            }
            rest = &rest[newline + 1..];
        }
        self.append(rest, &mut out);
        out
    }

    pub fn finish(&mut self) -> DecodedLines<T> {
        let mut out = DecodedLines::default();
        let line = std::mem::take(&mut self.buf);
        if !std::mem::take(&mut self.discarding) {
            self.decode_line(&line, &mut out);
        }
        out
    }

    fn append(&mut self, bytes: &[u8], out: &mut DecodedLines<T>) {
        if self.discarding {
            return;
        }
        let size = self.buf.len() + bytes.len();
        if let Err(err) = check_len(size, self.max_line_bytes) {
            out.errors.push(err);
            self.buf.clear();
            self.discarding = true;
            return;
        }
        self.buf.extend_from_slice(bytes);
    }

    fn decode_line(&self, line: &[u8], out: &mut DecodedLines<T>) {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.iter().all(u8::is_ascii_whitespace) {
            return;
        }
        match serde_json::from_slice(line) {
            Ok(frame) => out.frames.push(frame),
            Err(err) => out.errors.push(FrameError::Decode(err.to_string())),
        }
    }
}
