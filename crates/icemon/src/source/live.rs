use icemon_core::feed::{encode_frame, ClientFrame, LineDecoder, DEFAULT_MAX_FRAME_BYTES};
use icemon_core::{apply_event, FeedEvent, FeedOutcome, FrameError, Registry};
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::SurfaceChange;
use crate::config::{Endpoint, LiveConfig};

const READ_CHUNK_BYTES: usize = 8192;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("connecting to {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },
    #[error("connecting to {addr} failed: {source}")]
    Connect { addr: String, source: io::Error },
    #[error("sending login failed: {0}")]
    Login(io::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

type Discovery = Pin<Box<dyn Future<Output = Result<TcpStream, SourceError>> + Send>>;

enum LiveState {
    Discovering(Discovery),
    Connected(Connection),
    Retrying(Interval),
}

struct Connection {
    stream: TcpStream,
    decoder: LineDecoder<FeedEvent>,
    buf: Vec<u8>,
}

pub enum LiveWake {
    Discovered(Result<TcpStream, SourceError>),
    Read(io::Result<usize>),
    RetryTick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Discovering,
    Connected,
    Retrying,
}

pub struct LiveSource {
    config: LiveConfig,
    state: LiveState,
}

impl LiveSource {
    pub fn new(config: LiveConfig) -> Self {
        let state = LiveState::Discovering(discover(&config));
        Self { config, state }
    }

    pub fn net_name(&self) -> &str {
        &self.config.netname
    }

    pub fn scheduler_name(&self) -> String {
        match self.state {
            LiveState::Connected(_) => self.config.endpoint.to_string(),
            _ => String::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            LiveState::Discovering(_) => Phase::Discovering,
            LiveState::Connected(_) => Phase::Connected,
            LiveState::Retrying(_) => Phase::Retrying,
        }
    }

    pub fn start(&mut self, registry: &mut Registry) -> SurfaceChange {
        registry.clear();
        info!("scheduler_discovery: {}", self.config.endpoint);
        SurfaceChange::Suspend
    }

    /// Waits for the current state to make progress. Safe to drop before
    /// completion: the pending connect, socket read and retry timer all
    /// live in `self` and are picked up by the next call.
    pub async fn wait(&mut self) -> LiveWake {
        match &mut self.state {
            LiveState::Discovering(discovery) => LiveWake::Discovered(discovery.as_mut().await),
            LiveState::Connected(conn) => LiveWake::Read(conn.stream.read(&mut conn.buf).await),
            LiveState::Retrying(timer) => {
                timer.tick().await;
                LiveWake::RetryTick
            }
        }
    }

    pub fn service(&mut self, wake: LiveWake, registry: &mut Registry) -> Option<SurfaceChange> {
        match wake {
            LiveWake::Discovered(Ok(stream)) => {
                info!("scheduler_connected: {}", self.config.endpoint);
                self.state = LiveState::Connected(Connection {
                    stream,
                    decoder: LineDecoder::new(DEFAULT_MAX_FRAME_BYTES),
                    buf: vec![0; READ_CHUNK_BYTES],
                });
                registry.request_redraw();
                Some(SurfaceChange::Resume)
            }
            LiveWake::Discovered(Err(err)) => {
                warn!("scheduler_connect_error: {err}");
                self.state = LiveState::Retrying(retry_timer(self.config.retry_delay));
                registry.request_redraw();
                Some(SurfaceChange::Resume)
            }
            LiveWake::RetryTick => Some(self.rediscover(registry)),
            LiveWake::Read(Ok(0)) => {
                if let LiveState::Connected(conn) = &mut self.state {
                    let report = conn.decoder.finish();
                    log_errors(&report.errors);
                    apply_all(registry, report.frames);
                }
                info!("scheduler_closed");
                Some(self.rediscover(registry))
            }
            LiveWake::Read(Ok(read)) => {
                if self.drain(read, registry) {
                    Some(self.rediscover(registry))
                } else {
                    None
                }
            }
            LiveWake::Read(Err(err)) => {
                warn!("scheduler_read_error: {err}");
                Some(self.rediscover(registry))
            }
        }
    }

    fn drain(&mut self, first_read: usize, registry: &mut Registry) -> bool {
        let LiveState::Connected(conn) = &mut self.state else {
            return false;
        };
        let mut read = first_read;
        loop {
            let report = conn.decoder.push_chunk(&conn.buf[..read]);
            log_errors(&report.errors);
            if apply_all(registry, report.frames) {
                info!("scheduler_feed_end");
                return true;
            }
            match conn.stream.try_read(&mut conn.buf) {
                Ok(0) => {
                    let report = conn.decoder.finish();
                    log_errors(&report.errors);
                    apply_all(registry, report.frames);
                    info!("scheduler_closed");
                    return true;
                }
                Ok(more) => read = more,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return false,
                Err(err) => {
                    warn!("scheduler_read_error: {err}");
                    return true;
                }
            }
        }
    }

    fn rediscover(&mut self, registry: &mut Registry) -> SurfaceChange {
        registry.clear();
        debug!("scheduler_discovery: {}", self.config.endpoint);
        self.state = LiveState::Discovering(discover(&self.config));
        SurfaceChange::Suspend
    }
}

fn apply_all(registry: &mut Registry, events: Vec<FeedEvent>) -> bool {
    for event in events {
        match apply_event(registry, &event) {
            FeedOutcome::Applied => {}
            FeedOutcome::Ignored => debug!("scheduler_unknown_event"),
            FeedOutcome::EndOfFeed => return true,
        }
    }
    false
}

fn log_errors(errors: &[FrameError]) {
    for err in errors {
        warn!("scheduler_decode_error: {err}");
    }
}

fn retry_timer(delay: Duration) -> Interval {
    let mut timer = time::interval_at(Instant::now() + delay, delay);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

fn discover(config: &LiveConfig) -> Discovery {
    Box::pin(connect_and_login(
        config.endpoint.clone(),
        config.connect_timeout,
    ))
}

async fn connect_and_login(endpoint: Endpoint, timeout: Duration) -> Result<TcpStream, SourceError> {
    let addr = endpoint.connect_addr();
    let mut stream = match time::timeout(timeout, TcpStream::connect(&addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => return Err(SourceError::Connect { addr, source }),
        Err(_) => return Err(SourceError::Timeout { addr, timeout }),
    };
    let login = encode_frame(
        &ClientFrame::login(env!("CARGO_PKG_VERSION")),
        DEFAULT_MAX_FRAME_BYTES,
    )?;
    stream.write_all(&login).await.map_err(SourceError::Login)?;
    Ok(stream)
}
