use clap::Parser;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SCHEDULER_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8765;
pub const DEFAULT_NETNAME: &str = "ICECREAM";
pub const DEFAULT_TICK_MS: u64 = 20;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_RETRY_MS: u64 = 1_000;

pub const ABOUT: &str = "icemon: live terminal monitor for an icecream compile cluster.\n\
Shows every build host, its job slots and the compile jobs pending, running locally or running remotely.";

#[derive(Parser, Debug, Default)]
#[command(name = "icemon", version, about = "Live terminal monitor for an icecream compile cluster")]
pub struct Args {
    /// Scheduler to connect to, as host[:port].
    #[arg(short = 's', long)]
    pub scheduler: Option<String>,
    /// Network name to monitor.
    #[arg(short = 'n', long)]
    pub netname: Option<String>,
    /// Drive the view from the built-in workload simulator.
    #[arg(long, default_value_t = false)]
    pub simulate: bool,
    #[arg(long)]
    pub seed: Option<u64>,
    /// Stop simulating after this many ticks.
    #[arg(long)]
    pub cycles: Option<u64>,
    #[arg(long)]
    pub tick_ms: Option<u64>,
    /// Replace host and file names with hashed placeholders.
    #[arg(long, default_value_t = false)]
    pub anonymize: bool,
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    /// Print a short description and exit.
    #[arg(long, default_value_t = false)]
    pub about: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub scheduler: Option<String>,
    pub netname: Option<String>,
    pub simulate: bool,
    pub seed: Option<u64>,
    pub cycles: Option<u64>,
    pub tick_ms: Option<u64>,
    pub anonymize: bool,
    pub log_file: Option<PathBuf>,
    pub connect_timeout_ms: Option<u64>,
    pub retry_ms: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid scheduler address {0:?}")]
    InvalidScheduler(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let value = value.trim();
        let invalid = || ConfigError::InvalidScheduler(value.to_string());
        if value.is_empty() {
            return Err(invalid());
        }

        if let Some(rest) = value.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            let port = match tail.strip_prefix(':') {
                Some(port) => port.parse().map_err(|_| invalid())?,
                None if tail.is_empty() => DEFAULT_PORT,
                None => return Err(invalid()),
            };
            return Ok(Self {
                host: host.to_string(),
                port,
            });
        }

        match value.rsplit_once(':') {
            // A bare IPv6 address has several colons and no port.
            Some((host, _)) if host.contains(':') => Ok(Self {
                host: value.to_string(),
                port: DEFAULT_PORT,
            }),
            Some((host, port)) if !host.is_empty() => Ok(Self {
                host: host.to_string(),
                port: port.parse().map_err(|_| invalid())?,
            }),
            Some(_) => Err(invalid()),
            None => Ok(Self {
                host: value.to_string(),
                port: DEFAULT_PORT,
            }),
        }
    }

    pub fn connect_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_SCHEDULER_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.connect_addr())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveConfig {
    pub endpoint: Endpoint,
    pub netname: String,
    pub connect_timeout: Duration,
    pub retry_delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorConfig {
    pub seed: u64,
    pub cycles: Option<u64>,
    pub tick: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMode {
    Live(LiveConfig),
    Simulator(SimulatorConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mode: SourceMode,
    pub anonymize: bool,
    pub log_file: Option<PathBuf>,
}

pub fn load(args: &Args) -> Result<Config, ConfigError> {
    let env = |key: &str| std::env::var(key).ok();
    let path = config_path(args, &env);
    let file = load_file(&path)?;
    resolve(args, &file, &env)
}

pub fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn config_path(args: &Args, env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(path) = &args.config {
        return path.clone();
    }
    if let Some(path) = non_empty(env("ICEMON_CONFIG")) {
        return PathBuf::from(path);
    }
    config_dir(env).join("icemon/config.toml")
}

fn config_dir(env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(path) = non_empty(env("XDG_CONFIG_HOME")) {
        return PathBuf::from(path);
    }
    non_empty(env("HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
}

pub fn resolve(
    args: &Args,
    file: &FileConfig,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let anonymize = args.anonymize
        || env("ICEMON_ANONYMIZE")
            .and_then(|value| parse_bool_flag(&value))
            .unwrap_or(file.anonymize);
    let log_file = args.log_file.clone().or_else(|| file.log_file.clone());

    let mode = if args.simulate || file.simulate {
        SourceMode::Simulator(SimulatorConfig {
            seed: args
                .seed
                .or(file.seed)
                .unwrap_or_else(|| u64::from(std::process::id())),
            cycles: args.cycles.or(file.cycles),
            tick: Duration::from_millis(
                args.tick_ms
                    .or(file.tick_ms)
                    .unwrap_or(DEFAULT_TICK_MS)
                    .max(1),
            ),
        })
    } else {
        let scheduler = args
            .scheduler
            .clone()
            .and_then(|value| non_empty(Some(value)))
            .or_else(|| non_empty(env("ICEMON_SCHEDULER")))
            .or_else(|| non_empty(file.scheduler.clone()));
        let endpoint = match scheduler {
            Some(value) => Endpoint::parse(&value)?,
            None => Endpoint::default(),
        };
        let netname = args
            .netname
            .clone()
            .and_then(|value| non_empty(Some(value)))
            .or_else(|| non_empty(env("ICEMON_NETNAME")))
            .or_else(|| non_empty(file.netname.clone()))
            .unwrap_or_else(|| DEFAULT_NETNAME.to_string());
        SourceMode::Live(LiveConfig {
            endpoint,
            netname,
            connect_timeout: Duration::from_millis(
                file.connect_timeout_ms.unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS),
            ),
            retry_delay: Duration::from_millis(file.retry_ms.unwrap_or(DEFAULT_RETRY_MS).max(1)),
        })
    };

    Ok(Config {
        mode,
        anonymize,
        log_file,
    })
}

pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
