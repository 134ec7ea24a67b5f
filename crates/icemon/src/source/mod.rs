pub mod live;
pub mod simulator;

use icemon_core::Registry;

use crate::config::SourceMode;
use live::{LiveSource, LiveWake};
use simulator::SimulatorSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceChange {
    Suspend,
    Resume,
}

pub enum SourceWake {
    Live(LiveWake),
    SimulatorTick,
}

pub enum DataSource {
    Live(LiveSource),
    Simulator(SimulatorSource),
}

impl DataSource {
    pub fn from_mode(mode: SourceMode) -> Self {
        match mode {
            SourceMode::Live(config) => DataSource::Live(LiveSource::new(config)),
            SourceMode::Simulator(config) => DataSource::Simulator(SimulatorSource::new(&config)),
        }
    }

    pub fn net_name(&self) -> String {
        match self {
            DataSource::Live(source) => source.net_name().to_string(),
            DataSource::Simulator(_) => crate::config::DEFAULT_NETNAME.to_string(),
        }
    }

    pub fn scheduler_name(&self) -> String {
        match self {
            DataSource::Live(source) => source.scheduler_name(),
            DataSource::Simulator(_) => "simulator".to_string(),
        }
    }

    pub fn on_input(&mut self, key: char, registry: &mut Registry) -> bool {
        let consumed = match self {
            DataSource::Live(_) => false,
            DataSource::Simulator(source) => source.on_input(key),
        };
        if consumed {
            registry.request_redraw();
        }
        consumed
    }

    pub fn start(&mut self, registry: &mut Registry) -> Option<SurfaceChange> {
        match self {
            DataSource::Live(source) => Some(source.start(registry)),
            DataSource::Simulator(source) => {
                source.start(registry);
                None
            }
        }
    }

    pub async fn wait(&mut self) -> SourceWake {
        match self {
            DataSource::Live(source) => SourceWake::Live(source.wait().await),
            DataSource::Simulator(source) => {
                source.wait().await;
                SourceWake::SimulatorTick
            }
        }
    }

    pub fn service(&mut self, wake: SourceWake, registry: &mut Registry) -> Option<SurfaceChange> {
        match (self, wake) {
            (DataSource::Live(source), SourceWake::Live(wake)) => source.service(wake, registry),
            (DataSource::Simulator(source), SourceWake::SimulatorTick) => {
                source.tick(registry);
                None
            }
            _ => None,
        }
    }
}
