use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use icemon_core::columns::{sort_hosts, Column, COLUMNS};
use icemon_core::{Anonymizer, HostId, HostSummary, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Redraw,
    Quit,
    Passthrough(char),
    Ignored,
}

#[derive(Debug, Clone)]
pub struct ViewState {
    pub selected_host: Option<HostId>,
    pub selected_column: usize,
    pub sort_reversed: bool,
    pub track_jobs: bool,
    pub anonymizer: Anonymizer,
    order: Vec<HostId>,
}

impl ViewState {
    pub fn new(anonymizer: Anonymizer) -> Self {
        Self {
            selected_host: None,
            selected_column: 0,
            sort_reversed: false,
            track_jobs: false,
            anonymizer,
            order: Vec::new(),
        }
    }

    pub fn column(&self) -> &'static Column {
        &COLUMNS[self.selected_column.min(COLUMNS.len() - 1)]
    }

    pub fn order(&self) -> &[HostId] {
        &self.order
    }

    pub fn apply_order(&mut self, hosts: &[HostSummary], registry: &mut Registry) -> Vec<HostId> {
        self.order = sort_hosts(hosts, self.column(), self.sort_reversed);
        if self
            .selected_host
            .is_some_and(|id| registry.find_host(id).is_none())
        {
            self.selected_host = None;
        }
        for host in registry.hosts_mut() {
            host.highlighted = false;
        }
        for (position, id) in self.order.iter().enumerate() {
            if let Some(host) = registry.find_host_mut(*id) {
                host.current_position = position;
                host.highlighted = self.selected_host == Some(*id);
            }
        }
        self.order.clone()
    }

    pub fn handle_key(&mut self, key: KeyEvent, registry: &mut Registry) -> KeyOutcome {
        if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
            return KeyOutcome::Ignored;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => KeyOutcome::Quit,
                _ => KeyOutcome::Ignored,
            };
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(registry, -1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(registry, 1),
            KeyCode::Left | KeyCode::Char('h') => {
                self.selected_column = self.selected_column.saturating_sub(1);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if self.selected_column + 1 < COLUMNS.len() {
                    self.selected_column += 1;
                }
            }
            KeyCode::Tab => {
                self.selected_column = (self.selected_column + 1) % COLUMNS.len();
            }
            KeyCode::Char(' ') => {
                if let Some(host) = self.selected_host.and_then(|id| registry.find_host_mut(id)) {
                    host.expanded = !host.expanded;
                }
            }
            KeyCode::Char('a') => registry.set_all_expanded(!registry.all_expanded()),
            KeyCode::Char('r') => self.sort_reversed = !self.sort_reversed,
            KeyCode::Char('T') => self.track_jobs = !self.track_jobs,
            KeyCode::Char('q') => return KeyOutcome::Quit,
            KeyCode::Char(other) => return KeyOutcome::Passthrough(other),
            _ => return KeyOutcome::Ignored,
        }
        registry.request_redraw();
        KeyOutcome::Redraw
    }

    fn move_selection(&mut self, registry: &mut Registry, step: isize) {
        let current = self
            .selected_host
            .and_then(|id| registry.find_host(id))
            .map(|host| host.current_position);
        let next = match current {
            Some(position) => position
                .checked_add_signed(step)
                .filter(|next| *next < self.order.len())
                .unwrap_or(position),
            None => 0,
        };
        if let Some(id) = self.order.get(next).copied() {
            if let Some(previous) = self.selected_host.and_then(|id| registry.find_host_mut(id)) {
                previous.highlighted = false;
            }
            self.selected_host = Some(id);
            if let Some(host) = registry.find_host_mut(id) {
                host.highlighted = true;
            }
        }
    }
}
