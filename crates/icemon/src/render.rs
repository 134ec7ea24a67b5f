use icemon_core::columns::{measure_all, ColumnKind, COLUMNS};
use icemon_core::job_graph::JobGraph;
use icemon_core::layout::negotiate;
use icemon_core::{Aggregation, HostSummary, Registry};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::theme::{self, HEADER_STYLE, LABEL_STYLE, SELECTED_STYLE};
use crate::view::ViewState;

const CLUSTER_GRAPH_COLUMN: usize = 6;
const DETAIL_INDENT: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceInfo {
    pub scheduler: String,
    pub net_name: String,
}

pub fn render_dashboard(
    buf: &mut Buffer,
    area: Rect,
    registry: &mut Registry,
    view: &mut ViewState,
    source: &SourceInfo,
    now: Instant,
) {
    let aggregation = Aggregation::build(registry, &view.anonymizer);
    let order = view.apply_order(&aggregation.hosts, registry);
    let mut canvas = Canvas::new(buf, area);
    let width = canvas.width();
    let totals = &aggregation.totals;

    let mut row = 0;
    let col = canvas.text(row, 0, "Scheduler: ", LABEL_STYLE);
    let col = canvas.text(row, col, &source.scheduler, Style::new());
    let col = canvas.text(row, col, " Netname: ", LABEL_STYLE);
    canvas.text(row, col, &source.net_name, Style::new());

    row += 1;
    let col = canvas.text(row, 0, "Servers: ", LABEL_STYLE);
    canvas.text(
        row,
        col,
        &format!(
            "Total:{} Available:{} Active:{}",
            totals.hosts, totals.available_servers, totals.busy_servers
        ),
        Style::new(),
    );

    row += 1;
    let col = canvas.text(row, 0, "Total: ", LABEL_STYLE);
    canvas.text(
        row,
        col,
        &format!(
            "Remote:{} Local:{}",
            totals.lifetime_remote_jobs, totals.lifetime_local_jobs
        ),
        Style::new(),
    );

    row += 1;
    let col = canvas.text(row, 0, "Jobs: ", LABEL_STYLE);
    canvas.text(
        row,
        col,
        &format!(
            "Maximum:{} Active:{} Local:{} Pending:{}",
            totals.total_job_slots, totals.active_jobs, totals.local_jobs, totals.pending_jobs
        ),
        Style::new(),
    );

    row += 1;
    let cluster_graph = JobGraph::build(
        &aggregation.active,
        totals.total_job_slots,
        width.saturating_sub(CLUSTER_GRAPH_COLUMN),
        view.track_jobs,
    );
    canvas.graph(row, CLUSTER_GRAPH_COLUMN, &cluster_graph);

    row += 2;
    let widths = measure_all(&COLUMNS, &aggregation);
    let placements = negotiate(&widths, width);
    canvas.fill_row(row, HEADER_STYLE);
    let arrow = if view.sort_reversed { "↑" } else { "↓" };
    canvas.text(row, 0, arrow, HEADER_STYLE);
    for placement in &placements {
        let style = if placement.column == view.selected_column {
            SELECTED_STYLE
        } else {
            HEADER_STYLE
        };
        let header = format!("{:<width$}", COLUMNS[placement.column].header, width = placement.width);
        canvas.text(row, placement.start, &header, style);
    }

    let summaries: BTreeMap<_, &HostSummary> =
        aggregation.hosts.iter().map(|host| (host.id, host)).collect();
    for id in order {
        row += 1;
        if row >= canvas.height() {
            break;
        }
        let Some(summary) = summaries.get(&id).copied() else {
            continue;
        };
        let Some(host) = registry.find_host(id) else {
            continue;
        };
        let expanded = host.expanded;
        let marker = if expanded { "-" } else { "+" };
        canvas.text(row, 0, marker, theme::expand_marker_style(host.highlighted));

        for placement in &placements {
            let column = &COLUMNS[placement.column];
            match column.kind {
                ColumnKind::Text(value) => {
                    let mut style = Style::new();
                    if column.is_name() {
                        style = theme::host_style(summary.color);
                        if summary.no_remote {
                            style = style.add_modifier(Modifier::UNDERLINED);
                        }
                    }
                    canvas.text(row, placement.start, &value(summary), style);
                }
                ColumnKind::JobGraph => {
                    let graph = JobGraph::build(
                        &summary.running,
                        summary.max_jobs,
                        placement.width,
                        view.track_jobs,
                    );
                    canvas.graph(row, placement.start, &graph);
                }
            }
        }

        if expanded {
            row = draw_details(&mut canvas, row, registry, view, summary, now);
        }
    }
}

fn draw_details(
    canvas: &mut Canvas<'_>,
    mut row: usize,
    registry: &mut Registry,
    view: &ViewState,
    summary: &HostSummary,
    now: Instant,
) -> usize {
    let rows_left = canvas.height().saturating_sub(row + 1);
    let slots = registry.assign_host_slots(summary.id, summary.max_jobs.min(rows_left));
    for (index, slot) in slots.iter().enumerate() {
        row += 1;
        if row >= canvas.height() {
            return row;
        }
        let col = canvas.text(row, DETAIL_INDENT, &format!("Job {}: ", index + 1), LABEL_STYLE);
        let Some(job) = slot.and_then(|id| registry.find_job(id)) else {
            continue;
        };
        let col = canvas.text(row, col, &format!("({:5.1}s) ", job.elapsed_secs(now)), Style::new());
        let color = registry
            .find_host(job.client_id)
            .map(|client| client.color())
            .unwrap_or_default();
        let filename = view.anonymizer.filename(&job.filename);
        let label = if filename.is_empty() {
            "<unknown>"
        } else {
            filename.as_ref()
        };
        canvas.text(row, col, label, theme::host_style(color));
    }

    let Some(host) = registry.find_host(summary.id) else {
        return row;
    };
    let attributes: Vec<(&String, &String)> = host
        .attributes
        .iter()
        .filter(|(key, _)| !view.anonymizer.hides_attribute(key))
        .collect();
    let key_width = attributes
        .iter()
        .map(|(key, _)| key.chars().count())
        .max()
        .unwrap_or(0);
    for (key, value) in attributes {
        row += 1;
        if row >= canvas.height() {
            return row;
        }
        canvas.text(row, DETAIL_INDENT, key, LABEL_STYLE);
        canvas.text(row, DETAIL_INDENT + key_width + 1, value, Style::new());
    }
    row
}

struct Canvas<'a> {
    buf: &'a mut Buffer,
    area: Rect,
}

impl<'a> Canvas<'a> {
    fn new(buf: &'a mut Buffer, area: Rect) -> Self {
        Self { buf, area }
    }

    fn width(&self) -> usize {
        self.area.width as usize
    }

    fn height(&self) -> usize {
        self.area.height as usize
    }

    fn text(&mut self, row: usize, col: usize, text: &str, style: Style) -> usize {
        if row >= self.height() || col >= self.width() {
            return col;
        }
        let (x, _) = self.buf.set_stringn(
            self.area.x + col as u16,
            self.area.y + row as u16,
            text,
            self.width() - col,
            style,
        );
        (x - self.area.x) as usize
    }

    fn fill_row(&mut self, row: usize, style: Style) {
        if row >= self.height() {
            return;
        }
        let line = Rect::new(self.area.x, self.area.y + row as u16, self.area.width, 1);
        self.buf.set_style(line, style);
    }

    fn graph(&mut self, row: usize, col: usize, graph: &JobGraph) {
        let mut col = self.text(row, col, &graph.open_bracket().to_string(), Style::new());
        for cell in &graph.cells {
            col = self.text(row, col, &cell.glyph.to_string(), theme::host_style(cell.color));
        }
        self.text(row, col, &graph.close_bracket().to_string(), Style::new());
    }
}
