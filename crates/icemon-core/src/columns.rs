use crate::aggregate::{Aggregation, HostSummary};
use crate::layout::ColumnWidth;
use crate::model::HostId;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy)]
pub enum ColumnKind {
    Text(fn(&HostSummary) -> String),
    JobGraph,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub header: &'static str,
    pub min_width: usize,
    pub kind: ColumnKind,
    pub compare: fn(&HostSummary, &HostSummary) -> Ordering,
}

impl Column {
    const fn text(
        header: &'static str,
        min_width: usize,
        value: fn(&HostSummary) -> String,
        compare: fn(&HostSummary, &HostSummary) -> Ordering,
    ) -> Self {
        Self {
            header,
            min_width,
            kind: ColumnKind::Text(value),
            compare,
        }
    }

    pub fn value(&self, host: &HostSummary) -> Option<String> {
        match self.kind {
            ColumnKind::Text(value) => Some(value(host)),
            ColumnKind::JobGraph => None,
        }
    }

    pub fn is_name(&self) -> bool {
        self.header == "NAME"
    }

    pub fn measure(&self, aggregation: &Aggregation) -> ColumnWidth {
        let header = self.header.chars().count();
        match self.kind {
            ColumnKind::Text(value) => {
                let longest = aggregation
                    .hosts
                    .iter()
                    .filter(|host| host.id != 0)
                    .map(|host| value(host).chars().count())
                    .max()
                    .unwrap_or(0);
                ColumnWidth::fixed(header.max(self.min_width).max(longest))
            }
            ColumnKind::JobGraph => {
                let widest = aggregation
                    .hosts
                    .iter()
                    .filter(|host| host.id != 0)
                    .map(|host| host.max_jobs.saturating_add(2))
                    .max()
                    .unwrap_or(0);
                ColumnWidth::new(header.max(self.min_width), widest)
            }
        }
    }
}

pub const COLUMNS: [Column; 10] = [
    Column::text("ID", 0, |h| h.id.to_string(), |a, b| a.id.cmp(&b.id)),
    Column::text("NAME", 0, |h| h.name.clone(), |a, b| a.name.cmp(&b.name)),
    Column::text(
        "IN",
        5,
        |h| h.total_in.to_string(),
        |a, b| a.total_in.cmp(&b.total_in),
    ),
    Column::text(
        "CUR",
        0,
        |h| h.running.len().to_string(),
        |a, b| a.running.len().cmp(&b.running.len()),
    ),
    Column::text(
        "MAX",
        0,
        |h| h.max_jobs.to_string(),
        |a, b| a.max_jobs.cmp(&b.max_jobs),
    ),
    Column {
        header: "JOBS",
        min_width: 0,
        kind: ColumnKind::JobGraph,
        compare: |a, b| a.running.len().cmp(&b.running.len()),
    },
    Column::text(
        "OUT",
        5,
        |h| h.total_out.to_string(),
        |a, b| a.total_out.cmp(&b.total_out),
    ),
    Column::text(
        "LOCAL",
        5,
        |h| h.total_local.to_string(),
        |a, b| a.total_local.cmp(&b.total_local),
    ),
    Column::text(
        "ACTIVE",
        0,
        |h| h.active_jobs.to_string(),
        |a, b| a.active_jobs.cmp(&b.active_jobs),
    ),
    Column::text(
        "PENDING",
        0,
        |h| h.pending_jobs.to_string(),
        |a, b| a.pending_jobs.cmp(&b.pending_jobs),
    ),
];

pub fn measure_all(columns: &[Column], aggregation: &Aggregation) -> Vec<ColumnWidth> {
    columns
        .iter()
        .map(|column| column.measure(aggregation))
        .collect()
}

pub fn sort_hosts(hosts: &[HostSummary], column: &Column, reversed: bool) -> Vec<HostId> {
    let mut visible: Vec<&HostSummary> = hosts.iter().filter(|host| host.id != 0).collect();
    visible.sort_by_key(|host| host.id);
    if reversed {
        visible.sort_by(|a, b| (column.compare)(b, a));
    } else {
        visible.sort_by(|a, b| (column.compare)(a, b));
    }
    visible.into_iter().map(|host| host.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorId;

    fn summary(id: HostId, name: &str, max_jobs: usize, total_in: u64) -> HostSummary {
        HostSummary {
            id,
            name: name.to_string(),
            color: ColorId::DEFAULT,
            max_jobs,
            no_remote: false,
            pending_jobs: 0,
            active_jobs: 0,
            running: Vec::new(),
            total_in,
            total_out: 0,
            total_local: 0,
        }
    }

    fn aggregation(hosts: Vec<HostSummary>) -> Aggregation {
        Aggregation {
            hosts,
            ..Aggregation::default()
        }
    }

    #[test]
    fn text_columns_measure_header_min_and_values() {
        let agg = aggregation(vec![summary(1, "a-very-long-name", 4, 123456)]);
        let [id, name, input, ..] = COLUMNS;
        assert_eq!(id.measure(&agg), ColumnWidth::fixed(2));
        assert_eq!(name.measure(&agg), ColumnWidth::fixed(16));
        assert_eq!(input.measure(&agg), ColumnWidth::fixed(6));
        assert_eq!(input.measure(&aggregation(Vec::new())), ColumnWidth::fixed(5));
    }

    #[test]
    fn job_graph_column_wants_room_for_largest_host() {
        let agg = aggregation(vec![summary(1, "a", 4, 0), summary(2, "b", 12, 0)]);
        assert_eq!(COLUMNS[5].measure(&agg), ColumnWidth::new(4, 14));
        assert_eq!(COLUMNS[5].measure(&aggregation(Vec::new())), ColumnWidth::fixed(4));
    }

    #[test]
    fn job_graph_column_saturates_at_max_capacity() {
        let agg = aggregation(vec![summary(1, "a", usize::MAX, 0)]);
        assert_eq!(COLUMNS[5].measure(&agg), ColumnWidth::new(4, usize::MAX));
    }

    #[test]
    fn sort_skips_sentinel_and_breaks_ties_by_id() {
        let hosts = vec![
            summary(0, "none", 0, 0),
            summary(3, "c", 2, 5),
            summary(1, "a", 8, 5),
            summary(2, "b", 4, 1),
        ];
        let by_in = &COLUMNS[2];
        assert_eq!(sort_hosts(&hosts, by_in, false), vec![2, 1, 3]);
        assert_eq!(sort_hosts(&hosts, by_in, true), vec![1, 3, 2]);
        assert_eq!(sort_hosts(&hosts, &COLUMNS[1], true), vec![3, 2, 1]);
    }

    #[test]
    fn reversing_twice_restores_order() {
        let hosts = vec![summary(1, "x", 8, 2), summary(2, "y", 4, 9), summary(3, "z", 6, 2)];
        for column in &COLUMNS {
            let original = sort_hosts(&hosts, column, false);
            let mut reversed = false;
            reversed = !reversed;
            let _ = sort_hosts(&hosts, column, reversed);
            reversed = !reversed;
            assert_eq!(sort_hosts(&hosts, column, reversed), original);
        }
    }
}
