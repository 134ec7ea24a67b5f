use icemon_core::color::ColorId;
use icemon_core::job_graph::{apportion, GraphJob, JobGraph};
use icemon_core::layout::{negotiate, ColumnWidth, COLUMN_GAP, ROW_ORIGIN};
use icemon_core::model::JobClass;
use icemon_core::registry::Registry;
use proptest::prelude::*;

fn graph_jobs(bins: &[(usize, bool, usize)]) -> Vec<GraphJob> {
    let mut jobs = Vec::new();
    let mut next_id = 0;
    for (color, is_local, count) in bins {
        for _ in 0..*count {
            jobs.push(GraphJob {
                id: next_id,
                color: ColorId(*color),
                is_local: *is_local,
            });
            next_id += 1;
        }
    }
    jobs
}

proptest! {
    #[test]
    fn apportion_sums_to_target(
        counts in prop::collection::vec(0usize..50, 1..8),
        target in 0usize..64,
    ) {
        let allocation = apportion(&counts, target);
        let total: usize = counts.iter().sum();
        prop_assert_eq!(allocation.len(), counts.len());
        if total == 0 {
            prop_assert!(allocation.iter().all(|slots| *slots == 0));
        } else {
            prop_assert_eq!(allocation.iter().sum::<usize>(), target);
        }
    }

    #[test]
    fn job_graph_fills_exactly_the_scaled_target(
        bins in prop::collection::vec((0usize..8, any::<bool>(), 0usize..12), 0..6),
        capacity in 0usize..24,
        available in 0usize..32,
        track in any::<bool>(),
    ) {
        let jobs = graph_jobs(&bins);
        let graph = JobGraph::build(&jobs, capacity, available, track);
        let graph_slots = available.saturating_sub(2).min(capacity);
        prop_assert_eq!(graph.cells.len(), graph_slots);
        prop_assert_eq!(graph.compressed, graph_slots < capacity);

        let expected = if jobs.is_empty() || graph_slots == 0 {
            0
        } else {
            (graph_slots * jobs.len()).div_ceil(jobs.len().max(capacity))
        };
        prop_assert_eq!(graph.filled(), expected);
        prop_assert!(graph.filled() <= graph_slots);
    }

    #[test]
    fn layout_respects_minimums_and_keeps_a_fitting_prefix(
        widths in prop::collection::vec((0usize..12, 0usize..20), 0..10),
        terminal_width in 0usize..120,
    ) {
        let columns: Vec<ColumnWidth> = widths
            .iter()
            .map(|(min, extra)| ColumnWidth::new(*min, min + extra))
            .collect();
        let placements = negotiate(&columns, terminal_width);

        let mut next_start = ROW_ORIGIN;
        for (index, placement) in placements.iter().enumerate() {
            prop_assert_eq!(placement.column, index);
            prop_assert!(placement.width >= columns[index].min);
            prop_assert!(placement.width <= columns[index].desired);
            prop_assert_eq!(placement.start, next_start);
            prop_assert!(placement.end() <= terminal_width);
            next_start = placement.end() + COLUMN_GAP;
        }

        let min_total: usize = ROW_ORIGIN
            + columns.iter().map(|c| c.min).sum::<usize>()
            + COLUMN_GAP * columns.len().saturating_sub(1);
        if min_total <= terminal_width {
            prop_assert_eq!(placements.len(), columns.len());
        }
    }

    #[test]
    fn classification_is_always_exclusive(
        ops in prop::collection::vec((0u32..6, 0u8..5), 0..60),
    ) {
        let mut registry = Registry::new();
        for (id, op) in ops {
            match op {
                0 => registry.job_pending(id, 1, "a.c"),
                1 => registry.job_local(id, 2, "b.c"),
                2 => registry.job_remote(id, 3),
                3 => {
                    registry.job_done(id);
                }
                _ => {
                    registry.classify(id, None);
                }
            }
            for job in registry.jobs() {
                let memberships = [
                    registry.pending_jobs().contains(&job.id),
                    registry.active_local_jobs().contains(&job.id),
                    registry.active_remote_jobs().contains(&job.id),
                ];
                prop_assert!(memberships.iter().filter(|m| **m).count() <= 1);
                match registry.class_of(job.id) {
                    Some(class) => {
                        prop_assert_eq!(job.active, class.is_active());
                        prop_assert_eq!(job.is_local, class == JobClass::Local);
                    }
                    None => prop_assert!(!job.active),
                }
            }
            let classified = registry.pending_jobs().len()
                + registry.active_local_jobs().len()
                + registry.active_remote_jobs().len();
            prop_assert!(classified <= registry.job_count());
        }
    }
}
