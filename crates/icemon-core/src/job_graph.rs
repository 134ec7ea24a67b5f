use crate::color::ColorId;
use crate::model::JobId;
use std::collections::BTreeMap;

pub const LOCAL_GLYPH: char = '%';
pub const REMOTE_GLYPH: char = '=';
pub const LOCAL_TRACK: &str = "abcdefghijklmnopqrstuvwxyz";
pub const REMOTE_TRACK: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphJob {
    pub id: JobId,
    pub color: ColorId,
    pub is_local: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphCell {
    pub glyph: char,
    pub color: ColorId,
}

impl GraphCell {
    pub const EMPTY: Self = Self {
        glyph: ' ',
        color: ColorId::DEFAULT,
    };

    pub fn is_empty(&self) -> bool {
        self.glyph == ' '
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobGraph {
    pub compressed: bool,
    pub cells: Vec<GraphCell>,
}

impl JobGraph {
    pub fn build(jobs: &[GraphJob], capacity: usize, available: usize, track_jobs: bool) -> Self {
        let graph_slots = available.saturating_sub(2).min(capacity);
        let compressed = graph_slots < capacity;

        let mut bins: BTreeMap<BinKey, Vec<JobId>> = BTreeMap::new();
        for job in jobs {
            bins.entry(BinKey::of(job)).or_default().push(job.id);
        }
        let total_active: usize = bins.values().map(Vec::len).sum();
        let mut cells = Vec::with_capacity(graph_slots);

        if total_active > 0 && graph_slots > 0 {
            let effective = total_active.max(capacity);
            let target = (graph_slots * total_active).div_ceil(effective);
            let counts: Vec<usize> = bins.values().map(Vec::len).collect();
            let allocation = apportion(&counts, target);

            for ((key, ids), slots) in bins.iter().zip(allocation) {
                for n in 0..slots {
                    let glyph = if track_jobs {
                        // Every bin has at least as many jobs as slots.
                        track_glyph(ids[n], key.is_local())
                    } else if key.is_local() {
                        LOCAL_GLYPH
                    } else {
                        REMOTE_GLYPH
                    };
                    cells.push(GraphCell {
                        glyph,
                        color: key.color,
                    });
                }
            }
        }
        cells.resize(graph_slots, GraphCell::EMPTY);

        Self { compressed, cells }
    }

    pub fn open_bracket(&self) -> char {
        if self.compressed {
            '{'
        } else {
            '['
        }
    }

    pub fn close_bracket(&self) -> char {
        if self.compressed {
            '}'
        } else {
            ']'
        }
    }

    pub fn width(&self) -> usize {
        self.cells.len() + 2
    }

    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|cell| !cell.is_empty()).count()
    }

    pub fn to_text(&self) -> String {
        let mut text = String::with_capacity(self.width());
        text.push(self.open_bracket());
        text.extend(self.cells.iter().map(|cell| cell.glyph));
        text.push(self.close_bracket());
        text
    }
}

// Ordered local first, then by color, which keeps the strip from reshuffling
// between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct BinKey {
    remote: bool,
    color: ColorId,
}

impl BinKey {
    fn of(job: &GraphJob) -> Self {
        Self {
            remote: !job.is_local,
            color: job.color,
        }
    }

    fn is_local(&self) -> bool {
        !self.remote
    }
}

fn track_glyph(id: JobId, is_local: bool) -> char {
    let track = if is_local { LOCAL_TRACK } else { REMOTE_TRACK };
    let index = id as usize % track.len();
    track.as_bytes()[index] as char
}

/// Largest-remainder split of `target` across `counts`. Sums to exactly
/// `target` unless every count is zero; ties go to the earlier bin.
pub fn apportion(counts: &[usize], target: usize) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0; counts.len()];
    }
    let mut allocation = Vec::with_capacity(counts.len());
    let mut remainders = Vec::with_capacity(counts.len());
    for (index, count) in counts.iter().enumerate() {
        let share = count * target;
        allocation.push(share / total);
        remainders.push((index, share % total));
    }
    // Stable sort keeps bin order among equal remainders.
    remainders.sort_by(|a, b| b.1.cmp(&a.1));

    let mut assigned: usize = allocation.iter().sum();
    for (index, _) in remainders {
        if assigned >= target {
            break;
        }
        allocation[index] += 1;
        assigned += 1;
    }
    allocation
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: JobId, color: usize, is_local: bool) -> GraphJob {
        GraphJob {
            id,
            color: ColorId(color),
            is_local,
        }
    }

    #[test]
    fn apportion_awards_leftover_by_remainder() {
        assert_eq!(apportion(&[7, 3], 5), vec![4, 1]);
        assert_eq!(apportion(&[1, 1, 1], 2), vec![1, 1, 0]);
        assert_eq!(apportion(&[2, 5, 3], 4), vec![1, 2, 1]);
        assert_eq!(apportion(&[0, 0], 3), vec![0, 0]);
    }

    #[test]
    fn empty_host_renders_padded_strip() {
        let graph = JobGraph::build(&[], 4, 10, false);
        assert_eq!(graph.to_text(), "[    ]");
        assert!(!graph.compressed);
    }

    #[test]
    fn zero_capacity_renders_bare_brackets() {
        let graph = JobGraph::build(&[job(1, 1, false)], 0, 10, false);
        assert_eq!(graph.to_text(), "[]");
    }

    #[test]
    fn uncompressed_graph_draws_one_cell_per_job() {
        let jobs = [job(1, 2, false), job(2, 1, true), job(3, 2, false)];
        let graph = JobGraph::build(&jobs, 5, 20, false);
        assert_eq!(graph.to_text(), "[%==  ]");
        assert_eq!(graph.cells[1].color, ColorId(2));
    }

    #[test]
    fn compressed_graph_scales_to_available_width() {
        let jobs: Vec<GraphJob> = (0..10).map(|id| job(id, 1, false)).collect();
        let graph = JobGraph::build(&jobs, 20, 7, false);
        assert!(graph.compressed);
        assert_eq!(graph.cells.len(), 5);
        // ceil(5 * 10 / 20) = 3
        assert_eq!(graph.filled(), 3);
        assert_eq!(graph.to_text(), "{===  }");
    }

    #[test]
    fn overcommitted_host_never_overflows() {
        let jobs: Vec<GraphJob> = (0..6).map(|id| job(id, 1, true)).collect();
        let graph = JobGraph::build(&jobs, 4, 20, false);
        assert_eq!(graph.cells.len(), 4);
        assert_eq!(graph.filled(), 4);
    }

    #[test]
    fn track_mode_uses_job_letters() {
        let jobs = [job(0, 1, true), job(27, 1, false)];
        let graph = JobGraph::build(&jobs, 3, 10, true);
        assert_eq!(graph.to_text(), "[aB ]");
    }
}
