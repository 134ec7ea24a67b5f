pub const ROW_ORIGIN: usize = 2;
pub const COLUMN_GAP: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnWidth {
    pub min: usize,
    pub desired: usize,
}

impl ColumnWidth {
    pub fn fixed(width: usize) -> Self {
        Self {
            min: width,
            desired: width,
        }
    }

    pub fn new(min: usize, desired: usize) -> Self {
        Self {
            min,
            desired: desired.max(min),
        }
    }

    pub fn slack(&self) -> usize {
        self.desired - self.min
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub column: usize,
    pub start: usize,
    pub width: usize,
}

impl Placement {
    pub fn end(&self) -> usize {
        self.start + self.width
    }
}

/// Assigns a width and start position to every column that fits in
/// `terminal_width`. The result is always a prefix of `columns`.
pub fn negotiate(columns: &[ColumnWidth], terminal_width: usize) -> Vec<Placement> {
    let widths = negotiate_widths(columns, terminal_width);

    let mut placements = Vec::with_capacity(columns.len());
    let mut start = ROW_ORIGIN;
    for (column, width) in widths.into_iter().enumerate() {
        if start.saturating_add(width) > terminal_width {
            break;
        }
        placements.push(Placement {
            column,
            start,
            width,
        });
        start += width + COLUMN_GAP;
    }
    placements
}

fn negotiate_widths(columns: &[ColumnWidth], terminal_width: usize) -> Vec<usize> {
    let gaps = COLUMN_GAP * columns.len().saturating_sub(1);
    let desired_total = total_width(gaps, columns.iter().map(|c| c.desired));
    if desired_total <= terminal_width {
        return columns.iter().map(|c| c.desired).collect();
    }

    let slack_columns = columns.iter().filter(|c| c.slack() > 0).count();
    if slack_columns == 0 {
        return columns.iter().map(|c| c.desired).collect();
    }

    let min_total = total_width(gaps, columns.iter().map(|c| c.min));
    let available = terminal_width.saturating_sub(min_total);
    let share = available / slack_columns;
    let mut extra = available % slack_columns;

    columns
        .iter()
        .map(|column| {
            if column.slack() == 0 {
                return column.desired;
            }
            let mut grant = share;
            if extra > 0 {
                grant += 1;
                extra -= 1;
            }
            column.min + grant.min(column.slack())
        })
        .collect()
}

fn total_width(gaps: usize, widths: impl Iterator<Item = usize>) -> usize {
    widths.fold(ROW_ORIGIN + gaps, usize::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desired_widths_used_when_they_fit() {
        let columns = [ColumnWidth::fixed(3), ColumnWidth::new(4, 10)];
        let placements = negotiate(&columns, 80);
        assert_eq!(
            placements,
            vec![
                Placement {
                    column: 0,
                    start: 2,
                    width: 3
                },
                Placement {
                    column: 1,
                    start: 6,
                    width: 10
                },
            ]
        );
    }

    #[test]
    fn slack_is_shared_with_remainder_to_leading_columns() {
        // origin 2 + gaps 2 + mins 9 = 13, leaving 5 for two slack columns.
        let columns = [
            ColumnWidth::new(2, 20),
            ColumnWidth::fixed(3),
            ColumnWidth::new(4, 20),
        ];
        let placements = negotiate(&columns, 18);
        let widths: Vec<usize> = placements.iter().map(|p| p.width).collect();
        assert_eq!(widths, vec![5, 3, 6]);
        assert_eq!(placements[2].end(), 18);
    }

    #[test]
    fn grants_never_exceed_desired() {
        let columns = [ColumnWidth::new(2, 3), ColumnWidth::new(2, 30)];
        // origin 2 + gap 1 + mins 4 = 7; 20 left, 10 each.
        let placements = negotiate(&columns, 27);
        assert_eq!(placements[0].width, 3);
        assert_eq!(placements[1].width, 12);
    }

    #[test]
    fn trailing_columns_dropped_on_narrow_terminal() {
        let columns = [
            ColumnWidth::fixed(4),
            ColumnWidth::fixed(4),
            ColumnWidth::fixed(4),
        ];
        let placements = negotiate(&columns, 12);
        assert_eq!(placements.len(), 2);
        assert!(placements.iter().all(|p| p.end() <= 12));
    }

    #[test]
    fn unbounded_desired_width_is_negotiated_down() {
        let columns = [
            ColumnWidth::fixed(4),
            ColumnWidth::new(4, usize::MAX),
            ColumnWidth::new(2, usize::MAX),
        ];
        // origin 2 + gaps 2 + mins 10 = 14; 26 left, 13 each.
        let placements = negotiate(&columns, 40);
        let widths: Vec<usize> = placements.iter().map(|p| p.width).collect();
        assert_eq!(widths, vec![4, 17, 15]);
        assert_eq!(placements[2].end(), 40);
    }

    #[test]
    fn nothing_fits_in_zero_width() {
        assert!(negotiate(&[ColumnWidth::fixed(1)], 0).is_empty());
    }
}
