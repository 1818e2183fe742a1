// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grid storage and the iterative row/column allocation.

use kurbo::Size;

use crate::{ComponentId, LayoutError};

/// Passes of the guarantee/offer loop before settling for the current allocation.
const MAX_PASSES: usize = 5;

/// Extra weight given to tracks whose occupants asked for more than they were offered.
const WANTS_MORE_WEIGHT: f64 = 0.1;

/// Rows or columns one table may grow to.
pub(crate) const MAX_TRACKS: usize = 1 << 16;

/// Number of tracks needed to address `index`.
fn tracks_for(index: usize) -> Result<usize, LayoutError> {
    index
        .checked_add(1)
        .filter(|n| *n <= MAX_TRACKS)
        .ok_or(LayoutError::TrackOutOfRange(index))
}

/// How the allocation queries the components in its cells.
pub(crate) trait Cells {
    fn request(&self, id: ComponentId, offered: Size) -> Size;
    fn fixed_width(&self, id: ComponentId) -> bool;
    fn fixed_height(&self, id: ComponentId) -> bool;
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Table {
    rows: Vec<Vec<Option<ComponentId>>>,
    n_cols: usize,
    row_weights: Vec<Option<f64>>,
    col_weights: Vec<Option<f64>>,
    row_minimums: Vec<f64>,
    col_minimums: Vec<f64>,
    pub(crate) row_padding: f64,
    pub(crate) col_padding: f64,
}

/// Result of one allocation.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TableLayout {
    pub(crate) col_widths: Vec<f64>,
    pub(crate) row_heights: Vec<f64>,
    /// Sum of guaranteed widths, padding included.
    pub(crate) guaranteed_width: f64,
    /// Sum of guaranteed heights, padding included.
    pub(crate) guaranteed_height: f64,
    /// The loop stopped on the pass cap while still improving.
    pub(crate) hit_pass_cap: bool,
}

struct Guarantees {
    widths: Vec<f64>,
    heights: Vec<f64>,
    wants_width: Vec<bool>,
    wants_height: Vec<bool>,
}

impl Table {
    pub(crate) fn get(&self, row: usize, col: usize) -> Option<ComponentId> {
        self.rows.get(row)?.get(col).copied().flatten()
    }

    /// Grow the grid so `(n_rows, n_cols)` fits.
    pub(crate) fn pad_to(&mut self, n_rows: usize, n_cols: usize) {
        let n_cols = n_cols.max(self.n_cols);
        if n_rows > self.rows.len() {
            self.rows.resize_with(n_rows, Vec::new);
        }
        for row in &mut self.rows {
            row.resize(n_cols, None);
        }
        self.n_cols = n_cols;
        let n_rows = self.rows.len();
        self.row_weights.resize(n_rows, None);
        self.row_minimums.resize(n_rows, 0.0);
        self.col_weights.resize(n_cols, None);
        self.col_minimums.resize(n_cols, 0.0);
    }

    /// Whether `(row, col)` is addressable.
    pub(crate) fn check_cell(row: usize, col: usize) -> Result<(), LayoutError> {
        tracks_for(row)?;
        tracks_for(col)?;
        Ok(())
    }

    /// Put `id` in an empty cell. Returns `false` if the cell is occupied.
    pub(crate) fn place(
        &mut self,
        id: ComponentId,
        row: usize,
        col: usize,
    ) -> Result<bool, LayoutError> {
        self.pad_to(tracks_for(row)?, tracks_for(col)?);
        let cell = &mut self.rows[row][col];
        if cell.is_some() {
            return Ok(false);
        }
        *cell = Some(id);
        Ok(true)
    }

    /// Empty the cell holding `id`, if any.
    pub(crate) fn take(&mut self, id: ComponentId) -> bool {
        for cell in self.rows.iter_mut().flatten() {
            if *cell == Some(id) {
                *cell = None;
                return true;
            }
        }
        false
    }

    /// Occupants in row-major order.
    pub(crate) fn children(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.rows.iter().flatten().filter_map(|c| *c)
    }

    pub(crate) fn set_row_weight(&mut self, row: usize, weight: f64) -> Result<(), LayoutError> {
        self.pad_to(tracks_for(row)?, 0);
        self.row_weights[row] = Some(weight);
        Ok(())
    }

    pub(crate) fn set_col_weight(&mut self, col: usize, weight: f64) -> Result<(), LayoutError> {
        self.pad_to(0, tracks_for(col)?);
        self.col_weights[col] = Some(weight);
        Ok(())
    }

    pub(crate) fn set_row_minimum(&mut self, row: usize, minimum: f64) -> Result<(), LayoutError> {
        self.pad_to(tracks_for(row)?, 0);
        self.row_minimums[row] = minimum;
        Ok(())
    }

    pub(crate) fn set_col_minimum(&mut self, col: usize, minimum: f64) -> Result<(), LayoutError> {
        self.pad_to(0, tracks_for(col)?);
        self.col_minimums[col] = minimum;
        Ok(())
    }

    fn column(&self, col: usize) -> impl Iterator<Item = Option<ComponentId>> + '_ {
        self.rows.iter().map(move |r| r[col])
    }

    /// Every column holds only fixed-width components or nothing.
    pub(crate) fn fixed_width(&self, cells: &impl Cells) -> bool {
        self.children().all(|c| cells.fixed_width(c))
    }

    /// Every row holds only fixed-height components or nothing.
    pub(crate) fn fixed_height(&self, cells: &impl Cells) -> bool {
        self.children().all(|c| cells.fixed_height(c))
    }

    fn padding_total(padding: f64, n: usize) -> f64 {
        #[allow(clippy::cast_precision_loss, reason = "track counts are tiny")]
        let gaps = n.saturating_sub(1) as f64;
        padding * gaps
    }

    fn row_track_weights(&self, cells: &impl Cells) -> Vec<f64> {
        self.rows
            .iter()
            .zip(&self.row_weights)
            .map(|(row, set)| {
                set.unwrap_or_else(|| {
                    let all_fixed = row.iter().flatten().all(|c| cells.fixed_height(*c));
                    if all_fixed { 0.0 } else { 1.0 }
                })
            })
            .collect()
    }

    fn col_track_weights(&self, cells: &impl Cells) -> Vec<f64> {
        (0..self.n_cols)
            .map(|col| {
                self.col_weights[col].unwrap_or_else(|| {
                    let all_fixed = self.column(col).flatten().all(|c| cells.fixed_width(c));
                    if all_fixed { 0.0 } else { 1.0 }
                })
            })
            .collect()
    }

    fn determine_guarantees(
        &self,
        cells: &impl Cells,
        offered_widths: &[f64],
        offered_heights: &[f64],
        final_offer: bool,
    ) -> Guarantees {
        let mut widths = vec![0.0_f64; self.n_cols];
        let mut heights = vec![0.0_f64; self.rows.len()];
        let mut wants_width = vec![false; self.n_cols];
        let mut wants_height = vec![false; self.rows.len()];
        for (r, row) in self.rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let offer = Size::new(offered_widths[c], offered_heights[r]);
                let request = cell.map_or(Size::ZERO, |id| cells.request(id, offer));
                let (w, h) = if final_offer {
                    (request.width.min(offer.width), request.height.min(offer.height))
                } else {
                    (request.width, request.height)
                };
                widths[c] = widths[c].max(w);
                heights[r] = heights[r].max(h);
                wants_width[c] |= request.width > offer.width;
                wants_height[r] |= request.height > offer.height;
            }
        }
        for (w, min) in widths.iter_mut().zip(&self.col_minimums) {
            *w = w.max(*min);
        }
        for (h, min) in heights.iter_mut().zip(&self.row_minimums) {
            *h = h.max(*min);
        }
        Guarantees {
            widths,
            heights,
            wants_width,
            wants_height,
        }
    }

    /// Split `available` between the rows and columns.
    ///
    /// Tracks start with no guarantee and a share of the space by heuristic weight. Each pass
    /// offers every cell its track's guarantee plus proportional share, raises the guarantees
    /// to what the cells request, and hands the free space to tracks that still want more.
    /// The loop ends when free space stops changing. The last step shares the free space by
    /// the real weights.
    ///
    /// With `final_offer`, requests are clamped to what was offered, so fixed tracks shrink
    /// instead of overflowing.
    pub(crate) fn allocate(
        &self,
        cells: &impl Cells,
        available: Size,
        final_offer: bool,
    ) -> TableLayout {
        let n_rows = self.rows.len();
        let width_after_padding =
            (available.width - Self::padding_total(self.col_padding, self.n_cols)).max(0.0);
        let height_after_padding =
            (available.height - Self::padding_total(self.row_padding, n_rows)).max(0.0);

        let row_weights = self.row_track_weights(cells);
        let col_weights = self.col_track_weights(cells);
        let heuristic = |w: &f64| if *w == 0.0 { 0.5 } else { *w };
        let heuristic_cols: Vec<f64> = col_weights.iter().map(heuristic).collect();
        let heuristic_rows: Vec<f64> = row_weights.iter().map(heuristic).collect();

        let mut col_share = proportional(&heuristic_cols, width_after_padding);
        let mut row_share = proportional(&heuristic_rows, height_after_padding);
        let mut guaranteed_widths = vec![0.0; self.n_cols];
        let mut guaranteed_heights = vec![0.0; n_rows];
        let mut last_free: (Option<f64>, Option<f64>) = (None, None);
        let mut hit_pass_cap = false;

        for pass in 1..=MAX_PASSES {
            let offered_widths = add(&guaranteed_widths, &col_share);
            let offered_heights = add(&guaranteed_heights, &row_share);
            let g = self.determine_guarantees(
                cells,
                &offered_widths,
                &offered_heights,
                final_offer,
            );
            let free_width = width_after_padding - g.widths.iter().sum::<f64>();
            let free_height = height_after_padding - g.heights.iter().sum::<f64>();

            col_share = proportional(&boosted(&col_weights, &g.wants_width), free_width);
            row_share = proportional(&boosted(&row_weights, &g.wants_height), free_height);
            guaranteed_widths = g.widths;
            guaranteed_heights = g.heights;

            let improving_width = free_width > 0.0 && last_free.0 != Some(free_width);
            let improving_height = free_height > 0.0 && last_free.1 != Some(free_height);
            last_free = (Some(free_width), Some(free_height));
            if !(improving_width || improving_height) {
                break;
            }
            if pass == MAX_PASSES {
                hit_pass_cap = true;
            }
        }

        let free_width = width_after_padding - guaranteed_widths.iter().sum::<f64>();
        let free_height = height_after_padding - guaranteed_heights.iter().sum::<f64>();
        let col_widths = add(&guaranteed_widths, &proportional(&col_weights, free_width));
        let row_heights = add(&guaranteed_heights, &proportional(&row_weights, free_height));
        TableLayout {
            col_widths,
            row_heights,
            guaranteed_width: guaranteed_widths.iter().sum::<f64>()
                + Self::padding_total(self.col_padding, self.n_cols),
            guaranteed_height: guaranteed_heights.iter().sum::<f64>()
                + Self::padding_total(self.row_padding, n_rows),
            hit_pass_cap,
        }
    }

    /// Cell origins and sizes for a finished allocation, in row-major order.
    pub(crate) fn cell_frames(
        &self,
        layout: &TableLayout,
    ) -> Vec<(ComponentId, kurbo::Point, Size)> {
        let mut frames = Vec::new();
        let mut y = 0.0;
        for (r, row) in self.rows.iter().enumerate() {
            let mut x = 0.0;
            for (c, cell) in row.iter().enumerate() {
                if let Some(id) = cell {
                    frames.push((
                        *id,
                        kurbo::Point::new(x, y),
                        Size::new(layout.col_widths[c], layout.row_heights[r]),
                    ));
                }
                x += layout.col_widths[c] + self.col_padding;
            }
            y += layout.row_heights[r] + self.row_padding;
        }
        frames
    }
}

fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(a, b)| a + b).collect()
}

fn boosted(weights: &[f64], wants_more: &[bool]) -> Vec<f64> {
    if !wants_more.iter().any(|w| *w) {
        return weights.to_vec();
    }
    weights
        .iter()
        .zip(wants_more)
        .map(|(w, more)| if *more { w + WANTS_MORE_WEIGHT } else { *w })
        .collect()
}

/// Share `free` by weight. Negative free space shares nothing.
fn proportional(weights: &[f64], free: f64) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total == 0.0 {
        return vec![0.0; weights.len()];
    }
    let free = free.max(0.0);
    weights.iter().map(|w| free * w / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashMap;

    /// A cell that wants a fixed amount along each axis.
    #[derive(Clone, Copy)]
    struct Fake {
        request: Size,
        fixed: (bool, bool),
    }

    #[derive(Default)]
    struct FakeCells(HashMap<ComponentId, Fake>);

    impl FakeCells {
        fn add(&mut self, id: u64, w: f64, h: f64, fixed_w: bool, fixed_h: bool) -> ComponentId {
            let id = ComponentId(id);
            self.0.insert(
                id,
                Fake {
                    request: Size::new(w, h),
                    fixed: (fixed_w, fixed_h),
                },
            );
            id
        }
    }

    impl Cells for FakeCells {
        fn request(&self, id: ComponentId, _offered: Size) -> Size {
            self.0[&id].request
        }
        fn fixed_width(&self, id: ComponentId) -> bool {
            self.0[&id].fixed.0
        }
        fn fixed_height(&self, id: ComponentId) -> bool {
            self.0[&id].fixed.1
        }
    }

    fn approx_eq(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(a, b)| (a - b).abs() < 1e-9)
    }

    fn axes_and_plot() -> (Table, FakeCells) {
        let mut cells = FakeCells::default();
        let y_axis = cells.add(1, 40.0, 0.0, true, false);
        let plot = cells.add(2, 0.0, 0.0, false, false);
        let x_axis = cells.add(3, 0.0, 30.0, false, true);
        let mut table = Table::default();
        assert!(table.place(y_axis, 0, 0).unwrap());
        assert!(table.place(plot, 0, 1).unwrap());
        assert!(table.place(x_axis, 1, 1).unwrap());
        (table, cells)
    }

    #[test]
    fn fixed_axes_take_their_request_and_plot_takes_the_rest() {
        let (table, cells) = axes_and_plot();
        let layout = table.allocate(&cells, Size::new(480.0, 320.0), false);
        assert!(approx_eq(&layout.col_widths, &[40.0, 440.0]), "{layout:?}");
        assert!(approx_eq(&layout.row_heights, &[290.0, 30.0]), "{layout:?}");
        assert!(!layout.hit_pass_cap);
    }

    #[test]
    fn allocation_is_idempotent() {
        let (table, cells) = axes_and_plot();
        let a = table.allocate(&cells, Size::new(480.0, 320.0), false);
        let b = table.allocate(&cells, Size::new(480.0, 320.0), false);
        assert_eq!(a, b);
    }

    #[test]
    fn rows_get_at_least_their_minimum() {
        let mut cells = FakeCells::default();
        let mut table = Table::default();
        for r in 0..3 {
            let id = cells.add(r, 0.0, 0.0, false, false);
            table.place(id, usize::try_from(r).unwrap(), 0).unwrap();
        }
        table.set_row_minimum(0, 100.0).unwrap();
        table.set_row_minimum(2, 50.0).unwrap();
        let layout = table.allocate(&cells, Size::new(10.0, 300.0), false);
        assert!(approx_eq(&layout.row_heights, &[150.0, 50.0, 100.0]), "{layout:?}");
        assert!(layout.row_heights[0] >= 100.0 && layout.row_heights[2] >= 50.0);
    }

    #[test]
    fn explicit_weights_share_free_space() {
        let mut cells = FakeCells::default();
        let a = cells.add(1, 0.0, 0.0, false, false);
        let b = cells.add(2, 0.0, 0.0, false, false);
        let mut table = Table::default();
        table.place(a, 0, 0).unwrap();
        table.place(b, 0, 1).unwrap();
        table.set_col_weight(1, 3.0).unwrap();
        let layout = table.allocate(&cells, Size::new(400.0, 100.0), false);
        assert!(approx_eq(&layout.col_widths, &[100.0, 300.0]));
    }

    #[test]
    fn explicit_zero_weight_is_honoured() {
        let mut cells = FakeCells::default();
        let a = cells.add(1, 20.0, 0.0, false, false);
        let b = cells.add(2, 0.0, 0.0, false, false);
        let mut table = Table::default();
        table.place(a, 0, 0).unwrap();
        table.place(b, 0, 1).unwrap();
        table.set_col_weight(0, 0.0).unwrap();
        let layout = table.allocate(&cells, Size::new(200.0, 100.0), false);
        assert!(approx_eq(&layout.col_widths, &[20.0, 180.0]));
    }

    #[test]
    fn padding_sits_between_tracks() {
        let mut cells = FakeCells::default();
        let a = cells.add(1, 0.0, 0.0, false, false);
        let b = cells.add(2, 0.0, 0.0, false, false);
        let mut table = Table::default();
        table.place(a, 0, 0).unwrap();
        table.place(b, 0, 1).unwrap();
        table.col_padding = 20.0;
        let layout = table.allocate(&cells, Size::new(220.0, 50.0), false);
        assert!(approx_eq(&layout.col_widths, &[100.0, 100.0]));
        assert_eq!(layout.guaranteed_width, 20.0);
        let frames = table.cell_frames(&layout);
        assert_eq!(frames[1].1, kurbo::Point::new(120.0, 0.0));
    }

    #[test]
    fn final_offer_clamps_over_constrained_tracks() {
        let mut cells = FakeCells::default();
        let a = cells.add(1, 300.0, 0.0, true, false);
        let b = cells.add(2, 300.0, 0.0, true, false);
        let mut table = Table::default();
        table.place(a, 0, 0).unwrap();
        table.place(b, 0, 1).unwrap();
        let available = Size::new(400.0, 100.0);
        let first = table.allocate(&cells, available, false);
        assert!(first.guaranteed_width > available.width);
        let last = table.allocate(&cells, available, true);
        assert!(last.col_widths.iter().all(|w| *w <= 300.0 && *w >= 0.0));
        assert!(last.col_widths.iter().sum::<f64>() <= 600.0);
    }

    #[test]
    fn fixedness_is_the_conjunction_of_occupants() {
        let (table, cells) = axes_and_plot();
        assert!(!table.fixed_width(&cells));
        let mut only_axes = Table::default();
        only_axes.place(ComponentId(1), 0, 0).unwrap();
        assert!(only_axes.fixed_width(&cells));
        assert!(!only_axes.fixed_height(&cells));
        assert!(Table::default().fixed_width(&cells));
    }

    #[test]
    fn occupied_cells_are_refused_and_take_frees_them() {
        let mut table = Table::default();
        assert!(table.place(ComponentId(1), 1, 2).unwrap());
        assert_eq!((table.rows.len(), table.n_cols), (2, 3));
        assert!(!table.place(ComponentId(2), 1, 2).unwrap());
        assert!(table.take(ComponentId(1)));
        assert_eq!(table.get(1, 2), None);
        assert!(table.place(ComponentId(2), 1, 2).unwrap());
    }

    #[test]
    fn out_of_range_tracks_are_refused() {
        let mut table = Table::default();
        assert_eq!(
            table.place(ComponentId(1), usize::MAX, 0),
            Err(LayoutError::TrackOutOfRange(usize::MAX))
        );
        assert_eq!(
            table.set_col_weight(MAX_TRACKS, 1.0),
            Err(LayoutError::TrackOutOfRange(MAX_TRACKS))
        );
        assert_eq!((table.rows.len(), table.n_cols), (0, 0));
        assert!(table.set_row_minimum(MAX_TRACKS - 1, 0.0).is_ok());
    }
}
