//! Layout policy: the named legibility thresholds shared by the resolver and the fit validator.
//!
//! Every threshold is a `pub const` so the defaults are readable in one place, and
//! `DEFAULT_POLICY` bundles them into a compile-time value. Nothing here allocates; the
//! editor preview calls into this on every keystroke.
//!
//! # Width share
//! A cell with `cellWidth = 1` occupies exactly half of the block width, `cellWidth = 2`
//! the whole width. No gutters are subtracted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::model::CellWidth;

// ────────────────────────────────────────────────────────────────────────────
// Default thresholds
// ────────────────────────────────────────────────────────────────────────────

/// Lower clamp for any resolved height.
pub const MIN_HEIGHT_PX: f32 = 150.0;
/// Upper clamp for any resolved height.
pub const MAX_HEIGHT_PX: f32 = 800.0;
/// Height every block needs for its content to be comfortably readable.
pub const BASELINE_HEIGHT_PX: f32 = 300.0;
/// Width substituted for a zero (or otherwise unusable) block width.
pub const MIN_COMPUTE_WIDTH_PX: f32 = 1.0;

pub const MAX_TABLE_ROWS: u32 = 17;
pub const TABLE_HEADER_PX: f32 = 40.0;
pub const TABLE_ROW_PX: f32 = 24.0;

pub const MIN_PIE_RADIUS_PX: f32 = 60.0;
/// Label/legend padding around the pie on each side.
pub const PIE_PADDING_PX: f32 = 12.0;

/// Bar count assumed when the cell carries no `barCount`.
pub const DEFAULT_BAR_COUNT: u32 = 5;
/// Minimum bar thickness: slot width for vertical bars, row height for horizontal bars.
pub const MIN_BAR_WIDTH_PX: f32 = 12.0;
/// Axis and label gutter, applied once on each axis.
pub const BAR_AXIS_GUTTER_PX: f32 = 32.0;
pub const MIN_BAR_PLOT_HEIGHT_PX: f32 = 100.0;

/// Slack before an intrinsic height and a hard block ratio count as conflicting.
pub const ASPECT_CONFLICT_TOLERANCE_PX: f32 = 1.0;

pub const DEFAULT_POLICY: LayoutPolicy = LayoutPolicy {
    min_height_px: MIN_HEIGHT_PX,
    max_height_px: MAX_HEIGHT_PX,
    baseline_height_px: BASELINE_HEIGHT_PX,
    min_compute_width_px: MIN_COMPUTE_WIDTH_PX,
    max_table_rows: MAX_TABLE_ROWS,
    table_header_px: TABLE_HEADER_PX,
    table_row_px: TABLE_ROW_PX,
    min_pie_radius_px: MIN_PIE_RADIUS_PX,
    pie_padding_px: PIE_PADDING_PX,
    default_bar_count: DEFAULT_BAR_COUNT,
    min_bar_width_px: MIN_BAR_WIDTH_PX,
    bar_axis_gutter_px: BAR_AXIS_GUTTER_PX,
    min_bar_plot_height_px: MIN_BAR_PLOT_HEIGHT_PX,
    aspect_conflict_tolerance_px: ASPECT_CONFLICT_TOLERANCE_PX,
};

// ────────────────────────────────────────────────────────────────────────────
// Policy
// ────────────────────────────────────────────────────────────────────────────

/// Process-wide legibility policy. Loaded once at startup and passed by reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPolicy {
    pub min_height_px: f32,
    pub max_height_px: f32,
    pub baseline_height_px: f32,
    pub min_compute_width_px: f32,
    pub max_table_rows: u32,
    pub table_header_px: f32,
    pub table_row_px: f32,
    pub min_pie_radius_px: f32,
    pub pie_padding_px: f32,
    pub default_bar_count: u32,
    pub min_bar_width_px: f32,
    pub bar_axis_gutter_px: f32,
    pub min_bar_plot_height_px: f32,
    pub aspect_conflict_tolerance_px: f32,
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        DEFAULT_POLICY
    }
}

/// Rejected policy override. Only raised at configuration time, never during resolution.
#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("{name} must be a positive, finite number (got {value})")]
    NotPositive { name: &'static str, value: f32 },

    #[error("{name} must be at least 1")]
    ZeroCount { name: &'static str },

    #[error("min height {min}px exceeds {name} {value}px")]
    InvertedBounds {
        name: &'static str,
        min: f32,
        value: f32,
    },

    #[error("baseline height {baseline}px exceeds max height {max}px")]
    BaselineAboveMax { baseline: f32, max: f32 },
}

/// Effective clamp range for one block after applying a caller-supplied cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightBounds {
    pub lower: f32,
    pub upper: f32,
}

/// Bar chart orientation chosen by the geometry helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarOrientation {
    Vertical,
    /// Bars do not fit side by side and must be stacked as rows.
    Horizontal,
}

impl LayoutPolicy {
    /// Checks that every threshold is usable. The resolver assumes a validated policy.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let lengths = [
            ("min_height_px", self.min_height_px),
            ("max_height_px", self.max_height_px),
            ("baseline_height_px", self.baseline_height_px),
            ("min_compute_width_px", self.min_compute_width_px),
            ("table_header_px", self.table_header_px),
            ("table_row_px", self.table_row_px),
            ("min_pie_radius_px", self.min_pie_radius_px),
            ("pie_padding_px", self.pie_padding_px),
            ("min_bar_width_px", self.min_bar_width_px),
            ("bar_axis_gutter_px", self.bar_axis_gutter_px),
            ("min_bar_plot_height_px", self.min_bar_plot_height_px),
            ("aspect_conflict_tolerance_px", self.aspect_conflict_tolerance_px),
        ];
        for (name, value) in lengths {
            if !value.is_finite() || value <= 0.0 {
                return Err(PolicyError::NotPositive { name, value });
            }
        }
        if self.max_table_rows == 0 {
            return Err(PolicyError::ZeroCount {
                name: "max_table_rows",
            });
        }
        if self.default_bar_count == 0 {
            return Err(PolicyError::ZeroCount {
                name: "default_bar_count",
            });
        }
        for (name, value) in [
            ("max height", self.max_height_px),
            ("baseline height", self.baseline_height_px),
        ] {
            if self.min_height_px > value {
                return Err(PolicyError::InvertedBounds {
                    name,
                    min: self.min_height_px,
                    value,
                });
            }
        }
        if self.baseline_height_px > self.max_height_px {
            return Err(PolicyError::BaselineAboveMax {
                baseline: self.baseline_height_px,
                max: self.max_height_px,
            });
        }
        Ok(())
    }

    /// Clamp range for a block. A cap that is not finite and positive is ignored.
    ///
    /// A cap below `min_height_px` collapses both bounds onto the cap: the block is
    /// rendered at the cap and can only be fixed by splitting.
    pub fn height_bounds(&self, max_allowed_height: Option<f32>) -> HeightBounds {
        let upper = match max_allowed_height {
            Some(cap) if cap.is_finite() && cap > 0.0 => cap.min(self.max_height_px),
            _ => self.max_height_px,
        };
        HeightBounds {
            lower: self.min_height_px.min(upper),
            upper,
        }
    }

    /// Block width used for computation: zero, negative and NaN widths become the minimum.
    pub fn compute_width(&self, block_width: f32) -> f32 {
        block_width.max(self.min_compute_width_px)
    }

    /// Pixel width of one cell's share of the block row.
    pub fn cell_width_px(&self, block_width: f32, cell_width: CellWidth) -> f32 {
        self.compute_width(block_width) * (f32::from(cell_width.span()) / 2.0)
    }

    pub fn table_height(&self, rows: u32) -> f32 {
        self.table_header_px + rows as f32 * self.table_row_px
    }

    /// Largest pie radius that fits inside `width × height` after padding.
    pub fn pie_radius(&self, width: f32, height: f32) -> f32 {
        ((width.min(height) - 2.0 * self.pie_padding_px) / 2.0).max(0.0)
    }

    /// Smallest square side that holds a pie at the minimum legible radius.
    pub fn pie_min_height(&self) -> f32 {
        2.0 * (self.min_pie_radius_px + self.pie_padding_px)
    }

    /// Horizontal space each vertical bar gets at this width.
    pub fn bar_slot_px(&self, bars: u32, width: f32) -> f32 {
        (width - self.bar_axis_gutter_px).max(0.0) / bars.max(1) as f32
    }

    pub fn bar_orientation(&self, bars: u32, width: f32) -> BarOrientation {
        if self.bar_slot_px(bars, width) >= self.min_bar_width_px {
            BarOrientation::Vertical
        } else {
            BarOrientation::Horizontal
        }
    }

    /// Minimum cell height for `bars` bars at `width`, in whichever orientation fits.
    pub fn bar_min_height(&self, bars: u32, width: f32) -> f32 {
        let plot = match self.bar_orientation(bars, width) {
            BarOrientation::Vertical => self.min_bar_plot_height_px,
            BarOrientation::Horizontal => {
                (bars as f32 * self.min_bar_width_px).max(self.min_bar_plot_height_px)
            }
        };
        plot + self.bar_axis_gutter_px
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
