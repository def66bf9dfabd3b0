//! Fit Validator: can one cell's content render legibly inside a width × height budget?
//!
//! # Rules
//! - text, kpi, image: always fit (image height is governed by the resolver)
//! - table: at most `max_table_rows` rows, otherwise the data must be aggregated
//! - pie: the padded pie must reach `min_pie_radius_px`
//! - bar: vertical bars need `min_bar_width_px` each; when they do not fit side by side
//!   the chart must reflow into horizontal rows, which in turn need height
//!
//! `splitBlock` is a block-level remedy and never appears here.

use std::collections::BTreeSet;

use crate::layout::model::{BodyType, CellConfiguration, ElementFitValidation, RequiredAction};
use crate::layout::policy::{BarOrientation, LayoutPolicy};

/// Validates one cell against the space it is given. Pure function of its inputs.
pub fn validate(
    cell: &CellConfiguration,
    available_width: f32,
    available_height: f32,
    policy: &LayoutPolicy,
) -> ElementFitValidation {
    match cell.body_type {
        BodyType::Text | BodyType::Kpi | BodyType::Image => ElementFitValidation::fits(),
        BodyType::Table => validate_table(cell.row_count().unwrap_or(0), policy),
        BodyType::Pie => validate_pie(available_width, available_height, policy),
        BodyType::Bar => validate_bar(
            cell.bar_count().unwrap_or(policy.default_bar_count),
            available_width,
            available_height,
            policy,
        ),
    }
}

fn validate_table(rows: u32, policy: &LayoutPolicy) -> ElementFitValidation {
    if rows <= policy.max_table_rows {
        return ElementFitValidation::fits();
    }
    ElementFitValidation {
        fits: false,
        violations: vec![format!(
            "table has {rows} rows; at most {} rows are legible",
            policy.max_table_rows
        )],
        required_actions: BTreeSet::from([RequiredAction::Aggregate]),
        required_height: None,
    }
}

fn validate_pie(width: f32, height: f32, policy: &LayoutPolicy) -> ElementFitValidation {
    let radius = policy.pie_radius(width, height);
    if radius >= policy.min_pie_radius_px {
        return ElementFitValidation::fits();
    }

    let required = policy.pie_min_height();
    let mut violation = format!(
        "pie radius {radius:.1}px is below the legible minimum {:.0}px",
        policy.min_pie_radius_px
    );
    if width < required {
        violation.push_str(&format!(
            " (cell is only {width:.0}px wide; {required:.0}px needed)"
        ));
    }

    ElementFitValidation {
        fits: false,
        violations: vec![violation],
        required_actions: BTreeSet::from([RequiredAction::IncreaseHeight]),
        required_height: Some(required),
    }
}

fn validate_bar(bars: u32, width: f32, height: f32, policy: &LayoutPolicy) -> ElementFitValidation {
    if bars == 0 {
        return ElementFitValidation::fits();
    }

    let required = policy.bar_min_height(bars, width);
    let orientation = policy.bar_orientation(bars, width);
    if orientation == BarOrientation::Vertical && height >= required {
        return ElementFitValidation::fits();
    }

    let mut violations = Vec::new();
    let mut required_actions = BTreeSet::new();
    let mut required_height = None;

    if orientation == BarOrientation::Horizontal {
        violations.push(format!(
            "{bars} bars get {:.1}px each at {width:.0}px width; at least {:.0}px is legible",
            policy.bar_slot_px(bars, width),
            policy.min_bar_width_px
        ));
        required_actions.insert(RequiredAction::Reflow);
    }
    if height < required {
        violations.push(format!(
            "bar chart needs {required:.0}px of height but has {height:.0}px"
        ));
        required_actions.insert(RequiredAction::IncreaseHeight);
        required_height = Some(required);
    }

    ElementFitValidation {
        fits: false,
        violations,
        required_actions,
        required_height,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
