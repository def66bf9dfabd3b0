//! Height Resolver: picks the single authoritative height for a block.
//!
//! # Tiers (first applicable wins)
//! 1. Intrinsic media: an image cell with `setIntrinsic` sizing. The tallest natural
//!    image height wins. Soft block ratios are ignored.
//! 2. Block aspect ratio: a hard block ratio, `blockWidth ÷ ratio`.
//! 3. Readability enforcement: the baseline height, raised by whatever the cells need.
//! 4. Structural failure: conflicting hard constraints, or an overflow the fit validator
//!    proved cannot be fixed (see `escalate_to_structural_failure`).
//!
//! Every computed need is clamped into the policy bounds. Hitting the upper bound
//! means the block cannot grow any further and must be split.

use tracing::debug;

use crate::layout::model::{
    BlockAspectRatioConstraint, BlockHeightResolution, BodyType, CellConfiguration,
    HeightResolutionInput, HeightResolutionPriority,
};
use crate::layout::policy::{HeightBounds, LayoutPolicy};

/// Resolves the height for one block. Never fails for well-typed input.
pub fn resolve(input: &HeightResolutionInput, policy: &LayoutPolicy) -> BlockHeightResolution {
    let bounds = policy.height_bounds(input.max_allowed_height);
    let hard_ratio = input.aspect_constraint.filter(|c| !c.is_soft_constraint);

    let resolution = match intrinsic_media_need(input, policy) {
        Some((need, count)) => match hard_ratio {
            Some(constraint) if conflicts(need, &constraint, input, policy) => {
                let ratio_need = aspect_need(input.block_width, &constraint, policy);
                structural(
                    need,
                    &bounds,
                    format!(
                        "conflicting hard constraints: intrinsic media needs {need:.1}px \
                         but hard block aspect ratio {} needs {ratio_need:.1}px",
                        constraint.ratio
                    ),
                )
            }
            _ => clamp_to_bounds(
                HeightResolutionPriority::IntrinsicMedia,
                need,
                &bounds,
                format!("intrinsic media: tallest of {count} intrinsic image cell(s) is {need:.1}px"),
            ),
        },
        None => match hard_ratio {
            Some(constraint) => {
                let need = aspect_need(input.block_width, &constraint, policy);
                clamp_to_bounds(
                    HeightResolutionPriority::BlockAspectRatio,
                    need,
                    &bounds,
                    format!(
                        "hard block aspect ratio {} on {:.0}px width gives {need:.1}px",
                        constraint.ratio,
                        policy.compute_width(input.block_width)
                    ),
                )
            }
            None => {
                let need = readability_need(input, policy);
                clamp_to_bounds(
                    HeightResolutionPriority::ReadabilityEnforcement,
                    need,
                    &bounds,
                    format!(
                        "readability enforcement: baseline {:.0}px, content needs {need:.1}px",
                        policy.baseline_height_px
                    ),
                )
            }
        },
    };

    debug!(
        block_id = %input.block_id,
        priority = ?resolution.priority,
        height_px = resolution.height_px,
        requires_split = resolution.requires_split,
        "resolved block height"
    );
    resolution
}

/// Re-labels a resolution as a structural failure, keeping its height.
///
/// Used when fit validation proves an overflow that no height inside the bounds can fix.
pub fn escalate_to_structural_failure(
    resolution: BlockHeightResolution,
    reason: impl Into<String>,
) -> BlockHeightResolution {
    BlockHeightResolution {
        priority: HeightResolutionPriority::StructuralFailure,
        reason: reason.into(),
        can_increase: false,
        requires_split: true,
        ..resolution
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tier helpers
// ────────────────────────────────────────────────────────────────────────────

/// Tallest natural height across intrinsic image cells, with the number of such cells.
fn intrinsic_media_need(input: &HeightResolutionInput, policy: &LayoutPolicy) -> Option<(f32, usize)> {
    input
        .cells
        .iter()
        .filter(|cell| cell.is_intrinsic_media())
        .map(|cell| intrinsic_height(cell, input.block_width, policy))
        .fold(None, |acc, height| match acc {
            None => Some((height, 1)),
            Some((tallest, count)) => Some((tallest.max(height), count + 1)),
        })
}

fn intrinsic_height(cell: &CellConfiguration, block_width: f32, policy: &LayoutPolicy) -> f32 {
    let ratio = cell.aspect_ratio.unwrap_or_default();
    policy.cell_width_px(block_width, cell.cell_width) / ratio.value()
}

fn aspect_need(
    block_width: f32,
    constraint: &BlockAspectRatioConstraint,
    policy: &LayoutPolicy,
) -> f32 {
    policy.compute_width(block_width) / constraint.ratio.value()
}

fn conflicts(
    intrinsic_need: f32,
    constraint: &BlockAspectRatioConstraint,
    input: &HeightResolutionInput,
    policy: &LayoutPolicy,
) -> bool {
    let ratio_need = aspect_need(input.block_width, constraint, policy);
    (intrinsic_need - ratio_need).abs() > policy.aspect_conflict_tolerance_px
}

/// Baseline height raised to the tallest per-cell readable height.
fn readability_need(input: &HeightResolutionInput, policy: &LayoutPolicy) -> f32 {
    input
        .cells
        .iter()
        .map(|cell| {
            let width = policy.cell_width_px(input.block_width, cell.cell_width);
            match cell.body_type {
                BodyType::Table => policy.table_height(cell.row_count().unwrap_or(0)),
                BodyType::Pie => policy.pie_min_height(),
                BodyType::Bar => policy.bar_min_height(
                    cell.bar_count().unwrap_or(policy.default_bar_count),
                    width,
                ),
                BodyType::Kpi | BodyType::Text | BodyType::Image => 0.0,
            }
        })
        .fold(policy.baseline_height_px, f32::max)
}

fn clamp_to_bounds(
    priority: HeightResolutionPriority,
    need: f32,
    bounds: &HeightBounds,
    reason: String,
) -> BlockHeightResolution {
    let height_px = need.clamp(bounds.lower, bounds.upper);
    let requires_split = height_px >= bounds.upper;
    let reason = if requires_split {
        format!("{reason}; capped at {:.0}px, split required", bounds.upper)
    } else {
        reason
    };
    BlockHeightResolution {
        height_px,
        priority,
        reason,
        can_increase: !requires_split,
        requires_split,
    }
}

fn structural(need: f32, bounds: &HeightBounds, reason: String) -> BlockHeightResolution {
    BlockHeightResolution {
        height_px: need.clamp(bounds.lower, bounds.upper),
        priority: HeightResolutionPriority::StructuralFailure,
        reason,
        can_increase: false,
        requires_split: true,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::model::{AspectRatio, CellWidth, ContentMetadata, ImageMode};
    use crate::layout::policy::DEFAULT_POLICY;

    fn make_input(block_width: f32, cells: Vec<CellConfiguration>) -> HeightResolutionInput {
        HeightResolutionInput {
            block_id: "block-1".to_string(),
            block_width,
            cells,
            aspect_constraint: None,
            max_allowed_height: None,
        }
    }

    fn intrinsic_image(width: CellWidth, ratio: AspectRatio) -> CellConfiguration {
        CellConfiguration {
            cell_width: width,
            aspect_ratio: Some(ratio),
            image_mode: Some(ImageMode::SetIntrinsic),
            ..CellConfiguration::new("img", BodyType::Image)
        }
    }

    fn table(rows: u32) -> CellConfiguration {
        CellConfiguration {
            content_metadata: Some(ContentMetadata {
                row_count: Some(rows),
                bar_count: None,
            }),
            ..CellConfiguration::new("tbl", BodyType::Table)
        }
    }

    fn hard(ratio: AspectRatio) -> Option<BlockAspectRatioConstraint> {
        Some(BlockAspectRatioConstraint {
            ratio,
            is_soft_constraint: false,
        })
    }

    fn soft(ratio: AspectRatio) -> Option<BlockAspectRatioConstraint> {
        Some(BlockAspectRatioConstraint {
            ratio,
            is_soft_constraint: true,
        })
    }

    // ── readability enforcement ─────────────────────────────────────────────

    #[test]
    fn test_single_kpi_resolves_to_baseline() {
        let input = make_input(1200.0, vec![CellConfiguration::new("k", BodyType::Kpi)]);
        let r = resolve(&input, &DEFAULT_POLICY);
        assert_eq!(r.priority, HeightResolutionPriority::ReadabilityEnforcement);
        assert_eq!(r.height_px, 300.0);
        assert!(r.can_increase);
        assert!(!r.requires_split);
    }

    #[test]
    fn test_empty_block_resolves_to_baseline() {
        let r = resolve(&make_input(800.0, vec![]), &DEFAULT_POLICY);
        assert_eq!(r.priority, HeightResolutionPriority::ReadabilityEnforcement);
        assert_eq!(r.height_px, DEFAULT_POLICY.baseline_height_px);
    }

    #[test]
    fn test_max_allowed_height_caps_and_forces_split() {
        let mut input = make_input(1200.0, vec![CellConfiguration::new("k", BodyType::Kpi)]);
        input.max_allowed_height = Some(200.0);
        let r = resolve(&input, &DEFAULT_POLICY);
        assert_eq!(r.height_px, 200.0);
        assert!(r.requires_split);
        assert!(!r.can_increase);
    }

    #[test]
    fn test_max_allowed_height_below_min_is_honored() {
        let mut input = make_input(1200.0, vec![]);
        input.max_allowed_height = Some(90.0);
        let r = resolve(&input, &DEFAULT_POLICY);
        assert_eq!(r.height_px, 90.0);
        assert!(r.requires_split);
    }

    #[test]
    fn test_tall_table_raises_height() {
        // 40 + 15 × 24 = 400px
        let r = resolve(&make_input(1200.0, vec![table(15)]), &DEFAULT_POLICY);
        assert_eq!(r.height_px, 400.0);
        assert!(r.can_increase);
    }

    #[test]
    fn test_huge_table_hits_cap_and_requires_split() {
        let r = resolve(&make_input(1200.0, vec![table(60)]), &DEFAULT_POLICY);
        assert_eq!(r.height_px, 800.0);
        assert!(r.requires_split);
        assert!(!r.can_increase);
        assert!(r.reason.contains("split"));
    }

    #[test]
    fn test_zero_width_block_still_positive() {
        let cells = vec![
            CellConfiguration::new("b", BodyType::Bar),
            CellConfiguration::new("p", BodyType::Pie),
        ];
        let r = resolve(&make_input(0.0, cells), &DEFAULT_POLICY);
        assert!(r.height_px > 0.0);
        assert!(r.height_px >= 150.0 && r.height_px <= 800.0);
    }

    #[test]
    fn test_soft_constraint_alone_does_not_drive_height() {
        let mut input = make_input(1200.0, vec![CellConfiguration::new("t", BodyType::Text)]);
        input.aspect_constraint = soft(AspectRatio::Square);
        let r = resolve(&input, &DEFAULT_POLICY);
        assert_eq!(r.priority, HeightResolutionPriority::ReadabilityEnforcement);
    }

    // ── block aspect ratio ──────────────────────────────────────────────────

    #[test]
    fn test_hard_constraint_uses_block_ratio() {
        let mut input = make_input(960.0, vec![CellConfiguration::new("k", BodyType::Kpi)]);
        input.aspect_constraint = hard(AspectRatio::Landscape);
        let r = resolve(&input, &DEFAULT_POLICY);
        assert_eq!(r.priority, HeightResolutionPriority::BlockAspectRatio);
        assert!((r.height_px - 540.0).abs() < 1e-3);
        assert!(r.reason.contains("aspect ratio"));
    }

    #[test]
    fn test_hard_constraint_respects_upper_clamp_on_huge_width() {
        let mut input = make_input(1_000_000.0, vec![]);
        input.aspect_constraint = hard(AspectRatio::Square);
        let r = resolve(&input, &DEFAULT_POLICY);
        assert_eq!(r.height_px, 800.0);
        assert!(r.requires_split);
    }

    #[test]
    fn test_hard_constraint_raised_to_lower_clamp() {
        let mut input = make_input(100.0, vec![]);
        input.aspect_constraint = hard(AspectRatio::Landscape);
        let r = resolve(&input, &DEFAULT_POLICY);
        assert_eq!(r.height_px, 150.0);
        assert!(r.can_increase);
    }

    // ── intrinsic media ─────────────────────────────────────────────────────

    #[test]
    fn test_half_width_intrinsic_image() {
        let input = make_input(
            1200.0,
            vec![intrinsic_image(CellWidth::Half, AspectRatio::Landscape)],
        );
        let r = resolve(&input, &DEFAULT_POLICY);
        assert_eq!(r.priority, HeightResolutionPriority::IntrinsicMedia);
        assert!((r.height_px - 600.0 / (16.0 / 9.0)).abs() < 1e-3);
        assert!(r.reason.contains("intrinsic"));
    }

    #[test]
    fn test_tallest_intrinsic_image_wins() {
        let input = make_input(
            600.0,
            vec![
                intrinsic_image(CellWidth::Half, AspectRatio::Landscape),
                intrinsic_image(CellWidth::Half, AspectRatio::Square),
            ],
        );
        let r = resolve(&input, &DEFAULT_POLICY);
        // 300 / 1.0 beats 300 / 1.778
        assert!((r.height_px - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_intrinsic_ignores_soft_constraint() {
        let mut input = make_input(
            1200.0,
            vec![intrinsic_image(CellWidth::Half, AspectRatio::Square)],
        );
        input.aspect_constraint = soft(AspectRatio::Landscape);
        let r = resolve(&input, &DEFAULT_POLICY);
        assert_eq!(r.priority, HeightResolutionPriority::IntrinsicMedia);
        assert!((r.height_px - 600.0).abs() < 1e-3);
    }

    #[test]
    fn test_non_intrinsic_image_does_not_trigger_tier() {
        let cell = CellConfiguration {
            image_mode: Some(ImageMode::Fill),
            ..CellConfiguration::new("img", BodyType::Image)
        };
        let r = resolve(&make_input(1200.0, vec![cell]), &DEFAULT_POLICY);
        assert_eq!(r.priority, HeightResolutionPriority::ReadabilityEnforcement);
    }

    #[test]
    fn test_intrinsic_without_ratio_defaults_to_landscape() {
        let cell = CellConfiguration {
            cell_width: CellWidth::Full,
            image_mode: Some(ImageMode::SetIntrinsic),
            ..CellConfiguration::new("img", BodyType::Image)
        };
        let r = resolve(&make_input(960.0, vec![cell]), &DEFAULT_POLICY);
        assert!((r.height_px - 540.0).abs() < 1e-3);
    }

    #[test]
    fn test_tall_portrait_image_clamped_to_max() {
        let input = make_input(
            1200.0,
            vec![intrinsic_image(CellWidth::Full, AspectRatio::Portrait)],
        );
        let r = resolve(&input, &DEFAULT_POLICY);
        assert_eq!(r.priority, HeightResolutionPriority::IntrinsicMedia);
        assert_eq!(r.height_px, 800.0);
        assert!(r.requires_split);
    }

    // ── structural failure ──────────────────────────────────────────────────

    #[test]
    fn test_intrinsic_conflicting_with_hard_ratio_is_structural() {
        let mut input = make_input(
            1200.0,
            vec![intrinsic_image(CellWidth::Half, AspectRatio::Square)],
        );
        input.aspect_constraint = hard(AspectRatio::Landscape);
        let r = resolve(&input, &DEFAULT_POLICY);
        assert_eq!(r.priority, HeightResolutionPriority::StructuralFailure);
        assert!(!r.can_increase);
        assert!(r.requires_split);
    }

    #[test]
    fn test_intrinsic_agreeing_with_hard_ratio_is_intrinsic() {
        // full-width 16:9 image inside a hard 16:9 block: both need 675px
        let mut input = make_input(
            1200.0,
            vec![intrinsic_image(CellWidth::Full, AspectRatio::Landscape)],
        );
        input.aspect_constraint = hard(AspectRatio::Landscape);
        let r = resolve(&input, &DEFAULT_POLICY);
        assert_eq!(r.priority, HeightResolutionPriority::IntrinsicMedia);
    }

    #[test]
    fn test_escalation_keeps_height() {
        let r = resolve(&make_input(1200.0, vec![]), &DEFAULT_POLICY);
        let escalated = escalate_to_structural_failure(r.clone(), "pie cannot fit");
        assert_eq!(escalated.height_px, r.height_px);
        assert_eq!(escalated.priority, HeightResolutionPriority::StructuralFailure);
        assert!(escalated.requires_split);
        assert!(!escalated.can_increase);
        assert_eq!(escalated.reason, "pie cannot fit");
    }
}
