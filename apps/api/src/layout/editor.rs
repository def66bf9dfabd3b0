//! Editor Validation API: the boundary between untrusted block definitions and the
//! strict layout domain.
//!
//! Editor input and persisted template records arrive as loosely-typed JSON. Every leaf
//! field is kept as a `serde_json::Value` so a wrong type never fails deserialization,
//! and each field has exactly one normalization function that maps it into the closed
//! domain. Nothing in this module returns an error: invalid values are replaced with a
//! safe default and the replacement is logged at `debug`.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::layout::fit;
use crate::layout::model::{
    AspectRatio, BlockAspectRatioConstraint, BlockHeightResolution, BlockValidationResult,
    BlockedBlock, BodyType, CellConfiguration, CellWidth, ContentMetadata,
    ElementFitValidation, HeightResolutionInput, HeightResolutionPriority, ImageMode,
    PublishValidityResult, RequiredAction,
};
use crate::layout::policy::LayoutPolicy;
use crate::layout::resolver::{escalate_to_structural_failure, resolve};

// ────────────────────────────────────────────────────────────────────────────
// Untrusted input shapes
// ────────────────────────────────────────────────────────────────────────────

/// A cell exactly as the editor (or a stored template) sent it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorCell {
    pub chart_id: Value,
    pub cell_width: Value,
    pub body_type: Value,
    pub aspect_ratio: Value,
    pub image_mode: Value,
    pub content_metadata: Value,
}

/// A block exactly as the editor (or a stored template) sent it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorBlock {
    pub block_id: Value,
    #[serde(deserialize_with = "lenient_seq")]
    pub cells: Vec<EditorCell>,
    pub aspect_constraint: Value,
    pub max_allowed_height: Value,
}

/// Accepts any JSON for a list field: non-arrays become empty, malformed items default.
///
/// Item count and order are preserved so every submitted cell gets a validation.
pub fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Field normalization
// ────────────────────────────────────────────────────────────────────────────

/// `< 2` is a half-width cell, `>= 2` a full-width one. NaN counts as half.
pub fn normalize_cell_width(raw: f64) -> CellWidth {
    if raw >= 2.0 {
        CellWidth::Full
    } else {
        CellWidth::Half
    }
}

/// Unknown body types become `kpi`, which fits at any size.
pub fn normalize_body_type(raw: &str) -> BodyType {
    let trimmed = raw.trim();
    BodyType::ALL
        .into_iter()
        .find(|body_type| body_type.as_str().eq_ignore_ascii_case(trimmed))
        .unwrap_or_default()
}

/// Unknown ratios become 16:9.
pub fn normalize_aspect_ratio(raw: &str) -> AspectRatio {
    let trimmed = raw.trim();
    AspectRatio::ALL
        .into_iter()
        .find(|ratio| ratio.as_str() == trimmed)
        .unwrap_or_default()
}

/// Widths that are negative, NaN or not numbers become 0. Widths beyond the `f32`
/// range saturate at `f32::MAX`.
pub fn normalize_block_width(raw: &Value) -> f32 {
    match as_number(raw) {
        Some(width) if width >= 0.0 => width.min(f64::from(f32::MAX)) as f32,
        _ => {
            debug!(raw = %raw, "block width out of domain, using 0");
            0.0
        }
    }
}

fn normalize_cell_width_value(raw: &Value) -> CellWidth {
    match as_number(raw) {
        Some(number) => normalize_cell_width(number),
        None => {
            if !raw.is_null() {
                debug!(raw = %raw, "cellWidth is not numeric, using 1");
            }
            CellWidth::Half
        }
    }
}

fn normalize_body_type_value(raw: &Value) -> BodyType {
    let normalized = raw.as_str().map(normalize_body_type).unwrap_or_default();
    if body_type_coerced(raw, normalized) {
        debug!(raw = %raw, normalized = %normalized, "bodyType normalized");
    }
    normalized
}

/// An absent body type is the default, not a coercion.
fn body_type_coerced(raw: &Value, normalized: BodyType) -> bool {
    !raw.is_null() && raw.as_str() != Some(normalized.as_str())
}

/// Absent stays absent; anything present but invalid becomes 16:9.
fn normalize_aspect_ratio_value(raw: &Value) -> Option<AspectRatio> {
    match raw {
        Value::Null => None,
        Value::String(s) => Some(normalize_aspect_ratio(s)),
        other => {
            debug!(raw = %other, "aspectRatio is not a string, using 16:9");
            Some(AspectRatio::default())
        }
    }
}

/// Only a recognised mode survives; an unknown mode must not make an image intrinsic.
fn normalize_image_mode(raw: &Value) -> Option<ImageMode> {
    match raw {
        Value::Bool(true) => Some(ImageMode::SetIntrinsic),
        Value::String(s) => match s.trim() {
            m if m.eq_ignore_ascii_case("setIntrinsic") => Some(ImageMode::SetIntrinsic),
            m if m.eq_ignore_ascii_case("fit") => Some(ImageMode::Fit),
            m if m.eq_ignore_ascii_case("fill") => Some(ImageMode::Fill),
            _ => None,
        },
        _ => None,
    }
}

fn normalize_content_metadata(raw: &Value) -> Option<ContentMetadata> {
    let fields = raw.as_object()?;
    Some(ContentMetadata {
        row_count: fields.get("rowCount").and_then(as_count),
        bar_count: fields.get("barCount").and_then(as_count),
    })
}

/// Non-objects are dropped. A bad ratio is 16:9; a non-boolean flag is soft, so a
/// malformed constraint can never force a height.
fn normalize_aspect_constraint(raw: &Value) -> Option<BlockAspectRatioConstraint> {
    let fields = raw.as_object()?;
    Some(BlockAspectRatioConstraint {
        ratio: fields
            .get("ratio")
            .and_then(Value::as_str)
            .map(normalize_aspect_ratio)
            .unwrap_or_default(),
        is_soft_constraint: fields
            .get("isSoftConstraint")
            .and_then(Value::as_bool)
            .unwrap_or(true),
    })
}

fn normalize_max_allowed_height(raw: &Value) -> Option<f32> {
    as_number(raw)
        .filter(|h| h.is_finite() && *h > 0.0)
        .map(|h| h as f32)
}

fn normalize_id(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Numbers, or strings holding a number.
fn as_number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_count(raw: &Value) -> Option<u32> {
    let n = as_number(raw)?;
    if !n.is_finite() {
        return None;
    }
    // `as` saturates at the u32 range
    Some(n.floor().max(0.0) as u32)
}

pub fn normalize_cell(cell: &EditorCell) -> CellConfiguration {
    CellConfiguration {
        chart_id: normalize_id(&cell.chart_id),
        cell_width: normalize_cell_width_value(&cell.cell_width),
        body_type: normalize_body_type_value(&cell.body_type),
        aspect_ratio: normalize_aspect_ratio_value(&cell.aspect_ratio),
        image_mode: normalize_image_mode(&cell.image_mode),
        content_metadata: normalize_content_metadata(&cell.content_metadata),
    }
}

/// Produces the strict resolver input for one editor block.
pub fn normalize_block(block: &EditorBlock, block_width_px: f32) -> HeightResolutionInput {
    HeightResolutionInput {
        block_id: normalize_id(&block.block_id),
        block_width: if block_width_px >= 0.0 {
            block_width_px.min(f32::MAX)
        } else {
            0.0
        },
        cells: block.cells.iter().map(normalize_cell).collect(),
        aspect_constraint: normalize_aspect_constraint(&block.aspect_constraint),
        max_allowed_height: normalize_max_allowed_height(&block.max_allowed_height),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Block validation
// ────────────────────────────────────────────────────────────────────────────

/// Normalizes a block, resolves its height once and validates every cell at that height.
pub fn validate_block_for_editor(
    block: &EditorBlock,
    block_width_px: f32,
    policy: &LayoutPolicy,
) -> BlockValidationResult {
    let input = normalize_block(block, block_width_px);
    let resolution = resolve(&input, policy);

    let element_validations: Vec<ElementFitValidation> = input
        .cells
        .iter()
        .map(|cell| {
            let width = policy.cell_width_px(input.block_width, cell.cell_width);
            fit::validate(cell, width, resolution.height_px, policy)
        })
        .collect();

    let resolution = match unfixable_overflow(&input, &resolution, &element_validations, policy) {
        Some(reason) => escalate_to_structural_failure(resolution, reason),
        None => resolution,
    };

    let failing: Vec<usize> = element_validations
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.fits)
        .map(|(i, _)| i)
        .collect();

    let structural = resolution.priority == HeightResolutionPriority::StructuralFailure;
    let publish_blocked = structural || !failing.is_empty();
    let publish_block_reason = if structural {
        Some(resolution.reason.clone())
    } else {
        failing
            .first()
            .map(|&i| describe_failure(&input.cells[i], &element_validations[i], failing.len()))
    };

    let mut required_actions: BTreeSet<RequiredAction> = element_validations
        .iter()
        .flat_map(|v| v.required_actions.iter().copied())
        .collect();
    if resolution.requires_split {
        required_actions.insert(RequiredAction::SplitBlock);
    }

    BlockValidationResult {
        block_id: input.block_id,
        height_resolution: resolution,
        element_validations,
        publish_blocked,
        publish_block_reason,
        required_actions,
    }
}

/// Validates blocks independently, preserving order.
pub fn validate_blocks_for_editor(
    blocks: &[EditorBlock],
    block_width_px: f32,
    policy: &LayoutPolicy,
) -> Vec<BlockValidationResult> {
    blocks
        .iter()
        .map(|block| validate_block_for_editor(block, block_width_px, policy))
        .collect()
}

/// Publishing is allowed only when no block is blocked.
pub fn check_publish_validity(results: &[BlockValidationResult]) -> PublishValidityResult {
    let blocked_blocks: Vec<BlockedBlock> = results
        .iter()
        .filter(|r| r.publish_blocked)
        .map(|r| BlockedBlock {
            block_id: r.block_id.clone(),
            reason: r
                .publish_block_reason
                .clone()
                .unwrap_or_else(|| "block is not publishable".to_string()),
        })
        .collect();

    PublishValidityResult {
        can_publish: blocked_blocks.is_empty(),
        blocked_blocks,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

/// Finds a failing cell whose only remedy is more height, when more height cannot help:
/// either it needs more than the cap allows, or the block is already tall enough and
/// the cell's width is the real limit.
fn unfixable_overflow(
    input: &HeightResolutionInput,
    resolution: &BlockHeightResolution,
    validations: &[ElementFitValidation],
    policy: &LayoutPolicy,
) -> Option<String> {
    if resolution.priority == HeightResolutionPriority::StructuralFailure {
        return None;
    }
    let cap = policy.height_bounds(input.max_allowed_height).upper;

    input
        .cells
        .iter()
        .zip(validations)
        .find_map(|(cell, v)| {
            let height_only = !v.fits
                && v.required_actions.len() == 1
                && v.required_actions.contains(&RequiredAction::IncreaseHeight);
            let required = v.required_height?;
            if !height_only {
                return None;
            }
            if required > cap {
                Some(format!(
                    "unfixable overflow: {} cell '{}' needs {required:.0}px but the block is capped at {cap:.0}px",
                    cell.body_type, cell.chart_id
                ))
            } else if resolution.height_px >= required {
                Some(format!(
                    "unfixable overflow: {} cell '{}' does not fit its width at any height",
                    cell.body_type, cell.chart_id
                ))
            } else {
                None
            }
        })
}

fn describe_failure(cell: &CellConfiguration, v: &ElementFitValidation, failing: usize) -> String {
    let first = v.violations.first().map(String::as_str).unwrap_or("does not fit");
    if failing > 1 {
        format!(
            "{failing} cells do not fit; {} cell '{}': {first}",
            cell.body_type, cell.chart_id
        )
    } else {
        format!("{} cell '{}': {first}", cell.body_type, cell.chart_id)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
