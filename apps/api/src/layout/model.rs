//! Strict domain types for block height resolution and fit validation.
//!
//! Everything in here is closed: a `CellConfiguration` can only hold a valid width,
//! body type and aspect ratio. Untrusted editor data is turned into these types by
//! `layout::editor` and nowhere else.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Cell configuration
// ────────────────────────────────────────────────────────────────────────────

/// Share of the block row a cell occupies. Serialized as the integer `1` or `2`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CellWidth {
    /// Half of the row.
    #[default]
    Half,
    /// The whole row.
    Full,
}

impl CellWidth {
    pub fn span(self) -> u8 {
        match self {
            CellWidth::Half => 1,
            CellWidth::Full => 2,
        }
    }
}

impl From<CellWidth> for u8 {
    fn from(width: CellWidth) -> Self {
        width.span()
    }
}

impl TryFrom<u8> for CellWidth {
    type Error = String;

    fn try_from(span: u8) -> Result<Self, Self::Error> {
        match span {
            1 => Ok(CellWidth::Half),
            2 => Ok(CellWidth::Full),
            other => Err(format!("cellWidth must be 1 or 2, got {other}")),
        }
    }
}

/// Kind of content a cell holds. `Kpi` is the default: it fits at any size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    Pie,
    Bar,
    #[default]
    Kpi,
    Text,
    Image,
    Table,
}

impl BodyType {
    pub const ALL: [BodyType; 6] = [
        BodyType::Pie,
        BodyType::Bar,
        BodyType::Kpi,
        BodyType::Text,
        BodyType::Image,
        BodyType::Table,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BodyType::Pie => "pie",
            BodyType::Bar => "bar",
            BodyType::Kpi => "kpi",
            BodyType::Text => "text",
            BodyType::Image => "image",
            BodyType::Table => "table",
        }
    }
}

impl fmt::Display for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Width-to-height ratio. Defaults to 16:9.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 3] = [
        AspectRatio::Landscape,
        AspectRatio::Portrait,
        AspectRatio::Square,
    ];

    /// Width divided by height.
    pub fn value(self) -> f32 {
        match self {
            AspectRatio::Landscape => 16.0 / 9.0,
            AspectRatio::Portrait => 9.0 / 16.0,
            AspectRatio::Square => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Square => "1:1",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an image cell is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageMode {
    /// The image's natural aspect ratio dictates the block height.
    SetIntrinsic,
    Fit,
    Fill,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bar_count: Option<u32>,
}

/// One visual element inside a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellConfiguration {
    pub chart_id: String,
    pub cell_width: CellWidth,
    pub body_type: BodyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_mode: Option<ImageMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_metadata: Option<ContentMetadata>,
}

impl CellConfiguration {
    /// A half-width cell of the given type with no optional fields.
    pub fn new(chart_id: impl Into<String>, body_type: BodyType) -> Self {
        Self {
            chart_id: chart_id.into(),
            cell_width: CellWidth::Half,
            body_type,
            aspect_ratio: None,
            image_mode: None,
            content_metadata: None,
        }
    }

    /// True for image cells whose natural ratio governs the block height.
    pub fn is_intrinsic_media(&self) -> bool {
        self.body_type == BodyType::Image && self.image_mode == Some(ImageMode::SetIntrinsic)
    }

    pub fn row_count(&self) -> Option<u32> {
        self.content_metadata.and_then(|m| m.row_count)
    }

    pub fn bar_count(&self) -> Option<u32> {
        self.content_metadata.and_then(|m| m.bar_count)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Resolution input / output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockAspectRatioConstraint {
    pub ratio: AspectRatio,
    pub is_soft_constraint: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeightResolutionInput {
    pub block_id: String,
    /// Block width in px.
    pub block_width: f32,
    pub cells: Vec<CellConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_constraint: Option<BlockAspectRatioConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_allowed_height: Option<f32>,
}

/// Which rule decided a block's height. Lower tiers win when they apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeightResolutionPriority {
    IntrinsicMedia,
    BlockAspectRatio,
    ReadabilityEnforcement,
    StructuralFailure,
}

impl HeightResolutionPriority {
    pub fn tier(self) -> u8 {
        match self {
            HeightResolutionPriority::IntrinsicMedia => 1,
            HeightResolutionPriority::BlockAspectRatio => 2,
            HeightResolutionPriority::ReadabilityEnforcement => 3,
            HeightResolutionPriority::StructuralFailure => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeightResolution {
    pub height_px: f32,
    pub priority: HeightResolutionPriority,
    /// Diagnostic only; not user-facing text.
    pub reason: String,
    pub can_increase: bool,
    pub requires_split: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Validation results
// ────────────────────────────────────────────────────────────────────────────

/// Remedies the editor can offer for a cell or block that does not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequiredAction {
    Aggregate,
    IncreaseHeight,
    Reflow,
    /// Block-level only; never produced for a single cell.
    SplitBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementFitValidation {
    pub fits: bool,
    pub violations: Vec<String>,
    pub required_actions: BTreeSet<RequiredAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_height: Option<f32>,
}

impl ElementFitValidation {
    pub fn fits() -> Self {
        Self {
            fits: true,
            violations: Vec::new(),
            required_actions: BTreeSet::new(),
            required_height: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockValidationResult {
    pub block_id: String,
    pub height_resolution: BlockHeightResolution,
    pub element_validations: Vec<ElementFitValidation>,
    pub publish_blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_block_reason: Option<String>,
    pub required_actions: BTreeSet<RequiredAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedBlock {
    pub block_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishValidityResult {
    pub can_publish: bool,
    pub blocked_blocks: Vec<BlockedBlock>,
}
