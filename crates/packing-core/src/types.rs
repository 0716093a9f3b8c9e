use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::annealing::AnnealingStats;
use crate::config::{PackingConfig, SearchStrategy};
use crate::cost::CostBreakdown;
use crate::model::{Container, Dimensions, IdSequence, PackBox};

/// One box as it arrives from a loader (CSV row, JSON object, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub box_id: String,
    #[serde(alias = "original_width")]
    pub width: f64,
    #[serde(alias = "original_height")]
    pub height: f64,
    #[serde(alias = "original_depth")]
    pub depth: f64,
    /// Missing or unreadable values fall back to non-fragile
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_fragile: bool,
}

impl BoxRecord {
    /// Validates the record and turns it into a box with the next unique id.
    pub fn build(&self, ids: &mut IdSequence) -> Result<PackBox> {
        let mut bx = PackBox::new(
            self.box_id.clone(),
            self.width,
            self.height,
            self.depth,
            self.is_fragile,
        )?;
        bx.unique_id = Some(ids.next_id());
        Ok(bx)
    }
}

/// Builds every record with ids drawn from one sequence, stopping at the first invalid one.
pub fn build_boxes(records: &[BoxRecord], ids: &mut IdSequence) -> Result<Vec<PackBox>> {
    records.iter().map(|record| record.build(ids)).collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let flag = match FlagRepr::deserialize(deserializer)? {
        FlagRepr::Bool(value) => value,
        FlagRepr::Int(value) => value != 0,
        FlagRepr::Float(value) => value.is_finite() && value != 0.0,
        FlagRepr::Text(text) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "1" | "1.0" | "true" | "yes" | "y"
        ),
        FlagRepr::Other(_) => false,
    };
    Ok(flag)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Loaders hand out ids as numbers or strings; both become the same key.
fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Int(value) => value.to_string(),
        IdRepr::Float(value) => value.to_string(),
        IdRepr::Text(text) => text,
    })
}

/// Container size as supplied by the caller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ContainerSpec {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl ContainerSpec {
    pub fn build(&self) -> Result<Container> {
        Container::new(self.width, self.height, self.depth)
    }
}

impl From<Container> for ContainerSpec {
    fn from(container: Container) -> Self {
        let Dimensions {
            width,
            height,
            depth,
        } = container.dims();
        Self {
            width,
            height,
            depth,
        }
    }
}

/// Input: what the caller provides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingRequest {
    pub container: ContainerSpec,
    pub boxes: Vec<BoxRecord>,
    #[serde(default)]
    pub config: PackingConfig,
}

/// Final position of one placed box, using its rotated working dimensions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlacementRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub box_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<u64>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_fragile: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement_order: Option<usize>,
}

impl PlacementRecord {
    pub fn from_box(bx: &PackBox, placement_order: usize) -> Self {
        let pos = bx.position;
        let dims = bx.dims();
        Self {
            box_id: bx.box_id.clone(),
            unique_id: bx.unique_id,
            x: pos.x,
            y: pos.y,
            z: pos.z,
            width: dims.width,
            height: dims.height,
            depth: dims.depth,
            is_fragile: bx.is_fragile,
            placement_order: Some(placement_order),
        }
    }

    pub fn volume(&self) -> f64 {
        self.width * self.height * self.depth
    }
}

/// Summary statistics of a packing result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_boxes: usize,
    pub placed_boxes: usize,
    pub container_volume: f64,
    pub used_volume: f64,
    pub utilization_percentage: f64,
    pub max_stack_height: f64,
}

/// Output: what the packer returns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingResult {
    pub strategy: SearchStrategy,
    /// Base seed of the run; feeding it back as `config.seed` replays the run
    pub seed: u64,
    pub cost: f64,
    /// False when the best ordering found still leaves a box unplaceable
    pub feasible: bool,
    /// Placed boxes in placement order
    pub placements: Vec<PlacementRecord>,
    pub breakdown: CostBreakdown,
    pub summary: Summary,
    /// Best cost of each restart, in restart order
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub restart_costs: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stats: Option<AnnealingStats>,
}

/// Error type for packing
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),

    #[error("Orientation index {0} out of range (expected 0..6)")]
    OrientationOutOfRange(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PackError>;
