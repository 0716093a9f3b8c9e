//! Box and container model.
//!
//! Axis convention: `x` runs along the width, `y` along the height and `z`
//! along the depth. Boxes stack along `z`.

use serde::{Deserialize, Serialize};

use crate::types::{PackError, Result};

/// Tolerance used by every geometric comparison in the crate.
pub const EPSILON: f64 = 1e-9;

/// Number of axis-aligned orientations of a box.
pub const ORIENTATION_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64, depth: f64) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    pub fn volume(&self) -> f64 {
        self.width * self.height * self.depth
    }

    /// Width, height and depth permuted according to `orientation`.
    fn permuted(&self, orientation: Orientation) -> Self {
        let (w, h, d) = (self.width, self.height, self.depth);
        match orientation.index() {
            0 => Self::new(w, h, d),
            1 => Self::new(w, d, h),
            2 => Self::new(h, w, d),
            3 => Self::new(h, d, w),
            4 => Self::new(d, w, h),
            _ => Self::new(d, h, w),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// One of the six axis-aligned orientations, in the order the evaluator tries them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Orientation(u8);

impl Orientation {
    pub const ALL: [Orientation; ORIENTATION_COUNT] = [
        Orientation(0),
        Orientation(1),
        Orientation(2),
        Orientation(3),
        Orientation(4),
        Orientation(5),
    ];

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<usize> for Orientation {
    type Error = PackError;

    fn try_from(idx: usize) -> Result<Self> {
        Orientation::ALL
            .get(idx)
            .copied()
            .ok_or(PackError::OrientationOutOfRange(idx))
    }
}

fn validate_dimension(value: f64, name: &str) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PackError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// A movable box.
///
/// The original dimensions never change; rotating only swaps which of them
/// is used as the working width, height and depth. `Clone` is a full value
/// copy, so a cloned box can be rotated and moved without touching the
/// original.
#[derive(Debug, Clone, PartialEq)]
pub struct PackBox {
    /// External key, may repeat across units of the same SKU
    pub box_id: String,
    /// Per-unit id handed out by an [`IdSequence`]
    pub unique_id: Option<u64>,
    pub is_fragile: bool,
    /// Only meaningful after a successful placement
    pub position: Position,
    original: Dimensions,
    orientations: [Dimensions; ORIENTATION_COUNT],
    orientation: Orientation,
    dims: Dimensions,
}

impl PackBox {
    /// Creates a box in orientation 0. Fails if any dimension is not strictly positive.
    pub fn new(
        box_id: impl Into<String>,
        width: f64,
        height: f64,
        depth: f64,
        is_fragile: bool,
    ) -> Result<Self> {
        let box_id = box_id.into();
        validate_dimension(width, &format!("Width of box '{}'", box_id))?;
        validate_dimension(height, &format!("Height of box '{}'", box_id))?;
        validate_dimension(depth, &format!("Depth of box '{}'", box_id))?;

        let original = Dimensions::new(width, height, depth);
        let orientations = Orientation::ALL.map(|o| original.permuted(o));

        Ok(Self {
            box_id,
            unique_id: None,
            is_fragile,
            position: Position::default(),
            original,
            orientations,
            orientation: Orientation::default(),
            dims: original,
        })
    }

    pub fn original_dims(&self) -> Dimensions {
        self.original
    }

    /// Current working dimensions.
    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn orientations(&self) -> &[Dimensions; ORIENTATION_COUNT] {
        &self.orientations
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
        self.dims = self.orientations[orientation.index()];
    }

    /// Selects orientation `idx` (0..6) as the working dimensions.
    pub fn select_orientation(&mut self, idx: usize) -> Result<()> {
        self.set_orientation(Orientation::try_from(idx)?);
        Ok(())
    }

    pub fn volume(&self) -> f64 {
        self.original.volume()
    }

    /// Far corner of the box at its current position.
    pub fn max_corner(&self) -> Position {
        Position::new(
            self.position.x + self.dims.width,
            self.position.y + self.dims.height,
            self.position.z + self.dims.depth,
        )
    }

    pub fn center(&self) -> Position {
        Position::new(
            self.position.x + self.dims.width / 2.0,
            self.position.y + self.dims.height / 2.0,
            self.position.z + self.dims.depth / 2.0,
        )
    }
}

/// Axis-aligned placement volume with its origin at (0, 0, 0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Container {
    dims: Dimensions,
}

impl Container {
    pub fn new(width: f64, height: f64, depth: f64) -> Result<Self> {
        validate_dimension(width, "Container width")?;
        validate_dimension(height, "Container height")?;
        validate_dimension(depth, "Container depth")?;
        Ok(Self {
            dims: Dimensions::new(width, height, depth),
        })
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn width(&self) -> f64 {
        self.dims.width
    }

    pub fn height(&self) -> f64 {
        self.dims.height
    }

    pub fn depth(&self) -> f64 {
        self.dims.depth
    }

    pub fn volume(&self) -> f64 {
        self.dims.volume()
    }

    pub fn center(&self) -> Position {
        Position::new(
            self.dims.width / 2.0,
            self.dims.height / 2.0,
            self.dims.depth / 2.0,
        )
    }

    /// True when the box lies fully inside the container at its current position.
    pub fn contains(&self, bx: &PackBox) -> bool {
        let min = bx.position;
        let max = bx.max_corner();
        min.x >= -EPSILON
            && min.y >= -EPSILON
            && min.z >= -EPSILON
            && max.x <= self.dims.width + EPSILON
            && max.y <= self.dims.height + EPSILON
            && max.z <= self.dims.depth + EPSILON
    }
}

/// Hands out strictly increasing unique ids, starting at 1.
///
/// Owned by whoever loads boxes; every independent run can hold its own.
#[derive(Debug, Clone)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}
