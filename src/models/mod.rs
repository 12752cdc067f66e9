use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod garden;
pub mod layout;
pub mod params;
pub mod plant;
pub mod request;

/// Top-left corner of a zone on the garden plan, in plan units.
/// Only carried through for rendering; the optimizer never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Width and height of a zone on the garden plan, in plan units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}
