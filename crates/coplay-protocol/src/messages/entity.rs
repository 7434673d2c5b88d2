//! Shared 3D entity messages.
//!
//! Vector fields go on the wire as plain lists of numbers with a fixed,
//! documented length: `[x, y, z]` for [`Vec3`], `[x, y, z, w]` for
//! [`Quat`]. Decoding checks the length before building the value, so a
//! two-element position is rejected instead of being padded. NaN and
//! infinities have no JSON form, so encoding refuses them.

use serde::de::{self, Deserializer};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};

use crate::message::{GroupMessage, new_message_id};

/// A 3-component vector (position or scale).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Serialize for Vec3 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        finite_list(serializer, [self.x, self.y, self.z])
    }
}

impl<'de> Deserialize<'de> for Vec3 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [x, y, z] = fixed_list::<D, 3>(deserializer, "a list of 3 numbers")?;
        Ok(Self { x, y, z })
    }
}

/// A rotation quaternion, vector part first (`x, y, z`) then the scalar
/// part `w`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Serialize for Quat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        finite_list(serializer, [self.x, self.y, self.z, self.w])
    }
}

impl<'de> Deserialize<'de> for Quat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [x, y, z, w] = fixed_list::<D, 4>(deserializer, "a list of 4 numbers")?;
        Ok(Self { x, y, z, w })
    }
}

fn finite_list<S: Serializer, const N: usize>(
    serializer: S,
    values: [f32; N],
) -> Result<S::Ok, S::Error> {
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(ser::Error::custom(format!("non-finite vector component {bad}")));
    }
    serializer.collect_seq(values)
}

fn fixed_list<'de, D: Deserializer<'de>, const N: usize>(
    deserializer: D,
    expected: &'static str,
) -> Result<[f32; N], D::Error> {
    let values = Vec::<f32>::deserialize(deserializer)?;
    <[f32; N]>::try_from(values.as_slice())
        .map_err(|_| de::Error::invalid_length(values.len(), &expected))
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Synchronises the transform of one shared entity.
///
/// Usually sent on the unreliable channel at a high rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTransformMessage {
    #[serde(default)]
    pub window_id: String,
    #[serde(default = "new_message_id")]
    pub message_id: String,
    pub entity_id: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl EntityTransformMessage {
    pub fn new(entity_id: impl Into<String>, position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            window_id: String::new(),
            message_id: new_message_id(),
            entity_id: entity_id.into(),
            position,
            rotation,
            scale,
        }
    }
}

impl GroupMessage for EntityTransformMessage {
    fn window_id(&self) -> &str {
        &self.window_id
    }

    fn message_id(&self) -> &str {
        &self.message_id
    }
}

/// Creates (`is_active = true`) or removes a shared entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityStateMessage {
    #[serde(default)]
    pub window_id: String,
    #[serde(default = "new_message_id")]
    pub message_id: String,
    pub entity_id: String,
    pub is_active: bool,
    pub model_name: String,
}

impl EntityStateMessage {
    pub fn new(entity_id: impl Into<String>, is_active: bool, model_name: impl Into<String>) -> Self {
        Self {
            window_id: String::new(),
            message_id: new_message_id(),
            entity_id: entity_id.into(),
            is_active,
            model_name: model_name.into(),
        }
    }
}

impl GroupMessage for EntityStateMessage {
    fn window_id(&self) -> &str {
        &self.window_id
    }

    fn message_id(&self) -> &str {
        &self.message_id
    }
}
