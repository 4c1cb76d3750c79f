//! Structured payload decoding
//!
//! Channels carrying struct/protobuf/composite payloads deliver them as
//! JSON-shaped objects whose layout depends on the announced type name.
//! Decoders for those layouts live in a [`DecoderRegistry`] keyed by
//! `(format, type name)`, so support for a new structured type is one
//! `register` call instead of another arm in a central match.
//!
//! A malformed payload never propagates an error: decoding degrades to
//! the zero value, because a single bad record must not take down a
//! dashboard full of widgets.
//!
//! # Geometry
//!
//! The stock decoders produce [`Pose2d`] (field position plus heading in
//! degrees) and [`Rotation3d`] (roll/pitch/yaw in degrees), converting
//! quaternions with the standard Euler extraction.

use std::collections::HashMap;

use serde_json::Value as Json;

use crate::types::{StructFormat, StructuredType, Value};

/// A rotation quaternion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    /// Returns the ccw rotation angle around the X axis (roll) in radians.
    pub fn roll(&self) -> f64 {
        let cxcy = 1.0 - 2.0 * (self.x * self.x + self.y * self.y);
        let sxcy = 2.0 * (self.w * self.x + self.y * self.z);
        let cy_sq = cxcy * cxcy + sxcy * sxcy;
        if cy_sq > 1e-20 {
            sxcy.atan2(cxcy)
        } else {
            0.0
        }
    }

    /// Returns the ccw rotation angle around the Y axis (pitch) in radians.
    pub fn pitch(&self) -> f64 {
        let ratio = 2.0 * (self.w * self.y - self.z * self.x);
        if ratio.abs() >= 1.0 {
            ratio.signum() * (std::f64::consts::PI / 2.0)
        } else {
            ratio.asin()
        }
    }

    /// Returns the ccw rotation angle around the Z axis (yaw) in radians.
    pub fn yaw(&self) -> f64 {
        let cycz = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);
        let cysz = 2.0 * (self.w * self.z + self.x * self.y);
        let cy_sq = cycz * cycz + cysz * cysz;
        if cy_sq > 1e-20 {
            cysz.atan2(cycz)
        } else {
            (2.0 * self.w * self.z).atan2(self.w * self.w - self.z * self.z)
        }
    }
}

/// Converts a value in radians to degrees.
pub fn to_degrees(radians: f64) -> f64 {
    180.0 * radians / std::f64::consts::PI
}

/// A 2D field pose
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose2d {
    /// X position in meters
    pub x: f64,
    /// Y position in meters
    pub y: f64,
    /// Rotation in degrees
    pub theta: f64,
}

/// A 3D orientation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotation3d {
    /// CCW rotation angle around X axis (roll) in degrees
    pub x: f64,
    /// CCW rotation angle around Y axis (pitch) in degrees
    pub y: f64,
    /// CCW rotation angle around Z axis (yaw) in degrees
    pub z: f64,
}

type DecodeFn<T> = Box<dyn Fn(&Json) -> Option<T> + Send + Sync>;

/// Registry of structured-type decoders producing `T`
pub struct DecoderRegistry<T> {
    decoders: HashMap<(StructFormat, String), DecodeFn<T>>,
}

impl<T> Default for DecoderRegistry<T> {
    fn default() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }
}

impl<T> DecoderRegistry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoder for `(format, name)`, replacing any existing one.
    pub fn register(
        &mut self,
        format: StructFormat,
        name: impl Into<String>,
        decode: impl Fn(&Json) -> Option<T> + Send + Sync + 'static,
    ) {
        self.decoders
            .insert((format, name.into()), Box::new(decode));
    }

    /// Decode a payload according to its structured-type descriptor.
    /// Returns `None` when no decoder is registered or the payload shape
    /// does not match.
    pub fn decode(&self, structured: &StructuredType, value: &Json) -> Option<T> {
        let decode = self
            .decoders
            .get(&(structured.format, structured.name.clone()))?;
        decode(value)
    }

    /// Number of registered decoders.
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

fn field(value: &Json, key: &str) -> Option<f64> {
    value.get(key)?.as_f64()
}

fn quaternion(value: &Json) -> Option<Quaternion> {
    Some(Quaternion {
        w: field(value, "w")?,
        x: field(value, "x")?,
        y: field(value, "y")?,
        z: field(value, "z")?,
    })
}

/// `{translation: {x, y}, rotation: {value}}` with rotation in radians
fn pose2d_struct(value: &Json) -> Option<Pose2d> {
    let translation = value.get("translation")?;
    Some(Pose2d {
        x: field(translation, "x")?,
        y: field(translation, "y")?,
        theta: to_degrees(field(value.get("rotation")?, "value")?),
    })
}

/// `{translation: {x, y, z}, rotation: {q}}`; yaw comes from the quaternion
fn pose3d_struct(value: &Json) -> Option<Pose2d> {
    let translation = value.get("translation")?;
    let q = quaternion(value.get("rotation")?.get("q")?)?;
    Some(Pose2d {
        x: field(translation, "x")?,
        y: field(translation, "y")?,
        theta: to_degrees(q.yaw()),
    })
}

/// `{Robot: [x, y, theta_radians]}` published by a Field2d sendable
fn field2d_pose(value: &Json) -> Option<Pose2d> {
    let robot = value.get("Robot")?.as_array()?;
    Some(Pose2d {
        x: robot.first()?.as_f64()?,
        y: robot.get(1)?.as_f64()?,
        theta: to_degrees(robot.get(2)?.as_f64()?),
    })
}

fn rotation_from_quaternion(q: Quaternion) -> Rotation3d {
    Rotation3d {
        x: to_degrees(q.roll()),
        y: to_degrees(q.pitch()),
        z: to_degrees(q.yaw()),
    }
}

fn yaw_only(radians: f64) -> Rotation3d {
    Rotation3d {
        x: 0.0,
        y: 0.0,
        z: to_degrees(radians),
    }
}

/// Stock decoders mapping structured payloads to [`Pose2d`].
pub fn pose2d_decoders() -> DecoderRegistry<Pose2d> {
    let mut registry = DecoderRegistry::new();

    registry.register(StructFormat::Struct, "Pose2d", pose2d_struct);
    registry.register(StructFormat::Struct, "Pose3d", pose3d_struct);
    registry.register(StructFormat::Protobuf, "wpi.proto.ProtobufPose2d", pose2d_struct);
    registry.register(StructFormat::Protobuf, "wpi.proto.ProtobufPose3d", pose3d_struct);
    registry.register(StructFormat::Composite, "Field2d", field2d_pose);

    registry
}

/// Stock decoders mapping structured payloads to [`Rotation3d`].
pub fn rotation3d_decoders() -> DecoderRegistry<Rotation3d> {
    let mut registry = DecoderRegistry::new();

    registry.register(StructFormat::Struct, "Pose2d", |v| {
        Some(yaw_only(field(v.get("rotation")?, "value")?))
    });
    registry.register(StructFormat::Struct, "Pose3d", |v| {
        Some(rotation_from_quaternion(quaternion(
            v.get("rotation")?.get("q")?,
        )?))
    });
    registry.register(StructFormat::Struct, "Rotation2d", |v| {
        Some(yaw_only(field(v, "value")?))
    });
    registry.register(StructFormat::Struct, "Rotation3d", |v| {
        Some(rotation_from_quaternion(quaternion(v.get("q")?)?))
    });
    registry.register(StructFormat::Struct, "Quaternion", |v| {
        Some(rotation_from_quaternion(quaternion(v)?))
    });

    registry.register(StructFormat::Protobuf, "wpi.proto.ProtobufPose2d", |v| {
        Some(yaw_only(field(v.get("rotation")?, "value")?))
    });
    registry.register(StructFormat::Protobuf, "wpi.proto.ProtobufPose3d", |v| {
        Some(rotation_from_quaternion(quaternion(
            v.get("rotation")?.get("q")?,
        )?))
    });
    registry.register(StructFormat::Protobuf, "wpi.proto.ProtobufRotation2d", |v| {
        Some(yaw_only(field(v, "value")?))
    });
    registry.register(StructFormat::Protobuf, "wpi.proto.ProtobufRotation3d", |v| {
        Some(rotation_from_quaternion(quaternion(v.get("q")?)?))
    });
    registry.register(StructFormat::Protobuf, "wpi.proto.ProtobufQuaternion", |v| {
        Some(rotation_from_quaternion(quaternion(v)?))
    });

    registry.register(StructFormat::Composite, "Field2d", |v| {
        let robot = v.get("Robot")?.as_array()?;
        Some(yaw_only(robot.get(2)?.as_f64()?))
    });
    // Gyro sendables report degrees directly
    registry.register(StructFormat::Composite, "Gyro", |v| {
        Some(Rotation3d {
            x: 0.0,
            y: 0.0,
            z: field(v, "Value")?,
        })
    });
    for name in ["ADIS16448 IMU", "ADIS16470 IMU"] {
        registry.register(StructFormat::Composite, name, |v| {
            Some(Rotation3d {
                x: 0.0,
                y: 0.0,
                z: field(v, "Yaw Angle")?,
            })
        });
    }

    registry
}

/// Constructs a [`Pose2d`] from a channel value, degrading to zero on
/// anything unrecognized.
///
/// A bare `[x, y, theta]` number array is accepted with theta assumed to
/// be in degrees already; the measurement unit is unknowable in that case
/// and the caller may convert.
pub fn to_pose2d(
    value: &Value,
    structured: Option<&StructuredType>,
    registry: &DecoderRegistry<Pose2d>,
) -> Pose2d {
    match value {
        Value::NumberArray(items) => Pose2d {
            x: items.first().copied().unwrap_or(0.0),
            y: items.get(1).copied().unwrap_or(0.0),
            theta: items.get(2).copied().unwrap_or(0.0),
        },
        Value::Json(json) => structured
            .and_then(|s| registry.decode(s, json))
            .unwrap_or_default(),
        _ => Pose2d::default(),
    }
}

/// Constructs a [`Rotation3d`] from a channel value, degrading to zero on
/// anything unrecognized.
///
/// A bare number is taken as yaw; a `[x, y, z]` number array as
/// roll/pitch/yaw, assumed to be in degrees already.
pub fn to_rotation3d(
    value: &Value,
    structured: Option<&StructuredType>,
    registry: &DecoderRegistry<Rotation3d>,
) -> Rotation3d {
    match value {
        Value::Number(n) => Rotation3d {
            x: 0.0,
            y: 0.0,
            z: *n,
        },
        Value::NumberArray(items) => Rotation3d {
            x: items.first().copied().unwrap_or(0.0),
            y: items.get(1).copied().unwrap_or(0.0),
            z: items.get(2).copied().unwrap_or(0.0),
        },
        Value::Json(json) => structured
            .and_then(|s| registry.decode(s, json))
            .unwrap_or_default(),
        _ => Rotation3d::default(),
    }
}
