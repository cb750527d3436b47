//! Gazebo FDM wire formats.
//!
//! Both packets are headerless arrays of little-endian floats. There is no
//! length prefix, checksum or version field, so the layout here must match
//! the Gazebo plugin field for field.

use core::fmt;

/// Number of servo channels carried by a [`ServoPacket`].
pub const SERVO_CHANNELS: usize = 16;
/// Size of an encoded [`ServoPacket`] in bytes.
pub const SERVO_PACKET_LEN: usize = SERVO_CHANNELS * 4;
/// Number of `f64` fields in an [`FdmPacket`].
pub const FDM_FIELD_COUNT: usize = 17;
/// Size of an encoded [`FdmPacket`] in bytes.
pub const FDM_PACKET_LEN: usize = FDM_FIELD_COUNT * 8;

/// Motor speed commands sent to the physics engine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ServoPacket {
    /// Normalized motor speeds, roughly -1.0 to 1.0.
    pub motor_speed: [f32; SERVO_CHANNELS],
}

impl ServoPacket {
    pub fn to_bytes(&self) -> [u8; SERVO_PACKET_LEN] {
        let mut buf = [0u8; SERVO_PACKET_LEN];
        for (chunk, speed) in buf.chunks_exact_mut(4).zip(self.motor_speed.iter()) {
            chunk.copy_from_slice(&speed.to_le_bytes());
        }
        buf
    }

    /// Decode a servo packet. Returns `None` unless `buf` is exactly
    /// [`SERVO_PACKET_LEN`] bytes.
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() != SERVO_PACKET_LEN {
            return None;
        }
        let mut motor_speed = [0f32; SERVO_CHANNELS];
        for (speed, chunk) in motor_speed.iter_mut().zip(buf.chunks_exact(4)) {
            *speed = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Some(Self { motor_speed })
    }
}

/// Vehicle state computed by the physics engine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FdmPacket {
    /// Simulator clock in seconds.
    pub timestamp: f64,
    /// Linear acceleration in m/s² (body frame).
    pub linear_acceleration: [f64; 3],
    /// Angular velocity in rad/s (body frame).
    pub angular_velocity: [f64; 3],
    /// Orientation quaternion as (w, x, y, z).
    pub orientation: [f64; 4],
    /// Velocity in m/s (north, east, down).
    pub velocity_ned: [f64; 3],
    /// Position in meters relative to home (north, east, down).
    pub position_ned: [f64; 3],
}

impl FdmPacket {
    /// Decode a state packet. Returns `None` unless `buf` is exactly
    /// [`FDM_PACKET_LEN`] bytes; short datagrams are never reassembled.
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() != FDM_PACKET_LEN {
            return None;
        }
        let mut f = [0f64; FDM_FIELD_COUNT];
        for (field, chunk) in f.iter_mut().zip(buf.chunks_exact(8)) {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            *field = f64::from_le_bytes(raw);
        }
        Some(Self {
            timestamp: f[0],
            linear_acceleration: [f[1], f[2], f[3]],
            angular_velocity: [f[4], f[5], f[6]],
            orientation: [f[7], f[8], f[9], f[10]],
            velocity_ned: [f[11], f[12], f[13]],
            position_ned: [f[14], f[15], f[16]],
        })
    }

    pub fn to_bytes(&self) -> [u8; FDM_PACKET_LEN] {
        let mut buf = [0u8; FDM_PACKET_LEN];
        for (chunk, field) in buf.chunks_exact_mut(8).zip(self.fields().iter()) {
            chunk.copy_from_slice(&field.to_le_bytes());
        }
        buf
    }

    fn fields(&self) -> [f64; FDM_FIELD_COUNT] {
        let [ax, ay, az] = self.linear_acceleration;
        let [gx, gy, gz] = self.angular_velocity;
        let [qw, qx, qy, qz] = self.orientation;
        let [vn, ve, vd] = self.velocity_ned;
        let [pn, pe, pd] = self.position_ned;
        [
            self.timestamp,
            ax,
            ay,
            az,
            gx,
            gy,
            gz,
            qw,
            qx,
            qy,
            qz,
            vn,
            ve,
            vd,
            pn,
            pe,
            pd,
        ]
    }

    /// Norm of the orientation quaternion.
    pub fn quaternion_norm(&self) -> f64 {
        self.orientation.iter().map(|c| c * c).sum::<f64>().sqrt()
    }

    /// Check that every field is finite and the quaternion is unit length
    /// within `tolerance`.
    pub fn validate(&self, tolerance: f64) -> Result<(), MalformedState> {
        const NAMES: [&str; FDM_FIELD_COUNT] = [
            "timestamp",
            "linear_acceleration.x",
            "linear_acceleration.y",
            "linear_acceleration.z",
            "angular_velocity.x",
            "angular_velocity.y",
            "angular_velocity.z",
            "orientation.w",
            "orientation.x",
            "orientation.y",
            "orientation.z",
            "velocity.north",
            "velocity.east",
            "velocity.down",
            "position.north",
            "position.east",
            "position.down",
        ];

        if let Some((name, _)) = NAMES
            .iter()
            .zip(self.fields().iter())
            .find(|(_, value)| !value.is_finite())
        {
            return Err(MalformedState::NonFinite(*name));
        }

        let norm = self.quaternion_norm();
        if (norm - 1.0).abs() > tolerance {
            return Err(MalformedState::NonUnitQuaternion(norm));
        }
        Ok(())
    }
}

/// Reason a correctly sized state packet was rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MalformedState {
    /// A field was NaN or infinite.
    NonFinite(&'static str),
    /// The orientation quaternion norm was outside tolerance.
    NonUnitQuaternion(f64),
}

impl fmt::Display for MalformedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinite(field) => write!(f, "non-finite value in {field}"),
            Self::NonUnitQuaternion(norm) => write!(f, "quaternion norm {norm:.6} is not 1"),
        }
    }
}

impl std::error::Error for MalformedState {}
