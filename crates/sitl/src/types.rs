use core::fmt;

use serde::Deserialize;

use crate::servo::PWM_ZERO;
use crate::wire::SERVO_CHANNELS;

/// Vehicle identifier (matches MAVLink system ID range).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct VehicleId(pub u8);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vehicle({})", self.0)
    }
}

/// IMU sensor data.
#[derive(Debug, Clone)]
pub struct ImuData {
    /// Accelerometer reading in m/s² (body frame, [x, y, z]).
    pub accel_mss: [f32; 3],
    /// Gyroscope reading in rad/s (body frame, [x, y, z]).
    pub gyro_rads: [f32; 3],
}

/// GPS sensor data.
#[derive(Debug, Clone)]
pub struct GpsData {
    /// Latitude in degrees.
    pub lat_deg: f64,
    /// Longitude in degrees.
    pub lon_deg: f64,
    /// Altitude in meters above sea level.
    pub alt_m: f32,
    /// Ground speed in m/s.
    pub speed_ms: f32,
    /// Course over ground in degrees, 0 to 360.
    pub course_deg: f32,
    /// Vertical velocity in m/s, positive down.
    pub velocity_down_ms: f32,
}

/// Aggregated sensor data derived from one FDM update.
#[derive(Debug, Clone)]
pub struct SensorData {
    /// Timestamp in microseconds (simulation time).
    pub timestamp_us: u64,
    /// Vehicle that produced this data.
    pub vehicle_id: VehicleId,
    /// IMU data (accelerometer + gyroscope).
    pub imu: Option<ImuData>,
    /// GPS data. Always a 3D fix; the FDM packet carries a full position.
    pub gps: Option<GpsData>,
}

/// Raw servo outputs for one tick, in servo units (nominally 1000 to 2000).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorCommands {
    pub servos: [u16; SERVO_CHANNELS],
}

impl ActuatorCommands {
    /// All channels set to the same raw value.
    pub fn uniform(pwm: u16) -> Self {
        Self {
            servos: [pwm; SERVO_CHANNELS],
        }
    }
}

impl Default for ActuatorCommands {
    /// All motors stopped.
    fn default() -> Self {
        Self::uniform(PWM_ZERO)
    }
}
