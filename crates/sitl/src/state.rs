//! Kinematic state reconstructed from FDM packets.

use nalgebra::{Matrix3, Vector3};

use crate::bridge::time::SimClock;
use crate::config::GeoPosition;
use crate::types::{GpsData, ImuData, SensorData, VehicleId};
use crate::wire::FdmPacket;

/// Mean equatorial radius used for the flat-earth position offset.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Orientation matrix for a (w, x, y, z) quaternion.
///
/// The quaternion is used as sent; it is not renormalized. For a unit
/// quaternion this equals nalgebra's `UnitQuaternion::to_rotation_matrix`.
pub fn quaternion_to_dcm(q: [f64; 4]) -> Matrix3<f64> {
    let [w, x, y, z] = q;
    let (xx, yy, zz) = (x * x, y * y, z * z);
    let (wx, wy, wz) = (w * x, w * y, w * z);
    let (xy, xz, yz) = (x * y, x * z, y * z);

    Matrix3::new(
        1.0 - 2.0 * (yy + zz),
        2.0 * (xy - wz),
        2.0 * (xz + wy),
        2.0 * (xy + wz),
        1.0 - 2.0 * (xx + zz),
        2.0 * (yz - wx),
        2.0 * (xz - wy),
        2.0 * (yz + wx),
        1.0 - 2.0 * (xx + yy),
    )
}

/// Vehicle state as last reported by the physics engine.
///
/// Only the bridge writes to it: the decoder copies vectors from each
/// accepted packet and the frame-rate adapter advances [`SimClock`].
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicState {
    accel_body: Vector3<f64>,
    gyro: Vector3<f64>,
    dcm: Matrix3<f64>,
    velocity_ned: Vector3<f64>,
    position_ned: Vector3<f64>,
    pub(crate) clock: SimClock,
}

impl Default for KinematicState {
    fn default() -> Self {
        Self {
            accel_body: Vector3::zeros(),
            gyro: Vector3::zeros(),
            dcm: Matrix3::identity(),
            velocity_ned: Vector3::zeros(),
            position_ned: Vector3::zeros(),
            clock: SimClock::default(),
        }
    }
}

impl KinematicState {
    /// Copy one packet's kinematics into the state. Units are shared with the
    /// wire format, so nothing is converted. Timing is left to the
    /// frame-rate adapter.
    pub(crate) fn decode(&mut self, packet: &FdmPacket) {
        self.accel_body = Vector3::from(packet.linear_acceleration);
        self.gyro = Vector3::from(packet.angular_velocity);
        self.dcm = quaternion_to_dcm(packet.orientation);
        self.velocity_ned = Vector3::from(packet.velocity_ned);
        self.position_ned = Vector3::from(packet.position_ned);
    }

    /// Linear acceleration in m/s² (body frame).
    pub fn accel_body(&self) -> &Vector3<f64> {
        &self.accel_body
    }

    /// Angular rate in rad/s (body frame).
    pub fn gyro(&self) -> &Vector3<f64> {
        &self.gyro
    }

    /// Body-to-earth rotation matrix.
    pub fn dcm(&self) -> &Matrix3<f64> {
        &self.dcm
    }

    /// Velocity in m/s (NED).
    pub fn velocity_ned(&self) -> &Vector3<f64> {
        &self.velocity_ned
    }

    /// Position in meters relative to home (NED).
    pub fn position_ned(&self) -> &Vector3<f64> {
        &self.position_ned
    }

    /// Simulator timestamp of the last accepted packet, in seconds.
    pub fn last_timestamp(&self) -> f64 {
        self.clock.last_timestamp()
    }

    /// Accumulated simulated time in microseconds.
    pub fn time_now_us(&self) -> u64 {
        self.clock.time_now_us()
    }

    /// Velocity rotated into the body frame.
    pub fn velocity_body(&self) -> Vector3<f64> {
        self.dcm.transpose() * self.velocity_ned
    }

    /// Geographic position of the vehicle, offsetting `home` by the NED
    /// position on a locally flat earth.
    pub fn geodetic(&self, home: &GeoPosition) -> GeoPosition {
        let north = self.position_ned.x;
        let east = self.position_ned.y;
        let lat_rad = home.lat_deg.to_radians();

        let dlat = (north / EARTH_RADIUS_M).to_degrees();
        let dlon = (east / (EARTH_RADIUS_M * lat_rad.cos())).to_degrees();

        GeoPosition {
            lat_deg: home.lat_deg + dlat,
            lon_deg: wrap_longitude(home.lon_deg + dlon),
            alt_m: home.alt_m - self.position_ned.z,
        }
    }

    /// Sensor view of the current state for the autopilot's drivers.
    pub fn to_sensor_data(&self, vehicle_id: VehicleId, home: &GeoPosition) -> SensorData {
        let position = self.geodetic(home);
        let vn = self.velocity_ned.x;
        let ve = self.velocity_ned.y;
        let course = ve.atan2(vn).to_degrees().rem_euclid(360.0);

        SensorData {
            timestamp_us: self.time_now_us(),
            vehicle_id,
            imu: Some(ImuData {
                accel_mss: to_f32(&self.accel_body),
                gyro_rads: to_f32(&self.gyro),
            }),
            gps: Some(GpsData {
                lat_deg: position.lat_deg,
                lon_deg: position.lon_deg,
                alt_m: position.alt_m as f32,
                speed_ms: vn.hypot(ve) as f32,
                course_deg: course as f32,
                velocity_down_ms: self.velocity_ned.z as f32,
            }),
        }
    }
}

fn to_f32(v: &Vector3<f64>) -> [f32; 3] {
    [v.x as f32, v.y as f32, v.z as f32]
}

fn wrap_longitude(lon_deg: f64) -> f64 {
    (lon_deg + 180.0).rem_euclid(360.0) - 180.0
}
