//! Servo output encoding.

use crate::types::ActuatorCommands;
use crate::wire::ServoPacket;

/// Raw servo value that maps to a motor speed of 0.0.
pub const PWM_ZERO: u16 = 1000;
/// Raw servo units per unit of normalized motor speed.
pub const PWM_SCALE: f32 = 1000.0;

/// Convert a raw servo value (nominally 1000 to 2000) to a motor speed.
///
/// No clamping: values outside the nominal range map outside [0, 1].
pub fn pwm_to_motor_speed(pwm: u16) -> f32 {
    (f32::from(pwm) - f32::from(PWM_ZERO)) / PWM_SCALE
}

/// Build the outbound packet for this tick's servo outputs.
pub fn encode_servos(commands: &ActuatorCommands) -> ServoPacket {
    let mut packet = ServoPacket::default();
    for (speed, &pwm) in packet.motor_speed.iter_mut().zip(commands.servos.iter()) {
        *speed = pwm_to_motor_speed(pwm);
    }
    packet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::SERVO_CHANNELS;

    #[test]
    fn test_motor_speed_endpoints() {
        assert_eq!(pwm_to_motor_speed(1000), 0.0);
        assert_eq!(pwm_to_motor_speed(1500), 0.5);
        assert_eq!(pwm_to_motor_speed(2000), 1.0);
    }

    #[test]
    fn test_out_of_range_is_not_clamped() {
        assert_eq!(pwm_to_motor_speed(0), -1.0);
        assert_eq!(pwm_to_motor_speed(3000), 2.0);
    }

    #[test]
    fn test_encode_matches_affine_map() {
        for pwm in (1000..=2000).step_by(50) {
            let commands = ActuatorCommands::uniform(pwm);
            let packet = encode_servos(&commands);
            let expected = (pwm as f32 - 1000.0) / 1000.0;
            for speed in packet.motor_speed {
                assert!((-1.0..=1.0).contains(&speed));
                assert!((speed - expected).abs() < f32::EPSILON);
            }
        }
    }

    #[test]
    fn test_encode_preserves_channel_order() {
        let mut commands = ActuatorCommands::default();
        for (i, pwm) in commands.servos.iter_mut().enumerate() {
            *pwm = 1000 + 50 * i as u16;
        }
        let packet = encode_servos(&commands);
        for i in 0..SERVO_CHANNELS {
            assert!((packet.motor_speed[i] - 0.05 * i as f32).abs() < 1e-6);
        }
    }
}
