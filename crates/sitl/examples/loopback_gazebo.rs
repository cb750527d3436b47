//! Runs the bridge against a toy physics engine on loopback.
//!
//! The fake engine integrates a point mass lifted by the mean motor speed,
//! answers every servo packet with an FDM packet at 400 Hz sim time, and
//! drops one reply in ten to exercise the resend path.
//!
//! Run with: `cargo run -p gazebo_sitl --example loopback_gazebo`

use std::net::SocketAddr;

use gazebo_sitl::trace::init_tracing;
use gazebo_sitl::wire::ServoPacket;
use gazebo_sitl::{ActuatorCommands, BridgeConfig, FdmPacket, GazeboBridge};
use tokio::net::UdpSocket;

const STEP_S: f64 = 0.0025;
const GRAVITY: f64 = 9.80665;
/// Upward acceleration at full throttle.
const MAX_THRUST: f64 = 2.0 * GRAVITY;

async fn run_engine(socket: UdpSocket) {
    let mut buf = [0u8; 256];
    let mut t = 0.0;
    let mut down = 0.0;
    let mut v_down = 0.0;
    let mut replies = 0u64;

    loop {
        let Ok((len, from)) = socket.recv_from(&mut buf).await else {
            return;
        };
        let Some(servo) = ServoPacket::from_bytes(&buf[..len]) else {
            continue;
        };

        let throttle = servo.motor_speed[..4].iter().map(|&s| f64::from(s)).sum::<f64>() / 4.0;
        let accel_down = GRAVITY - MAX_THRUST * throttle;
        let (accel_down, v, d) = if down >= 0.0 && accel_down > 0.0 {
            (0.0, 0.0, 0.0) // sitting on the ground
        } else {
            let v = v_down + accel_down * STEP_S;
            (accel_down, v, down + v * STEP_S)
        };
        v_down = v;
        down = d.min(0.0);
        t += STEP_S;

        replies += 1;
        if replies % 10 == 0 {
            continue;
        }

        let packet = FdmPacket {
            timestamp: t,
            linear_acceleration: [0.0, 0.0, accel_down - GRAVITY],
            angular_velocity: [0.0; 3],
            orientation: [1.0, 0.0, 0.0, 0.0],
            velocity_ned: [0.0, 0.0, v_down],
            position_ned: [0.0, 0.0, down],
        };
        if socket.send_to(&packet.to_bytes(), from).await.is_err() {
            return;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing(0);

    let engine = UdpSocket::bind("127.0.0.1:0").await.expect("bind engine");
    let engine_addr: SocketAddr = engine.local_addr().expect("engine addr");
    tokio::spawn(run_engine(engine));

    let config = BridgeConfig {
        bind_addr: [127, 0, 0, 1].into(),
        local_port: 0,
        peer_addr: engine_addr.ip(),
        peer_port: engine_addr.port(),
        recv_timeout_ms: 20,
        ..Default::default()
    };
    let mut bridge = GazeboBridge::connect(config).expect("bind bridge");

    println!("=== Gazebo bridge loopback example ===\n");

    for tick in 1..=2000u32 {
        // Climb for two seconds of sim time, then hover-ish.
        let pwm = if tick <= 800 { 1700 } else { 1500 };
        let report = bridge
            .step(&ActuatorCommands::uniform(pwm))
            .await
            .expect("step");

        if tick % 200 == 0 {
            let state = bridge.state();
            println!(
                "tick {tick:4}: t={:.3}s alt={:6.2}m vz={:6.2}m/s rate={:?} resends={}",
                state.time_now_us() as f64 / 1.0e6,
                -state.position_ned().z,
                -state.velocity_ned().z,
                report.frame_rate_hz().map(|r| r.round()),
                bridge.stats().resends,
            );
        }
    }

    let sensors = bridge.sensor_data();
    if let Some(gps) = sensors.gps {
        println!(
            "\nFinal GPS: lat={:.6} lon={:.6} alt={:.1}m",
            gps.lat_deg, gps.lon_deg, gps.alt_m
        );
    }
    println!("Stats: {:?}", bridge.stats());
}
