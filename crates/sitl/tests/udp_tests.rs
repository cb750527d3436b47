//! End-to-end exchanges over real loopback sockets, with a blocking std
//! socket standing in for the Gazebo plugin.

use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::Duration;

use gazebo_sitl::wire::{ServoPacket, SERVO_PACKET_LEN};
use gazebo_sitl::{ActuatorCommands, BridgeConfig, FdmPacket, GazeboBridge, SimulatorError};

fn fdm(timestamp: f64) -> FdmPacket {
    FdmPacket {
        timestamp,
        linear_acceleration: [0.0, 0.0, -9.81],
        orientation: [1.0, 0.0, 0.0, 0.0],
        position_ned: [1.0, 2.0, -3.0],
        ..Default::default()
    }
}

/// Fake plugin bound to an ephemeral loopback port.
fn fake_gazebo() -> (UdpSocket, SocketAddr) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let addr = socket.local_addr().unwrap();
    (socket, addr)
}

fn loopback_config(peer: SocketAddr, recv_timeout_ms: u64) -> BridgeConfig {
    BridgeConfig {
        bind_addr: [127, 0, 0, 1].into(),
        local_port: 0,
        peer_addr: peer.ip(),
        peer_port: peer.port(),
        recv_timeout_ms,
        ..Default::default()
    }
}

#[tokio::test]
async fn exchange_over_loopback() {
    let (gazebo, gazebo_addr) = fake_gazebo();
    let mut bridge = GazeboBridge::connect(loopback_config(gazebo_addr, 200)).unwrap();

    let peer = thread::spawn(move || {
        let mut buf = [0u8; 256];
        let (len, from) = gazebo.recv_from(&mut buf).unwrap();
        let servo = ServoPacket::from_bytes(&buf[..len]).unwrap();
        gazebo.send_to(&fdm(5.0025).to_bytes(), from).unwrap();
        (len, servo)
    });

    let report = bridge
        .step(&ActuatorCommands::uniform(1250))
        .await
        .unwrap();
    let (len, servo) = peer.join().unwrap();

    assert_eq!(len, SERVO_PACKET_LEN);
    assert!(servo.motor_speed.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    assert_eq!(report.resends, 0);
    assert_eq!(bridge.state().last_timestamp(), 5.0025);
    assert_eq!(bridge.state().position_ned().z, -3.0);
}

#[tokio::test]
async fn dropped_servo_packets_are_resent() {
    let (gazebo, gazebo_addr) = fake_gazebo();
    let mut bridge = GazeboBridge::connect(loopback_config(gazebo_addr, 200)).unwrap();

    // Ignore the first two servo packets, answer the third.
    let peer = thread::spawn(move || {
        let mut buf = [0u8; 256];
        for seen in 1..=3 {
            let (_, from) = gazebo.recv_from(&mut buf).unwrap();
            if seen == 3 {
                gazebo.send_to(&fdm(1.0).to_bytes(), from).unwrap();
            }
        }
    });

    let report = bridge.step(&ActuatorCommands::default()).await.unwrap();
    peer.join().unwrap();

    assert_eq!(report.resends, 2);
    assert_eq!(bridge.state().last_timestamp(), 1.0);
}

#[tokio::test]
async fn queued_duplicates_are_drained() {
    let (gazebo, gazebo_addr) = fake_gazebo();
    let mut bridge = GazeboBridge::connect(loopback_config(gazebo_addr, 200)).unwrap();
    let bridge_addr = bridge.channel().local_addr().unwrap();

    // Packets sent while the autopilot was paused.
    for timestamp in [2.000, 2.001, 2.002] {
        gazebo
            .send_to(&fdm(timestamp).to_bytes(), bridge_addr)
            .unwrap();
    }

    let report = bridge.step(&ActuatorCommands::default()).await.unwrap();

    assert_eq!(report.drained, 2);
    assert_eq!(bridge.state().last_timestamp(), 2.000);

    // Channel is empty afterwards: the next tick needs a fresh reply.
    let deadline = tokio::time::Instant::now() + Duration::from_millis(300);
    let result = bridge
        .step_until(&ActuatorCommands::default(), Some(deadline))
        .await;
    assert!(matches!(result, Err(SimulatorError::Timeout(_))));
}

#[tokio::test]
async fn second_bridge_on_exclusive_port_fails_to_bind() {
    let holder = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = holder.local_addr().unwrap().port();
    let config = BridgeConfig {
        bind_addr: [127, 0, 0, 1].into(),
        local_port: port,
        ..Default::default()
    };

    match GazeboBridge::connect(config) {
        Err(SimulatorError::BindFailed { addr, .. }) => assert_eq!(addr.port(), port),
        other => panic!("Expected BindFailed, got: {other:?}"),
    }
}
