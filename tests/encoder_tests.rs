use sensorbus::config::{BlockSet, IntruderType, TrafficMode};
use sensorbus::labels::*;
use sensorbus::protocol::*;

fn label_of(packet: &[u8]) -> u16 {
    u16::from_be_bytes([packet[0], packet[1]])
}

fn word_at(packet: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        packet[offset],
        packet[offset + 1],
        packet[offset + 2],
        packet[offset + 3],
    ])
}

#[test]
fn test_scalar_layout_for_every_kind() {
    let cases = [
        (ScalarKind::TrueAirspeed, IOF_A429_TRUE_AIR_SPEED),
        (ScalarKind::MagneticHeading, IOF_AHRS_HEADING_ANGLE),
        (ScalarKind::TrueHeading, IOF_AHRS_TRUE_HEADING),
        (ScalarKind::IndicatedAirspeed, IOF_A429_COMPUTED_AIR_SPEED),
    ];

    for (kind, label) in cases {
        for value in [0.0f32, 135.5, -12.25, 359.9] {
            let packet = encode_scalar(kind, value);
            let mut expected = Vec::new();
            expected.extend_from_slice(&label.to_be_bytes());
            expected.extend_from_slice(&[1, 0, 0, 0]);
            expected.extend_from_slice(&value.to_be_bytes());
            expected.extend_from_slice(&[0, 0, 0, 0]);
            assert_eq!(&packet[..], &expected[..], "{:?} {}", kind, value);
        }
    }
}

#[test]
fn test_a429_altitude_layout() {
    for (kind, label) in [
        (AltitudeKind::A429Uncorrected, IOF_A429_BARO_UNCORR_ALTITUDE),
        (AltitudeKind::A429Corrected, IOF_A429_BARO_CORR_ALTITUDE),
    ] {
        let packet = encode_altitude(kind, 5355.0);
        assert_eq!(packet.len(), A429_ALTITUDE_PACKET_LEN);
        assert_eq!(label_of(&packet), label);
        assert_eq!(&packet[2..6], &[1, 0, 0, 0]);
        assert_eq!(&packet[6..10], &5355.0f32.to_be_bytes());
        assert!(packet[10..].iter().all(|b| *b == 0));
    }
}

#[test]
fn test_encoders_are_pure() {
    let first = encode_altitude(AltitudeKind::A429Corrected, 1200.0);
    let _ = encode_altitude(AltitudeKind::A429Corrected, 9000.0);
    let _ = encode_scalar(ScalarKind::TrueAirspeed, 250.0);
    let again = encode_altitude(AltitudeKind::A429Corrected, 1200.0);
    assert_eq!(first, again);
}

#[test]
fn test_magvar_is_label_and_raw_float() {
    let packet = encode_magvar(2.5);
    assert_eq!(&packet[..], &[0x03, 0x25, 0x40, 0x20, 0x00, 0x00]);
}

#[test]
fn test_coast_age_clamping() {
    let cases = [(-5, 0u32), (0, 0), (8191, 8191), (9000, 8191)];
    for (age, expected) in cases {
        let packet = encode_traffic_coast(age, 0);
        let discrete = word_at(&packet, 2);
        assert_eq!((discrete >> 8) & 0x1FFF, expected, "age {}", age);
        assert_eq!(discrete & !(0x1FFF << 8), TRAFFIC_COAST_WORD);
    }
}

#[test]
fn test_intruder_type_clamping() {
    let bearing_offset = 2 + 4 * 4;
    let cases = [(-3, 0u32), (0, 0), (1, 1), (2, 2), (3, 3), (7, 3)];
    for (intruder, expected) in cases {
        let packet = encode_traffic_basic(TRAFFIC_STANDBY_WORD, intruder);
        let bearing = word_at(&packet, bearing_offset);
        assert_eq!((bearing >> 15) & 0x3, expected, "intruder {}", intruder);
        assert_eq!(bearing & !(0x3 << 15), 0x6400_005A);
    }
}

#[test]
fn test_basic_traffic_framing() {
    let packet = encode_traffic(&TrafficMode::Normal, IntruderType::TrafficAdvisory);
    assert_eq!(packet.len(), TRAFFIC_BASIC_PACKET_LEN);
    assert_eq!(label_of(&packet), IOF_TRAFFIC_LABELS_RX);
    let words: Vec<u32> = (0..6).map(|i| word_at(&packet, 2 + 4 * i)).collect();
    assert_eq!(
        words,
        vec![0x8800_00BC, 0x1200_05EF, 0x6280_8058, 0x6290_8059, 0x6400_805A, 0x0300_05EF]
    );
}

#[test]
fn test_duplicate_traffic_framing() {
    let packet = encode_traffic(&TrafficMode::DuplicateIntruders, IntruderType::ResolutionAdvisory);
    assert_eq!(packet.len(), TRAFFIC_DUPLICATE_PACKET_LEN);
    let words: Vec<u32> = (0..9).map(|i| word_at(&packet, 2 + 4 * i)).collect();
    assert_eq!(
        words,
        vec![
            0x8800_00BC,
            0x1200_08EF,
            0x6280_8058,
            0x6290_8059,
            0x6400_005A,
            0x6280_8058,
            0x6290_8059,
            0x6400_005A,
            0x0300_08EF
        ]
    );
}

#[test]
fn test_traffic_mode_discrete_words() {
    let discrete = |mode: TrafficMode| word_at(&encode_traffic(&mode, IntruderType::NoThreat), 2);
    assert_eq!(discrete(TrafficMode::ComputerUnitFailure), 0x0000_02E8);
    assert_eq!(discrete(TrafficMode::Unavailable), 0x0000_00BC);
    assert_eq!(discrete(TrafficMode::Standby), 0x0100_00BC);
    assert_eq!(discrete(TrafficMode::Normal), 0x8800_00BC);
    assert_eq!(discrete(TrafficMode::Coast { age: 13 }), 0x0200_0DBC);
    assert_eq!(discrete(TrafficMode::Test), 0x4100_000E);
}

#[test]
fn test_vor_id_is_reversed() {
    let full = encode_vor_id("ABCD");
    assert_eq!(&full[..], &[0x04, 0x3F, b'D', b'C', b'B', b'A']);

    let short = encode_vor_id("A");
    assert_eq!(&short[..], &[0x04, 0x3F, 0, 0, 0, b'A']);

    let long = encode_vor_id("ABCDEF");
    assert_eq!(&long[2..], &[b'D', b'C', b'B', b'A']);
}

#[test]
fn test_iof_control_block_and_unblock_differ_only_in_command() {
    let blocks = BlockSet {
        magvar: true,
        ..BlockSet::default()
    };
    let block = encode_iof_control(IofCommand::Block, &blocks);
    let unblock = encode_iof_control(IofCommand::Unblock, &blocks);

    assert!(block[2..].starts_with(b"block_write\0"));
    assert!(unblock[2..].starts_with(b"unblock_write\0"));
    assert_eq!(&block[2 + 11..], &unblock[2 + 13..]);
    assert!(block.ends_with(b"\x00805"));
}
