//! Binary packet layouts for every label the simulator transmits.
//!
//! Every packet starts with its 16-bit label id. All multi-byte fields are
//! big-endian and padding bytes are zero. Encoders are pure: out-of-range
//! inputs are clamped, never rejected.

use core::fmt::Write as _;

use chrono::{DateTime, Datelike, Timelike, Utc};
use heapless::Vec;
use static_assertions::const_assert;

use crate::config::{BlockSet, FmsClock, GpsFix, IntruderType, TawsPopup, TrafficMode, MAX_COAST_AGE};
use crate::labels::*;
use crate::units::{deg_to_rad, ft_to_m, ftpm_to_mps, kts_to_mps};

pub const MAX_PACKET_SIZE: usize = 128;

pub type Packet = Vec<u8, MAX_PACKET_SIZE>;

pub const SCALAR_PACKET_LEN: usize = 14;
pub const A429_ALTITUDE_PACKET_LEN: usize = 18;
pub const SHADIN_ALTITUDE_PACKET_LEN: usize = 22;
pub const MAGVAR_PACKET_LEN: usize = 6;
pub const GPS_TIME_MARK_PACKET_LEN: usize = 42;
pub const GPS_STATUS_PACKET_LEN: usize = 51;
pub const GPS_CHANNEL_STATUS_PACKET_LEN: usize = 65;
pub const FMS_RTC_PACKET_LEN: usize = 10;
pub const VOR_ID_PACKET_LEN: usize = 6;
pub const TRAFFIC_BASIC_PACKET_LEN: usize = 26;
pub const TRAFFIC_DUPLICATE_PACKET_LEN: usize = 38;
pub const TAWS_PACKET_LEN: usize = 6;

const_assert!(GPS_CHANNEL_STATUS_PACKET_LEN <= MAX_PACKET_SIZE);
const_assert!(GPS_STATUS_PACKET_LEN <= MAX_PACKET_SIZE);
const_assert!(TRAFFIC_DUPLICATE_PACKET_LEN <= MAX_PACKET_SIZE);

// ARINC 429 framing words for the traffic label block
const ARINC_RTS_5_COUNT: u32 = 0x1200_05EF;
const ARINC_ETX_5_COUNT: u32 = 0x0300_05EF;
const ARINC_RTS_8_COUNT: u32 = 0x1200_08EF;
const ARINC_ETX_8_COUNT: u32 = 0x0300_08EF;
const INTRUDER_RANGE: u32 = 0x6280_8058;
const INTRUDER_ALTITUDE: u32 = 0x6290_8059;
const INTRUDER_BEARING: u32 = 0x6400_005A;
const INTRUDER_TYPE_SHIFT: u32 = 15;

// Discrete annunciation words (labels 016, 274 and 350)
pub const TRAFFIC_COMPUTER_UNIT_WORD: u32 = 0x0000_00E8 | 0x0000_0200;
pub const TRAFFIC_UNAVAILABLE_WORD: u32 = 0x0000_00BC;
pub const TRAFFIC_STANDBY_WORD: u32 = 0x0100_00BC;
pub const TRAFFIC_OPERATING_WORD: u32 = 0x8800_00BC;
pub const TRAFFIC_COAST_WORD: u32 = 0x0200_00BC;
pub const TRAFFIC_TEST_WORD: u32 = 0x4100_000E;
const COAST_AGE_SHIFT: u32 = 8;

const TAWS_PULL_UP_WORD: u32 = 0x0000_10BC;
const TAWS_GND_PROX_WORD: u32 = 0x0000_08BC;
const TAWS_BLANK_WORD: u32 = 0x0000_00BC;

const VALID: u8 = 1;

/// Big-endian writer over a bounded packet buffer.
#[derive(Debug)]
pub struct PacketWriter {
    buf: Packet,
}

impl PacketWriter {
    pub fn new(label: u16) -> Self {
        Self { buf: Vec::new() }.u16(label)
    }

    fn put(mut self, bytes: &[u8]) -> Self {
        let pushed = self.buf.extend_from_slice(bytes);
        debug_assert!(pushed.is_ok(), "packet exceeds {} bytes", MAX_PACKET_SIZE);
        self
    }

    pub fn u8(self, value: u8) -> Self {
        self.put(&[value])
    }

    pub fn u16(self, value: u16) -> Self {
        self.put(&value.to_be_bytes())
    }

    pub fn u32(self, value: u32) -> Self {
        self.put(&value.to_be_bytes())
    }

    pub fn f32(self, value: f32) -> Self {
        self.put(&value.to_be_bytes())
    }

    pub fn f64(self, value: f64) -> Self {
        self.put(&value.to_be_bytes())
    }

    pub fn pad(self, count: usize) -> Self {
        self.put(&[0u8; 16][..count.min(16)])
    }

    pub fn text(self, text: &str) -> Self {
        self.put(text.as_bytes())
    }

    pub fn decimal(self, value: u16) -> Self {
        let mut digits: heapless::String<5> = heapless::String::new();
        let _ = write!(digits, "{}", value);
        self.put(digits.as_bytes())
    }

    pub fn finish(self) -> Packet {
        self.buf
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IofCommand {
    Block,
    Unblock,
}

impl IofCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            IofCommand::Block => "block_write",
            IofCommand::Unblock => "unblock_write",
        }
    }
}

/// Block or unblock on-board writes to the simulated labels.
///
/// The always-blocked ids are sent as `\0a-b\0c\0d`, followed by one
/// `\0id` entry per active optional field.
pub fn encode_iof_control(command: IofCommand, blocks: &BlockSet) -> Packet {
    let [first, second, third, fourth] = ALWAYS_BLOCKED;
    let mut writer = PacketWriter::new(IOF_MPC2_IOF_CONTROL)
        .text(command.as_str())
        .u8(0)
        .decimal(first)
        .text("-")
        .decimal(second)
        .u8(0)
        .decimal(third)
        .u8(0)
        .decimal(fourth);

    let optional = [
        (blocks.magvar, IOF_FMS_MAGNETIC_VARIATION),
        (blocks.ias, IOF_A429_COMPUTED_AIR_SPEED),
        (blocks.true_heading, IOF_AHRS_TRUE_HEADING),
        (blocks.time, IOF_FMS_RTC_DATE_TIME),
        (blocks.vor_id, IOF_MMDS_VOR_ILS_STATION_ID),
    ];
    for (active, label) in optional {
        if active {
            writer = writer.u8(0).decimal(label);
        }
    }
    writer.finish()
}

/// GPS position, velocity and the current UTC date/time.
pub fn encode_gps_time_mark(fix: &GpsFix, wall_clock: &DateTime<Utc>) -> Packet {
    let year = u16::try_from(wall_clock.year()).unwrap_or(0);
    PacketWriter::new(IOF_GPS_TIME_MARK_INFO)
        .f64(deg_to_rad(fix.latitude_deg))
        .f64(deg_to_rad(fix.longitude_deg))
        .f32(ft_to_m(fix.altitude_ft) as f32)
        .f32(fix.ground_track_deg as f32)
        .f32(kts_to_mps(fix.ground_speed_kts) as f32)
        .f32(ftpm_to_mps(fix.vertical_speed_fpm) as f32)
        .u16(year)
        .u8(wall_clock.month() as u8)
        .u8(wall_clock.day() as u8)
        .u8(wall_clock.hour() as u8)
        .u8(wall_clock.minute() as u8)
        .u8(wall_clock.second() as u8)
        .pad(1)
        .finish()
}

/// GPS IOP status keep-alive, constant regardless of configuration.
pub fn encode_gps_status() -> Packet {
    const MODE: u8 = 0x02;
    const DOP: f32 = 1.0;
    const PROTECTION_LIMIT: f32 = 100.0;
    const POSITION_ERROR: f32 = 555.0;

    PacketWriter::new(IOF_GPS_IOP_STATUS)
        .pad(1)
        .u8(MODE)
        .pad(7)
        .f32(DOP)
        .f32(PROTECTION_LIMIT)
        .f32(POSITION_ERROR)
        .f32(DOP)
        .f32(PROTECTION_LIMIT)
        .f32(POSITION_ERROR)
        .pad(16)
        .finish()
}

/// GPS receiver channel status keep-alive: six channels tracking.
pub fn encode_gps_channel_status() -> Packet {
    const HEADER: u8 = 42;
    const CHANNELS: u8 = 6;
    const TRACKING: u8 = 0x04;

    let mut writer = PacketWriter::new(IOF_MPC2_GPS_CHANNEL_STATUS)
        .pad(1)
        .u8(HEADER)
        .u8(CHANNELS);
    for channel in 1..=CHANNELS {
        writer = writer.u8(channel).pad(1).u8(TRACKING).pad(7);
    }
    writer.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AltitudeKind {
    ShadinUncorrected,
    A429Uncorrected,
    A429Corrected,
}

pub fn encode_altitude(kind: AltitudeKind, altitude_ft: f32) -> Packet {
    match kind {
        // second data slot is present but marked invalid
        AltitudeKind::ShadinUncorrected => PacketWriter::new(IOF_SHADIN_ALTITUDE)
            .u8(VALID)
            .pad(3)
            .f32(altitude_ft)
            .u8(0)
            .pad(3)
            .f32(0.0)
            .pad(4)
            .finish(),
        AltitudeKind::A429Uncorrected | AltitudeKind::A429Corrected => {
            let label = if kind == AltitudeKind::A429Uncorrected {
                IOF_A429_BARO_UNCORR_ALTITUDE
            } else {
                IOF_A429_BARO_CORR_ALTITUDE
            };
            PacketWriter::new(label)
                .u8(VALID)
                .pad(3)
                .f32(altitude_ft)
                .pad(8)
                .finish()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    TrueAirspeed,
    MagneticHeading,
    TrueHeading,
    IndicatedAirspeed,
}

impl ScalarKind {
    pub fn label(self) -> u16 {
        match self {
            ScalarKind::TrueAirspeed => IOF_A429_TRUE_AIR_SPEED,
            ScalarKind::MagneticHeading => IOF_AHRS_HEADING_ANGLE,
            ScalarKind::TrueHeading => IOF_AHRS_TRUE_HEADING,
            ScalarKind::IndicatedAirspeed => IOF_A429_COMPUTED_AIR_SPEED,
        }
    }
}

pub fn encode_scalar(kind: ScalarKind, value: f32) -> Packet {
    PacketWriter::new(kind.label())
        .u8(VALID)
        .pad(3)
        .f32(value)
        .pad(4)
        .finish()
}

pub fn encode_magvar(magvar_deg: f32) -> Packet {
    PacketWriter::new(IOF_FMS_MAGNETIC_VARIATION)
        .f32(magvar_deg)
        .finish()
}

pub fn encode_fms_rtc(clock: &FmsClock) -> Packet {
    PacketWriter::new(IOF_FMS_RTC_DATE_TIME)
        .u8(clock.second)
        .u8(clock.minute)
        .u8(clock.hour)
        .u8(clock.day)
        .u8(clock.month)
        .u8(1)
        .u16(clock.year)
        .finish()
}

/// Station id truncated/null-filled to four bytes, sent in reverse order.
pub fn encode_vor_id(ident: &str) -> Packet {
    let mut chars = [0u8; 4];
    for (slot, byte) in chars.iter_mut().zip(ident.bytes()) {
        *slot = byte;
    }
    chars.reverse();
    PacketWriter::new(IOF_MMDS_VOR_ILS_STATION_ID)
        .put(&chars)
        .finish()
}

/// Bearing word with the intruder type clamped to [0, 3] in bits 15-16.
pub fn intruder_bearing(intruder_type: i32) -> u32 {
    let clamped = intruder_type.clamp(0, 3) as u32;
    INTRUDER_BEARING | (clamped << INTRUDER_TYPE_SHIFT)
}

/// One intruder framed by the 5-count RTS/ETX words.
pub fn encode_traffic_basic(discrete_label: u32, intruder_type: i32) -> Packet {
    PacketWriter::new(IOF_TRAFFIC_LABELS_RX)
        .u32(discrete_label)
        .u32(ARINC_RTS_5_COUNT)
        .u32(INTRUDER_RANGE)
        .u32(INTRUDER_ALTITUDE)
        .u32(intruder_bearing(intruder_type))
        .u32(ARINC_ETX_5_COUNT)
        .finish()
}

/// Two identical no-threat intruders under a normal-operation annunciation.
pub fn encode_traffic_duplicate() -> Packet {
    let bearing = intruder_bearing(0);
    PacketWriter::new(IOF_TRAFFIC_LABELS_RX)
        .u32(TRAFFIC_OPERATING_WORD)
        .u32(ARINC_RTS_8_COUNT)
        .u32(INTRUDER_RANGE)
        .u32(INTRUDER_ALTITUDE)
        .u32(bearing)
        .u32(INTRUDER_RANGE)
        .u32(INTRUDER_ALTITUDE)
        .u32(bearing)
        .u32(ARINC_ETX_8_COUNT)
        .finish()
}

pub fn encode_traffic_computer_unit() -> Packet {
    encode_traffic_basic(TRAFFIC_COMPUTER_UNIT_WORD, 0)
}

pub fn encode_traffic_unavailable(intruder_type: i32) -> Packet {
    encode_traffic_basic(TRAFFIC_UNAVAILABLE_WORD, intruder_type)
}

pub fn encode_traffic_standby(intruder_type: i32) -> Packet {
    encode_traffic_basic(TRAFFIC_STANDBY_WORD, intruder_type)
}

pub fn encode_traffic_operating(intruder_type: i32) -> Packet {
    encode_traffic_basic(TRAFFIC_OPERATING_WORD, intruder_type)
}

/// Discrete word for a coast annunciation; age is clamped to 13 bits at bit 8.
pub fn coast_discrete(age: i32) -> u32 {
    let age = age.clamp(0, MAX_COAST_AGE) as u32;
    TRAFFIC_COAST_WORD | (age << COAST_AGE_SHIFT)
}

pub fn encode_traffic_coast(age: i32, intruder_type: i32) -> Packet {
    encode_traffic_basic(coast_discrete(age), intruder_type)
}

pub fn encode_traffic_test(intruder_type: i32) -> Packet {
    encode_traffic_basic(TRAFFIC_TEST_WORD, intruder_type)
}

pub fn encode_traffic(mode: &TrafficMode, intruder: IntruderType) -> Packet {
    let intruder_type = intruder.code();
    match *mode {
        TrafficMode::Standby => encode_traffic_standby(intruder_type),
        TrafficMode::Unavailable => encode_traffic_unavailable(intruder_type),
        TrafficMode::Coast { age } => encode_traffic_coast(age, intruder_type),
        TrafficMode::Test => encode_traffic_test(intruder_type),
        TrafficMode::Normal => encode_traffic_operating(intruder_type),
        TrafficMode::DuplicateIntruders => encode_traffic_duplicate(),
        TrafficMode::ComputerUnitFailure => encode_traffic_computer_unit(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TawsAnnunciation {
    Warning,
    Caution,
    /// Re-arms the popup inhibit so another popup can be shown.
    ClearInhibit,
}

impl From<TawsPopup> for TawsAnnunciation {
    fn from(popup: TawsPopup) -> Self {
        match popup {
            TawsPopup::Warning => TawsAnnunciation::Warning,
            TawsPopup::Caution => TawsAnnunciation::Caution,
        }
    }
}

pub fn encode_taws(kind: TawsAnnunciation) -> Packet {
    let word = match kind {
        TawsAnnunciation::Warning => TAWS_PULL_UP_WORD,
        TawsAnnunciation::Caution => TAWS_GND_PROX_WORD,
        TawsAnnunciation::ClearInhibit => TAWS_BLANK_WORD,
    };
    PacketWriter::new(IOF_ARINC_SPARE_RX3_ARR).u32(word).finish()
}
