//! IOF label identifiers understood by the flight-management unit.

pub const IOF_GPS_TIME_MARK_INFO: u16 = 1024;
pub const IOF_ARINC_SPARE_RX3_ARR: u16 = 1029;
pub const IOF_A429_ALTITUDE_RATE: u16 = 1065;
pub const IOF_GPS_IOP_STATUS: u16 = 10118;
pub const IOF_MPC2_GPS_CHANNEL_STATUS: u16 = 10113;
pub const IOF_FMS_MAGNETIC_VARIATION: u16 = 805;
pub const IOF_SHADIN_ALTITUDE: u16 = 1055;
pub const IOF_A429_BARO_UNCORR_ALTITUDE: u16 = 1057;
pub const IOF_A429_BARO_CORR_ALTITUDE: u16 = 1058;
pub const IOF_A429_TRUE_AIR_SPEED: u16 = 1060;
pub const IOF_A429_COMPUTED_AIR_SPEED: u16 = 1064;
pub const IOF_MMDS_VOR_ILS_STATION_ID: u16 = 1087;
pub const IOF_TRAFFIC_LABELS_RX: u16 = 1183;
pub const IOF_AHRS_HEADING_ANGLE: u16 = 1042;
pub const IOF_AHRS_TRUE_HEADING: u16 = 1044;
pub const IOF_FMS_RTC_DATE_TIME: u16 = 948;

// MPC1 (0xFFFF) is never addressed by the simulator
pub const IOF_MPC2_IOF_CONTROL: u16 = 0xFFFE;

/// Labels blocked on every control directive regardless of configuration.
/// The first two are sent as a `first-second` pair.
pub const ALWAYS_BLOCKED: [u16; 4] = [
    IOF_GPS_TIME_MARK_INFO,
    IOF_A429_ALTITUDE_RATE,
    IOF_GPS_IOP_STATUS,
    IOF_MPC2_GPS_CHANNEL_STATUS,
];
