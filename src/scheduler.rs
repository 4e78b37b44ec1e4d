use crate::config::{BlockSet, SimulatorConfig};
use crate::protocol::{
    encode_altitude, encode_fms_rtc, encode_gps_channel_status, encode_gps_status,
    encode_gps_time_mark, encode_iof_control, encode_magvar, encode_scalar, encode_taws,
    encode_traffic, encode_vor_id, AltitudeKind, IofCommand, Packet, ScalarKind, TawsAnnunciation,
};
use crate::transport::{PacketSink, TransportError, TransportResult};
use chrono::{DateTime, Utc};
use heapless::Vec;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

/// Base cadence of the run loop.
pub const BASE_TICK: Duration = Duration::from_millis(50);

/// Subtracted from every due time so channels fire at or slightly before
/// their nominal time instead of drifting late.
pub const TIME_EPSILON: Duration = Duration::from_millis(10);

pub const MAX_PACKETS_PER_CHANNEL: usize = 8;

pub type PacketBatch = Vec<Packet, MAX_PACKETS_PER_CHANNEL>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelId {
    Control,
    Gps,
    Adc,
    Ahrs,
    FmsRtc,
}

impl ChannelId {
    /// Evaluation order within one tick.
    pub const ALL: [ChannelId; 5] = [
        ChannelId::Control,
        ChannelId::Gps,
        ChannelId::Adc,
        ChannelId::Ahrs,
        ChannelId::FmsRtc,
    ];

    pub fn start_offset(self) -> Duration {
        match self {
            ChannelId::Control => Duration::ZERO,
            ChannelId::Gps => Duration::from_millis(50),
            ChannelId::Adc => Duration::from_millis(100),
            ChannelId::Ahrs => Duration::from_millis(150),
            ChannelId::FmsRtc => Duration::from_millis(200),
        }
    }

    pub fn interval(self) -> Duration {
        match self {
            ChannelId::Control => Duration::from_secs(1),
            ChannelId::Gps | ChannelId::Adc | ChannelId::Ahrs => Duration::from_millis(200),
            ChannelId::FmsRtc => Duration::from_millis(500),
        }
    }
}

/// One independently paced stream of packets.
#[derive(Debug, Clone)]
pub struct Channel {
    id: ChannelId,
    interval: Duration,
    next_due: Duration,
}

impl Channel {
    fn new(id: ChannelId) -> Self {
        Self {
            id,
            interval: id.interval(),
            // Control would start at -epsilon; time since start cannot go negative
            next_due: id.start_offset().saturating_sub(TIME_EPSILON),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn next_due(&self) -> Duration {
        self.next_due
    }

    pub fn is_due(&self, now: Duration) -> bool {
        now >= self.next_due
    }

    fn advance(&mut self, now: Duration) {
        self.next_due = (now + self.interval).saturating_sub(TIME_EPSILON);
    }
}

/// Turns the configuration into the packets each channel carries.
#[derive(Debug, Clone, Copy)]
pub struct SensorFeed<'a> {
    config: &'a SimulatorConfig,
    blocks: BlockSet,
}

impl<'a> SensorFeed<'a> {
    pub fn new(config: &'a SimulatorConfig) -> Self {
        Self {
            config,
            blocks: config.block_set(),
        }
    }

    pub fn packets(&self, channel: ChannelId, wall_clock: &DateTime<Utc>) -> PacketBatch {
        let config = self.config;
        let mut batch = PacketBatch::new();
        let mut add = |packet: Packet| {
            let pushed = batch.push(packet);
            debug_assert!(pushed.is_ok(), "too many packets for {:?}", channel);
        };

        match channel {
            ChannelId::Control => {
                add(encode_iof_control(IofCommand::Block, &self.blocks));
                add(encode_gps_channel_status());
                if let Some(magvar) = config.magvar_deg {
                    add(encode_magvar(magvar));
                }
                if let Some(ias) = config.ias_kts {
                    add(encode_scalar(ScalarKind::IndicatedAirspeed, ias));
                }
            }
            ChannelId::Gps => {
                add(encode_gps_time_mark(&config.position, wall_clock));
                add(encode_gps_status());
            }
            ChannelId::Adc => {
                match config.baro_uncorr_alt_ft {
                    Some(altitude) => add(encode_altitude(AltitudeKind::A429Uncorrected, altitude)),
                    None => add(encode_altitude(AltitudeKind::A429Corrected, config.baro_corr_alt_ft)),
                }
                add(encode_scalar(ScalarKind::TrueAirspeed, config.true_airspeed_kts));
                if let Some(altitude) = config.shadin_uncorr_alt_ft {
                    add(encode_altitude(AltitudeKind::ShadinUncorrected, altitude));
                }
                if let Some(mode) = &config.traffic {
                    add(encode_traffic(mode, config.intruder));
                }
                if let Some(popup) = config.taws_popup {
                    add(encode_taws(popup.into()));
                }
            }
            ChannelId::Ahrs => {
                if let Some(ident) = &config.vor_ident {
                    add(encode_vor_id(ident.as_str()));
                }
                add(encode_scalar(ScalarKind::MagneticHeading, config.mag_heading_deg));
                if let Some(heading) = config.true_heading_deg {
                    add(encode_scalar(ScalarKind::TrueHeading, heading));
                }
            }
            ChannelId::FmsRtc => {
                if let Some(clock) = &config.fms_clock {
                    add(encode_fms_rtc(clock));
                }
            }
        }
        batch
    }

    /// Packets that hand the labels back to the unit: unblock, then the
    /// TAWS inhibit clear if a popup was streamed.
    pub fn cleanup_packets(&self) -> PacketBatch {
        let mut batch = PacketBatch::new();
        let _ = batch.push(encode_iof_control(IofCommand::Unblock, &self.blocks));
        if self.config.taws_popup.is_some() {
            let _ = batch.push(encode_taws(TawsAnnunciation::ClearInhibit));
        }
        batch
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub control_fires: u32,
    pub gps_fires: u32,
    pub adc_fires: u32,
    pub ahrs_fires: u32,
    pub fms_rtc_fires: u32,
    pub packets_sent: u64,
    pub transient_failures: u64,
}

impl SchedulerStats {
    pub fn fires(&self, channel: ChannelId) -> u32 {
        match channel {
            ChannelId::Control => self.control_fires,
            ChannelId::Gps => self.gps_fires,
            ChannelId::Adc => self.adc_fires,
            ChannelId::Ahrs => self.ahrs_fires,
            ChannelId::FmsRtc => self.fms_rtc_fires,
        }
    }

    fn record_fire(&mut self, channel: ChannelId) {
        let counter = match channel {
            ChannelId::Control => &mut self.control_fires,
            ChannelId::Gps => &mut self.gps_fires,
            ChannelId::Adc => &mut self.adc_fires,
            ChannelId::Ahrs => &mut self.ahrs_fires,
            ChannelId::FmsRtc => &mut self.fms_rtc_fires,
        };
        *counter += 1;
    }
}

#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub fired: Vec<ChannelId, 5>,
    pub sent: u32,
    pub transient_failures: u32,
}

/// Drives the five channels from a single clock.
#[derive(Debug)]
pub struct Scheduler<'a> {
    feed: SensorFeed<'a>,
    channels: [Channel; 5],
    stats: SchedulerStats,
}

impl<'a> Scheduler<'a> {
    pub fn new(config: &'a SimulatorConfig) -> Self {
        Self {
            feed: SensorFeed::new(config),
            channels: ChannelId::ALL.map(Channel::new),
            stats: SchedulerStats::default(),
        }
    }

    /// Fires every channel due at `now` (time since the scheduler started).
    ///
    /// Stops at the first fatal transport failure; the remaining packets of
    /// that tick are not sent.
    pub fn tick<S: PacketSink>(
        &mut self,
        now: Duration,
        wall_clock: &DateTime<Utc>,
        sink: &mut S,
    ) -> Result<TickReport, TransportError> {
        self.stats.ticks += 1;
        let mut report = TickReport::default();

        for channel in self.channels.iter_mut() {
            if !channel.is_due(now) {
                continue;
            }
            channel.advance(now);
            let id = channel.id();
            self.stats.record_fire(id);
            let _ = report.fired.push(id);
            trace!("{:?} fired at {:?}, next due {:?}", id, now, channel.next_due());

            for packet in self.feed.packets(id, wall_clock) {
                match sink.send(&packet) {
                    TransportResult::Sent => {
                        report.sent += 1;
                        self.stats.packets_sent += 1;
                    }
                    TransportResult::TransientFailure => {
                        report.transient_failures += 1;
                        self.stats.transient_failures += 1;
                    }
                    TransportResult::FatalFailure(e) => return Err(e),
                }
            }
        }

        if !report.fired.is_empty() {
            debug!("tick {:?}: fired {:?}, {} sent", now, report.fired, report.sent);
        }
        Ok(report)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FmsClock, TawsPopup, TrafficMode};
    use crate::labels::*;

    #[derive(Default)]
    struct CountingSink {
        labels: std::vec::Vec<u16>,
    }

    impl PacketSink for CountingSink {
        fn send(&mut self, packet: &[u8]) -> TransportResult {
            self.labels.push(u16::from_be_bytes([packet[0], packet[1]]));
            TransportResult::Sent
        }

        fn close(&mut self) {}
    }

    fn labels_for(config: &SimulatorConfig, channel: ChannelId) -> std::vec::Vec<u16> {
        SensorFeed::new(config)
            .packets(channel, &Utc::now())
            .iter()
            .map(|p| u16::from_be_bytes([p[0], p[1]]))
            .collect()
    }

    #[test]
    fn test_initial_due_times() {
        let config = SimulatorConfig::default();
        let scheduler = Scheduler::new(&config);
        let due: std::vec::Vec<u64> = scheduler
            .channels()
            .iter()
            .map(|c| c.next_due().as_millis() as u64)
            .collect();
        assert_eq!(due, vec![0, 40, 90, 140, 190]);
    }

    #[test]
    fn test_channel_advances_from_fire_time() {
        let mut channel = Channel::new(ChannelId::Gps);
        assert!(!channel.is_due(Duration::from_millis(39)));
        assert!(channel.is_due(Duration::from_millis(40)));
        channel.advance(Duration::from_millis(57));
        assert_eq!(channel.next_due(), Duration::from_millis(247));
    }

    #[test]
    fn test_control_fires_once_per_second() {
        let config = SimulatorConfig::default();
        let mut scheduler = Scheduler::new(&config);
        let mut sink = CountingSink::default();
        let wall = Utc::now();

        for tick in 0..40u64 {
            scheduler.tick(BASE_TICK * tick as u32, &wall, &mut sink).unwrap();
        }
        // t = 0, 1.0 s
        assert_eq!(scheduler.stats().fires(ChannelId::Control), 2);
    }

    #[test]
    fn test_default_channel_contents() {
        let config = SimulatorConfig::default();
        assert_eq!(
            labels_for(&config, ChannelId::Control),
            vec![IOF_MPC2_IOF_CONTROL, IOF_MPC2_GPS_CHANNEL_STATUS]
        );
        assert_eq!(
            labels_for(&config, ChannelId::Gps),
            vec![IOF_GPS_TIME_MARK_INFO, IOF_GPS_IOP_STATUS]
        );
        assert_eq!(
            labels_for(&config, ChannelId::Adc),
            vec![IOF_A429_BARO_CORR_ALTITUDE, IOF_A429_TRUE_AIR_SPEED]
        );
        assert_eq!(labels_for(&config, ChannelId::Ahrs), vec![IOF_AHRS_HEADING_ANGLE]);
        assert!(labels_for(&config, ChannelId::FmsRtc).is_empty());
    }

    #[test]
    fn test_fully_configured_channel_contents() {
        let mut config = SimulatorConfig::default();
        config.magvar_deg = Some(3.0);
        config.ias_kts = Some(120.0);
        config.baro_uncorr_alt_ft = Some(6000.0);
        config.shadin_uncorr_alt_ft = Some(6010.0);
        config.traffic = Some(TrafficMode::Standby);
        config.taws_popup = Some(TawsPopup::Caution);
        config.vor_ident = Some(crate::config::VorIdent::new("IABQ"));
        config.true_heading_deg = Some(270.0);
        config.fms_clock = Some(FmsClock::new(2022, 1, 2, 3, 4, 5).unwrap());

        assert_eq!(
            labels_for(&config, ChannelId::Control),
            vec![
                IOF_MPC2_IOF_CONTROL,
                IOF_MPC2_GPS_CHANNEL_STATUS,
                IOF_FMS_MAGNETIC_VARIATION,
                IOF_A429_COMPUTED_AIR_SPEED
            ]
        );
        assert_eq!(
            labels_for(&config, ChannelId::Adc),
            vec![
                IOF_A429_BARO_UNCORR_ALTITUDE,
                IOF_A429_TRUE_AIR_SPEED,
                IOF_SHADIN_ALTITUDE,
                IOF_TRAFFIC_LABELS_RX,
                IOF_ARINC_SPARE_RX3_ARR
            ]
        );
        assert_eq!(
            labels_for(&config, ChannelId::Ahrs),
            vec![IOF_MMDS_VOR_ILS_STATION_ID, IOF_AHRS_HEADING_ANGLE, IOF_AHRS_TRUE_HEADING]
        );
        assert_eq!(labels_for(&config, ChannelId::FmsRtc), vec![IOF_FMS_RTC_DATE_TIME]);
    }

    #[test]
    fn test_cleanup_packets() {
        let mut config = SimulatorConfig::default();
        assert_eq!(SensorFeed::new(&config).cleanup_packets().len(), 1);

        config.taws_popup = Some(TawsPopup::Warning);
        let batch = SensorFeed::new(&config).cleanup_packets();
        assert_eq!(batch.len(), 2);
        assert_eq!(&batch[0][2..15], b"unblock_write");
        assert_eq!(&batch[1][..], &encode_taws(TawsAnnunciation::ClearInhibit)[..]);
    }

    #[test]
    fn test_fatal_failure_stops_tick() {
        struct FailingSink;
        impl PacketSink for FailingSink {
            fn send(&mut self, _packet: &[u8]) -> TransportResult {
                TransportResult::FatalFailure(TransportError::Closed("test".into()))
            }
            fn close(&mut self) {}
        }

        let config = SimulatorConfig::default();
        let mut scheduler = Scheduler::new(&config);
        let result = scheduler.tick(Duration::ZERO, &Utc::now(), &mut FailingSink);
        assert_eq!(result.unwrap_err(), TransportError::Closed("test".into()));
        assert_eq!(scheduler.stats().packets_sent, 0);
    }
}
