use arrayvec::ArrayString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_HOST: &str = "192.168.28.32";
pub const DEFAULT_PORT: u16 = 3471;

// Coast age occupies 13 bits of the discrete word
pub const MAX_COAST_AGE: i32 = 8191;

const DEFAULT_LATITUDE_DEG: f64 = 35.0403;
const DEFAULT_LONGITUDE_DEG: f64 = -106.6092;
const DEFAULT_ALTITUDE_FT: f64 = 5355.0;
const DEFAULT_BARO_CORR_ALT_FT: f32 = 5355.0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("coast age must be in [0, 8191] (got {0})")]
    InvalidCoastAge(i32),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid FMS clock: {field} must be in [{min}, {max}] (got {value})")]
    InvalidClock {
        field: &'static str,
        min: u16,
        max: u16,
        value: u16,
    },
    #[error("destination host must not be empty")]
    EmptyHost,
    #[error("destination port must not be zero")]
    InvalidPort,
    #[error("unknown {kind} '{value}'")]
    UnknownChoice { kind: &'static str, value: String },
    #[error("invalid value '{value}' for --{option}")]
    InvalidValue { option: &'static str, value: String },
    #[error("malformed configuration file: {0}")]
    Malformed(String),
}

/// Threat classification of the simulated intruder, packed into the bearing word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntruderType {
    #[default]
    NoThreat,
    TrafficAdvisory,
    ResolutionAdvisory,
    ProximityAdvisory,
}

impl IntruderType {
    pub fn code(self) -> i32 {
        match self {
            IntruderType::NoThreat => 0,
            IntruderType::TrafficAdvisory => 1,
            IntruderType::ResolutionAdvisory => 2,
            IntruderType::ProximityAdvisory => 3,
        }
    }

    pub fn from_flag(flag: &str) -> Result<Self, ConfigError> {
        match flag {
            "nt" => Ok(IntruderType::NoThreat),
            "ta" => Ok(IntruderType::TrafficAdvisory),
            "ra" => Ok(IntruderType::ResolutionAdvisory),
            "pa" => Ok(IntruderType::ProximityAdvisory),
            other => Err(ConfigError::UnknownChoice {
                kind: "intruder type",
                value: other.to_string(),
            }),
        }
    }
}

/// Traffic annunciation the simulator streams on the ADC channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrafficMode {
    Standby,
    Unavailable,
    /// Ages above 12 turn the coast annunciation into "removed".
    Coast { age: i32 },
    Test,
    Normal,
    DuplicateIntruders,
    ComputerUnitFailure,
}

impl TrafficMode {
    pub fn from_flag(flag: &str, coast_age: i32) -> Result<Self, ConfigError> {
        match flag {
            "s" => Ok(TrafficMode::Standby),
            "u" => Ok(TrafficMode::Unavailable),
            "c" => Ok(TrafficMode::Coast { age: coast_age }),
            "t" => Ok(TrafficMode::Test),
            "n" => Ok(TrafficMode::Normal),
            "d" => Ok(TrafficMode::DuplicateIntruders),
            "f" => Ok(TrafficMode::ComputerUnitFailure),
            other => Err(ConfigError::UnknownChoice {
                kind: "traffic type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TawsPopup {
    Warning,
    Caution,
}

impl TawsPopup {
    pub fn from_flag(flag: &str) -> Result<Self, ConfigError> {
        match flag {
            "w" => Ok(TawsPopup::Warning),
            "c" => Ok(TawsPopup::Caution),
            other => Err(ConfigError::UnknownChoice {
                kind: "TAWS popup",
                value: other.to_string(),
            }),
        }
    }
}

/// Date and time the simulated FMS real-time clock reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FmsClock {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl FmsClock {
    /// Builds a clock from the operator's `year month day hour minute second` tuple.
    pub fn new(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<Self, ConfigError> {
        let clock = Self { year, month, day, hour, minute, second };
        clock.validate()?;
        Ok(clock)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("year", self.year, 2000, u16::MAX)?;
        check_range("month", u16::from(self.month), 1, 12)?;
        check_range("day", u16::from(self.day), 1, 31)?;
        check_range("hour", u16::from(self.hour), 0, 23)?;
        check_range("minute", u16::from(self.minute), 0, 59)?;
        check_range("second", u16::from(self.second), 0, 59)
    }
}

fn check_range(field: &'static str, value: u16, min: u16, max: u16) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::InvalidClock { field, min, max, value });
    }
    Ok(())
}

/// VOR/ILS station identifier, at most four bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct VorIdent(ArrayString<4>);

impl VorIdent {
    /// Keeps as many leading characters as fit in four bytes.
    pub fn new(ident: &str) -> Self {
        let mut truncated = ArrayString::new();
        for c in ident.chars() {
            if truncated.try_push(c).is_err() {
                break;
            }
        }
        Self(truncated)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for VorIdent {
    fn from(ident: String) -> Self {
        Self::new(&ident)
    }
}

impl From<VorIdent> for String {
    fn from(ident: VorIdent) -> Self {
        ident.0.to_string()
    }
}

/// Ownship GPS solution reported on the time-mark packet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsFix {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_ft: f64,
    pub ground_track_deg: f64,
    pub ground_speed_kts: f64,
    pub vertical_speed_fpm: f64,
}

impl Default for GpsFix {
    fn default() -> Self {
        Self {
            latitude_deg: DEFAULT_LATITUDE_DEG,
            longitude_deg: DEFAULT_LONGITUDE_DEG,
            altitude_ft: DEFAULT_ALTITUDE_FT,
            ground_track_deg: 0.0,
            ground_speed_kts: 0.0,
            vertical_speed_fpm: 0.0,
        }
    }
}

/// Labels whose on-board writers are blocked so simulated values win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockSet {
    pub magvar: bool,
    pub ias: bool,
    pub true_heading: bool,
    pub time: bool,
    pub vor_id: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub host: String,
    pub port: u16,
    pub position: GpsFix,
    pub baro_corr_alt_ft: f32,
    /// Replaces the corrected altitude when present.
    pub baro_uncorr_alt_ft: Option<f32>,
    pub shadin_uncorr_alt_ft: Option<f32>,
    pub true_airspeed_kts: f32,
    pub mag_heading_deg: f32,
    pub true_heading_deg: Option<f32>,
    pub magvar_deg: Option<f32>,
    pub ias_kts: Option<f32>,
    pub fms_clock: Option<FmsClock>,
    pub vor_ident: Option<VorIdent>,
    pub traffic: Option<TrafficMode>,
    pub intruder: IntruderType,
    pub taws_popup: Option<TawsPopup>,
    pub timeout_secs: Option<u64>,
    pub cleanup: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            position: GpsFix::default(),
            baro_corr_alt_ft: DEFAULT_BARO_CORR_ALT_FT,
            baro_uncorr_alt_ft: None,
            shadin_uncorr_alt_ft: None,
            true_airspeed_kts: 0.0,
            mag_heading_deg: 0.0,
            true_heading_deg: None,
            magvar_deg: None,
            ias_kts: None,
            fms_clock: None,
            vor_ident: None,
            traffic: None,
            intruder: IntruderType::NoThreat,
            taws_popup: None,
            timeout_secs: None,
            cleanup: true,
        }
    }
}

impl SimulatorConfig {
    /// Loads a JSON configuration; omitted fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if let Some(TrafficMode::Coast { age }) = self.traffic {
            if !(0..=MAX_COAST_AGE).contains(&age) {
                return Err(ConfigError::InvalidCoastAge(age));
            }
        }
        if let Some(clock) = &self.fms_clock {
            clock.validate()?;
        }
        Ok(())
    }

    pub fn destination(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn block_set(&self) -> BlockSet {
        BlockSet {
            magvar: self.magvar_deg.is_some(),
            ias: self.ias_kts.is_some(),
            true_heading: self.true_heading_deg.is_some(),
            time: self.fms_clock.is_some(),
            vor_id: self.vor_ident.is_some(),
        }
    }
}

/// Parses a timeout in whole seconds.
pub fn parse_timeout(value: &str) -> Result<u64, ConfigError> {
    let seconds: i64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidTimeout(value.to_string()))?;
    if seconds < 0 {
        return Err(ConfigError::InvalidTimeout(format!(
            "must be greater than or equal to 0 (got {})",
            seconds
        )));
    }
    Ok(seconds as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.destination(), "192.168.28.32:3471");
        assert!(config.cleanup);
        assert_eq!(config.block_set(), BlockSet::default());
    }

    #[test]
    fn test_coast_age_bounds() {
        let mut config = SimulatorConfig::default();
        config.traffic = Some(TrafficMode::Coast { age: 8191 });
        assert!(config.validate().is_ok());

        config.traffic = Some(TrafficMode::Coast { age: 8192 });
        assert_eq!(config.validate(), Err(ConfigError::InvalidCoastAge(8192)));

        config.traffic = Some(TrafficMode::Coast { age: -1 });
        assert_eq!(config.validate(), Err(ConfigError::InvalidCoastAge(-1)));
    }

    #[test]
    fn test_clock_validation() {
        assert!(FmsClock::new(2024, 2, 29, 23, 59, 59).is_ok());
        assert!(matches!(
            FmsClock::new(1999, 1, 1, 0, 0, 0),
            Err(ConfigError::InvalidClock { field: "year", .. })
        ));
        assert!(matches!(
            FmsClock::new(2020, 13, 1, 0, 0, 0),
            Err(ConfigError::InvalidClock { field: "month", .. })
        ));
        assert!(matches!(
            FmsClock::new(2020, 1, 0, 0, 0, 0),
            Err(ConfigError::InvalidClock { field: "day", .. })
        ));
        assert!(matches!(
            FmsClock::new(2020, 1, 1, 24, 0, 0),
            Err(ConfigError::InvalidClock { field: "hour", .. })
        ));
        assert!(matches!(
            FmsClock::new(2020, 1, 1, 0, 60, 0),
            Err(ConfigError::InvalidClock { field: "minute", .. })
        ));
    }

    #[test]
    fn test_timeout_parsing() {
        assert_eq!(parse_timeout("30"), Ok(30));
        assert_eq!(parse_timeout("0"), Ok(0));
        assert!(parse_timeout("-1").is_err());
        assert!(parse_timeout("soon").is_err());
    }

    #[test]
    fn test_vor_ident_truncation() {
        assert_eq!(VorIdent::new("ABQX1").as_str(), "ABQX");
        assert_eq!(VorIdent::new("A").as_str(), "A");
    }

    #[test]
    fn test_block_set_follows_optional_fields() {
        let mut config = SimulatorConfig::default();
        config.magvar_deg = Some(2.5);
        config.vor_ident = Some(VorIdent::new("IABQ"));

        let blocks = config.block_set();
        assert!(blocks.magvar);
        assert!(blocks.vor_id);
        assert!(!blocks.ias);
        assert!(!blocks.true_heading);
        assert!(!blocks.time);
    }

    #[test]
    fn test_json_config() {
        let json = r#"{"host":"127.0.0.1","magvar_deg":2.5,"traffic":{"Coast":{"age":12}},"vor_ident":"ABQ"}"#;
        let config = SimulatorConfig::from_json(json).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.magvar_deg, Some(2.5));
        assert_eq!(config.traffic, Some(TrafficMode::Coast { age: 12 }));
        assert_eq!(config.vor_ident.map(String::from), Some("ABQ".to_string()));

        let bad_age = r#"{"traffic":{"Coast":{"age":9000}}}"#;
        assert_eq!(
            SimulatorConfig::from_json(bad_age),
            Err(ConfigError::InvalidCoastAge(9000))
        );
        assert!(matches!(
            SimulatorConfig::from_json("{not json"),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn test_choice_flags() {
        assert_eq!(IntruderType::from_flag("ra").unwrap().code(), 2);
        assert_eq!(TrafficMode::from_flag("c", 7), Ok(TrafficMode::Coast { age: 7 }));
        assert_eq!(TawsPopup::from_flag("w"), Ok(TawsPopup::Warning));
        assert!(TrafficMode::from_flag("x", 0).is_err());
    }
}
