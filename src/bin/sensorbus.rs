use clap::{App, Arg, ArgMatches};
use colored::*;
use sensorbus::config::{
    parse_timeout, ConfigError, FmsClock, IntruderType, SimulatorConfig, TawsPopup, TrafficMode,
    VorIdent,
};
use sensorbus::{Simulator, StopReason};
use std::str::FromStr;
use tracing::{warn, Level};

const CONFIG_ERROR_EXIT_CODE: i32 = 2;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = build_cli().get_matches();

    let level = if matches.is_present("verbose") { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = match build_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "error:".bright_red().bold(), e);
            std::process::exit(CONFIG_ERROR_EXIT_CODE);
        }
    };

    println!("{}", "✈️  Avionics Sensor Bus Simulator".bright_cyan().bold());
    println!("================================");
    println!("   Destination: {}", config.destination().bright_white());
    if let Some(secs) = config.timeout_secs {
        println!("   Timeout:     {} s", secs);
    }
    println!("Terminate with Ctrl-Break on Win32, Ctrl-C on Unix");
    println!("(Run with --help for further help)");

    let mut simulator = Simulator::open(&config)?;
    let outcome = simulator.run(interrupt()).await;
    match outcome {
        Ok(summary) => {
            let reason = match summary.reason {
                StopReason::Timeout => "timeout",
                StopReason::Interrupted => "operator interrupt",
                StopReason::TransportFailure => "transport failure",
            };
            println!(
                "{} Stopped on {} after {} ms ({} packets, {} cleanup rounds)",
                "✅".green(),
                reason,
                summary.elapsed_ms,
                summary.stats.packets_sent,
                summary.cleanup_attempts
            );
            let link = simulator.sink().stats();
            println!(
                "   UDP: {} datagrams, {} bytes, {} host-down drops, {} reopens",
                link.datagrams_sent, link.bytes_sent, link.transient_failures, link.reopens
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "❌".red(), e.to_string().bright_red());
            Err(e.into())
        }
    }
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C, run until timeout: {}", e);
        std::future::pending::<()>().await;
    }
}

fn build_cli() -> App<'static, 'static> {
    let value = |name: &'static str, help: &'static str| {
        Arg::with_name(name).long(name).takes_value(true).help(help)
    };

    App::new("sensorbus")
        .version("0.1.0")
        .about("Streams simulated sensor telemetry to a flight-management unit under test")
        .arg(value("config", "JSON configuration file; command-line options override it").value_name("FILE"))
        .arg(value("host", "Destination host; use 127.0.0.1 for a local simulator [default: 192.168.28.32]"))
        .arg(value("port", "Destination port [default: 3471]"))
        .arg(
            Arg::with_name("fmstime")
                .long("fmstime")
                .takes_value(true)
                .number_of_values(6)
                .value_names(&["YEAR", "MONTH", "DAY", "HOUR", "MINUTE", "SECOND"])
                .help("FMS real-time clock. Not sent by default"),
        )
        .arg(value("timeout", "Run time in seconds. Without it the simulator runs until Ctrl-C"))
        .arg(value("latitude", "In degrees [default: 35.0403]").allow_hyphen_values(true))
        .arg(value("longitude", "In degrees [default: -106.6092]").allow_hyphen_values(true))
        .arg(value("altitude", "In feet [default: 5355]").allow_hyphen_values(true))
        .arg(value("groundspeed", "In knots [default: 0]").allow_hyphen_values(true))
        .arg(value("groundtrack", "In degrees [default: 0]").allow_hyphen_values(true))
        .arg(value("verticalspeed", "In feet per minute [default: 0]").allow_hyphen_values(true))
        .arg(value("barrocorralt", "Corrected baro altitude in feet [default: 5355]").allow_hyphen_values(true))
        .arg(
            value("barrouncorralt", "Uncorrected baro altitude in feet; replaces barrocorralt")
                .allow_hyphen_values(true),
        )
        .arg(value("trueairspeed", "In knots [default: 0]").allow_hyphen_values(true))
        .arg(value("magheading", "In degrees [default: 0]").allow_hyphen_values(true))
        .arg(value("trueheading", "In degrees. Not sent by default").allow_hyphen_values(true))
        .arg(value("magvar", "In degrees. Not sent by default").allow_hyphen_values(true))
        .arg(value("ias", "Indicated airspeed in knots. Not sent by default").allow_hyphen_values(true))
        .arg(
            value("shadinuncorralt", "Shadin uncorrected altitude in feet. Not sent by default")
                .allow_hyphen_values(true),
        )
        .arg(
            value(
                "traffictype",
                "Traffic annunciation: n(ormal), s(tandby), u(navailable), t(est), d(uplicates), f(ailure), c(oast)",
            )
            .possible_values(&["s", "u", "c", "t", "n", "d", "f"]),
        )
        .arg(
            value("intrudertype", "nt (no threat), ta, ra or pa [default: nt]")
                .possible_values(&["nt", "ta", "ra", "pa"]),
        )
        .arg(
            value("coastage", "Coast age in [0, 8191]; above 12 the annunciation becomes 'removed' [default: 0]")
                .allow_hyphen_values(true),
        )
        .arg(value("tawspopup", "TAWS popup: w(arning) or c(aution)").possible_values(&["w", "c"]))
        .arg(value("ident", "VOR/ILS station id, up to 4 characters. Not sent by default"))
        .arg(
            Arg::with_name("nocleanup")
                .long("nocleanup")
                .help("Do not unblock the labels when the run ends"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Log every tick"),
        )
}

fn parse_value<T: FromStr>(matches: &ArgMatches, option: &'static str) -> Result<Option<T>, ConfigError> {
    matches
        .value_of(option)
        .map(|raw| {
            raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                option,
                value: raw.to_string(),
            })
        })
        .transpose()
}

fn build_config(matches: &ArgMatches) -> Result<SimulatorConfig, ConfigError> {
    let mut config = match matches.value_of("config") {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::Malformed(format!("{}: {}", path, e)))?;
            SimulatorConfig::from_json(&json)?
        }
        None => SimulatorConfig::default(),
    };

    if let Some(host) = matches.value_of("host") {
        config.host = host.to_string();
    }
    if let Some(port) = parse_value(matches, "port")? {
        config.port = port;
    }
    if let Some(raw) = matches.value_of("timeout") {
        config.timeout_secs = Some(parse_timeout(raw)?);
    }
    if let Some(values) = matches.values_of("fmstime") {
        let fields: Vec<&str> = values.collect();
        let field = |index: usize| -> Result<u8, ConfigError> {
            fields[index].trim().parse().map_err(|_| ConfigError::InvalidValue {
                option: "fmstime",
                value: fields[index].to_string(),
            })
        };
        let year = fields[0].trim().parse().map_err(|_| ConfigError::InvalidValue {
            option: "fmstime",
            value: fields[0].to_string(),
        })?;
        config.fms_clock = Some(FmsClock::new(year, field(1)?, field(2)?, field(3)?, field(4)?, field(5)?)?);
    }

    let position = &mut config.position;
    for (option, slot) in [
        ("latitude", &mut position.latitude_deg),
        ("longitude", &mut position.longitude_deg),
        ("altitude", &mut position.altitude_ft),
        ("groundspeed", &mut position.ground_speed_kts),
        ("groundtrack", &mut position.ground_track_deg),
        ("verticalspeed", &mut position.vertical_speed_fpm),
    ] {
        if let Some(value) = parse_value(matches, option)? {
            *slot = value;
        }
    }

    if let Some(altitude) = parse_value(matches, "barrocorralt")? {
        config.baro_corr_alt_ft = altitude;
    }
    if let Some(speed) = parse_value(matches, "trueairspeed")? {
        config.true_airspeed_kts = speed;
    }
    if let Some(heading) = parse_value(matches, "magheading")? {
        config.mag_heading_deg = heading;
    }
    for (option, slot) in [
        ("barrouncorralt", &mut config.baro_uncorr_alt_ft),
        ("shadinuncorralt", &mut config.shadin_uncorr_alt_ft),
        ("trueheading", &mut config.true_heading_deg),
        ("magvar", &mut config.magvar_deg),
        ("ias", &mut config.ias_kts),
    ] {
        if let Some(value) = parse_value(matches, option)? {
            *slot = Some(value);
        }
    }

    if let Some(flag) = matches.value_of("traffictype") {
        let coast_age = parse_value(matches, "coastage")?.unwrap_or(0);
        config.traffic = Some(TrafficMode::from_flag(flag, coast_age)?);
    }
    if let Some(flag) = matches.value_of("intrudertype") {
        config.intruder = IntruderType::from_flag(flag)?;
    }
    if let Some(flag) = matches.value_of("tawspopup") {
        config.taws_popup = Some(TawsPopup::from_flag(flag)?);
    }
    if let Some(ident) = matches.value_of("ident") {
        config.vor_ident = Some(VorIdent::new(ident));
    }
    if matches.is_present("nocleanup") {
        config.cleanup = false;
    }

    config.validate()?;
    Ok(config)
}
