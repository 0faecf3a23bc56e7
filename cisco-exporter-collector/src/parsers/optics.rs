//! Interface stats listing and transceiver diagnostics.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{is_not_available, parse_num};
use crate::dialect::Dialect;
use crate::error::ParseError;

/// An interface found in the stats listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsEntity {
    pub name: String,
    /// False when the device reports the interface as disabled.
    pub enabled: bool,
}

static STATS_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9/.:_-]*[0-9])\s*$").unwrap());

static STATS_DISABLED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:Interface\s+)?(\S+)?\s*is disabled").unwrap());

static STATS_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+Switching path\s+").unwrap());

/// Parse `show interfaces stats`.
///
/// Each interface is a name line followed either by a switching path table
/// or by an "is disabled" line. A name line with neither is dropped, unless it
/// is the last thing in the output.
pub fn parse_interface_stats(text: &str) -> Result<Vec<StatsEntity>, ParseError> {
    let mut entities = Vec::new();
    let mut pending: Option<String> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if let Some(caps) = STATS_NAME.captures(line) {
            if let Some(name) = pending.take() {
                tracing::trace!(interface = %name, "Stats entry without body");
            }
            pending = Some(caps[1].to_string());
        } else if STATS_HEADER.is_match(line) {
            if let Some(name) = pending.take() {
                entities.push(StatsEntity { name, enabled: true });
            }
        } else if let Some(caps) = STATS_DISABLED.captures(line.trim_start()) {
            let named = caps.get(1).map(|m| m.as_str());
            if let Some(name) = pending.take() {
                if named.is_none_or(|n| n == name) {
                    entities.push(StatsEntity {
                        name,
                        enabled: false,
                    });
                }
            }
        }
    }

    match pending {
        Some(name) => Err(ParseError::Truncated(name)),
        None => Ok(entities),
    }
}

/// Unit of an optical power reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUnit {
    Dbm,
    Milliwatt,
}

impl PowerUnit {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "dBm" => Some(PowerUnit::Dbm),
            "mW" => Some(PowerUnit::Milliwatt),
            _ => None,
        }
    }
}

/// An optical power value in the unit the device printed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Power {
    pub value: f64,
    pub unit: PowerUnit,
}

/// Transmit and receive power of one transceiver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransceiverReading {
    pub tx: Power,
    pub rx: Power,
}

/// Parse transceiver detail output for `dialect`.
///
/// Returns `Ok(None)` when the output carries no readings (transceiver absent,
/// values not applicable).
pub fn parse_transceiver(
    dialect: Dialect,
    text: &str,
) -> Result<Option<TransceiverReading>, ParseError> {
    match dialect {
        Dialect::Ios => parse_ios_table(text),
        Dialect::NxOs => parse_labeled(text, &NXOS_TX, &NXOS_RX, &NXOS_ABSENT),
        Dialect::IosXe => parse_labeled(text, &XE_TX, &XE_RX, &XE_ABSENT),
    }
}

static IOS_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*Port\s+\(").unwrap());
static IOS_UNIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^)]+)\)").unwrap());
static IOS_RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s-]+$").unwrap());

fn is_alarm_marker(token: &str) -> bool {
    matches!(token, "++" | "+" | "-" | "--")
}

// IOS prints a table whose header row carries one unit per column, the last
// two being Tx and Rx power.
fn parse_ios_table(text: &str) -> Result<Option<TransceiverReading>, ParseError> {
    let mut lines = text.lines();

    let Some(header) = lines.by_ref().find(|l| IOS_HEADER.is_match(l)) else {
        return Ok(None);
    };

    let units: Vec<&str> = IOS_UNIT
        .captures_iter(header)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    let columns = units.len() + 1;

    let (tx_unit, rx_unit) = match units.as_slice() {
        [.., tx, rx] => match (PowerUnit::parse(tx), PowerUnit::parse(rx)) {
            (Some(tx), Some(rx)) => (tx, rx),
            _ => return Err(ParseError::Header(header.trim().to_string())),
        },
        _ => return Err(ParseError::Header(header.trim().to_string())),
    };

    let row = lines
        .map(str::trim_end)
        .find(|l| !l.trim().is_empty() && !IOS_RULE.is_match(l))
        .ok_or_else(|| ParseError::Truncated(header.trim().to_string()))?;

    let fields: Vec<&str> = row
        .split_whitespace()
        .filter(|t| !is_alarm_marker(t))
        .collect();
    if fields.len() < columns {
        return Err(ParseError::Truncated(row.trim().to_string()));
    }

    let (tx, rx) = (fields[columns - 2], fields[columns - 1]);
    if is_not_available(tx) || is_not_available(rx) {
        return Ok(None);
    }

    Ok(Some(TransceiverReading {
        tx: Power {
            value: parse_num("tx_power", tx)?,
            unit: tx_unit,
        },
        rx: Power {
            value: parse_num("rx_power", rx)?,
            unit: rx_unit,
        },
    }))
}

static NXOS_TX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*Tx Power\s+(\S+)\s*(dBm|mW)?").unwrap());
static NXOS_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*Rx Power\s+(\S+)\s*(dBm|mW)?").unwrap());
static NXOS_ABSENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"transceiver is not present").unwrap());

static XE_TX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*Transceiver Tx power\s*=\s*(\S+)\s*(dBm|mW)?").unwrap());
static XE_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*Transceiver Rx optical power\s*=\s*(\S+)\s*(dBm|mW)?").unwrap()
});
static XE_ABSENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)not present|is disabled").unwrap());

// "Label value unit" lines; the first occurrence wins (lane 1 on multi-lane
// optics).
fn parse_labeled(
    text: &str,
    tx_re: &Regex,
    rx_re: &Regex,
    absent_re: &Regex,
) -> Result<Option<TransceiverReading>, ParseError> {
    if absent_re.is_match(text) {
        return Ok(None);
    }

    let tx = tx_re.captures(text);
    let rx = rx_re.captures(text);

    let (tx, rx) = match (tx, rx) {
        (None, None) => return Ok(None),
        (Some(c), None) | (None, Some(c)) => {
            return Err(ParseError::Truncated(c[0].trim().to_string()));
        }
        (Some(tx), Some(rx)) => (tx, rx),
    };

    let power = |caps: &regex::Captures<'_>, field: &'static str| -> Result<Option<Power>, ParseError> {
        let value = &caps[1];
        if is_not_available(value) {
            return Ok(None);
        }
        let unit = caps
            .get(2)
            .and_then(|m| PowerUnit::parse(m.as_str()))
            .unwrap_or(PowerUnit::Dbm);
        Ok(Some(Power {
            value: parse_num(field, value)?,
            unit,
        }))
    };

    match (power(&tx, "tx_power")?, power(&rx, "rx_power")?) {
        (Some(tx), Some(rx)) => Ok(Some(TransceiverReading { tx, rx })),
        _ => Ok(None),
    }
}

/// Slot, subslot and port of an interface name like `TenGigabitEthernet0/1/2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubslotPort {
    pub slot: u32,
    pub subslot: u32,
    pub port: u32,
}

static SUBSLOT_PORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S(\d+)/(\d+)/(\d+)").unwrap());

/// Decompose an interface name into slot/subslot/port.
///
/// `None` means the name does not have that shape and the interface should be
/// skipped.
pub fn decompose_subslot_port(name: &str) -> Option<SubslotPort> {
    let caps = SUBSLOT_PORT.captures(name)?;
    Some(SubslotPort {
        slot: caps[1].parse().ok()?,
        subslot: caps[2].parse().ok()?,
        port: caps[3].parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATS: &str = "\
GigabitEthernet0/0/0
          Switching path    Pkts In   Chars In   Pkts Out  Chars Out
               Processor      12345    1234567      23456    2345678
             Route cache          0          0          0          0
                   Total      12345    1234567      23456    2345678
GigabitEthernet0/0/1
Interface GigabitEthernet0/0/1 is disabled
TenGigabitEthernet0/1/0
          Switching path    Pkts In   Chars In   Pkts Out  Chars Out
               Processor         10       1000         20       2000
                   Total         10       1000         20       2000
";

    const IOS_TRANSCEIVER: &str = "\
ITU Channel not available (Wavelength not available),
Transceiver is internally calibrated.
If device is externally calibrated, only calibrated values are printed.
++ : high alarm, +  : high warning, -  : low warning, -- : low alarm.
NA or N/A: not applicable, Tx: transmit, Rx: receive.
mA: milliamperes, dBm: decibels (milli-watts).

                                 Optical   Optical
           Temperature  Voltage  Tx Power  Rx Power
Port       (Celsius)    (Volts)  (dBm)     (dBm)
---------  -----------  -------  --------  --------
Gi1/0/49     32.5       3.29      -2.3      -3.1
";

    const IOS_TRANSCEIVER_ALARM: &str = "\
                                            Optical   Optical
           Temperature  Voltage  Current    Tx Power  Rx Power
Port       (Celsius)    (Volts)  (mA)       (mW)      (mW)
---------  -----------  -------  --------   --------  --------
Te1/1/1      30.1       3.28     5.9        0.58      0.0001 --
";

    const NXOS_TRANSCEIVER: &str = "\
Ethernet1/49
    transceiver is present
    type is QSFP-100G-SR4
    name is CISCO-AVAGO

           SFP Detail Diagnostics Information (internal calibration)
  ----------------------------------------------------------------------------
                Current              Alarms                  Warnings
                Measurement     High        Low         High          Low
  ----------------------------------------------------------------------------
  Lane Number:1 Network Lane
  Temperature   31.50 C        75.00 C     -5.00 C     70.00 C        0.00 C
  Voltage        3.28 V         3.63 V      2.97 V      3.46 V        3.13 V
  Current        6.63 mA       10.00 mA     2.00 mA     9.50 mA       3.00 mA
  Tx Power      -0.95 dBm       3.49 dBm  -12.30 dBm    0.49 dBm     -8.23 dBm
  Rx Power      -1.24 dBm       3.49 dBm  -14.30 dBm    0.49 dBm    -10.31 dBm
  Lane Number:2 Network Lane
  Tx Power      -1.05 dBm       3.49 dBm  -12.30 dBm    0.49 dBm     -8.23 dBm
  Rx Power      -1.44 dBm       3.49 dBm  -14.30 dBm    0.49 dBm    -10.31 dBm
";

    const XE_TRANSCEIVER: &str = "\
The Transceiver in slot 0 subslot 1 port 0 is enabled.
  Module temperature                        = +32.980 C
  Transceiver Tx supply voltage             = 3288.0 mVolts
  Transceiver Tx bias current               = 6472 uAmps
  Transceiver Tx power                      = -2.4 dBm
  Transceiver Rx optical power              = -3.5 dBm
";

    #[test]
    fn test_parse_interface_stats() {
        let entities = parse_interface_stats(STATS).unwrap();
        assert_eq!(
            entities,
            vec![
                StatsEntity {
                    name: "GigabitEthernet0/0/0".to_string(),
                    enabled: true
                },
                StatsEntity {
                    name: "GigabitEthernet0/0/1".to_string(),
                    enabled: false
                },
                StatsEntity {
                    name: "TenGigabitEthernet0/1/0".to_string(),
                    enabled: true
                },
            ]
        );
    }

    #[test]
    fn test_stats_stray_disabled_line_adds_nothing() {
        let text = format!("{}Interface Loopback0 is disabled\n", STATS);
        assert_eq!(
            parse_interface_stats(&text).unwrap(),
            parse_interface_stats(STATS).unwrap()
        );
    }

    #[test]
    fn test_stats_truncated() {
        let text = "GigabitEthernet0/0/0\n          Switching path    Pkts In\nGigabitEthernet0/0/1\n";
        assert_eq!(
            parse_interface_stats(text),
            Err(ParseError::Truncated("GigabitEthernet0/0/1".to_string()))
        );
    }

    #[test]
    fn test_stats_empty() {
        assert_eq!(parse_interface_stats("").unwrap(), vec![]);
    }

    #[test]
    fn test_parse_ios_transceiver() {
        let reading = parse_transceiver(Dialect::Ios, IOS_TRANSCEIVER)
            .unwrap()
            .unwrap();
        assert_eq!(
            reading.tx,
            Power {
                value: -2.3,
                unit: PowerUnit::Dbm
            }
        );
        assert_eq!(reading.rx.value, -3.1);
    }

    #[test]
    fn test_parse_ios_transceiver_milliwatt_with_alarm() {
        let reading = parse_transceiver(Dialect::Ios, IOS_TRANSCEIVER_ALARM)
            .unwrap()
            .unwrap();
        assert_eq!(reading.tx.unit, PowerUnit::Milliwatt);
        assert_eq!(reading.tx.value, 0.58);
        assert_eq!(reading.rx.value, 0.0001);
    }

    #[test]
    fn test_ios_transceiver_not_applicable() {
        let text = IOS_TRANSCEIVER.replace("-2.3      -3.1", "N/A       N/A");
        assert_eq!(parse_transceiver(Dialect::Ios, &text).unwrap(), None);
    }

    #[test]
    fn test_ios_transceiver_truncated() {
        let cut = IOS_TRANSCEIVER.replace("Gi1/0/49     32.5       3.29      -2.3      -3.1\n", "");
        assert!(matches!(
            parse_transceiver(Dialect::Ios, &cut),
            Err(ParseError::Truncated(_))
        ));

        let short = IOS_TRANSCEIVER.replace("      -2.3      -3.1", "");
        assert!(matches!(
            parse_transceiver(Dialect::Ios, &short),
            Err(ParseError::Truncated(_))
        ));
    }

    #[test]
    fn test_ios_transceiver_bad_header() {
        let text = "Port       (Celsius)    (Volts)  (mA)\nGi1/0/1  30.0  3.3  6.0\n";
        assert!(matches!(
            parse_transceiver(Dialect::Ios, text),
            Err(ParseError::Header(_))
        ));
    }

    #[test]
    fn test_no_transceiver_output() {
        let text = "% No transceiver is inserted on Gi1/0/2\n";
        assert_eq!(parse_transceiver(Dialect::Ios, text).unwrap(), None);
        assert_eq!(parse_transceiver(Dialect::NxOs, text).unwrap(), None);
        assert_eq!(parse_transceiver(Dialect::IosXe, text).unwrap(), None);
    }

    #[test]
    fn test_parse_nxos_transceiver_first_lane() {
        let reading = parse_transceiver(Dialect::NxOs, NXOS_TRANSCEIVER)
            .unwrap()
            .unwrap();
        assert_eq!(reading.tx.value, -0.95);
        assert_eq!(reading.rx.value, -1.24);
        assert_eq!(reading.rx.unit, PowerUnit::Dbm);
    }

    #[test]
    fn test_nxos_transceiver_absent() {
        let text = "Ethernet1/50\n    transceiver is not present\n";
        assert_eq!(parse_transceiver(Dialect::NxOs, text).unwrap(), None);
    }

    #[test]
    fn test_nxos_transceiver_truncated() {
        let cut = &NXOS_TRANSCEIVER[..NXOS_TRANSCEIVER.find("  Rx Power").unwrap()];
        assert!(matches!(
            parse_transceiver(Dialect::NxOs, cut),
            Err(ParseError::Truncated(_))
        ));
    }

    #[test]
    fn test_parse_iosxe_transceiver() {
        let reading = parse_transceiver(Dialect::IosXe, XE_TRANSCEIVER)
            .unwrap()
            .unwrap();
        assert_eq!(reading.tx.value, -2.4);
        assert_eq!(reading.rx.value, -3.5);
    }

    #[test]
    fn test_parse_idempotent() {
        for (dialect, text) in [
            (Dialect::Ios, IOS_TRANSCEIVER),
            (Dialect::NxOs, NXOS_TRANSCEIVER),
            (Dialect::IosXe, XE_TRANSCEIVER),
        ] {
            assert_eq!(
                parse_transceiver(dialect, text),
                parse_transceiver(dialect, text)
            );
        }
        assert_eq!(parse_interface_stats(STATS), parse_interface_stats(STATS));
    }

    #[test]
    fn test_decompose_subslot_port() {
        assert_eq!(
            decompose_subslot_port("TenGigabitEthernet0/1/2"),
            Some(SubslotPort {
                slot: 0,
                subslot: 1,
                port: 2
            })
        );
        assert_eq!(decompose_subslot_port("GigabitEthernet1"), None);
        assert_eq!(decompose_subslot_port("Gi0/1"), None);
    }
}
