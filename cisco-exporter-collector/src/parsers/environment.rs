//! Chassis environment: temperature sensors and power supplies.

use once_cell::sync::Lazy;

use super::{LineRule, apply_first, cap_num, cap_str};
use crate::dialect::Dialect;
use crate::error::ParseError;

/// One environment reading.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvironmentRecord {
    /// Sensor temperature in degrees Celsius.
    Temperature { item: String, celsius: f64 },
    /// Power supply status.
    PowerSupply { item: String, ok: bool },
}

impl EnvironmentRecord {
    pub fn item(&self) -> &str {
        match self {
            EnvironmentRecord::Temperature { item, .. } => item,
            EnvironmentRecord::PowerSupply { item, .. } => item,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Section {
    #[default]
    None,
    Power,
    Temperature,
    SensorTable,
    PsuTable,
}

#[derive(Default)]
struct EnvState {
    section: Section,
    records: Vec<EnvironmentRecord>,
    temperatures: usize,
}

impl EnvState {
    fn push_power(&mut self, item: String, ok: bool) {
        let known = self
            .records
            .iter()
            .any(|r| matches!(r, EnvironmentRecord::PowerSupply { .. }) && r.item() == item);
        if !known {
            self.records.push(EnvironmentRecord::PowerSupply { item, ok });
        }
    }
}

fn status_ok(status: &str) -> bool {
    matches!(status.to_ascii_lowercase().as_str(), "ok" | "normal" | "good")
}

type Rule = LineRule<EnvState>;

// IOS-XE: one table of slot/sensor rows.
static XE_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(r"^\s*Slot\s+Sensor\s+Current State", |s, _| {
            s.section = Section::SensorTable;
            Ok(())
        }),
        Rule::new(
            r"^\s*(\S+)\s+(.+?)\s{2,}(\S+)\s{2,}(\d+(?:\.\d+)?)\s+(\S+)",
            |s, caps| {
                if s.section != Section::SensorTable {
                    return Ok(());
                }
                let slot = cap_str(caps, 1);
                let sensor = cap_str(caps, 2);
                let state = cap_str(caps, 3);
                match &caps[5] {
                    "Celsius" => s.records.push(EnvironmentRecord::Temperature {
                        item: format!("{} {}", slot, sensor),
                        celsius: cap_num(caps, 4, "reading")?,
                    }),
                    _ if slot.starts_with('P') => {
                        let ok = status_ok(&state);
                        s.push_power(slot, ok);
                    }
                    _ => {}
                }
                Ok(())
            },
        ),
        Rule::new(r"^\s*(?:[A-Z]+\d+|\d+)\s+\S", |s, caps| {
            if s.section == Section::SensorTable {
                return Err(ParseError::Truncated(caps[0].trim().to_string()));
            }
            Ok(())
        }),
    ]
});

// IOS (Catalyst): status lines plus an optional PSU table.
static IOS_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(
            r"^\s*Temperature Value:\s*(-?\d+(?:\.\d+)?)\s*Degree Celsius",
            |s, caps| {
                s.temperatures += 1;
                let item = match s.temperatures {
                    1 => "Temperature".to_string(),
                    n => format!("Temperature {}", n),
                };
                s.records.push(EnvironmentRecord::Temperature {
                    item,
                    celsius: cap_num(caps, 1, "temperature")?,
                });
                Ok(())
            },
        ),
        Rule::new(r"^\s*(POWER|RPS)\s+is\s+(.+?)\s*$", |s, caps| {
            let status = cap_str(caps, 2);
            if !status.eq_ignore_ascii_case("NOT PRESENT") {
                s.push_power(cap_str(caps, 1), status.starts_with("OK"));
            }
            Ok(())
        }),
        Rule::new(r"^\s*SW\s+PID\s+Serial#\s+Status", |s, _| {
            s.section = Section::PsuTable;
            Ok(())
        }),
        Rule::new(r"^\s*(\d+[A-Z])\s+(.+?)\s*$", |s, caps| {
            if s.section != Section::PsuTable {
                return Ok(());
            }
            let rest = cap_str(caps, 2);
            if rest.eq_ignore_ascii_case("Not Present") {
                return Ok(());
            }
            let fields: Vec<&str> = rest.split_whitespace().collect();
            let Some(status) = fields.get(2) else {
                return Err(ParseError::Truncated(caps[0].trim().to_string()));
            };
            s.push_power(format!("PS{}", &caps[1]), status_ok(status));
            Ok(())
        }),
    ]
});

// NX-OS: "Power Supply:" and "Temperature:" sections.
static NXOS_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(r"^Power Supply:", |s, _| {
            s.section = Section::Power;
            Ok(())
        }),
        Rule::new(r"^Temperature:", |s, _| {
            s.section = Section::Temperature;
            Ok(())
        }),
        Rule::new(r"^[A-Z][A-Za-z ]*:\s*$", |s, _| {
            s.section = Section::None;
            Ok(())
        }),
        Rule::new(
            r"^(\d+)\s+(\S+)\s+(\d+)\s*W\s+(\d+)\s*W\s+(\d+)\s*W\s+(.+?)\s*$",
            |s, caps| {
                if s.section != Section::Power {
                    return Ok(());
                }
                let status = cap_str(caps, 6);
                if !status.eq_ignore_ascii_case("Absent") {
                    s.push_power(format!("PS{}", &caps[1]), status_ok(&status));
                }
                Ok(())
            },
        ),
        Rule::new(
            r"^(\d+)\s+(\S+)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\S+)\s*$",
            |s, caps| {
                if s.section != Section::Temperature {
                    return Ok(());
                }
                s.records.push(EnvironmentRecord::Temperature {
                    item: format!("{} {}", &caps[1], &caps[2]),
                    celsius: cap_num(caps, 5, "cur_temp")?,
                });
                Ok(())
            },
        ),
        Rule::new(r"^(\d+)\s+\S", |s, caps| {
            if matches!(s.section, Section::Power | Section::Temperature) {
                return Err(ParseError::Truncated(caps[0].trim().to_string()));
            }
            Ok(())
        }),
    ]
});

/// Parse `show environment`.
pub fn parse_environment(
    dialect: Dialect,
    text: &str,
) -> Result<Vec<EnvironmentRecord>, ParseError> {
    let rules = match dialect {
        Dialect::Ios => &*IOS_RULES,
        Dialect::IosXe => &*XE_RULES,
        Dialect::NxOs => &*NXOS_RULES,
    };

    let mut state = EnvState::default();
    for line in text.lines() {
        if line.trim().is_empty() || line.trim_start().starts_with("--") {
            continue;
        }
        apply_first(rules, &mut state, line)?;
    }

    Ok(state.records)
}
