//! Software version, uptime, memory and CPU.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{cap_num, cap_str};
use crate::dialect::Dialect;
use crate::error::ParseError;

/// Software version and uptime from `show version`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionInfo {
    pub version: Option<String>,
    pub uptime: Option<Duration>,
}

/// Unit of memory figures as printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryUnit {
    Bytes,
    Kilobytes,
}

/// One memory pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRecord {
    pub kind: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub unit: MemoryUnit,
}

/// CPU utilization percentages.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CpuRecord {
    pub five_seconds: f64,
    pub interrupts: Option<f64>,
    pub one_minute: Option<f64>,
    pub five_minutes: Option<f64>,
}

static IOS_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Cisco IOS.*?,\s*Version\s+([^\s,]+)").unwrap());

static NXOS_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:NXOS|system):\s+version\s+(\S+)").unwrap());

static UPTIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)uptime is\s+(.+?)\s*$").unwrap());

static UPTIME_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s+(year|week|day|hour|minute|second)").unwrap());

/// Parse `show version`.
pub fn parse_version(dialect: Dialect, text: &str) -> Result<VersionInfo, ParseError> {
    let version_re = match dialect {
        Dialect::Ios | Dialect::IosXe => &*IOS_VERSION,
        Dialect::NxOs => &*NXOS_VERSION,
    };

    let version = version_re.captures(text).map(|c| cap_str(&c, 1));
    let uptime = match UPTIME.captures(text) {
        Some(caps) => parse_uptime(&caps[1])?,
        None => None,
    };

    Ok(VersionInfo { version, uptime })
}

/// Convert an uptime phrase such as `1 year, 3 days, 4 hours` to a duration.
pub fn parse_uptime(phrase: &str) -> Result<Option<Duration>, ParseError> {
    let mut seconds = 0u64;
    let mut found = false;

    for caps in UPTIME_PART.captures_iter(phrase) {
        let n: u64 = cap_num(&caps, 1, "uptime")?;
        let unit = match &caps[2] {
            "year" => 365 * 86_400,
            "week" => 7 * 86_400,
            "day" => 86_400,
            "hour" => 3_600,
            "minute" => 60,
            _ => 1,
        };
        seconds += n * unit;
        found = true;
    }

    Ok(found.then(|| Duration::from_secs(seconds)))
}

static IOS_MEMORY_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*Head\s+Total\(b\)\s+Used\(b\)\s+Free\(b\)").unwrap());

static IOS_MEMORY_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(.+?)\s+([0-9A-Fa-f]+)\s+(\d+)\s+(\d+)\s+(\d+)\s+\d+\s+\d+\s*$").unwrap()
});

static NXOS_MEMORY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*Memory usage:\s+(\d+)K total,\s+(\d+)K used,\s+(\d+)K free").unwrap()
});

/// Parse memory pools from `show memory statistics` or `show system resources`.
pub fn parse_memory(dialect: Dialect, text: &str) -> Result<Vec<MemoryRecord>, ParseError> {
    match dialect {
        Dialect::Ios | Dialect::IosXe => parse_ios_memory(text),
        Dialect::NxOs => {
            let Some(caps) = NXOS_MEMORY.captures(text) else {
                return Ok(Vec::new());
            };
            Ok(vec![MemoryRecord {
                kind: "system".to_string(),
                total: cap_num(&caps, 1, "total")?,
                used: cap_num(&caps, 2, "used")?,
                free: cap_num(&caps, 3, "free")?,
                unit: MemoryUnit::Kilobytes,
            }])
        }
    }
}

// The pool table ends at the first blank line after its header.
fn parse_ios_memory(text: &str) -> Result<Vec<MemoryRecord>, ParseError> {
    let mut records = Vec::new();
    let mut in_table = false;

    for line in text.lines() {
        if !in_table {
            in_table = IOS_MEMORY_HEADER.is_match(line);
            continue;
        }
        if line.trim().is_empty() {
            break;
        }

        let caps = IOS_MEMORY_ROW
            .captures(line)
            .ok_or_else(|| ParseError::Truncated(line.trim().to_string()))?;
        records.push(MemoryRecord {
            kind: cap_str(&caps, 1),
            total: cap_num(&caps, 3, "total")?,
            used: cap_num(&caps, 4, "used")?,
            free: cap_num(&caps, 5, "free")?,
            unit: MemoryUnit::Bytes,
        });
    }

    Ok(records)
}

static IOS_CPU: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"CPU utilization for five seconds:\s*(\d+)%/(\d+)%;\s*one minute:\s*(\d+)%;\s*five minutes:\s*(\d+)%",
    )
    .unwrap()
});

static NXOS_CPU: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*CPU states\s*:\s*([\d.]+)% user,\s*([\d.]+)% kernel,\s*([\d.]+)% idle")
        .unwrap()
});

/// Parse CPU utilization.
pub fn parse_cpu(dialect: Dialect, text: &str) -> Result<Option<CpuRecord>, ParseError> {
    match dialect {
        Dialect::Ios | Dialect::IosXe => {
            let Some(caps) = IOS_CPU.captures(text) else {
                return Ok(None);
            };
            Ok(Some(CpuRecord {
                five_seconds: cap_num(&caps, 1, "five_seconds")?,
                interrupts: Some(cap_num(&caps, 2, "interrupts")?),
                one_minute: Some(cap_num(&caps, 3, "one_minute")?),
                five_minutes: Some(cap_num(&caps, 4, "five_minutes")?),
            }))
        }
        Dialect::NxOs => {
            let Some(caps) = NXOS_CPU.captures(text) else {
                return Ok(None);
            };
            let idle: f64 = cap_num(&caps, 3, "idle")?;
            Ok(Some(CpuRecord {
                five_seconds: 100.0 - idle,
                ..Default::default()
            }))
        }
    }
}
