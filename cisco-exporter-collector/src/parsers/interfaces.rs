//! Interface status and counters from `show interfaces` / `show interface`.

use once_cell::sync::Lazy;

use super::{LineRule, apply_first, cap_num, cap_str};
use crate::dialect::Dialect;
use crate::error::ParseError;

/// Status and counters of one interface.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterfaceRecord {
    pub name: String,
    pub description: String,
    pub mac: String,
    pub speed: String,
    pub admin_up: bool,
    pub oper_up: bool,
    /// Interface is error-disabled.
    pub error_status: bool,
    pub receive_bytes: u64,
    pub receive_errors: u64,
    pub receive_drops: u64,
    pub receive_broadcast: u64,
    pub receive_multicast: u64,
    pub transmit_bytes: u64,
    pub transmit_errors: u64,
    pub transmit_drops: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Direction {
    #[default]
    Unknown,
    Rx,
    Tx,
}

#[derive(Default)]
struct IfState {
    records: Vec<InterfaceRecord>,
    lines_since_header: usize,
    direction: Direction,
    /// Set after a header we could not read; body lines belong to no record.
    detached: bool,
}

impl IfState {
    fn begin(&mut self, name: String) -> &mut InterfaceRecord {
        self.lines_since_header = 0;
        self.detached = false;
        self.direction = Direction::Unknown;
        self.records.push(InterfaceRecord {
            name,
            ..Default::default()
        });
        let last = self.records.len() - 1;
        &mut self.records[last]
    }

    fn detach(&mut self) {
        self.detached = true;
        self.direction = Direction::Unknown;
    }
}

type Rule = LineRule<IfState>;

fn is_err_disabled(reason: &str) -> bool {
    let reason = reason.to_ascii_lowercase();
    reason.contains("err-disabled") || reason.contains("errdisabled")
}

// Body rules only apply under a recognized interface header.
macro_rules! current {
    ($s:expr) => {{
        if $s.detached {
            return Ok(());
        }
        match $s.records.last_mut() {
            Some(r) => r,
            None => return Ok(()),
        }
    }};
}

static IOS_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(
            r"^(\S+) is ([a-z][a-z ]*?)(?:\s*\(([^)]+)\))?, line protocol is (\w+)(?:\s*\(([^)]+)\))?",
            |s, caps| {
                let admin = cap_str(caps, 2);
                let notes = format!("{} {}", cap_str(caps, 3), cap_str(caps, 5));
                let r = s.begin(cap_str(caps, 1));
                r.admin_up = admin != "administratively down" && admin != "deleted";
                r.oper_up = &caps[4] == "up";
                r.error_status = is_err_disabled(&notes);
                Ok(())
            },
        ),
        Rule::new(r"^\S+ is ", |s, _| {
            s.detach();
            Ok(())
        }),
        Rule::new(r"^\s+Hardware is .+?, address is (\S+)", |s, caps| {
            current!(s).mac = cap_str(caps, 1);
            Ok(())
        }),
        Rule::new(r"^\s+Description:\s*(.*?)\s*$", |s, caps| {
            current!(s).description = cap_str(caps, 1);
            Ok(())
        }),
        Rule::new(r"^\s+\w+[- ][Dd]uplex,\s*([^,]+)", |s, caps| {
            current!(s).speed = cap_str(caps, 1);
            Ok(())
        }),
        Rule::new(
            r"^\s+Input queue: \d+/\d+/(\d+)/\d+.*Total output drops: (\d+)",
            |s, caps| {
                let r = current!(s);
                r.receive_drops = cap_num(caps, 1, "input_drops")?;
                r.transmit_drops = cap_num(caps, 2, "output_drops")?;
                Ok(())
            },
        ),
        Rule::new(r"^\s+\d+ packets input, (\d+) bytes", |s, caps| {
            current!(s).receive_bytes = cap_num(caps, 1, "input_bytes")?;
            Ok(())
        }),
        Rule::new(
            r"^\s+Received (\d+) broadcasts(?: \((\d+)(?: IP)? multicasts?\))?",
            |s, caps| {
                let r = current!(s);
                r.receive_broadcast = cap_num(caps, 1, "broadcasts")?;
                if caps.get(2).is_some() {
                    r.receive_multicast = cap_num(caps, 2, "multicasts")?;
                }
                Ok(())
            },
        ),
        Rule::new(r"^\s+\d+ watchdog, (\d+) multicast", |s, caps| {
            current!(s).receive_multicast = cap_num(caps, 1, "multicasts")?;
            Ok(())
        }),
        Rule::new(r"^\s+(\d+) input errors", |s, caps| {
            current!(s).receive_errors = cap_num(caps, 1, "input_errors")?;
            Ok(())
        }),
        Rule::new(r"^\s+\d+ packets output, (\d+) bytes", |s, caps| {
            current!(s).transmit_bytes = cap_num(caps, 1, "output_bytes")?;
            Ok(())
        }),
        Rule::new(r"^\s+(\d+) output errors", |s, caps| {
            current!(s).transmit_errors = cap_num(caps, 1, "output_errors")?;
            Ok(())
        }),
    ]
});

static NXOS_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(r"^(\S+) is (up|down)(?:\s*\(([^)]+)\))?", |s, caps| {
            let reason = cap_str(caps, 3);
            let r = s.begin(cap_str(caps, 1));
            r.oper_up = &caps[2] == "up";
            r.admin_up = !reason.eq_ignore_ascii_case("Administratively down");
            r.error_status = is_err_disabled(&reason);
            Ok(())
        }),
        Rule::new(r"^\S+ is ", |s, _| {
            s.detach();
            Ok(())
        }),
        Rule::new(r"^admin state is (up|down)", |s, caps| {
            current!(s).admin_up = &caps[1] == "up";
            Ok(())
        }),
        Rule::new(r"^\s+Hardware:.*?address:\s*(\S+)", |s, caps| {
            current!(s).mac = cap_str(caps, 1);
            Ok(())
        }),
        Rule::new(r"^\s+Description:\s*(.*?)\s*$", |s, caps| {
            current!(s).description = cap_str(caps, 1);
            Ok(())
        }),
        Rule::new(r"^\s+(?:full|half|auto)-duplex,\s*([^,]+)", |s, caps| {
            current!(s).speed = cap_str(caps, 1);
            Ok(())
        }),
        Rule::new(r"^\s+RX\s*$", |s, _| {
            s.direction = Direction::Rx;
            Ok(())
        }),
        Rule::new(r"^\s+TX\s*$", |s, _| {
            s.direction = Direction::Tx;
            Ok(())
        }),
        Rule::new(
            r"^\s+\d+ unicast packets\s+(\d+) multicast packets\s+(\d+) broadcast packets",
            |s, caps| {
                if s.direction != Direction::Rx {
                    return Ok(());
                }
                let r = current!(s);
                r.receive_multicast = cap_num(caps, 1, "multicast_packets")?;
                r.receive_broadcast = cap_num(caps, 2, "broadcast_packets")?;
                Ok(())
            },
        ),
        Rule::new(r"^\s+\d+ input packets\s+(\d+) bytes", |s, caps| {
            current!(s).receive_bytes = cap_num(caps, 1, "input_bytes")?;
            Ok(())
        }),
        Rule::new(r"^\s+\d+ output packets\s+(\d+) bytes", |s, caps| {
            current!(s).transmit_bytes = cap_num(caps, 1, "output_bytes")?;
            Ok(())
        }),
        Rule::new(r"^\s+(\d+) input error", |s, caps| {
            current!(s).receive_errors = cap_num(caps, 1, "input_errors")?;
            Ok(())
        }),
        Rule::new(r"^\s+(\d+) output error", |s, caps| {
            current!(s).transmit_errors = cap_num(caps, 1, "output_errors")?;
            Ok(())
        }),
        Rule::new(r"(\d+) input discard", |s, caps| {
            current!(s).receive_drops = cap_num(caps, 1, "input_discard")?;
            Ok(())
        }),
        Rule::new(r"(\d+) output discard", |s, caps| {
            current!(s).transmit_drops = cap_num(caps, 1, "output_discard")?;
            Ok(())
        }),
    ]
});

/// Parse interface status output for `dialect`.
pub fn parse_interfaces(dialect: Dialect, text: &str) -> Result<Vec<InterfaceRecord>, ParseError> {
    let rules = match dialect {
        Dialect::Ios | Dialect::IosXe => &*IOS_RULES,
        Dialect::NxOs => &*NXOS_RULES,
    };

    let mut state = IfState::default();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        state.lines_since_header += 1;
        apply_first(rules, &mut state, line)?;
    }

    // A header with nothing after it means the output was cut.
    if state.lines_since_header == 0 {
        if let Some(last) = state.records.last() {
            return Err(ParseError::Truncated(last.name.clone()));
        }
    }

    Ok(state.records)
}
