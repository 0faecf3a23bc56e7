//! BGP neighbor summary tables.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{cap_num, cap_str};
use crate::dialect::Dialect;
use crate::error::ParseError;

/// Address family assumed when output has no address family header.
const DEFAULT_ADDRESS_FAMILY: &str = "IPv4 Unicast";

/// One neighbor row of a BGP summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgpSession {
    pub address_family: String,
    pub neighbor: String,
    pub asn: String,
    /// Established, i.e. the state column holds a prefix count.
    pub up: bool,
    pub prefixes_received: u64,
    pub messages_input: u64,
    pub messages_output: u64,
}

static IOS_FAMILY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^For address family:\s*(.+?)\s*$").unwrap());

static NXOS_FAMILY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^BGP summary information for VRF\s+([^,\s]+),\s*address family\s+(.+?)\s*$")
        .unwrap()
});

static TABLE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Neighbor\s+V\s+AS\s+MsgRcvd\s+MsgSent").unwrap());

// Neighbor V AS MsgRcvd MsgSent TblVer InQ OutQ Up/Down State/PfxRcd
static ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\S+)\s+(\d+)\s+(\d+(?:\.\d+)?)\s+(\d+)\s+(\d+)\s+\d+\s+\d+\s+\d+\s+(\S+)\s+(.+?)\s*$",
    )
    .unwrap()
});

static ADDRESS_LED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d{1,3}\.\d{1,3}\.|[0-9A-Fa-f]{0,4}::?[0-9A-Fa-f])").unwrap());

static WRAPPED_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9A-Fa-f:.]+)\s*$").unwrap());

struct Summary {
    family: String,
    in_table: bool,
    wrapped: Option<String>,
    sessions: Vec<BgpSession>,
}

impl Summary {
    fn start_family(&mut self, family: String) -> Result<(), ParseError> {
        if let Some(addr) = self.wrapped.take() {
            return Err(ParseError::Truncated(addr));
        }
        self.family = family;
        self.in_table = false;
        Ok(())
    }

    fn row(&mut self, line: &str) -> Result<(), ParseError> {
        let Some(caps) = ROW.captures(line) else {
            if ADDRESS_LED.is_match(line) {
                return Err(ParseError::Truncated(line.trim().to_string()));
            }
            return Ok(());
        };

        let state = cap_str(&caps, 7);
        let (up, prefixes_received) = match state.parse::<u64>() {
            Ok(n) => (true, n),
            Err(_) => (false, 0),
        };

        self.sessions.push(BgpSession {
            address_family: self.family.clone(),
            neighbor: cap_str(&caps, 1),
            asn: cap_str(&caps, 3),
            up,
            prefixes_received,
            messages_input: cap_num(&caps, 4, "msg_rcvd")?,
            messages_output: cap_num(&caps, 5, "msg_sent")?,
        });
        Ok(())
    }
}

/// Parse `show bgp all summary`.
pub fn parse_bgp_summary(dialect: Dialect, text: &str) -> Result<Vec<BgpSession>, ParseError> {
    let mut summary = Summary {
        family: DEFAULT_ADDRESS_FAMILY.to_string(),
        in_table: false,
        wrapped: None,
        sessions: Vec::new(),
    };

    for line in text.lines().map(str::trim_end) {
        if line.is_empty() {
            continue;
        }

        if let Some(family) = address_family(dialect, line) {
            summary.start_family(family)?;
            continue;
        }

        if TABLE_HEADER.is_match(line) {
            summary.in_table = true;
            continue;
        }

        if !summary.in_table {
            continue;
        }

        // Long IPv6 neighbors push the rest of the row onto the next line.
        if let Some(addr) = summary.wrapped.take() {
            summary.row(&format!("{} {}", addr, line.trim_start()))?;
            continue;
        }

        if let Some(caps) = WRAPPED_ADDRESS.captures(line) {
            if ADDRESS_LED.is_match(line) {
                summary.wrapped = Some(caps[1].to_string());
                continue;
            }
        }

        summary.row(line)?;
    }

    if let Some(addr) = summary.wrapped {
        return Err(ParseError::Truncated(addr));
    }

    Ok(summary.sessions)
}

fn address_family(dialect: Dialect, line: &str) -> Option<String> {
    match dialect {
        Dialect::Ios | Dialect::IosXe => IOS_FAMILY.captures(line).map(|c| cap_str(&c, 1)),
        Dialect::NxOs => NXOS_FAMILY.captures(line).map(|c| {
            let vrf = &c[1];
            let family = cap_str(&c, 2);
            if vrf == "default" {
                family
            } else {
                format!("{}/{}", vrf, family)
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IOS_SUMMARY: &str = "\
For address family: IPv4 Unicast
BGP router identifier 10.0.0.1, local AS number 65000
BGP table version is 1234, main routing table version 1234
120 network entries using 29760 bytes of memory

Neighbor        V           AS MsgRcvd MsgSent   TblVer  InQ OutQ Up/Down  State/PfxRcd
10.0.0.2        4        65001  123456  123457     1234    0    0 5w2d          120
10.0.0.3        4        65002       0       0        1    0    0 never    Idle (Admin)

For address family: IPv6 Unicast
BGP router identifier 10.0.0.1, local AS number 65000

Neighbor        V           AS MsgRcvd MsgSent   TblVer  InQ OutQ Up/Down  State/PfxRcd
2001:DB8:FFFF:1::2
                4   65001.100   45678   45679      567    0    0 1d02h          42
";

    const NXOS_SUMMARY: &str = "\
BGP summary information for VRF default, address family IPv4 Unicast
BGP router identifier 10.1.1.1, local AS number 65000
BGP table version is 88, IPv4 Unicast config peers 2, capable peers 1

Neighbor        V    AS MsgRcvd MsgSent   TblVer  InQ OutQ Up/Down  State/PfxRcd
10.1.1.2        4 65001   12345   12346       88    0    0    3w1d 250
10.1.1.3        4 65003      10      12        0    0    0 00:00:12 Active

BGP summary information for VRF CUSTOMER, address family IPv4 Unicast
Neighbor        V    AS MsgRcvd MsgSent   TblVer  InQ OutQ Up/Down  State/PfxRcd
172.16.0.1      4 64512     300     301       12    0    0 02:11:45 7
";

    #[test]
    fn test_parse_ios_summary() {
        let sessions = parse_bgp_summary(Dialect::Ios, IOS_SUMMARY).unwrap();
        assert_eq!(sessions.len(), 3);

        assert_eq!(
            sessions[0],
            BgpSession {
                address_family: "IPv4 Unicast".to_string(),
                neighbor: "10.0.0.2".to_string(),
                asn: "65001".to_string(),
                up: true,
                prefixes_received: 120,
                messages_input: 123456,
                messages_output: 123457,
            }
        );

        assert!(!sessions[1].up);
        assert_eq!(sessions[1].prefixes_received, 0);

        assert_eq!(sessions[2].address_family, "IPv6 Unicast");
        assert_eq!(sessions[2].neighbor, "2001:DB8:FFFF:1::2");
        assert_eq!(sessions[2].asn, "65001.100");
        assert_eq!(sessions[2].prefixes_received, 42);
    }

    #[test]
    fn test_parse_nxos_summary() {
        let sessions = parse_bgp_summary(Dialect::NxOs, NXOS_SUMMARY).unwrap();
        assert_eq!(sessions.len(), 3);
        assert_eq!(sessions[0].address_family, "IPv4 Unicast");
        assert_eq!(sessions[0].prefixes_received, 250);
        assert!(!sessions[1].up);
        assert_eq!(sessions[2].address_family, "CUSTOMER/IPv4 Unicast");
        assert_eq!(sessions[2].messages_output, 301);
    }

    #[test]
    fn test_no_bgp_configured() {
        let text = "% BGP not active\n";
        assert!(parse_bgp_summary(Dialect::Ios, text).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_wrapped_neighbor() {
        let cut = &IOS_SUMMARY[..IOS_SUMMARY.rfind("                4").unwrap()];
        assert_eq!(
            parse_bgp_summary(Dialect::Ios, cut),
            Err(ParseError::Truncated("2001:DB8:FFFF:1::2".to_string()))
        );
    }

    #[test]
    fn test_truncated_row() {
        let text = "\
Neighbor        V           AS MsgRcvd MsgSent   TblVer  InQ OutQ Up/Down  State/PfxRcd
10.0.0.2        4        65001  123456
";
        assert!(matches!(
            parse_bgp_summary(Dialect::IosXe, text),
            Err(ParseError::Truncated(_))
        ));
    }

    #[test]
    fn test_parse_idempotent() {
        assert_eq!(
            parse_bgp_summary(Dialect::Ios, IOS_SUMMARY),
            parse_bgp_summary(Dialect::Ios, IOS_SUMMARY)
        );
    }
}
