//! OS dialect detection.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ResolutionError;
use crate::runner::CommandRunner;
use crate::session::Session;

/// Command whose output identifies the OS family.
pub const IDENTIFY_COMMAND: &str = "show version";

/// Command syntax and output format family of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Ios,
    IosXe,
    NxOs,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Ios => "ios",
            Dialect::IosXe => "iosxe",
            Dialect::NxOs => "nxos",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved device: its dialect and the identification output it came from.
#[derive(Debug, Clone)]
pub struct Identity {
    pub dialect: Dialect,
    pub text: String,
}

struct Signature {
    dialect: Dialect,
    include: Regex,
    exclude: Option<Regex>,
}

impl Signature {
    fn matches(&self, text: &str) -> bool {
        self.include.is_match(text) && !self.exclude.as_ref().is_some_and(|re| re.is_match(text))
    }
}

// IOS-XE banners also contain "Cisco IOS Software", hence the exclusion on the
// plain IOS signature.
static SIGNATURES: Lazy<Vec<Signature>> = Lazy::new(|| {
    vec![
        Signature {
            dialect: Dialect::IosXe,
            include: Regex::new(r"IOS[ -]XE").unwrap(),
            exclude: None,
        },
        Signature {
            dialect: Dialect::NxOs,
            include: Regex::new(r"NX-OS").unwrap(),
            exclude: None,
        },
        Signature {
            dialect: Dialect::Ios,
            include: Regex::new(r"Cisco IOS Software|Internetwork Operating System").unwrap(),
            exclude: Some(Regex::new(r"IOS[ -]XE|NX-OS").unwrap()),
        },
    ]
});

/// Classify identification output. First matching signature wins.
pub fn classify(text: &str) -> Option<Dialect> {
    SIGNATURES
        .iter()
        .find(|sig| sig.matches(text))
        .map(|sig| sig.dialect)
}

/// Run the identification command and classify its output.
pub async fn resolve(
    session: &mut Session,
    runner: &CommandRunner,
) -> Result<Identity, ResolutionError> {
    let output = runner.run(session, IDENTIFY_COMMAND).await?;

    match classify(&output.text) {
        Some(dialect) => Ok(Identity {
            dialect,
            text: output.text,
        }),
        None => Err(unrecognized(&output.text)),
    }
}

fn unrecognized(text: &str) -> ResolutionError {
    let first = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    ResolutionError::Unrecognized(first.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const IOS: &str = include_str!("../tests/fixtures/ios_show_version.txt");
    const IOS_XE: &str = include_str!("../tests/fixtures/iosxe_show_version.txt");
    const NX_OS: &str = include_str!("../tests/fixtures/nxos_show_version.txt");

    #[test]
    fn test_classify_fixtures() {
        assert_eq!(classify(IOS), Some(Dialect::Ios));
        assert_eq!(classify(IOS_XE), Some(Dialect::IosXe));
        assert_eq!(classify(NX_OS), Some(Dialect::NxOs));
    }

    #[test]
    fn test_signatures_mutually_exclusive() {
        for text in [IOS, IOS_XE, NX_OS] {
            let matching = SIGNATURES.iter().filter(|sig| sig.matches(text)).count();
            assert_eq!(matching, 1, "ambiguous signature for:\n{}", text);
        }
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify("JUNOS 20.4R3.8 built 2021-09-01"), None);
        assert_eq!(classify(""), None);
    }

    #[tokio::test]
    async fn test_resolve_keeps_identification_text() {
        use std::time::Duration;

        use crate::mock::{MockConnector, MockDevice};
        use crate::target::Target;

        let connector = MockConnector::new()
            .with_device("nx1", MockDevice::nxos())
            .with_device("eos1", MockDevice::new().with_command("show version", "\nArista vEOS\n"));
        let runner = CommandRunner::new(Duration::from_secs(1), 1000);

        let target: Target = "nx1".parse().unwrap();
        let mut session = Session::open(&connector, &target, Duration::from_secs(1))
            .await
            .unwrap();
        let identity = resolve(&mut session, &runner).await.unwrap();
        session.close().await;
        assert_eq!(identity.dialect, Dialect::NxOs);
        assert_eq!(classify(&identity.text), Some(Dialect::NxOs));
        assert!(identity.text.contains("NX-OS"));

        let target: Target = "eos1".parse().unwrap();
        let mut session = Session::open(&connector, &target, Duration::from_secs(1))
            .await
            .unwrap();
        let err = resolve(&mut session, &runner).await.unwrap_err();
        session.close().await;
        assert!(matches!(err, ResolutionError::Unrecognized(ref line) if line == "Arista vEOS"));
    }

    #[test]
    fn test_dialect_display() {
        assert_eq!(Dialect::IosXe.to_string(), "iosxe");
        assert_eq!(Dialect::NxOs.as_str(), "nxos");
    }
}
