//! # Login Validation
//!
//! Checks run on untrusted client input before it reaches the world.
//!
//! ## Philosophy
//!
//! NEVER trust the client. The client says "I am Notch".
//! We verify:
//! 1. Is the name even a legal Classic name?
//! 2. Does the salted hash prove the listing server vouched for it?
//! 3. If not, does the configured policy let them in anyway?

use std::net::IpAddr;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Shortest accepted player name.
pub const MIN_NAME_LENGTH: usize = 2;
/// Longest accepted player name.
pub const MAX_NAME_LENGTH: usize = 16;

/// True for names made of `[A-Za-z0-9_.]` with a legal length.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    (MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&name.len())
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
}

/// True when every character is printable ASCII (`0x20..=0x7E`).
#[must_use]
pub fn is_valid_chat(text: &str) -> bool {
    text.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Lowercase hex md5 of `salt + name`.
#[must_use]
pub fn name_hash(salt: &str, name: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(salt.as_bytes());
    hasher.update(name.as_bytes());
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

/// Checks the verification key a client sent in its handshake.
///
/// Some clients drop leading zeros from the hex digest and some upper-case
/// it, so both sides are normalised before comparing.
#[must_use]
pub fn verify_name(salt: &str, name: &str, key: &str) -> bool {
    let expected = name_hash(salt, name);
    let key = key.trim();
    let normalize = |s: &str| s.trim_start_matches('0').to_ascii_lowercase();
    !key.is_empty() && normalize(&expected) == normalize(key)
}

/// How strictly the server insists on verified names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameVerification {
    /// Unverified players are always rejected.
    Always,
    /// Unverified players are let in from the address they last used.
    #[default]
    Balanced,
    /// Verification is informational only.
    Never,
}

/// Outcome of the name verification step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameDecision {
    /// Hash matched, or the address is exempt.
    Verified,
    /// Hash did not match but the policy lets the player in.
    AllowedUnverified,
    /// Disconnect with an unverified-name reason.
    Rejected,
}

/// Facts about a login that bear on name verification.
#[derive(Clone, Copy, Debug)]
pub struct NameCheck {
    /// The handshake key matched the salted hash.
    pub hash_matches: bool,
    /// Address of the connecting client.
    pub address: IpAddr,
    /// The player's last recorded address equals `address`.
    pub returning_address: bool,
    /// Whether LAN addresses skip verification.
    pub allow_lan: bool,
}

impl NameVerification {
    /// Applies the policy to one login.
    #[must_use]
    pub fn decide(self, check: &NameCheck) -> NameDecision {
        if check.hash_matches
            || check.address.is_loopback()
            || (check.allow_lan && is_lan_address(check.address))
        {
            return NameDecision::Verified;
        }
        match self {
            Self::Always => NameDecision::Rejected,
            Self::Balanced if check.returning_address => NameDecision::AllowedUnverified,
            Self::Balanced => NameDecision::Rejected,
            Self::Never => NameDecision::AllowedUnverified,
        }
    }
}

/// Loopback, private, and link-local addresses.
#[must_use]
pub fn is_lan_address(address: IpAddr) -> bool {
    match address {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local(),
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            // fc00::/7 unique local, fe80::/10 link local
            v6.is_loopback() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_name_charset() {
        assert!(is_valid_name("Notch"));
        assert!(is_valid_name("a_b.c_123"));
        assert!(is_valid_name("ab"));
        assert!(is_valid_name("abcdefghijklmnop"));
        assert!(!is_valid_name("a"));
        assert!(!is_valid_name("abcdefghijklmnopq"));
        assert!(!is_valid_name("bad name"));
        assert!(!is_valid_name("dash-name"));
        assert!(!is_valid_name("ünicode"));
    }

    #[test]
    fn test_chat_charset() {
        assert!(is_valid_chat("hello &cworld ~!"));
        assert!(is_valid_chat(""));
        assert!(!is_valid_chat("tab\there"));
        assert!(!is_valid_chat("caf\u{e9}"));
        assert!(!is_valid_chat("\u{7f}"));
    }

    #[test]
    fn test_name_hash_known_value() {
        // md5("") and md5("abc")
        assert_eq!(name_hash("", ""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(name_hash("a", "bc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_verify_name_normalises() {
        let salt = "s4lt";
        let hash = name_hash(salt, "Notch");
        assert!(verify_name(salt, "Notch", &hash));
        assert!(verify_name(salt, "Notch", &hash.to_ascii_uppercase()));
        assert!(!verify_name(salt, "Jeb", &hash));
        assert!(!verify_name(salt, "Notch", ""));

        // Find a salt whose digest has a leading zero and check trimming
        let salt = (0..1000)
            .map(|i| i.to_string())
            .find(|s| name_hash(s, "Notch").starts_with('0'))
            .unwrap();
        let hash = name_hash(&salt, "Notch");
        assert!(verify_name(&salt, "Notch", hash.trim_start_matches('0')));
    }

    fn check(hash_matches: bool, address: IpAddr, returning_address: bool) -> NameCheck {
        NameCheck { hash_matches, address, returning_address, allow_lan: true }
    }

    #[test]
    fn test_policy_decisions() {
        let public = IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8));
        let lan = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 4));
        let local = IpAddr::V4(Ipv4Addr::LOCALHOST);

        for policy in [NameVerification::Always, NameVerification::Balanced, NameVerification::Never] {
            assert_eq!(policy.decide(&check(true, public, false)), NameDecision::Verified);
            assert_eq!(policy.decide(&check(false, local, false)), NameDecision::Verified);
            assert_eq!(policy.decide(&check(false, lan, false)), NameDecision::Verified);
        }

        assert_eq!(NameVerification::Always.decide(&check(false, public, true)), NameDecision::Rejected);
        assert_eq!(
            NameVerification::Balanced.decide(&check(false, public, true)),
            NameDecision::AllowedUnverified
        );
        assert_eq!(NameVerification::Balanced.decide(&check(false, public, false)), NameDecision::Rejected);
        assert_eq!(
            NameVerification::Never.decide(&check(false, public, false)),
            NameDecision::AllowedUnverified
        );

        let strict_lan = NameCheck { allow_lan: false, ..check(false, lan, false) };
        assert_eq!(NameVerification::Always.decide(&strict_lan), NameDecision::Rejected);
    }

    #[test]
    fn test_lan_addresses() {
        assert!(is_lan_address(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
        assert!(is_lan_address(IpAddr::V4(Ipv4Addr::new(172, 16, 5, 5))));
        assert!(is_lan_address(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert!(is_lan_address("fe80::1".parse().unwrap()));
        assert!(!is_lan_address(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1))));
        assert!(!is_lan_address("2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn test_policy_toml_names() {
        #[derive(Deserialize)]
        struct Doc {
            mode: NameVerification,
        }
        let doc: Doc = toml::from_str("mode = \"never\"").unwrap();
        assert_eq!(doc.mode, NameVerification::Never);
    }
}
