//! ESMTP features

use std::{
    fmt::{self, Display, Formatter},
    net::{Ipv4Addr, Ipv6Addr},
};

use crate::transport::smtp::authentication::Mechanism;

/// Client identifier, the parameter to `EHLO` and `HELO`
///
/// Unless one is configured, the domain of the sender address is used.
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ClientId {
    /// A fully-qualified domain name
    Domain(String),
    /// An IPv4 address
    Ipv4(Ipv4Addr),
    /// An IPv6 address
    Ipv6(Ipv6Addr),
}

impl Display for ClientId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Domain(ref value) => f.write_str(value),
            Self::Ipv4(ref value) => write!(f, "[{value}]"),
            Self::Ipv6(ref value) => write!(f, "[IPv6:{value}]"),
        }
    }
}

impl From<&str> for ClientId {
    fn from(domain: &str) -> Self {
        Self::Domain(domain.to_owned())
    }
}

/// Whether a `220` greeting contains the word `ESMTP`, in any case
pub(crate) fn announces_esmtp(greeting: &str) -> bool {
    greeting
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|word| word.eq_ignore_ascii_case("esmtp"))
}

/// Mechanism to use when one `250` line of the `EHLO` reply advertises `AUTH`
///
/// `PLAIN` is picked when the server mentions `XOAUTH` or does not offer
/// `LOGIN`. Lines which are not an `AUTH` capability give `None`.
pub(crate) fn auth_mechanism(line: &str) -> Option<Mechanism> {
    let line = line.to_ascii_uppercase();
    let words: Vec<&str> = line
        .split(|c: char| c.is_whitespace() || c == '=' || c == '-')
        .filter(|word| !word.is_empty())
        .collect();

    if !words.contains(&"AUTH") {
        return None;
    }

    let login = words.contains(&"LOGIN");
    let plain = words.contains(&"PLAIN");
    let xoauth = line.contains("XOAUTH");

    match (login, plain) {
        (false, false) => None,
        (true, _) if !xoauth => Some(Mechanism::Login),
        _ => Some(Mechanism::Plain),
    }
}
