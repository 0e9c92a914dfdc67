use std::fmt::{Display, Formatter, Result as FmtResult, Write};

use super::mimebody::{encode_header_text, is_plain_header_text};
use crate::address::{Address, AddressError};

/// Represents an email address with an optional display name.
///
/// Used for the sender of a [`Message`](super::Message). Rendered as
/// `"Some Name" <user@domain.tld>` when a name is set, or as the bare address.
///
/// # Examples
///
/// ```
/// # use mxmail::{Address, Mailbox};
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let mailbox = Mailbox::new(Some("Example Shop".into()), "shop@example.com".parse()?);
/// assert_eq!(mailbox.to_string(), r#""Example Shop" <shop@example.com>"#);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct Mailbox {
    /// The name associated with the address.
    pub name: Option<String>,

    /// The email address itself.
    pub email: Address,
}

impl Mailbox {
    /// Creates a new `Mailbox` using an email address and an optional display name.
    pub fn new(name: Option<String>, email: Address) -> Self {
        Mailbox { name, email }
    }
}

impl Display for Mailbox {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if let Some(name) = &self.name {
            let name = name.trim();
            if !name.is_empty() {
                write_name(f, name)?;
                f.write_str(" <")?;
                self.email.fmt(f)?;
                return f.write_char('>');
            }
        }
        self.email.fmt(f)
    }
}

impl<S: Into<String>, T: AsRef<str>> TryFrom<(S, T)> for Mailbox {
    type Error = AddressError;

    fn try_from(header: (S, T)) -> Result<Self, Self::Error> {
        let (name, address) = header;
        Ok(Mailbox::new(Some(name.into()), address.as_ref().parse()?))
    }
}

impl From<Address> for Mailbox {
    fn from(value: Address) -> Self {
        Mailbox::new(None, value)
    }
}

fn write_name(f: &mut Formatter<'_>, name: &str) -> FmtResult {
    if !is_plain_header_text(name) {
        return f.write_str(&encode_header_text(name));
    }

    // Quoted string: https://datatracker.ietf.org/doc/html/rfc2822#section-3.2.5
    f.write_char('"')?;
    for c in name.chars() {
        if matches!(c, '"' | '\\') {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    f.write_char('"')
}

#[cfg(test)]
mod test {
    use super::Mailbox;

    #[test]
    fn mailbox_format_address_only() {
        let mailbox = Mailbox::new(None, "kayo@example.com".parse().unwrap());
        assert_eq!(mailbox.to_string(), "kayo@example.com");
    }

    #[test]
    fn mailbox_format_address_with_name() {
        let mailbox = Mailbox::try_from(("K.", "kayo@example.com")).unwrap();
        assert_eq!(mailbox.to_string(), r#""K." <kayo@example.com>"#);
    }

    #[test]
    fn mailbox_format_blank_name() {
        let mailbox = Mailbox::try_from(("  ", "kayo@example.com")).unwrap();
        assert_eq!(mailbox.to_string(), "kayo@example.com");
    }

    #[test]
    fn mailbox_format_escapes_quotes() {
        let mailbox = Mailbox::try_from((r#"The "Best" Shop"#, "shop@example.com")).unwrap();
        assert_eq!(
            mailbox.to_string(),
            r#""The \"Best\" Shop" <shop@example.com>"#
        );
    }

    #[test]
    fn mailbox_format_non_ascii_name() {
        let mailbox = Mailbox::try_from(("Kayo ☺", "kayo@example.com")).unwrap();
        assert_eq!(
            mailbox.to_string(),
            "=?utf-8?b?S2F5byDimLo=?= <kayo@example.com>"
        );
    }

    #[test]
    fn mailbox_format_name_with_line_break() {
        let mailbox = Mailbox::try_from(("Shop\r\nBcc: x@evil.example", "shop@example.com")).unwrap();
        assert_eq!(
            mailbox.to_string(),
            "=?utf-8?b?U2hvcA0KQmNjOiB4QGV2aWwuZXhhbXBsZQ==?= <shop@example.com>"
        );
    }
}
