//! Provides limited SASL authentication mechanisms

use std::fmt::{self, Debug, Display, Formatter};

use crate::base64;

/// Contains user credentials
#[derive(PartialEq, Eq, Clone, Hash)]
pub struct Credentials {
    authentication_identity: String,
    secret: String,
}

impl Credentials {
    /// Create a `Credentials` struct from username and password
    pub fn new(username: String, password: String) -> Credentials {
        Credentials {
            authentication_identity: username,
            secret: password,
        }
    }

    /// The user name
    pub fn username(&self) -> &str {
        &self.authentication_identity
    }

    /// An empty user name means the credentials must not be offered
    pub(crate) fn is_empty(&self) -> bool {
        self.authentication_identity.is_empty()
    }
}

impl<S, T> From<(S, T)> for Credentials
where
    S: Into<String>,
    T: Into<String>,
{
    fn from((username, password): (S, T)) -> Self {
        Credentials::new(username.into(), password.into())
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").finish()
    }
}

/// Represents authentication mechanisms
#[derive(PartialEq, Eq, Copy, Clone, Hash, Debug)]
pub enum Mechanism {
    /// PLAIN authentication mechanism, defined in
    /// [RFC 4616](https://tools.ietf.org/html/rfc4616)
    ///
    /// Sent with its initial response, in one line.
    Plain,
    /// LOGIN authentication mechanism
    /// Obsolete but needed for some providers (like office365)
    ///
    /// Defined in [draft-murchison-sasl-login-00](https://www.ietf.org/archive/id/draft-murchison-sasl-login-00.txt).
    Login,
}

impl Display for Mechanism {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Mechanism::Plain => "PLAIN",
            Mechanism::Login => "LOGIN",
        })
    }
}

impl Mechanism {
    /// Does the mechanism supports initial response
    pub fn supports_initial_response(self) -> bool {
        match self {
            Mechanism::Plain => true,
            Mechanism::Login => false,
        }
    }

    /// Lines to send, in order, one per server prompt
    ///
    /// The first one is the `AUTH` command itself. Each following line answers
    /// one `334` challenge.
    pub fn responses(self, credentials: &Credentials) -> Vec<String> {
        match self {
            Mechanism::Plain => vec![format!(
                "AUTH {} {}",
                self,
                base64::encode(format!(
                    "\u{0}{}\u{0}{}",
                    credentials.authentication_identity, credentials.secret
                ))
            )],
            Mechanism::Login => vec![
                format!("AUTH {self}"),
                base64::encode(&credentials.authentication_identity),
                base64::encode(&credentials.secret),
            ],
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Credentials, Mechanism};

    #[test]
    fn test_plain() {
        let credentials = Credentials::new("user".to_owned(), "password".to_owned());

        assert_eq!(
            Mechanism::Plain.responses(&credentials),
            vec!["AUTH PLAIN AHVzZXIAcGFzc3dvcmQ=".to_owned()]
        );
        assert!(Mechanism::Plain.supports_initial_response());
    }

    #[test]
    fn test_login() {
        let credentials = Credentials::new("alice".to_owned(), "wonderland".to_owned());

        assert_eq!(
            Mechanism::Login.responses(&credentials),
            vec![
                "AUTH LOGIN".to_owned(),
                "YWxpY2U=".to_owned(),
                "d29uZGVybGFuZA==".to_owned(),
            ]
        );
        assert!(!Mechanism::Login.supports_initial_response());
    }

    #[test]
    fn test_from_user_pass_for_credentials() {
        assert_eq!(
            Credentials::new("alice".to_owned(), "wonderland".to_owned()),
            Credentials::from(("alice", "wonderland"))
        );
        assert!(Credentials::from(("", "")).is_empty());
    }

    #[test]
    fn test_debug_hides_secret() {
        let credentials = Credentials::from(("alice", "wonderland"));
        assert_eq!(format!("{credentials:?}"), "Credentials");
    }
}
