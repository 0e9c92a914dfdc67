use std::{borrow::Cow, time::Duration};

use url::Url;

use super::{
    authentication::Credentials, error, extension::ClientId, Error, SendOptions, SMTP_PORT,
    SUBMISSIONS_PORT,
};

/// Parses `smtp://` and `smtps://` connection URLs into a host and its send options
pub(crate) fn from_connection_url(connection_url: &str) -> Result<(String, SendOptions), Error> {
    let connection_url = Url::parse(connection_url).map_err(error::client)?;

    let host = connection_url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| error::client("smtp host undefined"))?
        .to_owned();

    let mut options = match connection_url.scheme() {
        "smtp" => SendOptions::new().port(connection_url.port().unwrap_or(SMTP_PORT)),
        "smtps" => SendOptions::new()
            .tls(true)
            .port(connection_url.port().unwrap_or(SUBMISSIONS_PORT)),
        scheme => return Err(error::client(format!("Unknown scheme '{scheme}'"))),
    };

    // use the path segment of the URL as name in the HELO / EHLO command
    if connection_url.path().len() > 1 {
        let name = connection_url.path().trim_matches('/').to_owned();
        options = options.hello_name(ClientId::Domain(name));
    }

    if let Some(timeout) = connection_url
        .query_pairs()
        .find(|(k, _)| k == "timeout")
        .map(|(_, v)| v.into_owned())
    {
        let secs = timeout
            .parse::<u64>()
            .map_err(|_| error::client(format!("invalid timeout '{timeout}'")))?;
        options = options.timeout(Duration::from_secs(secs));
    }

    if !connection_url.username().is_empty() || connection_url.password().is_some() {
        let percent_decode = |s: &str| {
            percent_encoding::percent_decode_str(s)
                .decode_utf8()
                .map(Cow::into_owned)
                .map_err(error::client)
        };
        let credentials = Credentials::new(
            percent_decode(connection_url.username())?,
            percent_decode(connection_url.password().unwrap_or_default())?,
        );
        options = options.credentials(credentials);
    }

    Ok((host, options))
}
