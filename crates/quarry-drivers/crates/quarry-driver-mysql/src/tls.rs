//! MySQL TLS support

use mysql_async::SslOpts;
use quarry_core::TlsMode;

/// Build `SslOpts` for `mode`, or `None` for a plain connection.
///
/// mysql_async cannot fall back to plaintext after offering TLS, so `prefer`
/// connects without it.
pub fn build_ssl_opts(mode: TlsMode) -> Option<SslOpts> {
    match mode {
        TlsMode::Disable | TlsMode::Prefer => None,
        TlsMode::Require => Some(
            SslOpts::default()
                .with_danger_accept_invalid_certs(true)
                .with_danger_skip_domain_validation(true),
        ),
        TlsMode::VerifyCa => Some(SslOpts::default().with_danger_skip_domain_validation(true)),
        TlsMode::VerifyFull => Some(SslOpts::default()),
    }
}

#[cfg(test)]
mod tests;
