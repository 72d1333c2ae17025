//! Connection secrets
//!
//! A data source's connection string usually embeds a password. It is kept in
//! a [`ConnectionSecret`] so that formatting it with `{}` or `{:?}` never prints
//! the raw text; the only way to get at the string is [`ConnectionSecret::expose`].

use serde::Deserialize;
use url::Url;

/// Marker written in place of secret material.
pub const REDACTED: &str = "***REDACTED***";

/// Passwords shorter than this would match ordinary words in error text.
pub const MIN_BARE_PASSWORD: usize = 4;

/// An opaque connection string for a tenant data source.
///
/// Deliberately not `Serialize`: it cannot end up in a response body by
/// accident.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ConnectionSecret(String);

impl ConnectionSecret {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw connection string. Only the gateway and drivers call this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Parse the secret as a URL, if it is one.
    pub fn as_url(&self) -> Option<Url> {
        Url::parse(self.0.trim()).ok()
    }

    /// The secret with its password replaced, suitable for display.
    ///
    /// Falls back to the full marker when the secret is not a URL.
    pub fn masked(&self) -> String {
        match self.as_url() {
            Some(mut url) => {
                if url.password().is_some() && url.set_password(Some("***")).is_err() {
                    return REDACTED.to_string();
                }
                url.to_string()
            }
            None => REDACTED.to_string(),
        }
    }

    /// Remove every verbatim occurrence of this secret from `text`.
    ///
    /// Both the whole connection string and its password component are
    /// replaced, the password in raw and percent-decoded form. A password
    /// shorter than [`MIN_BARE_PASSWORD`] characters is only replaced in its
    /// `user:password@` position.
    pub fn redact(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (needle, replacement) in self.sensitive_fragments() {
            if !needle.is_empty() && out.contains(needle.as_str()) {
                out = out.replace(needle.as_str(), &replacement);
            }
        }
        out
    }

    // Longest first so the whole string is replaced before its password.
    fn sensitive_fragments(&self) -> Vec<(String, String)> {
        let mut fragments = vec![
            (self.0.clone(), REDACTED.to_string()),
            (self.0.trim().to_string(), REDACTED.to_string()),
        ];
        if let Some(url) = self.as_url() {
            if let Some(password) = url.password() {
                let mut forms = vec![password.to_string()];
                forms.extend(percent_decode(password));
                for form in forms {
                    if form.chars().count() < MIN_BARE_PASSWORD {
                        fragments.push((format!(":{form}@"), format!(":{REDACTED}@")));
                    } else {
                        fragments.push((form, REDACTED.to_string()));
                    }
                }
            }
        }
        fragments.sort_by_key(|(needle, _)| std::cmp::Reverse(needle.len()));
        fragments.dedup_by(|a, b| a.0 == b.0);
        fragments
    }
}

pub(crate) fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

impl From<String> for ConnectionSecret {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for ConnectionSecret {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl std::fmt::Debug for ConnectionSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ConnectionSecret").field(&REDACTED).finish()
    }
}

impl std::fmt::Display for ConnectionSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(REDACTED)
    }
}
