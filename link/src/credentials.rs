//! Request credentials for a site.
//!
//! A statement is authorized either by the site's api key or by the session
//! cookies a user obtained through [`Session::login`](crate::Session::login).

/// Header carrying the api key
pub const API_KEY_HEADER: &str = "Authorization";
pub const COOKIE_HEADER: &str = "Cookie";
pub const SET_COOKIE_HEADER: &str = "Set-Cookie";

/// Credentials attached to one request.
///
/// # Examples
///
/// ```rust
/// use cloudsite_link::Credentials;
///
/// let key = Credentials::api_key("8f14e45f-ceea-467f-a0e6-b2c0b0e2a8f1");
/// assert!(key.is_authenticated());
///
/// let anonymous = Credentials::none();
/// assert!(!anonymous.is_authenticated());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    /// Site api key, sent verbatim in `Authorization`
    ApiKey(String),

    /// Session cookies (`name=value`), sent in one `Cookie` header
    Cookies(Vec<String>),

    #[default]
    None,
}

impl Credentials {
    pub fn api_key(key: impl Into<String>) -> Self {
        Self::ApiKey(key.into())
    }

    pub fn cookies(cookies: Vec<String>) -> Self {
        Self::Cookies(cookies)
    }

    pub fn none() -> Self {
        Self::None
    }

    /// Cookies win over the api key when both are at hand.
    pub fn prefer_cookies(cookies: &[String], api_key: Option<&str>) -> Self {
        if !cookies.is_empty() {
            Self::Cookies(cookies.to_vec())
        } else {
            api_key.map_or(Self::None, Self::api_key)
        }
    }

    /// Append the authorization header, if any.
    ///
    /// - ApiKey: `Authorization: <key>`
    /// - Cookies: `Cookie: a=1; b=2`
    /// - None: nothing
    pub fn apply(&self, headers: &mut Vec<(String, String)>) {
        match self {
            Self::ApiKey(key) => headers.push((API_KEY_HEADER.to_string(), key.clone())),
            Self::Cookies(cookies) if !cookies.is_empty() => {
                headers.push((COOKIE_HEADER.to_string(), cookies.join("; ")))
            }
            Self::Cookies(_) | Self::None => {}
        }
    }

    pub fn is_authenticated(&self) -> bool {
        match self {
            Self::ApiKey(_) => true,
            Self::Cookies(cookies) => !cookies.is_empty(),
            Self::None => false,
        }
    }
}

/// `name=value` pairs from `Set-Cookie` header values, attributes dropped.
pub fn cookies_from_set_cookie<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .map(str::to_string)
        .collect()
}
