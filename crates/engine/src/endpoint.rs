//! API operations as (method, URL template) pairs

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use crate::error::{ScenarioError, ScenarioResult};

/// HTTP methods a scenario can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }

    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Patch => reqwest::Method::PATCH,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            _ => Err(format!("Unsupported HTTP method: {}", s)),
        }
    }
}

/// One API operation. The URL is relative to the environment base URL and
/// may contain `{name}` placeholders.
///
/// ```
/// use scenario_engine::{EndPoint, HttpMethod};
///
/// const DELETE_SERIES: EndPoint = EndPoint::new(HttpMethod::Delete, "/todo/series/partner/{slug}/");
/// let resolved = DELETE_SERIES.format(&[("slug", "weekly-review")]).unwrap();
/// assert_eq!(resolved.url(), "/todo/series/partner/weekly-review/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndPoint {
    method: HttpMethod,
    url: Cow<'static, str>,
}

impl EndPoint {
    pub const fn new(method: HttpMethod, url: &'static str) -> Self {
        Self {
            method,
            url: Cow::Borrowed(url),
        }
    }

    pub fn owned(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: Cow::Owned(url.into()),
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Placeholder names in template order
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut rest = self.url.as_ref();
        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    names.push(&after[..close]);
                    rest = &after[close + 1..];
                }
                None => break,
            }
        }
        names
    }

    /// Resolve placeholders into a new endpoint. Every placeholder needs a
    /// substitution; unused substitutions are ignored.
    pub fn format<V: fmt::Display>(&self, substitutions: &[(&str, V)]) -> ScenarioResult<EndPoint> {
        let mut resolved = String::with_capacity(self.url.len());
        let mut rest = self.url.as_ref();

        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                break;
            };
            let name = &after[..close];
            let value = substitutions
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value)
                .ok_or_else(|| ScenarioError::MissingPlaceholder {
                    placeholder: name.to_string(),
                    template: self.url.to_string(),
                })?;

            resolved.push_str(&rest[..open]);
            resolved.push_str(&value.to_string());
            rest = &after[close + 1..];
        }
        resolved.push_str(rest);

        Ok(EndPoint::owned(self.method, resolved))
    }
}

impl fmt::Display for EndPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}
