use super::{AffinityCookieError, AffinityCookieResult};
use derive_builder::Builder;
use std::borrow::Cow;

#[derive(Debug, Clone, Builder)]
/// Cookie name/value pair carrying the affinity token, used for COOKIE in req
/// and SET-COOKIE in res
pub struct AffinityCookie {
  #[builder(setter(custom))]
  /// Cookie name indicating the affinity cookie
  pub name: String,
  #[builder(setter(custom))]
  /// Affinity token: opaque id of the backend the client is pinned to
  pub value: String,
}
impl<'a> AffinityCookieBuilder {
  pub fn name(&mut self, v: impl Into<Cow<'a, str>>) -> &mut Self {
    self.name = Some(v.into().to_string());
    self
  }
  pub fn value(&mut self, v: impl Into<Cow<'a, str>>) -> &mut Self {
    self.value = Some(v.into().to_string());
    self
  }
}
impl AffinityCookie {
  /// Build a pair for a freshly resolved token
  pub fn build<'a>(name: impl Into<Cow<'a, str>>, value: impl Into<Cow<'a, str>>) -> AffinityCookieResult<Self> {
    AffinityCookieBuilder::default()
      .name(name)
      .value(value)
      .build()
      .map_err(|_| AffinityCookieError::FailedToBuildAffinityCookie)
  }

  /// Extract the pair from a single `Set-Cookie` line.
  /// Only the first `;`-delimited fragment is the name/value pair; attributes after it
  /// (`Path`, `Max-Age`, ...) are ignored. The name must match `expected_name` exactly,
  /// and the value runs from the first `=` to the end of the fragment, so tokens may
  /// themselves contain `=`.
  pub fn try_from(set_cookie_value: &str, expected_name: &str) -> AffinityCookieResult<Self> {
    let first_fragment = set_cookie_value.trim().split(';').next().unwrap_or_default().trim();
    if first_fragment.is_empty() {
      return Err(AffinityCookieError::EmptyCookieFragment);
    }
    let Some(separator) = first_fragment.find('=') else {
      return Err(AffinityCookieError::InvalidCookieStructure);
    };
    let (name, value) = (&first_fragment[..separator], &first_fragment[separator + 1..]);
    if name != expected_name {
      return Err(AffinityCookieError::NotAffinityCookie);
    }
    if value.is_empty() {
      return Err(AffinityCookieError::NoAffinityCookieValue);
    }
    Ok(AffinityCookie {
      name: expected_name.to_string(),
      value: value.to_string(),
    })
  }
}

impl From<AffinityCookie> for String {
  /// Render as a bare `name=value` pair, the shape written to `Set-Cookie` and merged
  /// into a request `Cookie` line
  fn from(cookie: AffinityCookie) -> Self {
    format!("{}={}", cookie.name, cookie.value)
  }
}
