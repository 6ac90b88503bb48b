use super::{affinity_cookie::AffinityCookie, utils_headers::merge_cookie_crumb};
use crate::{
  constants::{AFFINITY_COOKIE_NAME, AFFINITY_QUERY_NAME},
  log::*,
};
use anyhow::Result;
use http::{request::Parts, HeaderValue, Uri};
use url::form_urlencoded;

////////////////////////////////////////////////////
// Functions to inspect and augment the request

/// Affinity token hinted through the request's query string, percent-decoded.
/// The first value for the key wins and an empty value means absent. A decoded token
/// that cannot travel as a header value is dropped, never an error.
pub(super) fn affinity_token_from_query(uri: &Uri) -> Option<String> {
  let query = uri.query()?;
  let token = form_urlencoded::parse(query.as_bytes())
    .find(|(key, _)| key == AFFINITY_QUERY_NAME)
    .map(|(_, value)| value.into_owned())?;
  if token.is_empty() {
    return None;
  }
  if HeaderValue::from_str(&token).is_err() {
    debug!("Affinity token from the query string is not header-encodable, ignored");
    return None;
  }
  Some(token)
}

/// Attach the query-derived affinity cookie to the request parts, so that any
/// cookie-based affinity logic downstream observes it as if the client had sent it
pub(super) fn synthesize_affinity_cookie(parts: &mut Parts, token: &str) -> Result<()> {
  let cookie = AffinityCookie::build(AFFINITY_COOKIE_NAME, token)?;
  merge_cookie_crumb(&mut parts.headers, cookie)
}
