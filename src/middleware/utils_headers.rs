use super::{affinity_cookie::AffinityCookie, AffinityCookieError};
use anyhow::Result;
use bytes::BufMut;
use http::{header, HeaderMap, HeaderName, HeaderValue};

// ////////////////////////////////////////////////////
// // Functions to manipulate request/response headers

/// Check whether the request's `Cookie` header(s) already carry a crumb with the given
/// name, whatever its value. Presence alone is what suppresses the query hint, so
/// existing stickiness is never overridden by this layer.
pub(super) fn has_cookie_crumb(headers: &HeaderMap, expected_cookie_name: &str) -> bool {
  headers
    .get_all(header::COOKIE)
    .iter()
    .flat_map(|v| v.to_str().unwrap_or("").split(';'))
    .map(|crumb| crumb.trim())
    .filter(|crumb| !crumb.is_empty())
    .any(|crumb| crumb.split('=').next().unwrap_or_default().trim_end() == expected_cookie_name)
}

/// Merge a synthesized cookie crumb into the request's `Cookie` header as if the client
/// had sent it, aligning any existing cookie lines into a single line first.
/// Sometimes violates [RFC6265](https://www.rfc-editor.org/rfc/rfc6265#section-5.4) (for http/1.1).
/// This is allowed in RFC7540 (for http/2) as mentioned [here](https://stackoverflow.com/questions/4843556/in-http-specification-what-is-the-string-that-separates-cookies).
pub(super) fn merge_cookie_crumb(headers: &mut HeaderMap, cookie: AffinityCookie) -> Result<()> {
  let crumb: String = cookie.into();
  let cookies = headers
    .iter()
    .filter(|(k, _)| **k == header::COOKIE)
    .map(|(_, v)| v.to_str().unwrap_or(""))
    .filter(|v| !v.is_empty())
    .chain(std::iter::once(crumb.as_str()))
    .collect::<Vec<_>>()
    .join("; ");
  let new_value = HeaderValue::from_bytes(cookies.as_bytes())?;
  headers.remove(header::COOKIE);
  headers.insert(header::COOKIE, new_value);
  Ok(())
}

/// Take the affinity token from the response's accumulated `Set-Cookie` entries.
/// The first entry whose cookie name matches decides the outcome: when its value is
/// empty there is no affinity signal, and later entries are not consulted. Malformed
/// or empty entries are skipped, never an error.
pub(super) fn extract_affinity_from_set_cookie(headers: &HeaderMap, expected_cookie_name: &str) -> Option<String> {
  headers
    .get_all(header::SET_COOKIE)
    .iter()
    .find_map(
      |entry| match AffinityCookie::try_from(entry.to_str().unwrap_or(""), expected_cookie_name) {
        Ok(cookie) => Some(Some(cookie.value)),
        Err(AffinityCookieError::NoAffinityCookieValue) => Some(None),
        Err(_) => None,
      },
    )
    .flatten()
}

/// Append the affinity cookie to the response as a new `Set-Cookie` entry.
/// Set-Cookie response header could be in multiple lines.
/// https://developer.mozilla.org/ja/docs/Web/HTTP/Headers/Set-Cookie
pub(super) fn append_set_cookie_entry(headers: &mut HeaderMap, cookie: AffinityCookie) -> Result<()> {
  let cookie_string: String = cookie.into();
  headers.append(header::SET_COOKIE, cookie_string.parse::<HeaderValue>()?);
  Ok(())
}

/// Append header entry with comma according to [RFC9110](https://datatracker.ietf.org/doc/html/rfc9110)
pub(super) fn append_header_entry_with_comma(headers: &mut HeaderMap, key: &str, value: &str) -> Result<()> {
  match headers.entry(HeaderName::from_bytes(key.as_bytes())?) {
    header::Entry::Vacant(entry) => {
      entry.insert(value.parse::<HeaderValue>()?);
    }
    header::Entry::Occupied(mut entry) => {
      let mut new_value = Vec::<u8>::with_capacity(entry.get().as_bytes().len() + 2 + value.len());
      new_value.put_slice(entry.get().as_bytes());
      new_value.put_slice(b", ");
      new_value.put_slice(value.as_bytes());
      entry.insert(HeaderValue::from_bytes(&new_value)?);
    }
  }

  Ok(())
}

/// Overwrite header entry if exist
pub(super) fn add_header_entry_overwrite_if_exist(headers: &mut HeaderMap, key: &str, value: &str) -> Result<()> {
  match headers.entry(HeaderName::from_bytes(key.as_bytes())?) {
    header::Entry::Vacant(entry) => {
      entry.insert(value.parse::<HeaderValue>()?);
    }
    header::Entry::Occupied(mut entry) => {
      entry.insert(HeaderValue::from_bytes(value.as_bytes())?);
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::constants::AFFINITY_COOKIE_NAME;

  #[test]
  fn cookie_crumb_found_in_single_line() {
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, "foo=bar; _TRAEFIK_BACKEND=http://1.2.3.4".parse().unwrap());
    assert!(has_cookie_crumb(&headers, AFFINITY_COOKIE_NAME));
  }

  #[test]
  fn cookie_crumb_found_across_multiple_lines() {
    let mut headers = HeaderMap::new();
    headers.append(header::COOKIE, "foo=bar".parse().unwrap());
    headers.append(header::COOKIE, "_TRAEFIK_BACKEND=http://1.2.3.4".parse().unwrap());
    assert!(has_cookie_crumb(&headers, AFFINITY_COOKIE_NAME));
  }

  #[test]
  fn cookie_crumb_presence_ignores_the_value() {
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, "_TRAEFIK_BACKEND=".parse().unwrap());
    assert!(has_cookie_crumb(&headers, AFFINITY_COOKIE_NAME));

    // even a bare crumb without `=` counts as present
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, "_TRAEFIK_BACKEND".parse().unwrap());
    assert!(has_cookie_crumb(&headers, AFFINITY_COOKIE_NAME));
  }

  #[test]
  fn cookie_crumb_name_match_is_exact() {
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, "_TRAEFIK_BACKEND_OLD=x; other=y".parse().unwrap());
    assert!(!has_cookie_crumb(&headers, AFFINITY_COOKIE_NAME));
    assert!(!has_cookie_crumb(&HeaderMap::new(), AFFINITY_COOKIE_NAME));
  }

  #[test]
  fn merge_crumb_into_empty_headers() {
    let mut headers = HeaderMap::new();
    let cookie = AffinityCookie::build(AFFINITY_COOKIE_NAME, "http://1.2.3.4").unwrap();
    merge_cookie_crumb(&mut headers, cookie).unwrap();
    assert_eq!(headers.get(header::COOKIE).unwrap(), "_TRAEFIK_BACKEND=http://1.2.3.4");
  }

  #[test]
  fn merge_crumb_aligns_existing_lines() {
    let mut headers = HeaderMap::new();
    headers.append(header::COOKIE, "foo=bar".parse().unwrap());
    headers.append(header::COOKIE, "baz=qux".parse().unwrap());
    let cookie = AffinityCookie::build(AFFINITY_COOKIE_NAME, "http://1.2.3.4").unwrap();
    merge_cookie_crumb(&mut headers, cookie).unwrap();

    assert_eq!(headers.get_all(header::COOKIE).iter().count(), 1);
    assert_eq!(
      headers.get(header::COOKIE).unwrap(),
      "foo=bar; baz=qux; _TRAEFIK_BACKEND=http://1.2.3.4"
    );
  }

  #[test]
  fn first_matching_set_cookie_entry_decides() {
    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, "_TRAEFIK_BACKEND=http://1.2.3.4".parse().unwrap());
    headers.append(header::SET_COOKIE, "_TRAEFIK_BACKEND=http://9.9.9.9".parse().unwrap());
    assert_eq!(
      extract_affinity_from_set_cookie(&headers, AFFINITY_COOKIE_NAME),
      Some("http://1.2.3.4".to_string())
    );
  }

  #[test]
  fn first_matching_entry_with_empty_value_means_no_signal() {
    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, "_TRAEFIK_BACKEND=".parse().unwrap());
    headers.append(header::SET_COOKIE, "_TRAEFIK_BACKEND=http://9.9.9.9".parse().unwrap());
    assert_eq!(extract_affinity_from_set_cookie(&headers, AFFINITY_COOKIE_NAME), None);
  }

  #[test]
  fn malformed_entries_are_skipped() {
    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, "".parse().unwrap());
    headers.append(header::SET_COOKIE, "no-separator".parse().unwrap());
    headers.append(header::SET_COOKIE, "other=cookie".parse().unwrap());
    headers.append(
      header::SET_COOKIE,
      "_TRAEFIK_BACKEND=http://1.2.3.4; Path=/path".parse().unwrap(),
    );
    assert_eq!(
      extract_affinity_from_set_cookie(&headers, AFFINITY_COOKIE_NAME),
      Some("http://1.2.3.4".to_string())
    );
    assert_eq!(extract_affinity_from_set_cookie(&HeaderMap::new(), AFFINITY_COOKIE_NAME), None);
  }

  #[test]
  fn append_with_comma_works() {
    let mut headers = HeaderMap::new();
    append_header_entry_with_comma(&mut headers, "access-control-expose-headers", "Foo").unwrap();
    assert_eq!(headers.get("access-control-expose-headers").unwrap(), "Foo");

    append_header_entry_with_comma(&mut headers, "access-control-expose-headers", "Bar").unwrap();
    assert_eq!(headers.get("access-control-expose-headers").unwrap(), "Foo, Bar");
  }

  #[test]
  fn overwrite_if_exist_works() {
    let mut headers = HeaderMap::new();
    add_header_entry_overwrite_if_exist(&mut headers, "x-traefik-backend", "http://1.2.3.4").unwrap();
    add_header_entry_overwrite_if_exist(&mut headers, "x-traefik-backend", "http://9.9.9.9").unwrap();
    assert_eq!(headers.get("x-traefik-backend").unwrap(), "http://9.9.9.9");
  }
}
