/// Cookie carrying the affinity token, shared with the load-balancing layer
pub const AFFINITY_COOKIE_NAME: &str = "_TRAEFIK_BACKEND";

/// Response header exposing the affinity token to clients
pub const AFFINITY_HEADER_NAME: &str = "X-Traefik-Backend";

/// Query-string key accepted as an affinity hint when the cookie is absent.
/// Intentionally the same literal as the header name.
pub const AFFINITY_QUERY_NAME: &str = "X-Traefik-Backend";
