use http::header::HOST;
use http::uri::{Authority, PathAndQuery, Scheme};
use http::{Request, Uri};
use percent_encoding::percent_decode_str;

/// Percent-decoded path of `uri`
///
/// Escapes that do not decode are kept as written, and decoded bytes that
/// are not UTF-8 are replaced.
///
/// ```
/// use echosrv::handler::decoded_path;
///
/// let uri: http::Uri = "/a%20b/c%2Fd?q=%20".parse().unwrap();
/// assert_eq!(decoded_path(&uri), "/a b/c/d");
/// ```
pub fn decoded_path(uri: &Uri) -> String {
    percent_decode_str(uri.path()).decode_utf8_lossy().into_owned()
}

/// Moves the `Host` header into the request URI's authority
///
/// Hosting servers call this before handing a request to a handler, so the
/// handler sees the host as part of the target rather than as a header.
/// Every `Host` value is removed; the first one becomes the authority unless
/// the URI already carries one or the value is not a valid authority.
pub fn move_host_to_authority<B>(request: &mut Request<B>) {
    let Some(host) = request.headers_mut().remove(HOST) else {
        return;
    };
    if request.uri().authority().is_some() {
        return;
    }
    let Ok(authority) = Authority::try_from(host.as_bytes()) else {
        return;
    };

    let mut parts = request.uri().clone().into_parts();
    parts.scheme = Some(Scheme::HTTP);
    parts.authority = Some(authority);
    if parts.path_and_query.is_none() {
        parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    if let Ok(uri) = Uri::from_parts(parts) {
        *request.uri_mut() = uri;
    }
}
