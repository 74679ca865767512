use url::{form_urlencoded, Url};

use crate::errors::ProbeError;

/// Server-assigned continuation token, read from response URLs and sent back on retry.
pub const PATH_ID_PARAM: &str = "pathid";
/// Client identity token, appended to saved-URL validation requests.
pub const PUSH_ID_PARAM: &str = "push_id";

pub fn parse_url(raw: &str) -> Result<Url, ProbeError> {
    Url::parse(raw).map_err(|_| ProbeError::InvalidUrl(raw.to_string()))
}

/// First non-empty value of query parameter `name`, if `raw` parses as a URL.
pub fn query_param(raw: &str, name: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let value = url
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())?;
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

pub fn path_id_of(raw: &str) -> Option<String> {
    query_param(raw, PATH_ID_PARAM)
}

/// Append `name=value`, leaving any existing occurrences in place.
pub fn append_param(raw: &str, name: &str, value: &str) -> Result<String, ProbeError> {
    let mut url = parse_url(raw)?;
    url.query_pairs_mut().append_pair(name, value);
    Ok(url.into())
}

/// Set `name=value`, replacing any existing occurrences of `name`.
/// Other parameters keep their original encoding and order.
pub fn merge_param(raw: &str, name: &str, value: &str) -> Result<String, ProbeError> {
    let mut url = parse_url(raw)?;
    let mut query = url
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty() && !names_param(pair, name))
        .collect::<Vec<_>>()
        .join("&");
    if !query.is_empty() {
        query.push('&');
    }
    query.push_str(
        &form_urlencoded::Serializer::new(String::new())
            .append_pair(name, value)
            .finish(),
    );
    url.set_query(Some(&query));
    Ok(url.into())
}

fn names_param(pair: &str, name: &str) -> bool {
    form_urlencoded::parse(pair.as_bytes())
        .next()
        .is_some_and(|(key, _)| key == name)
}
