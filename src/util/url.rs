use crate::Error;
use url::Url;

/// Parse a Mautic host (`https://mautic.example.com`, trailing slash optional)
/// into a base URL whose path ends with `/`.
pub(crate) fn normalize_host(raw: &str) -> Result<Url, Error> {
    let bad_host = |message: &str| Error::BadHost {
        host: raw.into(),
        message: message.into(),
        source: None,
    };

    let mut url = Url::parse(raw.trim()).map_err(|err| Error::BadHost {
        host: raw.into(),
        message: "not an absolute URL".into(),
        source: Some(Box::new(err)),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(bad_host("scheme must be http or https"));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(bad_host("host is missing"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(bad_host("host must not include query or fragment"));
    }

    let path = url.path();
    if path != "/" && !path.ends_with('/') {
        url.set_path(&format!("{path}/"));
    }
    Ok(url)
}

pub(crate) fn endpoint_url<'a, I>(base_url: &Url, segments: I) -> Result<Url, Error>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut url = base_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| Error::InvalidConfig {
            message: "base_url must be a hierarchical URL".into(),
            source: None,
        })?;
        path.pop_if_empty();
        for seg in segments {
            path.push(seg);
        }
    }
    Ok(url)
}

pub(crate) fn sanitize_url_for_error(url: &Url) -> Url {
    let mut safe = url.clone();
    safe.set_query(None);
    safe.set_fragment(None);
    let _ = safe.set_username("");
    let _ = safe.set_password(None);
    safe
}
