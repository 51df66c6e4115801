use url::Url;

/// Extracts the user id carried in the `param` query parameter of `href`.
///
/// The first occurrence wins; an empty value counts as absent. `+` decodes
/// to a space and percent-escapes are decoded.
pub fn user_id_from_params(href: &str, param: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == param)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
