//! Web search for recognized text.

use url::Url;

use crate::error::{Error, Result};

/// Appends `query` to `base` as the URL-encoded `q` parameter.
pub fn search_url(base: &str, query: &str) -> Result<Url> {
    Url::parse_with_params(base, &[("q", query)])
        .map_err(|e| Error::Search(format!("invalid search URL {base:?}: {e}")))
}

/// Opens a search for `query` in the default browser.
pub fn open(base: &str, query: &str) -> Result<()> {
    let url = search_url(base, query)?;
    log::info!("Opening {url}");
    webbrowser::open(url.as_str()).map_err(|e| Error::Search(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_is_encoded() {
        let url = search_url("https://www.google.com/search", "HELLO WORLD&more").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.google.com/search?q=HELLO+WORLD%26more"
        );
    }

    #[test]
    fn bad_base_is_rejected() {
        assert!(search_url("not a url", "x").is_err());
    }
}
