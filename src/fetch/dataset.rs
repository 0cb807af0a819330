use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{info, instrument};
use url::Url;

/// Download the dataset at `url_str` and return its body as text.
#[instrument(level = "info", skip(client))]
pub async fn fetch_csv(client: &Client, url_str: &str) -> Result<String> {
    let url = Url::parse(url_str).with_context(|| format!("parsing dataset URL {}", url_str))?;

    let resp = client
        .get(url.as_str())
        .send()
        .await
        .with_context(|| format!("GET {}", url))?
        .error_for_status()?;
    let text = resp
        .text()
        .await
        .with_context(|| format!("reading body from {}", url))?;

    info!(bytes = text.len(), file = %file_name(&url), "fetched dataset");
    Ok(text)
}

/// Last path segment of `url`, used to label the download in logs.
pub fn file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or("dataset.csv")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_uses_last_segment() -> Result<()> {
        let url = Url::parse(
            "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_daily_reports/06-18-2020.csv",
        )?;
        assert_eq!(file_name(&url), "06-18-2020.csv");
        assert_eq!(file_name(&Url::parse("https://example.com/")?), "dataset.csv");
        Ok(())
    }

    #[tokio::test]
    async fn invalid_url_is_rejected_before_any_request() {
        let client = Client::new();
        let err = fetch_csv(&client, "not a url").await.unwrap_err();
        assert!(err.to_string().contains("parsing dataset URL"));
    }
}
