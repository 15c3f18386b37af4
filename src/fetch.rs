use reqwest::Client;

/// Downloads a timetable page.
///
/// `query` is appended to `url`, letting the service forward its own query
/// string to the upstream page.
pub async fn fetch_page(client: &Client, url: &str, query: &[(String, String)]) -> reqwest::Result<String> {
    log::debug!("Fetching {url}");

    client
        .get(url)
        .query(query)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
}
