//! Price feed published in a GitHub repository.
//!
//! The live feed is the file on the default branch. Past days are recovered from the file history:
//! the commit listing finds a revision, and the raw file is fetched at that revision.

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;

use crate::{
    prelude::*,
    retry::RetryPolicy,
    source::{FetchError, PriceSource},
};

const LIVE_TIMEOUT: Duration = Duration::from_secs(10);
const HISTORICAL_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub struct GitHub {
    client: Client,
    raw_base_url: Url,
    commits_url: Url,
    live_url: Url,
    file_path: String,
    live_retry: RetryPolicy,
}

impl GitHub {
    pub fn try_new(raw_base_url: Url, api_base_url: Url, file_path: &str, branch: &str) -> Result<Self> {
        ensure!(!raw_base_url.cannot_be_a_base(), "invalid raw base URL `{raw_base_url}`");

        let client = Client::builder().user_agent(USER_AGENT).build()?;
        let file_path = file_path.trim_matches('/').to_owned();
        let live_url = file_url(&raw_base_url, branch, &file_path);
        let mut commits_url = api_base_url;
        commits_url
            .path_segments_mut()
            .map_err(|()| anyhow!("invalid API base URL"))?
            .pop_if_empty()
            .push("commits");
        Ok(Self {
            client,
            raw_base_url,
            commits_url,
            live_url,
            file_path,
            live_retry: RetryPolicy::default(),
        })
    }

    pub fn with_live_retry(mut self, live_retry: RetryPolicy) -> Self {
        self.live_retry = live_retry;
        self
    }

    async fn get_text(&self, url: &Url, timeout: Duration) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|error| FetchError::from_reqwest(url, error))?;
        check_status(url, response)?.text().await.map_err(|error| FetchError::from_reqwest(url, error))
    }

    async fn find_commit(&self, since: DateTime<Tz>) -> Result<Commit, FetchError> {
        let mut url = self.commits_url.clone();
        url.query_pairs_mut()
            .append_pair("path", &self.file_path)
            .append_pair("since", &since.to_rfc3339())
            .append_pair("per_page", "1");
        let response = self
            .client
            .get(url.clone())
            .timeout(HISTORICAL_TIMEOUT)
            .send()
            .await
            .map_err(|error| FetchError::from_reqwest(&url, error))?;
        let commits: Vec<Commit> = check_status(&url, response)?
            .json()
            .await
            .map_err(|error| FetchError::from_reqwest(&url, error))?;
        commits.into_iter().next().ok_or(FetchError::NoCommits { date: since.date_naive() })
    }
}

#[async_trait]
impl PriceSource for GitHub {
    #[instrument(skip_all, fields(url = %self.live_url))]
    async fn fetch_live(&self) -> Result<String, FetchError> {
        info!("fetching the live feed…");
        let content = self.live_retry.run(move || self.get_text(&self.live_url, LIVE_TIMEOUT)).await?;
        info!(n_bytes = content.len(), "fetched");
        Ok(content)
    }

    #[instrument(skip_all, fields(since = %since))]
    async fn fetch_historical(&self, since: DateTime<Tz>) -> Result<String, FetchError> {
        info!("looking up the revision…");
        let commit = self.find_commit(since).await?;
        info!(sha = commit.sha, "fetching the historical feed…");
        let url = file_url(&self.raw_base_url, &commit.sha, &self.file_path);
        let content = self.get_text(&url, HISTORICAL_TIMEOUT).await?;
        info!(n_bytes = content.len(), "fetched");
        Ok(content)
    }
}

#[derive(Deserialize)]
struct Commit {
    sha: String,
}

/// `{base}/{revision}/{path}`.
fn file_url(base: &Url, revision: &str, file_path: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(revision).extend(file_path.split('/'));
    }
    url
}

fn check_status(url: &Url, response: Response) -> Result<Response, FetchError> {
    match response.status() {
        StatusCode::NOT_FOUND => Err(FetchError::NotFound { url: url.clone() }),
        status if !status.is_success() => Err(FetchError::Status { url: url.clone(), status }),
        _ => Ok(response),
    }
}
