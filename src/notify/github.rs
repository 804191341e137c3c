//! GitHub issue notification backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::Notifier;
use crate::error::{AppError, Result};
use crate::models::{MonitorConfig, NotifierConfig};

/// Request body for `POST /repos/{owner}/{repo}/issues`.
#[derive(Debug, Serialize)]
struct NewIssue<'a> {
    title: String,
    body: String,
    labels: &'a [String],
}

/// Opens one GitHub issue per alert.
pub struct GithubIssueNotifier {
    http: Client,
    api_url: String,
    repository: String,
    token: Option<String>,
    labels: Vec<String>,
}

impl GithubIssueNotifier {
    pub fn new(config: &NotifierConfig, monitor: &MonitorConfig) -> Result<Self> {
        let repository = config
            .repository
            .clone()
            .filter(|r| r.split_once('/').is_some_and(|(o, n)| !o.is_empty() && !n.is_empty()))
            .ok_or_else(|| AppError::config("notifier.repository must be 'owner/repo'"))?;

        if config.token.is_none() {
            log::warn!("No GitHub token configured; issue creation will likely be rejected");
        }

        let http = Client::builder()
            .user_agent(&monitor.user_agent)
            .timeout(monitor.notify_timeout())
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            repository,
            token: config.token.clone(),
            labels: config.labels.clone(),
        })
    }

    fn issues_url(&self) -> String {
        format!("{}/repos/{}/issues", self.api_url, self.repository)
    }

    fn issue<'a>(&'a self, job_name: &str, target: &str, message: &str) -> NewIssue<'a> {
        NewIssue {
            title: format!("Website change detected: {job_name}"),
            body: format!("**URL**: {target}\n\n```\n{message}\n```\n"),
            labels: &self.labels,
        }
    }
}

#[async_trait]
impl Notifier for GithubIssueNotifier {
    async fn notify(&self, job_name: &str, target: &str, message: &str) -> Result<()> {
        let mut request = self
            .http
            .post(self.issues_url())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .json(&self.issue(job_name, target, message));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await.map_err(AppError::notify)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            log::warn!("GitHub returned {} for {}: {}", status, job_name, body);
            return Err(AppError::notify(format!("GitHub issue creation returned {status}")));
        }

        log::info!("Opened GitHub issue in {} for {}", self.repository, job_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier_config(repo: &str) -> NotifierConfig {
        NotifierConfig {
            repository: Some(repo.to_string()),
            token: Some("t".into()),
            ..NotifierConfig::default()
        }
    }

    #[test]
    fn test_rejects_malformed_repository() {
        let monitor = MonitorConfig::default();
        assert!(GithubIssueNotifier::new(&notifier_config("acme"), &monitor).is_err());
        assert!(GithubIssueNotifier::new(&notifier_config("/watch"), &monitor).is_err());
        assert!(GithubIssueNotifier::new(&notifier_config("acme/watch"), &monitor).is_ok());
    }

    #[test]
    fn test_issue_payload() {
        let notifier =
            GithubIssueNotifier::new(&notifier_config("acme/watch"), &MonitorConfig::default())
                .unwrap();
        assert_eq!(
            notifier.issues_url(),
            "https://api.github.com/repos/acme/watch/issues"
        );

        let payload = serde_json::to_value(notifier.issue(
            "home",
            "https://example.com",
            "New checksum: abc",
        ))
        .unwrap();
        assert_eq!(payload["title"], "Website change detected: home");
        assert!(payload["body"].as_str().unwrap().contains("New checksum: abc"));
        assert_eq!(payload["labels"][0], "website-change");
    }
}
