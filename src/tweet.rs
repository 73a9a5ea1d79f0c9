use crate::action::{Action, ActionFactory};
use crate::changeset::{FileChange, FileStatus};
use crate::oauth::Credentials;
use crate::{info, warning};
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::rc::Rc;
use std::time::Duration;
use ureq::{Agent, Proxy};
use ureq::http::StatusCode;

#[derive(Debug, Serialize)]
struct TweetPayload<'a> {
    text: &'a str,
}

struct Client {
    agent: Agent,
    endpoint: String,
    credentials: Credentials,
}

/// factory for tweet actions, shared by every tweet it builds
pub struct TwitterConfig {
    client: Rc<Client>,
}

impl TwitterConfig {
    pub fn new(credentials: Credentials, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self::with_proxy(credentials, endpoint, timeout, Proxy::try_from_env())
    }

    fn with_proxy(
        credentials: Credentials,
        endpoint: impl Into<String>,
        timeout: Duration,
        proxy: Option<Proxy>,
    ) -> Self {
        // non-2xx statuses are inspected rather than surfaced as transport errors
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global((!timeout.is_zero()).then_some(timeout))
            .proxy(proxy)
            .build()
            .into();
        Self {
            client: Rc::new(Client {
                agent,
                endpoint: endpoint.into(),
                credentials,
            }),
        }
    }
}

impl ActionFactory for TwitterConfig {
    fn new_action(&self, file: FileChange, content: Option<Vec<u8>>) -> Result<Box<dyn Action>> {
        let text = content
            .map(String::from_utf8)
            .transpose()
            .with_context(|| format!("tweet file {} is not valid UTF-8", file.path()))?;
        Ok(Box::new(Tweet {
            file,
            text,
            client: Rc::clone(&self.client),
        }))
    }
}

/// posts the content of a newly added file
pub struct Tweet {
    file: FileChange,
    text: Option<String>,
    client: Rc<Client>,
}

impl Action for Tweet {
    fn describe(&self) -> String {
        format!("tweet from {}", self.file.path())
    }

    fn execute(&self) -> Result<()> {
        let text = match (&self.text, self.file.status()) {
            (Some(text), FileStatus::Added) => text.as_str(),
            _ => {
                info!(
                    "tweets are only created for new files: skipping {} file {}",
                    self.file.status(),
                    self.file.path()
                );
                return Ok(());
            }
        };

        let client = &self.client;
        let authorization = client
            .credentials
            .authorization("POST", &client.endpoint)
            .context("failed to sign tweet request")?;

        let payload =
            serde_json::to_vec(&TweetPayload { text }).context("failed to encode tweet payload")?;

        info!("creating tweet");
        let mut response = client
            .agent
            .post(client.endpoint.as_str())
            .header("Content-Type", "application/json")
            .header("Authorization", authorization.as_str())
            .send(payload)
            .context("failed to send tweet request")?;

        let status = response.status();
        let body = match response.body_mut().read_to_string() {
            Ok(body) => body,
            Err(e) => {
                warning!("failed to read tweet response body: {}", e);
                String::new()
            }
        };

        if status != StatusCode::CREATED {
            bail!("error creating tweet: {}: {}", status, body.trim());
        }
        Ok(())
    }
}
