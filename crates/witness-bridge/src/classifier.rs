// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote use-of-force ranking service.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use witness_config::model::BridgeConfig;
use witness_core::types::Ranking;
use witness_core::{
    AdapterType, ClassifierAdapter, ForceRank, HealthStatus, PluginAdapter, WitnessError,
};

use crate::http::{build_client, check_status, transport};

#[derive(Serialize)]
struct RankRequest<'a> {
    text: &'a str,
}

/// Either `3` or `"Rank 3"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RankLabel {
    Level(u8),
    Label(String),
}

#[derive(Deserialize)]
struct RankResponse {
    rank: RankLabel,
    confidence: f32,
}

/// `POST {url}` with `{"text"}`, answered by `{"rank", "confidence"}`.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: reqwest::Client,
    url: String,
}

impl HttpClassifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, WitnessError> {
        Ok(Self {
            client: build_client(None, timeout)?,
            url: url.into(),
        })
    }

    /// Fails when `bridge.classifier_url` is not configured.
    pub fn from_config(config: &BridgeConfig) -> Result<Self, WitnessError> {
        let url = config
            .classifier_url
            .as_deref()
            .ok_or_else(|| WitnessError::Config("bridge.classifier_url is not set".into()))?;
        Self::new(url, Duration::from_secs(config.request_timeout_secs))
    }
}

#[async_trait]
impl PluginAdapter for HttpClassifier {
    fn name(&self) -> &str {
        "http-classifier"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Classifier
    }

    async fn health_check(&self) -> Result<HealthStatus, WitnessError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WitnessError> {
        Ok(())
    }
}

#[async_trait]
impl ClassifierAdapter for HttpClassifier {
    async fn rank(&self, text: &str) -> Result<Ranking, WitnessError> {
        let response = self
            .client
            .post(&self.url)
            .json(&RankRequest { text })
            .send()
            .await
            .map_err(transport)?;
        let body: RankResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| WitnessError::upstream(format!("malformed ranking response: {e}")))?;

        let label = match &body.rank {
            RankLabel::Level(level) => ForceRank::from_level(*level),
            RankLabel::Label(label) => ForceRank::parse_label(label),
        }
        .ok_or_else(|| WitnessError::upstream("ranking service returned an unknown rank"))?;
        debug!(rank = %label, confidence = body.confidence, "text ranked");
        Ok(Ranking {
            label,
            confidence: body.confidence.clamp(0.0, 1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn parses_label_and_numeric_ranks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({"text": "tear gas"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"rank": "Rank 4", "confidence": 0.91})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_json(json!({"text": "officer on duty"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"rank": 1, "confidence": 0.6})),
            )
            .mount(&server)
            .await;

        let classifier = HttpClassifier::new(server.uri(), Duration::from_secs(5)).unwrap();
        let ranking = classifier.rank("tear gas").await.unwrap();
        assert_eq!(ranking.label, ForceRank::ChemicalElectric);
        assert!((ranking.confidence - 0.91).abs() < 1e-6);
        assert_eq!(
            classifier.rank("officer on duty").await.unwrap().label,
            ForceRank::PolicePresence
        );
    }

    #[tokio::test]
    async fn unknown_rank_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"rank": "Rank 9", "confidence": 0.5})),
            )
            .mount(&server)
            .await;

        let classifier = HttpClassifier::new(server.uri(), Duration::from_secs(5)).unwrap();
        assert!(classifier.rank("x").await.unwrap_err().is_upstream());
    }
}
