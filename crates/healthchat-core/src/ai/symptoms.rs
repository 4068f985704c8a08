use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct SymptomRequest {
    symptoms: Vec<String>,
}

/// A candidate condition for a set of symptoms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub name: String,
    pub confidence: f64,
    pub description: String,
    pub precautions: Vec<String>,
}

// The service reports unknown symptoms with a 200 and an `error` body.
#[derive(Deserialize)]
#[serde(untagged)]
enum SymptomResponse {
    Predictions { predictions: Vec<Prediction> },
    Error { error: String },
}

#[derive(Clone)]
pub struct SymptomClient {
    client: Client,
    endpoint: String,
}

impl SymptomClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    /// Ask the prediction service for the most likely conditions, best first
    pub async fn predict(&self, symptoms: &[String]) -> Result<Vec<Prediction>> {
        let symptoms: Vec<String> = symptoms
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if symptoms.is_empty() {
            return Err(anyhow!("At least one symptom is required"));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(&SymptomRequest { symptoms })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Prediction service error {}: {}", status, text));
        }

        match response.json::<SymptomResponse>().await? {
            SymptomResponse::Predictions { mut predictions } => {
                predictions.sort_by(|a, b| {
                    b.confidence
                        .partial_cmp(&a.confidence)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                Ok(predictions)
            }
            SymptomResponse::Error { error } => Err(anyhow!(error)),
        }
    }
}
