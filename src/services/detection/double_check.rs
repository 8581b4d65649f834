// Double Check
// Local verdict first, then an optional cloud opinion reported alongside it.

use crate::models::DetectionResult;
use crate::services::providers::{CloudClassifier, CloudError, CloudVerdict};
use super::detector::Detector;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CloudOutcome {
    Verdict(CloudVerdict),
    Failed { message: String },
    Skipped,
}

impl CloudOutcome {
    pub fn verdict(&self) -> Option<&CloudVerdict> {
        match self {
            CloudOutcome::Verdict(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DoubleCheckReport {
    pub request_id: String,
    pub local: DetectionResult,
    pub cloud: CloudOutcome,
}

impl DoubleCheckReport {
    /// True when the cloud opinion exists and lands on the other side of 0.5.
    pub fn disagrees(&self) -> bool {
        match self.cloud.verdict() {
            Some(v) => (v.ai_probability >= 0.5) != (self.local.ai_confidence >= 0.5),
            None => false,
        }
    }
}

/// The local result never depends on the cloud call; a slow, failing or absent
/// classifier only changes `cloud`.
pub async fn detect_with_double_check(
    detector: &Detector,
    text: &str,
    classifier: Option<&CloudClassifier>,
    timeout: Duration,
) -> DoubleCheckReport {
    let request_id = Uuid::new_v4().to_string();
    let local = detector.detect_single(text);

    let cloud = match classifier {
        None => CloudOutcome::Skipped,
        Some(_) if local.features.is_insufficient() => CloudOutcome::Skipped,
        Some(classifier) => match tokio::time::timeout(timeout, classifier.classify(text)).await {
            Ok(Ok(verdict)) => CloudOutcome::Verdict(verdict),
            Ok(Err(e)) => {
                warn!(request_id = %request_id, error = %e, "double_check.cloud_failed");
                CloudOutcome::Failed { message: e.to_string() }
            }
            Err(_) => {
                let e = CloudError::Timeout(timeout);
                warn!(request_id = %request_id, error = %e, "double_check.cloud_failed");
                CloudOutcome::Failed { message: e.to_string() }
            }
        },
    };

    let report = DoubleCheckReport { request_id, local, cloud };
    info!(
        request_id = %report.request_id,
        local_label = %report.local.label,
        cloud = report.cloud.verdict().is_some(),
        disagrees = report.disagrees(),
        "double_check.done"
    );
    report
}
