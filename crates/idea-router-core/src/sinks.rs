//! Spreadsheet and task-tracker sinks.
//!
//! The spreadsheet is a Google Apps Script web app receiving one JSON row per
//! message. The task tracker is a Bitrix24 inbound webhook. A task is only
//! created after the spreadsheet accepted the row.

use chrono::Local;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classifier::DEFAULT_CATEGORY;
use crate::error::{ConfigError, SinkError};
use crate::types::{Assignee, Classification, InboundMessage, Priority, ProcessedResult};

const SPREADSHEET: &str = "spreadsheet";
const TASK_TRACKER: &str = "task tracker";

/// Task-tracker method appended to the webhook base URL.
const TASK_ADD_METHOD: &str = "tasks.task.add";

/// One spreadsheet row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadsheetRow {
    pub action: &'static str,
    pub timestamp: String,
    pub username: String,
    pub user_id: i64,
    pub message_type: String,
    pub category: String,
    pub priority: String,
    pub original_text: String,
    pub processed_text: String,
    pub responsible: String,
}

/// Fields of a task-tracker task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub responsible_id: u32,
    pub priority: u8,
}

/// Task-tracker request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    pub fields: TaskFields,
}

/// Everything submitted to the sinks for one message.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkRecord {
    pub row: SpreadsheetRow,
    pub task: TaskRecord,
}

impl SinkRecord {
    /// Derive both sink payloads from a processed message.
    ///
    /// Without a classification the defaults (general, medium, unassigned) are used.
    pub fn build(message: &InboundMessage, processed: &ProcessedResult) -> Self {
        let classification = processed.classification.clone().unwrap_or_else(|| Classification {
            category: DEFAULT_CATEGORY.to_string(),
            priority: Priority::Medium,
            assignee: Assignee::unassigned(),
        });

        let timestamp = message
            .received_at
            .with_timezone(&Local)
            .format("%d.%m.%Y %H:%M:%S")
            .to_string();

        let row = SpreadsheetRow {
            action: "saveMessage",
            timestamp,
            username: message.sender_display_name.clone(),
            user_id: message.sender_id,
            message_type: message.kind.as_str().to_string(),
            category: classification.category.clone(),
            priority: classification.priority.label().to_string(),
            original_text: processed.original_text.clone(),
            processed_text: processed.summary_text.clone(),
            responsible: classification.assignee.name.clone(),
        };

        let task = TaskRecord {
            fields: TaskFields {
                title: format!(
                    "Новая идея из Telegram: {} ({})",
                    classification.category, message.sender_display_name
                ),
                description: processed.summary_text.clone(),
                responsible_id: classification.assignee.tracker_id,
                priority: classification.priority.tracker_value(),
            },
        };

        Self { row, task }
    }
}

/// Sends sink records to the configured endpoints.
#[derive(Clone)]
pub struct SinkDispatcher {
    client: reqwest::Client,
    spreadsheet_url: Option<String>,
    task_tracker_url: Option<String>,
}

impl SinkDispatcher {
    /// Create a dispatcher whose requests are bounded by `timeout`.
    pub fn new(
        spreadsheet_url: Option<String>,
        task_tracker_url: Option<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            spreadsheet_url,
            task_tracker_url: task_tracker_url.map(|u| u.trim_end_matches('/').to_string()),
        })
    }

    pub fn has_spreadsheet(&self) -> bool {
        self.spreadsheet_url.is_some()
    }

    pub fn has_task_tracker(&self) -> bool {
        self.task_tracker_url.is_some()
    }

    /// Submit the record. Failures are logged, never returned.
    pub async fn dispatch(&self, record: &SinkRecord) {
        let user_id = record.row.user_id;

        if self.spreadsheet_url.is_none() {
            debug!(sender_id = user_id, "Spreadsheet not configured, skipping sinks");
            return;
        }

        if let Err(e) = self.save_row(&record.row).await {
            warn!(sender_id = user_id, step = "spreadsheet", error = %e, "Failed to save row");
            return;
        }
        info!(sender_id = user_id, "Row saved to spreadsheet");

        if self.task_tracker_url.is_none() {
            debug!(sender_id = user_id, "Task tracker not configured, skipping");
            return;
        }

        match self.create_task(&record.task).await {
            Ok(()) => info!(sender_id = user_id, "Task created in task tracker"),
            Err(e) => {
                warn!(sender_id = user_id, step = "task_tracker", error = %e, "Failed to create task")
            }
        }
    }

    /// POST a row to the spreadsheet endpoint.
    pub async fn save_row(&self, row: &SpreadsheetRow) -> Result<(), SinkError> {
        let url = self
            .spreadsheet_url
            .as_deref()
            .ok_or(SinkError::NotConfigured(SPREADSHEET))?;
        self.post_json(SPREADSHEET, url, row).await
    }

    /// POST a task to the task tracker.
    pub async fn create_task(&self, task: &TaskRecord) -> Result<(), SinkError> {
        let base = self
            .task_tracker_url
            .as_deref()
            .ok_or(SinkError::NotConfigured(TASK_TRACKER))?;
        let url = format!("{}/{}", base, TASK_ADD_METHOD);
        self.post_json(TASK_TRACKER, &url, task).await
    }

    /// Fetch a user's statistics from the spreadsheet backend.
    pub async fn fetch_stats(&self, username: &str) -> Result<serde_json::Value, SinkError> {
        let url = self
            .spreadsheet_url
            .as_deref()
            .ok_or(SinkError::NotConfigured(SPREADSHEET))?;

        let response = self
            .client
            .get(url)
            .query(&[("action", "getStats"), ("user", username)])
            .send()
            .await
            .map_err(|e| SinkError::RequestFailed {
                sink: SPREADSHEET,
                message: e.to_string(),
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Status {
                sink: SPREADSHEET,
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|e| SinkError::ParseError {
            sink: SPREADSHEET,
            message: e.to_string(),
        })
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        sink: &'static str,
        url: &str,
        body: &T,
    ) -> Result<(), SinkError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| SinkError::RequestFailed {
                sink,
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::OK {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SinkError::Status {
                sink,
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageKind;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(classification: Option<Classification>) -> SinkRecord {
        let message = InboundMessage::new(42, "alice", "срочно нужно обновить API", MessageKind::Text);
        let processed = ProcessedResult {
            original_text: message.text.clone(),
            summary_text: "🎯 Обновить API".to_string(),
            classification,
        };
        SinkRecord::build(&message, &processed)
    }

    fn dev_high() -> Classification {
        Classification {
            category: "разработка".to_string(),
            priority: Priority::High,
            assignee: Assignee {
                name: "Технический директор".to_string(),
                tracker_id: 2,
            },
        }
    }

    fn dispatcher(spreadsheet: Option<String>, tracker: Option<String>) -> SinkDispatcher {
        SinkDispatcher::new(spreadsheet, tracker, Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_record_from_classification() {
        let record = record(Some(dev_high()));

        assert_eq!(record.row.action, "saveMessage");
        assert_eq!(record.row.user_id, 42);
        assert_eq!(record.row.username, "alice");
        assert_eq!(record.row.message_type, "text");
        assert_eq!(record.row.category, "разработка");
        assert_eq!(record.row.priority, "высокий");
        assert_eq!(record.row.responsible, "Технический директор");
        assert_eq!(record.row.processed_text, "🎯 Обновить API");

        assert_eq!(record.task.fields.title, "Новая идея из Telegram: разработка (alice)");
        assert_eq!(record.task.fields.description, "🎯 Обновить API");
        assert_eq!(record.task.fields.priority, 2);
        assert_eq!(record.task.fields.responsible_id, 2);
    }

    #[test]
    fn test_record_without_classification_uses_defaults() {
        let record = record(None);
        assert_eq!(record.row.category, "общее");
        assert_eq!(record.row.priority, "средний");
        assert_eq!(record.row.responsible, "Не назначен");
        assert_eq!(record.task.fields.priority, 1);
        assert_eq!(record.task.fields.responsible_id, 1);
    }

    #[test]
    fn test_timestamp_format() {
        let ts = record(None).row.timestamp;
        // dd.mm.yyyy hh:mm:ss
        assert_eq!(ts.len(), 19);
        assert_eq!(&ts[2..3], ".");
        assert_eq!(&ts[5..6], ".");
        assert_eq!(&ts[10..11], " ");
    }

    #[test]
    fn test_task_record_wire_shape() {
        let json = serde_json::to_value(&record(Some(dev_high())).task).unwrap();
        assert_eq!(json["fields"]["PRIORITY"], 2);
        assert_eq!(json["fields"]["RESPONSIBLE_ID"], 2);
        assert!(json["fields"]["TITLE"].as_str().unwrap().contains("разработка"));
        assert_eq!(json["fields"]["DESCRIPTION"], "🎯 Обновить API");
    }

    #[tokio::test]
    async fn test_spreadsheet_then_task() {
        let sheet = MockServer::start().await;
        let tracker = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "action": "saveMessage",
                "category": "разработка",
                "priority": "высокий",
                "user_id": 42
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&sheet)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/1/key/tasks.task.add"))
            .and(body_partial_json(serde_json::json!({"fields": {"PRIORITY": 2}})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&tracker)
            .await;

        let dispatcher = dispatcher(
            Some(format!("{}/exec", sheet.uri())),
            Some(format!("{}/rest/1/key/", tracker.uri())),
        );
        dispatcher.dispatch(&record(Some(dev_high()))).await;
    }

    #[tokio::test]
    async fn test_spreadsheet_failure_suppresses_task() {
        let sheet = MockServer::start().await;
        let tracker = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&sheet)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&tracker)
            .await;

        let dispatcher = dispatcher(Some(sheet.uri()), Some(tracker.uri()));
        dispatcher.dispatch(&record(None)).await;
    }

    #[tokio::test]
    async fn test_spreadsheet_timeout_suppresses_task() {
        let sheet = MockServer::start().await;
        let tracker = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&sheet)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&tracker)
            .await;

        let dispatcher = SinkDispatcher::new(
            Some(sheet.uri()),
            Some(tracker.uri()),
            Duration::from_millis(200),
        )
        .unwrap();
        dispatcher.dispatch(&record(None)).await;
    }

    #[tokio::test]
    async fn test_unconfigured_spreadsheet_makes_no_calls() {
        let tracker = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&tracker)
            .await;

        let dispatcher = dispatcher(None, Some(tracker.uri()));
        dispatcher.dispatch(&record(None)).await;
    }

    #[tokio::test]
    async fn test_unconfigured_tracker_is_skipped() {
        let sheet = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&sheet)
            .await;

        let dispatcher = dispatcher(Some(sheet.uri()), None);
        assert!(!dispatcher.has_task_tracker());
        dispatcher.dispatch(&record(None)).await;
    }

    #[tokio::test]
    async fn test_task_failure_is_swallowed() {
        let sheet = MockServer::start().await;
        let tracker = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&sheet)
            .await;
        Mock::given(method("POST"))
            .and(path("/tasks.task.add"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad"))
            .expect(1)
            .mount(&tracker)
            .await;

        let dispatcher = dispatcher(Some(sheet.uri()), Some(tracker.uri()));
        dispatcher.dispatch(&record(None)).await;
    }

    #[tokio::test]
    async fn test_create_task_reports_status() {
        let tracker = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad"))
            .expect(1)
            .mount(&tracker)
            .await;

        let dispatcher = dispatcher(None, Some(tracker.uri()));
        let err = dispatcher.create_task(&record(None).task).await.unwrap_err();
        assert!(matches!(err, SinkError::Status { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_fetch_stats() {
        let sheet = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("action", "getStats"))
            .and(query_param("user", "alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"total": 3})))
            .expect(1)
            .mount(&sheet)
            .await;

        let dispatcher = dispatcher(Some(sheet.uri()), None);
        let stats = dispatcher.fetch_stats("alice").await.unwrap();
        assert_eq!(stats["total"], 3);
    }

    #[tokio::test]
    async fn test_fetch_stats_unconfigured() {
        let dispatcher = dispatcher(None, None);
        assert!(matches!(
            dispatcher.fetch_stats("alice").await,
            Err(SinkError::NotConfigured("spreadsheet"))
        ));
    }
}
