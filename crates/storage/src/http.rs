use std::env;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use practice_core::model::{Exercise, ExerciseId, SubjectId, TopicId, TopicNode};

use crate::records::{
    AnswerOutcome, BulkCreateReceipt, BulkExercisePayload, ExerciseRecord, LivesSnapshot,
    ProgressKind, TopicRecord,
};
use crate::repository::{ContentStore, ExerciseStore, LivesStore, StorageError, TopicStore};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl HttpConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Read `PRACTICE_API_URL` and `PRACTICE_API_TOKEN`.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var("PRACTICE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        Self::new(base_url).with_token(env::var("PRACTICE_API_TOKEN").ok())
    }
}

/// JSON/REST client for the learning backend.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    config: HttpConfig,
}

#[derive(Serialize)]
struct SubmitBody {
    answer: usize,
}

#[derive(Serialize)]
struct ProgressBody {
    #[serde(rename = "type")]
    kind: ProgressKind,
}

#[derive(Serialize)]
struct BulkBody<'a> {
    exercises: &'a [BulkExercisePayload],
}

impl HttpBackend {
    /// # Errors
    ///
    /// Returns `StorageError::Transport` if the TLS backend cannot be initialized.
    pub fn new(config: HttpConfig) -> Result<Self, StorageError> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_checked(&self, request: RequestBuilder) -> Result<Response, StorageError> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound);
        }
        if !status.is_success() {
            tracing::warn!(%status, url = %response.url(), "backend request failed");
            return Err(StorageError::Http(status));
        }
        Ok(response)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StorageError> {
        Ok(self.send_checked(request).await?.json().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, StorageError> {
        self.send(self.client.get(self.url(path))).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, StorageError> {
        self.send(self.client.post(self.url(path)).json(body)).await
    }
}

#[async_trait]
impl ExerciseStore for HttpBackend {
    async fn fetch_by_topic(&self, topic_id: TopicId) -> Result<Vec<Exercise>, StorageError> {
        let records: Vec<ExerciseRecord> =
            self.get_json(&format!("topics/{topic_id}/exercises")).await?;
        Ok(records.into_iter().map(ExerciseRecord::into_exercise).collect())
    }

    async fn submit_answer(
        &self,
        exercise_id: ExerciseId,
        choice: usize,
    ) -> Result<AnswerOutcome, StorageError> {
        self.post_json(
            &format!("exercises/{exercise_id}/submit"),
            &SubmitBody { answer: choice },
        )
        .await
    }
}

#[async_trait]
impl LivesStore for HttpBackend {
    async fn fetch(&self) -> Result<LivesSnapshot, StorageError> {
        self.get_json("lives").await
    }

    async fn reset(&self) -> Result<LivesSnapshot, StorageError> {
        self.post_json("lives/reset", &serde_json::json!({})).await
    }
}

#[async_trait]
impl ContentStore for HttpBackend {
    async fn mark_progress(
        &self,
        topic_id: TopicId,
        kind: ProgressKind,
    ) -> Result<(), StorageError> {
        // The acknowledgement body varies between backends and is not needed.
        let request = self
            .client
            .post(self.url(&format!("topics/{topic_id}/progress")))
            .json(&ProgressBody { kind });
        self.send_checked(request).await?;
        Ok(())
    }

    async fn bulk_create(
        &self,
        topic_id: TopicId,
        exercises: &[BulkExercisePayload],
    ) -> Result<BulkCreateReceipt, StorageError> {
        self.post_json(
            &format!("topics/{topic_id}/exercises/bulk"),
            &BulkBody { exercises },
        )
        .await
    }
}

#[async_trait]
impl TopicStore for HttpBackend {
    async fn topics_by_subject(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<TopicNode>, StorageError> {
        let records: Vec<TopicRecord> =
            self.get_json(&format!("subjects/{subject_id}/topics")).await?;
        Ok(records.into_iter().map(TopicRecord::into_node).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> HttpBackend {
        HttpBackend::new(HttpConfig::new(format!("{}/api/", server.uri()))).unwrap()
    }

    #[tokio::test]
    async fn fetches_and_normalizes_exercises() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/topics/7/exercises"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "topic_id": 7, "question": "Q", "options": ["a", "b"], "correct_answer": 0 },
                { "id": 2, "topic_id": 7, "question": "R", "optionA": "x", "optionB": "y", "correct_option": "B" }
            ])))
            .mount(&server)
            .await;

        let exercises = backend(&server).fetch_by_topic(TopicId::new(7)).await.unwrap();
        assert_eq!(exercises.len(), 2);
        assert_eq!(exercises[1].options(), ["x", "y"]);
    }

    #[tokio::test]
    async fn submit_posts_the_choice_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/exercises/3/submit"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(json!({ "answer": 2 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "is_correct": false,
                "message": "Respuesta incorrecta",
                "lives": 2,
                "life_gained": false,
                "next_life_at": "2023-11-14T22:43:20Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = HttpConfig::new(format!("{}/api", server.uri()))
            .with_token(Some("secret".into()));
        let outcome = HttpBackend::new(config)
            .unwrap()
            .submit_answer(ExerciseId::new(3), 2)
            .await
            .unwrap();
        assert!(!outcome.is_correct);
        assert_eq!(outcome.lives, Some(2));
    }

    #[tokio::test]
    async fn server_error_maps_to_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/lives"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = backend(&server).fetch().await.unwrap_err();
        assert!(matches!(err, StorageError::Http(status) if status.as_u16() == 503));
    }

    #[tokio::test]
    async fn mark_progress_sends_kind() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/topics/4/progress"))
            .and(body_json(json!({ "type": "practice" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        backend(&server)
            .mark_progress(TopicId::new(4), ProgressKind::Practice)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn bulk_create_reads_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/topics/4/exercises/bulk"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "count": 2 })))
            .mount(&server)
            .await;

        let payload = BulkExercisePayload {
            question: "Q".into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: 0,
            level: 1,
        };
        let receipt = backend(&server)
            .bulk_create(TopicId::new(4), &[payload.clone(), payload])
            .await
            .unwrap();
        assert_eq!(receipt.count, Some(2));
    }

    #[tokio::test]
    async fn topics_and_missing_routes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/subjects/1/topics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "subject_id": 1, "level": 2, "progress_percentage": 100 }
            ])))
            .mount(&server)
            .await;

        let backend = backend(&server);
        let topics = backend.topics_by_subject(SubjectId::new(1)).await.unwrap();
        assert_eq!(topics[0].level(), 2);
        assert!(topics[0].is_complete());

        let err = backend.topics_by_subject(SubjectId::new(2)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
