use crate::config::ClientConfig;
use crate::error::{ArtifactKind, ClientError, Result, translate_delete_error};
use crate::models::{ApiResponse, CodeBody, Language, PublishRequest, TestRequest};
use crate::transport::{HttpTransport, Transport};
use base64::Engine;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue, USER_AGENT};
use reqwest::{Method, Request};
use serde::Serialize;
use url::Url;

/// Identifying `user-agent` sent with every request.
pub const CLIENT_USER_AGENT: &str = "transformationAction";

const TRANSFORMATIONS: &str = "transformations";
const LIBRARIES: &str = "libraries";

#[derive(Debug, Clone)]
pub struct TransformClient<T = HttpTransport> {
    config: ClientConfig,
    authorization: HeaderValue,
    transport: T,
}

impl TransformClient<HttpTransport> {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Self::with_transport(config, HttpTransport::new(http))
    }
}

impl<T: Transport> TransformClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        let authorization = basic_auth_header(&config.email, &config.access_token)?;
        Ok(Self {
            config,
            authorization,
            transport,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn list_transformations(&self) -> Result<ApiResponse> {
        tracing::info!("Getting all transformations from upstream");
        let url = self.url(&[TRANSFORMATIONS]);
        self.send(Method::GET, url, None).await
    }

    pub async fn list_libraries(&self) -> Result<ApiResponse> {
        tracing::info!("Getting all libraries from upstream");
        let url = self.url(&[LIBRARIES]);
        self.send(Method::GET, url, None).await
    }

    pub async fn create_transformation(
        &self,
        name: &str,
        description: &str,
        code: &str,
        language: Language,
        publish: bool,
    ) -> Result<ApiResponse> {
        tracing::info!("Creating transformation: {name}");
        let url = with_publish(self.url(&[TRANSFORMATIONS]), publish);
        let body = CodeBody {
            name: Some(name),
            description,
            code,
            language,
        };
        self.send(Method::POST, url, Some(encode(&body)?)).await
    }

    /// Update an existing transformation.
    ///
    /// `name` is only used for logging: the server keeps the name given at
    /// creation and the request body carries `description`, `code` and
    /// `language` only.
    pub async fn update_transformation(
        &self,
        id: &str,
        name: &str,
        description: &str,
        code: &str,
        language: Language,
        publish: bool,
    ) -> Result<ApiResponse> {
        tracing::info!("Updating transformation: {name}");
        let url = with_publish(self.url(&[TRANSFORMATIONS, id]), publish);
        let body = CodeBody {
            name: None,
            description,
            code,
            language,
        };
        self.send(Method::POST, url, Some(encode(&body)?)).await
    }

    pub async fn create_library(
        &self,
        name: &str,
        description: &str,
        code: &str,
        language: Language,
        publish: bool,
    ) -> Result<ApiResponse> {
        tracing::info!("Creating library: {name}");
        let url = with_publish(self.url(&[LIBRARIES]), publish);
        let body = CodeBody {
            name: Some(name),
            description,
            code,
            language,
        };
        self.send(Method::POST, url, Some(encode(&body)?)).await
    }

    pub async fn update_library(
        &self,
        id: &str,
        description: &str,
        code: &str,
        language: Language,
        publish: bool,
    ) -> Result<ApiResponse> {
        tracing::info!("Updating library: {id}");
        let url = with_publish(self.url(&[LIBRARIES, id]), publish);
        let body = CodeBody {
            name: None,
            description,
            code,
            language,
        };
        self.send(Method::POST, url, Some(encode(&body)?)).await
    }

    /// Run transformation versions against their test input on the server.
    ///
    /// Both sequences are sent in the given order; the server's results are
    /// returned without interpretation.
    pub async fn test_transformation_and_library<S, L>(
        &self,
        transformations: &[S],
        libraries: &[L],
    ) -> Result<ApiResponse>
    where
        S: Serialize,
        L: Serialize,
    {
        tracing::info!("Testing transformations and libraries");
        let url = self.url(&[TRANSFORMATIONS, LIBRARIES, "test"]);
        let body = TestRequest {
            transformations,
            libraries,
        };
        self.send(Method::POST, url, Some(encode(&body)?)).await
    }

    pub async fn publish<S, L>(
        &self,
        transformations: &[S],
        libraries: &[L],
        commit_id: &str,
    ) -> Result<ApiResponse>
    where
        S: Serialize,
        L: Serialize,
    {
        tracing::info!("Publishing transformations and libraries");
        let url = self.url(&[TRANSFORMATIONS, LIBRARIES, "publish"]);
        let body = PublishRequest {
            transformations,
            libraries,
            commit_id,
        };
        self.send(Method::POST, url, Some(encode(&body)?)).await
    }

    /// Delete a transformation.
    ///
    /// `id` is not checked: an empty id addresses `/transformations/` itself.
    /// A `400` is reported as [`ClientError::Conflict`]; the server answers
    /// that way when the transformation is still connected to a destination.
    pub async fn delete_transformation(&self, id: &str) -> Result<ApiResponse> {
        tracing::info!("Deleting transformation: {id}");
        let url = self.url(&[TRANSFORMATIONS, id]);
        self.send(Method::DELETE, url, None)
            .await
            .map_err(|err| translate_delete_error(ArtifactKind::Transformation, id, err))
    }

    /// Delete a library. Same empty-id and `400` handling as
    /// [`delete_transformation`](Self::delete_transformation).
    pub async fn delete_library(&self, id: &str) -> Result<ApiResponse> {
        tracing::info!("Deleting library: {id}");
        let url = self.url(&[LIBRARIES, id]);
        self.send(Method::DELETE, url, None)
            .await
            .map_err(|err| translate_delete_error(ArtifactKind::Library, id, err))
    }

    fn url(&self, segments: &[&str]) -> Url {
        self.config.server_endpoint.join(segments)
    }

    fn request(&self, method: Method, url: Url, body: Option<Vec<u8>>) -> Request {
        let mut req = Request::new(method, url);
        let headers = req.headers_mut();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        headers.insert(AUTHORIZATION, self.authorization.clone());
        if let Some(body) = body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            *req.body_mut() = Some(body.into());
        }
        req
    }

    async fn send(&self, method: Method, url: Url, body: Option<Vec<u8>>) -> Result<ApiResponse> {
        tracing::debug!(%method, %url, "sending request");
        let req = self.request(method.clone(), url.clone(), body);
        let raw = self.transport.execute(req).await?;

        if !raw.status.is_success() {
            return Err(ClientError::Status {
                method,
                url: url.to_string(),
                status: raw.status,
                body: raw.body,
            });
        }
        Ok(ApiResponse::from_text(raw.status, &raw.body))
    }
}

fn with_publish(mut url: Url, publish: bool) -> Url {
    url.query_pairs_mut()
        .append_pair("publish", if publish { "true" } else { "false" });
    url
}

fn encode<B: Serialize>(body: &B) -> Result<Vec<u8>> {
    serde_json::to_vec(body).map_err(ClientError::Encode)
}

fn basic_auth_header(username: &str, password: &str) -> Result<HeaderValue> {
    let token =
        base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    let mut value = HeaderValue::from_str(&format!("Basic {token}"))?;
    value.set_sensitive(true);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerEndpoint;
    use crate::models::{TransformationTest, VersionRef};
    use crate::transport::RawResponse;
    use reqwest::StatusCode;
    use reqwest::header::HeaderMap;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Recorded {
        method: Method,
        url: String,
        headers: HeaderMap,
        body: Option<Value>,
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Recorded>>,
        replies: Mutex<VecDeque<RawResponse>>,
    }

    impl Recorder {
        fn reply(&self, status: StatusCode, body: &str) {
            self.replies.lock().unwrap().push_back(RawResponse {
                status,
                body: body.to_string(),
            });
        }

        fn take(&self) -> Vec<Recorded> {
            std::mem::take(&mut *self.seen.lock().unwrap())
        }
    }

    impl Transport for Recorder {
        async fn execute(&self, request: Request) -> Result<RawResponse> {
            let body = request
                .body()
                .and_then(|b| b.as_bytes())
                .map(|b| serde_json::from_slice(b).expect("request body is JSON"));
            self.seen.lock().unwrap().push(Recorded {
                method: request.method().clone(),
                url: request.url().to_string(),
                headers: request.headers().clone(),
                body,
            });
            Ok(self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(RawResponse {
                    status: StatusCode::OK,
                    body: "{}".to_string(),
                }))
        }
    }

    fn client() -> TransformClient<Recorder> {
        let config = ClientConfig::new(
            ServerEndpoint::parse("https://api.example.com").unwrap(),
            "dev@example.com",
            "s3cret",
        );
        TransformClient::with_transport(config, Recorder::default()).unwrap()
    }

    fn only(client: &TransformClient<Recorder>) -> Recorded {
        let mut seen = client.transport().take();
        assert_eq!(seen.len(), 1, "expected exactly one request, got {seen:?}");
        seen.remove(0)
    }

    fn assert_auth_and_agent(req: &Recorded) {
        assert_eq!(req.headers[USER_AGENT], "transformationAction");
        let auth = req.headers[AUTHORIZATION].to_str().unwrap();
        let b64 = auth.strip_prefix("Basic ").expect("basic auth");
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .unwrap();
        assert_eq!(decoded, b"dev@example.com:s3cret");
    }

    #[tokio::test]
    async fn list_operations_issue_authenticated_gets() {
        let client = client();
        client.transport().reply(StatusCode::OK, r#"{"transformations":[]}"#);

        let resp = client.list_transformations().await.unwrap();
        assert_eq!(resp.body, json!({"transformations": []}));
        let req = only(&client);
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.url, "https://api.example.com/transformations");
        assert!(req.body.is_none());
        assert_auth_and_agent(&req);

        client.list_libraries().await.unwrap();
        let req = only(&client);
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.url, "https://api.example.com/libraries");
        assert_auth_and_agent(&req);
    }

    #[tokio::test]
    async fn create_transformation_sends_name_and_publish_flag() {
        let client = client();
        client
            .transport()
            .reply(StatusCode::OK, r#"{"id":"t-1","versionId":"v-1","name":"dedupe"}"#);

        let resp = client
            .create_transformation("dedupe", "drop dupes", "code()", Language::JavaScript, true)
            .await
            .unwrap();
        assert_eq!(resp.transformation().unwrap().id, "t-1");

        let req = only(&client);
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.url, "https://api.example.com/transformations?publish=true");
        assert_eq!(req.headers[CONTENT_TYPE], "application/json");
        assert_eq!(
            req.body,
            Some(json!({
                "name": "dedupe",
                "description": "drop dupes",
                "code": "code()",
                "language": "javascript",
            }))
        );
        assert_auth_and_agent(&req);
    }

    #[tokio::test]
    async fn update_transformation_never_sends_name() {
        let client = client();
        client
            .update_transformation("t-1", "renamed", "d", "c", Language::Python, false)
            .await
            .unwrap();

        let req = only(&client);
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.url, "https://api.example.com/transformations/t-1?publish=false");
        assert_eq!(
            req.body,
            Some(json!({"description": "d", "code": "c", "language": "pythonfaas"}))
        );
        assert_auth_and_agent(&req);
    }

    #[tokio::test]
    async fn create_library_sends_name() {
        let client = client();
        client
            .create_library("utils", "helpers", "export const x = 1;", Language::JavaScript, false)
            .await
            .unwrap();

        let req = only(&client);
        assert_eq!(req.url, "https://api.example.com/libraries?publish=false");
        assert_eq!(
            req.body,
            Some(json!({
                "name": "utils",
                "description": "helpers",
                "code": "export const x = 1;",
                "language": "javascript",
            }))
        );
    }

    #[tokio::test]
    async fn update_library_has_no_name_field() {
        let client = client();
        client
            .update_library("lib-1", "helpers", "x", Language::JavaScript, true)
            .await
            .unwrap();

        let req = only(&client);
        assert_eq!(req.url, "https://api.example.com/libraries/lib-1?publish=true");
        let body = req.body.unwrap();
        let keys: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
        assert!(
            keys.iter().all(|k| !k.to_ascii_lowercase().contains("name")),
            "unexpected name-like key in {keys:?}"
        );
        assert_eq!(body, json!({"description": "helpers", "code": "x", "language": "javascript"}));
    }

    #[tokio::test]
    async fn test_request_body_is_exactly_the_given_sequences() {
        let client = client();
        client
            .transport()
            .reply(StatusCode::OK, r#"{"result":{"successTestResults":[]}}"#);

        let t1 = TransformationTest {
            version_id: "tv-1".to_string(),
            test_input: Some(vec![json!({"event": "a"})]),
        };
        let t2 = TransformationTest {
            version_id: "tv-2".to_string(),
            test_input: None,
        };
        let l1 = VersionRef {
            version_id: "lv-1".to_string(),
        };

        let resp = client
            .test_transformation_and_library(&[t1, t2], &[l1])
            .await
            .unwrap();
        assert_eq!(resp.body, json!({"result": {"successTestResults": []}}));

        let req = only(&client);
        assert_eq!(req.method, Method::POST);
        assert_eq!(
            req.url,
            "https://api.example.com/transformations/libraries/test"
        );
        assert_eq!(
            req.body,
            Some(json!({
                "transformations": [
                    {"versionId": "tv-1", "testInput": [{"event": "a"}]},
                    {"versionId": "tv-2"},
                ],
                "libraries": [{"versionId": "lv-1"}],
            }))
        );
        assert_auth_and_agent(&req);
    }

    #[tokio::test]
    async fn publish_includes_commit_id() {
        let client = client();
        let ts = [json!({"versionId": "tv-1"})];
        let ls: [Value; 0] = [];
        client.publish(&ts, &ls, "commit123").await.unwrap();

        let req = only(&client);
        assert_eq!(req.method, Method::POST);
        assert_eq!(
            req.url,
            "https://api.example.com/transformations/libraries/publish"
        );
        assert_eq!(
            req.body,
            Some(json!({
                "transformations": [{"versionId": "tv-1"}],
                "libraries": [],
                "commitId": "commit123",
            }))
        );
        assert_auth_and_agent(&req);
    }

    #[tokio::test]
    async fn delete_success_returns_payload_unmodified() {
        let client = client();
        client
            .transport()
            .reply(StatusCode::OK, r#"{"deleted":true,"id":"t-1"}"#);

        let resp = client.delete_transformation("t-1").await.unwrap();
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body, json!({"deleted": true, "id": "t-1"}));

        let req = only(&client);
        assert_eq!(req.method, Method::DELETE);
        assert_eq!(req.url, "https://api.example.com/transformations/t-1");
        assert!(req.body.is_none());
        assert_auth_and_agent(&req);
    }

    #[tokio::test]
    async fn delete_bad_request_is_conflict() {
        let client = client();
        client.transport().reply(StatusCode::BAD_REQUEST, "{}");
        let err = client.delete_transformation("t-1").await.unwrap_err();
        assert!(err.is_conflict());
        let msg = err.to_string();
        assert!(msg.contains("t-1"), "{msg}");
        assert!(msg.contains("It may be connected to a destination."), "{msg}");

        client.transport().reply(StatusCode::BAD_REQUEST, "{}");
        let err = client.delete_library("lib-1").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to delete library lib-1: It may be connected to a destination."
        );
        let req = client.transport().take().pop().unwrap();
        assert_eq!(req.url, "https://api.example.com/libraries/lib-1");
    }

    #[tokio::test]
    async fn delete_server_error_passes_through() {
        let client = client();
        client
            .transport()
            .reply(StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded");

        let err = client.delete_library("lib-1").await.unwrap_err();
        match err {
            ClientError::Status {
                method,
                url,
                status,
                body,
            } => {
                assert_eq!(method, Method::DELETE);
                assert_eq!(url, "https://api.example.com/libraries/lib-1");
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_request_outside_delete_is_not_translated() {
        let client = client();
        client
            .transport()
            .reply(StatusCode::BAD_REQUEST, r#"{"message":"invalid code"}"#);

        let err = client
            .create_transformation("t", "d", "c", Language::JavaScript, false)
            .await
            .unwrap_err();
        assert!(!err.is_conflict());
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert!(err.to_string().contains("invalid code"));
    }

    #[tokio::test]
    async fn ids_are_single_path_segments() {
        let client = client();
        client.delete_transformation("a/b").await.unwrap();
        let req = only(&client);
        assert_eq!(req.url, "https://api.example.com/transformations/a%2Fb");
    }

    #[tokio::test]
    async fn empty_id_addresses_the_collection_path() {
        let client = client();
        client.delete_transformation("").await.unwrap();
        assert_eq!(only(&client).url, "https://api.example.com/transformations/");

        client.delete_library("").await.unwrap();
        assert_eq!(only(&client).url, "https://api.example.com/libraries/");
    }

    fn assert_shareable<T: Send + Sync + Clone + 'static>() {}

    fn assert_send<F: Send>(_: &F) {}

    #[test]
    fn client_and_its_futures_cross_threads() {
        assert_shareable::<TransformClient>();
        assert_shareable::<ClientConfig>();

        let client = TransformClient::new(ClientConfig::new(
            ServerEndpoint::default(),
            "dev@example.com",
            "s3cret",
        ))
        .unwrap();
        assert_send(&client.list_transformations());
        assert_send(&client.delete_library("lib-1"));
        assert_send(&client.publish(&[json!({"versionId": "tv-1"})], &[] as &[Value], "c"));
    }

    #[tokio::test]
    async fn concurrent_calls_share_one_client() {
        let client = client();
        client
            .transport()
            .reply(StatusCode::OK, r#"{"transformations":[]}"#);
        client.transport().reply(StatusCode::OK, r#"{"libraries":[]}"#);

        let (a, b) = tokio::join!(client.list_transformations(), client.list_libraries());
        a.unwrap();
        b.unwrap();

        let mut urls: Vec<String> = client.transport().take().into_iter().map(|r| r.url).collect();
        urls.sort();
        assert_eq!(
            urls,
            [
                "https://api.example.com/libraries",
                "https://api.example.com/transformations",
            ]
        );
    }

    #[tokio::test]
    async fn client_is_usable_from_spawned_tasks() {
        let client = std::sync::Arc::new(client());
        let tasks: Vec<_> = ["t-1", "t-2", "t-3"]
            .into_iter()
            .map(|id| {
                let client = client.clone();
                tokio::spawn(async move { client.delete_transformation(id).await.map(|_| ()) })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let mut urls: Vec<String> = client.transport().take().into_iter().map(|r| r.url).collect();
        urls.sort();
        assert_eq!(
            urls,
            [
                "https://api.example.com/transformations/t-1",
                "https://api.example.com/transformations/t-2",
                "https://api.example.com/transformations/t-3",
            ]
        );
    }
}
