use super::{
    build_client, ensure_success, trimmed_base_url, AccessToken, RoomMetadata, RoomProvider,
    RoomUserInfo,
};
use crate::error::{Error, ValidationErrorKind};
use async_trait::async_trait;
use log::*;
use reqwest::StatusCode;
use secrecy::SecretString;
use serde_json::{json, Value};
use service::config::Config;
use std::time::Duration;

const PROVIDER: &str = "Liveblocks";

/// Liveblocks REST API client, authenticated with the project's secret key.
pub struct LiveblocksClient {
    client: reqwest::Client,
    base_url: String,
}

impl LiveblocksClient {
    pub fn new(
        base_url: impl Into<String>,
        secret: &SecretString,
        timeout: Duration,
    ) -> Result<Self, Error> {
        Ok(Self {
            client: build_client(Some(secret), timeout)?,
            base_url: trimmed_base_url(base_url),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let secret = config.liveblocks_secret().ok_or_else(|| {
            warn!("Failed to get Liveblocks secret from config");
            Error::config("LIVEBLOCKS_SECRET is not set")
        })?;

        Self::new(
            config.liveblocks_base_url(),
            &SecretString::new(secret),
            config.provider_timeout(),
        )
    }

    fn room_url(&self, room_id: &str) -> String {
        format!(
            "{}/v2/rooms/{}",
            self.base_url,
            urlencoding::encode(room_id)
        )
    }
}

#[async_trait]
impl RoomProvider for LiveblocksClient {
    async fn create_room(&self, room_id: &str, metadata: &RoomMetadata) -> Result<(), Error> {
        let url = format!("{}/v2/rooms", self.base_url);
        let body = json!({
            "id": room_id,
            "defaultAccesses": [],
            "metadata": metadata,
        });

        debug!("Creating room {room_id}");
        let response = self.client.post(&url).json(&body).send().await?;

        if response.status() == StatusCode::CONFLICT {
            info!("Room {room_id} already exists, reusing it");
            return Ok(());
        }

        ensure_success(PROVIDER, response).await?;
        info!("Created room {room_id}");
        Ok(())
    }

    async fn issue_access_token(
        &self,
        room_id: &str,
        user_id: &str,
        user_info: &RoomUserInfo,
    ) -> Result<AccessToken, Error> {
        let url = format!("{}/v2/authorize-user", self.base_url);
        let mut permissions = serde_json::Map::new();
        permissions.insert(room_id.to_string(), json!(["room:write"]));
        let body = json!({
            "userId": user_id,
            "userInfo": user_info,
            "permissions": permissions,
        });

        debug!("Issuing access token for user {user_id} in room {room_id}");
        let response = self.client.post(&url).json(&body).send().await?;
        let response = ensure_success(PROVIDER, response).await?;

        Ok(response.json::<AccessToken>().await?)
    }

    async fn fetch_snapshot(&self, room_id: &str) -> Result<Value, Error> {
        let url = format!("{}/storage", self.room_url(room_id));

        debug!("Fetching storage snapshot of room {room_id}");
        let response = self
            .client
            .get(&url)
            .query(&[("format", "json")])
            .send()
            .await?;
        let raw = ensure_success(PROVIDER, response).await?.text().await?;

        serde_json::from_str(&raw).map_err(|err| {
            error!("Storage snapshot of room {room_id} is not valid JSON: {err}");
            Error {
                source: Some(Box::new(err)),
                ..Error::validation(ValidationErrorKind::MalformedSnapshot(format!(
                    "storage snapshot of room {room_id} is not valid JSON"
                )))
            }
        })
    }

    async fn delete_room(&self, room_id: &str) -> Result<(), Error> {
        debug!("Deleting room {room_id}");
        let response = self.client.delete(self.room_url(room_id)).send().await?;
        ensure_success(PROVIDER, response).await?;
        info!("Deleted room {room_id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, ErrorCategory, ExternalErrorKind, InternalErrorKind};
    use mockito::{Matcher, Server};

    const ROOM_ID: &str = "group:11111111-1111-1111-1111-111111111111:meeting:22222222-2222-2222-2222-222222222222";

    // Matches the room id in a path whether or not the colons arrive percent-encoded.
    const ROOM_PATH: &str = "group(:|%3A)11111111-1111-1111-1111-111111111111(:|%3A)meeting(:|%3A)22222222-2222-2222-2222-222222222222";

    fn client(server: &mockito::ServerGuard) -> LiveblocksClient {
        LiveblocksClient::new(
            server.url(),
            &SecretString::new("sk_test_secret".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn metadata() -> RoomMetadata {
        RoomMetadata {
            group_id: "11111111-1111-1111-1111-111111111111".parse().unwrap(),
            meeting_id: "22222222-2222-2222-2222-222222222222".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn create_room_sends_id_and_metadata_with_bearer_secret() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/rooms")
            .match_header("authorization", "Bearer sk_test_secret")
            .match_body(Matcher::Json(json!({
                "id": ROOM_ID,
                "defaultAccesses": [],
                "metadata": {
                    "groupId": "11111111-1111-1111-1111-111111111111",
                    "meetingId": "22222222-2222-2222-2222-222222222222"
                }
            })))
            .with_status(200)
            .with_body(r#"{"id":"room"}"#)
            .create_async()
            .await;

        client(&server)
            .create_room(ROOM_ID, &metadata())
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_room_treats_conflict_as_success() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v2/rooms")
            .with_status(409)
            .with_body(r#"{"error":"ROOM_ALREADY_EXISTS"}"#)
            .create_async()
            .await;

        assert!(client(&server)
            .create_room(ROOM_ID, &metadata())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn issue_access_token_requests_write_access_to_one_room() {
        let mut permissions = serde_json::Map::new();
        permissions.insert(ROOM_ID.to_string(), json!(["room:write"]));

        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/authorize-user")
            .match_header("authorization", "Bearer sk_test_secret")
            .match_body(Matcher::Json(json!({
                "userId": "42",
                "userInfo": {"id": "User#42", "name": "Minji", "role": "PM"},
                "permissions": permissions
            })))
            .with_status(200)
            .with_body(r#"{"token":"lb_token"}"#)
            .create_async()
            .await;

        let token = client(&server)
            .issue_access_token(
                ROOM_ID,
                "42",
                &RoomUserInfo {
                    id: "User#42".to_string(),
                    name: "Minji".to_string(),
                    role: "PM".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(token.token, "lb_token");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_snapshot_parses_storage_json() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock(
                "GET",
                Matcher::Regex(format!("^/v2/rooms/{ROOM_PATH}/storage")),
            )
            .match_query(Matcher::UrlEncoded("format".into(), "json".into()))
            .with_status(200)
            .with_body(r#"{"liveblocksType":"LiveObject","data":{"doc":{"content":[]}}}"#)
            .create_async()
            .await;

        let snapshot = client(&server).fetch_snapshot(ROOM_ID).await.unwrap();

        assert_eq!(snapshot["data"]["doc"]["content"], json!([]));
    }

    #[tokio::test]
    async fn fetch_snapshot_rejects_unparseable_storage() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock(
                "GET",
                Matcher::Regex(format!("^/v2/rooms/{ROOM_PATH}/storage")),
            )
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let err = client(&server).fetch_snapshot(ROOM_ID).await.unwrap_err();

        assert!(matches!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Validation(
                ValidationErrorKind::MalformedSnapshot(_)
            ))
        ));
    }

    #[tokio::test]
    async fn fetch_snapshot_surfaces_provider_errors() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock(
                "GET",
                Matcher::Regex(format!("^/v2/rooms/{ROOM_PATH}/storage")),
            )
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let err = client(&server).fetch_snapshot(ROOM_ID).await.unwrap_err();

        assert_eq!(err.category(), ErrorCategory::UpstreamFailure);
    }

    #[tokio::test]
    async fn fetch_snapshot_gives_up_when_the_provider_never_answers() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accepts connections and holds them open without ever writing a response.
        let silent = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = LiveblocksClient::new(
            format!("http://{addr}"),
            &SecretString::new("sk_test_secret".to_string()),
            Duration::from_millis(500),
        )
        .unwrap();

        let started = std::time::Instant::now();
        let err = client.fetch_snapshot(ROOM_ID).await.unwrap_err();
        silent.abort();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Timeout)
        );
        assert_eq!(err.category(), ErrorCategory::UpstreamFailure);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn delete_room_keeps_the_error_body_verbatim() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", Matcher::Regex(format!("^/v2/rooms/{ROOM_PATH}$")))
            .with_status(404)
            .with_body(r#"{"error":"ROOM_NOT_FOUND","message":"Room not found"}"#)
            .create_async()
            .await;

        let err = client(&server).delete_room(ROOM_ID).await.unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Upstream {
                status: 404,
                body: r#"{"error":"ROOM_NOT_FOUND","message":"Room not found"}"#.to_string(),
            })
        );
    }

    #[tokio::test]
    async fn delete_room_succeeds_on_no_content() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", Matcher::Regex(format!("^/v2/rooms/{ROOM_PATH}$")))
            .match_header("authorization", "Bearer sk_test_secret")
            .with_status(204)
            .create_async()
            .await;

        client(&server).delete_room(ROOM_ID).await.unwrap();

        mock.assert_async().await;
    }
}
