/// Metadata service client.
///
/// Logs in with the user's credentials and resolves a track or album into
/// its display name plus one image locator per cover size.
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use coverfetch_shared::{CoverError, ImageSize, Locators, MetadataError};

use crate::target::TargetKind;

/// Device name announced at login.
const DEVICE_NAME: &str = "coverfetch";

/// Default base URL for cover image files.
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://i.scdn.co/image";

/// Login credentials, both non-empty.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Result<Self, CoverError> {
        if username.is_empty() || password.is_empty() {
            return Err(CoverError::MissingCredentials);
        }
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authenticated session token.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// A resolved target: its name and where each cover size lives.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub name: String,
    pub locators: Locators<ImageSize>,
}

/// Resolves targets into cover locators.
#[async_trait]
pub trait MetadataService: Send + Sync {
    /// Open an authenticated session.
    async fn login(&self, credentials: &Credentials) -> Result<Session, MetadataError>;

    /// Look up the item with the given hex id.
    async fn resolve(
        &self,
        session: &Session,
        kind: TargetKind,
        hex_id: &str,
    ) -> Result<Resolved, MetadataError>;
}

// ====== WIRE TYPES ======

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    device_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// One cover image file.
#[derive(Debug, Clone, Deserialize)]
pub struct CoverImage {
    /// Size tag such as `SMALL`.
    pub size: String,
    pub file_id: String,
}

/// Album metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct AlbumMetadata {
    pub name: String,
    #[serde(default)]
    pub covers: Vec<CoverImage>,
}

/// Track metadata. A track's covers are its album's covers.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackMetadata {
    pub name: String,
    pub album: AlbumMetadata,
}

/// Map cover images to locators under `image_base_url`.
///
/// Unknown size tags are skipped. A later image of the same size replaces an
/// earlier one.
pub fn cover_locators(image_base_url: &str, covers: &[CoverImage]) -> Locators<ImageSize> {
    let base = image_base_url.trim_end_matches('/');
    let mut locators = Locators::new();
    for cover in covers {
        match cover.size.parse::<ImageSize>() {
            Ok(size) => {
                locators.insert(size, format!("{}/{}", base, cover.file_id));
            }
            Err(e) => warn!("Skipping cover {}: {}", cover.file_id, e),
        }
    }
    locators
}

/// JSON-over-HTTP metadata service.
///
/// This is not a Spotify client. It expects a metadata gateway that exposes
/// `POST /login`, `GET /track/{hex_id}` and `GET /album/{hex_id}` with the
/// JSON shapes above and bearer-token auth; the binary needs such a gateway
/// at `--metadata-url`.
pub struct HttpMetadataService {
    client: Client,
    base_url: String,
    image_base_url: String,
}

impl HttpMetadataService {
    pub fn new(client: Client, base_url: &str, image_base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            image_base_url: image_base_url.to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        session: &Session,
        url: String,
    ) -> Result<T, MetadataError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(session.token())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl MetadataService for HttpMetadataService {
    async fn login(&self, credentials: &Credentials) -> Result<Session, MetadataError> {
        let url = format!("{}/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                username: &credentials.username,
                password: &credentials.password,
                device_name: DEVICE_NAME,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let login: LoginResponse = serde_json::from_slice(&body)?;
        debug!("Logged in as {}", credentials.username());
        Ok(Session::new(login.token))
    }

    async fn resolve(
        &self,
        session: &Session,
        kind: TargetKind,
        hex_id: &str,
    ) -> Result<Resolved, MetadataError> {
        let url = format!("{}/{}/{}", self.base_url, kind, hex_id);
        let (name, covers) = match kind {
            TargetKind::Track => {
                let track: TrackMetadata = self.get_json(session, url).await?;
                (track.name, track.album.covers)
            }
            TargetKind::Album => {
                let album: AlbumMetadata = self.get_json(session, url).await?;
                (album.name, album.covers)
            }
        };

        Ok(Resolved {
            name,
            locators: cover_locators(&self.image_base_url, &covers),
        })
    }
}
