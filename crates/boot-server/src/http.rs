//! HTTP boot configuration and artifact server
//!
//! Per-MAC endpoints backed by the lease table:
//!
//! - `GET /v1/boot/{mac}` — boot policy as JSON (Pixiecore-compatible)
//! - `GET /v1/boot/{mac}/config` — generated install configuration (YAML)
//! - `GET /v1/boot/{mac}/kernel`, `GET /v1/boot/{mac}/initrd` — artifacts
//!
//! A MAC without an active lease gets 404 on every endpoint; that is the
//! whole "no boot policy" surface as seen from the network.

use crate::error::BootError;
use crate::lease::LeaseTable;
use crate::policy::{render_install_config, resolve};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use host_model::normalize_mac;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path as StdPath, PathBuf};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Boot configuration answer for `GET /v1/boot/{mac}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootConfig {
    /// Kernel download path
    pub kernel: String,
    /// Initrd download paths
    #[serde(default)]
    pub initrd: Vec<String>,
    /// Kernel command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmdline: Option<String>,
    /// Optional operator-facing message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Shared state for the HTTP handlers.
#[derive(Debug, Clone)]
pub struct HttpState {
    /// Lease table shared with the other listeners
    pub leases: LeaseTable,
    /// Root directory holding kernel/initrd blobs
    pub artifact_root: PathBuf,
}

/// Build the boot HTTP router.
pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/boot/{mac}", get(boot_config))
        .route("/v1/boot/{mac}/config", get(install_config))
        .route("/v1/boot/{mac}/kernel", get(kernel_artifact))
        .route("/v1/boot/{mac}/initrd", get(initrd_artifact))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the router on an already-bound listener.
pub async fn serve(listener: TcpListener, state: HttpState) -> Result<(), BootError> {
    info!(addr = %listener.local_addr()?, "HTTP boot server listening");
    axum::serve(listener, router(state))
        .await
        .map_err(|e| BootError::Http(e.to_string()))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn boot_config(
    State(state): State<HttpState>,
    Path(mac): Path<String>,
) -> Result<Json<BootConfig>, StatusCode> {
    let mac = normalize_mac(&mac).map_err(|_| StatusCode::BAD_REQUEST)?;
    let policy = resolve(&state.leases, &mac)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(BootConfig {
        kernel: format!("/v1/boot/{mac}/kernel"),
        initrd: vec![format!("/v1/boot/{mac}/initrd")],
        cmdline: Some(policy.cmdline),
        message: None,
    }))
}

async fn install_config(
    State(state): State<HttpState>,
    Path(mac): Path<String>,
) -> Result<Response, StatusCode> {
    let mac = normalize_mac(&mac).map_err(|_| StatusCode::BAD_REQUEST)?;
    let lease = state
        .leases
        .lookup(&mac)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    let body = render_install_config(&lease).map_err(|err| {
        warn!(%mac, error = %err, "failed to render install config");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(([(header::CONTENT_TYPE, "application/yaml")], body).into_response())
}

async fn kernel_artifact(
    State(state): State<HttpState>,
    Path(mac): Path<String>,
) -> Result<Response, StatusCode> {
    serve_artifact(&state, &mac, ArtifactKind::Kernel).await
}

async fn initrd_artifact(
    State(state): State<HttpState>,
    Path(mac): Path<String>,
) -> Result<Response, StatusCode> {
    serve_artifact(&state, &mac, ArtifactKind::Initrd).await
}

#[derive(Debug, Clone, Copy)]
enum ArtifactKind {
    Kernel,
    Initrd,
}

async fn serve_artifact(
    state: &HttpState,
    mac: &str,
    kind: ArtifactKind,
) -> Result<Response, StatusCode> {
    let mac = normalize_mac(mac).map_err(|_| StatusCode::BAD_REQUEST)?;
    let lease = state
        .leases
        .lookup(&mac)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    let name = match kind {
        ArtifactKind::Kernel => &lease.kernel,
        ArtifactKind::Initrd => &lease.initrd,
    };
    let path = safe_join(&state.artifact_root, name).ok_or_else(|| {
        warn!(%mac, name, "artifact name escapes the artifact root");
        StatusCode::NOT_FOUND
    })?;

    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok((
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response()),
        Err(err) => {
            warn!(%mac, path = %path.display(), error = %err, "artifact read failed");
            Err(StatusCode::NOT_FOUND)
        }
    }
}

/// Join an artifact name onto the root, rejecting absolute paths and any
/// traversal components.
fn safe_join(root: &StdPath, name: &str) -> Option<PathBuf> {
    let rel = StdPath::new(name);
    if rel.as_os_str().is_empty() || rel.is_absolute() {
        return None;
    }
    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(rel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::lease_for_host;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Duration;
    use host_model::{
        BmcEndpoint, BmcProtocol, DiskLayout, Host, ImageSpec, OsSpec,
    };
    use tower::ServiceExt;

    fn sample_host(mac: &str) -> Host {
        Host {
            hostname: "h1".to_string(),
            mac: mac.to_string(),
            bmc: BmcEndpoint {
                address: "10.0.0.10".to_string(),
                protocol: BmcProtocol::Redfish,
                username: "admin".to_string(),
                password: "secret".to_string(),
                insecure_skip_verify: true,
            },
            hardware: None,
            os: OsSpec {
                os_type: String::new(),
                version: String::new(),
                source: String::new(),
                root_password: String::new(),
                ssh_keys: vec![],
                image: ImageSpec {
                    kernel: "vmlinuz".to_string(),
                    initrd: "initrd.img".to_string(),
                    cmdline: "console=ttyS0".to_string(),
                },
                disk: DiskLayout {
                    device: "/dev/sda".to_string(),
                    filesystem: "ext4".to_string(),
                    use_lvm: false,
                    partition_scheme: None,
                    partitions: vec![],
                },
                network: Default::default(),
                packages: vec![],
                pre_install: vec![],
                post_install: vec![],
            },
        }
    }

    async fn state_with_lease(mac: &str) -> HttpState {
        let leases = LeaseTable::new();
        leases
            .insert(lease_for_host(
                &sample_host(mac),
                "http://10.0.0.1:8080",
                Duration::minutes(30),
            ))
            .await;
        HttpState {
            leases,
            artifact_root: std::env::temp_dir(),
        }
    }

    #[tokio::test]
    async fn test_boot_config_with_lease() {
        let state = state_with_lease("aa:bb:cc:dd:ee:01").await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/boot/aa:bb:cc:dd:ee:01")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_boot_config_without_lease_is_404() {
        let state = HttpState {
            leases: LeaseTable::new(),
            artifact_root: std::env::temp_dir(),
        };
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/boot/aa:bb:cc:dd:ee:99")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_mac_is_400() {
        let state = HttpState {
            leases: LeaseTable::new(),
            artifact_root: std::env::temp_dir(),
        };
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/boot/not-a-mac")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_install_config_served_as_yaml() {
        let state = state_with_lease("aa:bb:cc:dd:ee:01").await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/boot/aa:bb:cc:dd:ee:01/config")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/yaml"
        );
    }

    #[tokio::test]
    async fn test_missing_artifact_is_404() {
        let mut state = state_with_lease("aa:bb:cc:dd:ee:01").await;
        state.artifact_root = PathBuf::from("/nonexistent-artifact-root");
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/boot/aa:bb:cc:dd:ee:01/kernel")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_safe_join_rejects_traversal() {
        let root = StdPath::new("/srv/artifacts");
        assert!(safe_join(root, "vmlinuz").is_some());
        assert!(safe_join(root, "images/vmlinuz").is_some());
        assert!(safe_join(root, "../etc/shadow").is_none());
        assert!(safe_join(root, "/etc/shadow").is_none());
        assert!(safe_join(root, "images/../../etc/shadow").is_none());
        assert!(safe_join(root, "").is_none());
    }
}
