//! Helpers for extracting repository and image identities from request paths.
//!
//! Backends call these on the (percent-decoded) request path; the
//! dispatcher itself only matches and never validates the remainder.

use crate::error::{GatewayError, Result};
use axum::extract::Request;
use std::borrow::Cow;

pub const REPO_PREFIX: &str = "/repo/";
pub const IMAGE_PREFIX: &str = "/image/";
pub const TOKEN_PATH: &str = "/token";

pub const DEFAULT_TAG: &str = "latest";

/// A repository name and tag parsed from `/image/<name[:tag]>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub name: String,
    pub tag: String,
}

/// Percent-decoded path of the request. Undecodable paths are used raw.
pub fn request_path(request: &Request) -> Cow<'_, str> {
    let raw = request.uri().path();
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

/// Repository name from `/repo/<name>`.
pub fn repo_name(path: &str) -> Result<&str> {
    path.strip_prefix(REPO_PREFIX)
        .ok_or_else(|| GatewayError::InvalidPath(path.to_string()))
}

/// Image reference from `/image/<name[:tag]>`, split on the last `:`.
pub fn image_reference(path: &str) -> Result<ImageReference> {
    let fullname = path
        .strip_prefix(IMAGE_PREFIX)
        .ok_or_else(|| GatewayError::InvalidPath(path.to_string()))?;

    let (name, tag) = match fullname.rsplit_once(':') {
        Some((name, tag)) => (name, tag),
        None => (fullname, DEFAULT_TAG),
    };

    if tag.is_empty() {
        return Err(GatewayError::InvalidTag(path.to_string()));
    }

    Ok(ImageReference {
        name: name.to_string(),
        tag: tag.to_string(),
    })
}

/// Repository a token request is scoped to: `None` for `/token` and `/token/`.
pub fn token_scope(path: &str) -> Result<Option<&str>> {
    let rest = path
        .strip_prefix(TOKEN_PATH)
        .ok_or_else(|| GatewayError::InvalidPath(path.to_string()))?;

    match rest {
        "" | "/" => Ok(None),
        _ => rest
            .strip_prefix('/')
            .map(Some)
            .ok_or_else(|| GatewayError::InvalidPath(path.to_string())),
    }
}
