// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client identification cookie.
//!
//! Each browser gets a random client id in the `portal_client` cookie. The id
//! selects the server-side session store standing in for that browser's
//! storage. The cookie must survive the cross-site form post back from Entra
//! ID, so secure deployments send it `SameSite=None; Secure`.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts, HeaderValue},
};
use tracing::debug;

use crate::session::ClientId;

pub const CLIENT_COOKIE: &str = "portal_client";

/// The client id from the request cookie, if present and well formed.
pub struct ClientCookie(pub Option<ClientId>);

impl<S: Send + Sync> FromRequestParts<S> for ClientCookie {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|header| cookie_value(header, CLIENT_COOKIE));

        let client_id = raw.and_then(|value| match value.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                debug!("Ignoring malformed client cookie");
                None
            }
        });

        Ok(ClientCookie(client_id))
    }
}

fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key.trim() == name).then(|| value.trim().trim_matches('"'))
    })
}

fn attributes(secure: bool) -> &'static str {
    if secure {
        "Path=/; HttpOnly; SameSite=None; Secure"
    } else {
        "Path=/; HttpOnly; SameSite=Lax"
    }
}

/// `Set-Cookie` value binding the browser to `client_id`.
pub fn set_cookie(client_id: &ClientId, secure: bool) -> HeaderValue {
    let cookie = format!("{CLIENT_COOKIE}={client_id}; {}", attributes(secure));
    // A hyphenated UUID and fixed attributes are always valid header bytes.
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// `Set-Cookie` value that removes the client cookie.
pub fn expire_cookie(secure: bool) -> HeaderValue {
    if secure {
        HeaderValue::from_static("portal_client=; Path=/; HttpOnly; SameSite=None; Secure; Max-Age=0")
    } else {
        HeaderValue::from_static("portal_client=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
    }
}
