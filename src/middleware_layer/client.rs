use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::Response,
};
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

/// The cookie that identifies a browser client.
pub const CLIENT_COOKIE: &str = "client_id";

/// How long the client cookie lives, in days.
const CLIENT_COOKIE_MAX_AGE_DAYS: i64 = 30;

/// Identifies the browser client a request comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientId(pub Uuid);

/// Extracts the client ID from the request cookies.
///
/// # Arguments
///
/// * `cookies` - The request cookies.
///
/// # Returns
///
/// An `Option` containing the client ID if found.
fn extract_client_id(cookies: &Cookies) -> Option<Uuid> {
    cookies
        .get(CLIENT_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

/// Creates a secure cookie with the given name, value, and max age.
fn create_secure_cookie(name: &'static str, value: String, max_age_days: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);

    let is_production = std::env::var("APP_ENV")
        .unwrap_or_else(|_| "development".to_string()) == "production";

    cookie.set_http_only(true);

    if is_production {
        cookie.set_secure(true);
    }

    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_max_age(Duration::days(max_age_days));
    cookie.set_path("/");

    cookie
}

/// A middleware that makes sure every request carries a client ID.
///
/// A client without a valid `client_id` cookie gets a new one. The ID is
/// inserted into the request extensions as `ClientId`.
pub async fn ensure_client(
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let client_id = match extract_client_id(&cookies) {
        Some(id) => id,
        None => {
            let id = Uuid::new_v4();
            cookies.add(create_secure_cookie(
                CLIENT_COOKIE,
                id.to_string(),
                CLIENT_COOKIE_MAX_AGE_DAYS,
            ));
            tracing::debug!("🍪 Issued client_id: {}", id);
            id
        }
    };

    request.extensions_mut().insert(ClientId(client_id));

    next.run(request).await
}
