//! Corporate SSO login and the cookie shortcut around it.
//!
//! Interactive sign-in is slow (two redirects plus the identity provider),
//! so repeated runs inject a saved session cookie jar instead and only fall
//! back to the form when the jar has gone stale.

use crate::{locate, Error, Locator, PageContext, Result};
use eoka::Page;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// SSO account used by the suite.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// One cookie of a saved session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// A saved session: the cookie jar from a previous successful login.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionCookies {
    pub cookies: Vec<SessionCookie>,
}

impl SessionCookies {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Install every cookie into the page, then reload so the app sees them.
    pub async fn inject(&self, page: &Page) -> Result<()> {
        if self.cookies.is_empty() {
            return Err(Error::Auth("cookie jar is empty".into()));
        }
        for cookie in &self.cookies {
            debug!("injecting cookie {}", cookie.name);
            page.set_cookie(
                &cookie.name,
                &cookie.value,
                cookie.domain.as_deref(),
                cookie.path.as_deref(),
            )
            .await?;
        }
        page.reload().await?;
        Ok(())
    }

    /// Capture the current page's cookies. `document.cookie` misses HttpOnly
    /// entries, so a jar captured here may still need the form fallback.
    pub async fn capture(page: &Page, domain: &str) -> Result<Self> {
        let raw: String = page.evaluate("document.cookie").await?;
        let cookies = raw
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                Some(SessionCookie {
                    name: name.to_string(),
                    value: value.to_string(),
                    domain: Some(domain.to_string()),
                    path: Some("/".to_string()),
                })
            })
            .collect();
        Ok(Self { cookies })
    }
}

/// The identity-provider sign-in screen.
pub struct LoginPage<'a> {
    page: &'a Page,
    ctx: &'a PageContext,
}

impl<'a> LoginPage<'a> {
    pub fn new(page: &'a Page, ctx: &'a PageContext) -> Self {
        Self { page, ctx }
    }

    fn username_input() -> Locator {
        Locator::new("sso username", "#okta-signin-username")
            .or("input[name=\"username\"]")
            .or("input[type=\"email\"]")
    }

    fn password_input() -> Locator {
        Locator::new("sso password", "#okta-signin-password")
            .or("input[name=\"password\"]")
            .or("input[type=\"password\"]")
    }

    fn submit_button() -> Locator {
        Locator::new("sso submit", "#okta-signin-submit").or("button[type=\"submit\"]")
    }

    /// Marker only rendered for signed-in users.
    const ACCOUNT_MARKER: &'static str = "[data-testid=\"account-menu\"]";
    const ERROR_BANNER: &'static str = ".okta-form-infobox-error, [role=\"alert\"]";

    /// Drive the sign-in form. Handles both the single-screen form and the
    /// two-step variant where the password field appears after "Next".
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<()> {
        info!("signing in as {}", credentials.username);
        locate::fill(self.page, self.ctx, &Self::username_input(), &credentials.username).await?;

        if locate::resolve(self.page, &Self::password_input()).await.is_err() {
            locate::click(self.page, self.ctx, &Self::submit_button()).await?;
            let password = Self::password_input();
            let candidates: Vec<&str> = password.candidates().iter().map(String::as_str).collect();
            locate::wait_for_any(self.page, &candidates, self.ctx.element_timeout_ms)
                .await
                .ok();
        }

        locate::fill(self.page, self.ctx, &Self::password_input(), &credentials.password).await?;
        locate::click(self.page, self.ctx, &Self::submit_button()).await?;

        let landed = locate::wait_for_any(
            self.page,
            &[Self::ACCOUNT_MARKER, Self::ERROR_BANNER],
            self.ctx.element_timeout_ms,
        )
        .await
        .map_err(|_| Error::Auth("no redirect after submitting credentials".into()))?;

        if landed == 1 {
            let banner: String = self
                .page
                .evaluate(&format!(
                    "(document.querySelector({})?.textContent || '').trim()",
                    serde_json::to_string(Self::ERROR_BANNER).unwrap()
                ))
                .await
                .unwrap_or_default();
            return Err(Error::Auth(format!("identity provider rejected login: {banner}")));
        }
        Ok(())
    }

    /// Whether the current page shows the signed-in marker.
    pub async fn is_authenticated(page: &Page) -> Result<bool> {
        locate::is_visible(page, Self::ACCOUNT_MARKER).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_jar_roundtrips_through_json() {
        let jar = SessionCookies {
            cookies: vec![SessionCookie {
                name: "sid".into(),
                value: "abc123".into(),
                domain: Some(".example-air.com".into()),
                path: Some("/".into()),
            }],
        };
        let json = serde_json::to_string(&jar).unwrap();
        let back: SessionCookies = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cookies.len(), 1);
        assert_eq!(back.cookies[0].name, "sid");
        assert_eq!(back.cookies[0].domain.as_deref(), Some(".example-air.com"));
    }

    #[test]
    fn cookie_jar_accepts_minimal_entries() {
        let back: SessionCookies =
            serde_json::from_str(r#"{"cookies":[{"name":"sid","value":"x"}]}"#).unwrap();
        assert!(back.cookies[0].domain.is_none());
        assert!(back.cookies[0].path.is_none());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join("fareflow-auth-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("session.json");
        let jar = SessionCookies {
            cookies: vec![SessionCookie {
                name: "sid".into(),
                value: "v".into(),
                domain: None,
                path: None,
            }],
        };
        jar.save(&path).unwrap();
        let back = SessionCookies::load(&path).unwrap();
        assert_eq!(back.cookies[0].value, "v");
        std::fs::remove_file(&path).ok();
    }
}
