//! Authorization context handed to probes.

use crate::error::{Result, SearchError};
use std::fmt;
use std::sync::Arc;

/// A bearer token, fetched once per search and shared read-only by every probe.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(Arc<str>);

impl AccessToken {
  /// Wraps a raw token.
  pub fn new(token: impl Into<String>) -> Self {
    Self(Arc::from(token.into()))
  }

  /// The raw token.
  pub fn secret(&self) -> &str {
    &self.0
  }

  /// Value for an `Authorization` header.
  pub fn bearer(&self) -> String {
    format!("Bearer {}", self.0)
  }
}

impl fmt::Debug for AccessToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("AccessToken(***)")
  }
}

/// Supplies the authorization a probe needs.
///
/// Called once per search, before the first round. An error ends the search
/// with [`SearchError::Credential`] without issuing any probe.
pub trait CredentialProvider: Send + Sync {
  /// Obtains a token for the coming search.
  fn access_token(&self) -> Result<AccessToken>;
}

impl<F> CredentialProvider for F
where
  F: Fn() -> Result<AccessToken> + Send + Sync,
{
  fn access_token(&self) -> Result<AccessToken> {
    self()
  }
}

/// A provider that always hands out the same token.
#[derive(Debug, Clone)]
pub struct StaticToken(AccessToken);

impl StaticToken {
  /// Creates a provider for `token`.
  pub fn new(token: impl Into<String>) -> Self {
    Self(AccessToken::new(token))
  }
}

impl CredentialProvider for StaticToken {
  fn access_token(&self) -> Result<AccessToken> {
    if self.0.secret().trim().is_empty() {
      return Err(SearchError::credential("access token is empty"));
    }
    Ok(self.0.clone())
  }
}

/// Signature of a client-credentials token exchange.
pub type TokenExchange = dyn Fn(&str, &str) -> Result<AccessToken> + Send + Sync;

/// OAuth client credentials plus the exchange that turns them into a token.
///
/// The exchange itself (an HTTP call in practice) is supplied by the caller.
/// Blank credentials are rejected before it is ever invoked.
pub struct ClientCredentials {
  client_id: String,
  client_secret: String,
  exchange: Box<TokenExchange>,
}

impl ClientCredentials {
  /// Creates a provider for the given client id and secret.
  pub fn new<F>(client_id: impl Into<String>, client_secret: impl Into<String>, exchange: F) -> Self
  where
    F: Fn(&str, &str) -> Result<AccessToken> + Send + Sync + 'static,
  {
    Self {
      client_id: client_id.into(),
      client_secret: client_secret.into(),
      exchange: Box::new(exchange),
    }
  }

  /// The client id.
  pub fn client_id(&self) -> &str {
    &self.client_id
  }
}

impl fmt::Debug for ClientCredentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ClientCredentials")
      .field("client_id", &self.client_id)
      .field("client_secret", &"***")
      .finish()
  }
}

impl CredentialProvider for ClientCredentials {
  fn access_token(&self) -> Result<AccessToken> {
    if self.client_id.trim().is_empty() || self.client_secret.trim().is_empty() {
      return Err(SearchError::credential("missing API client id or secret"));
    }
    (self.exchange)(&self.client_id, &self.client_secret)
  }
}
