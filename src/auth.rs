use anyhow::{Context, Result};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Verified requester identity, as yielded by the external identity
/// provider. Every booking/transfer transaction is attributed to one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
	pub subject: String,
	pub email: String,
}

/// Bearer-token verification seam. Token issuance belongs to the
/// external identity provider; Asclepius only validates what it is
/// handed. Tests substitute a stub implementation.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + 'static {
	async fn verify(&self, token: &str) -> Result<Principal>;
}

/// Claims we require from the identity provider's tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
	pub sub: String,
	#[serde(default)]
	pub email: Option<String>,
	pub exp: u64,
	#[serde(default)]
	pub iss: Option<String>,
}

/// HS256 JWT verifier against a shared secret, optionally pinning the
/// issuer.
pub struct JwtVerifier {
	key: DecodingKey,
	validation: Validation,
}

impl JwtVerifier {
	pub fn new(secret: &str, issuer: Option<&str>) -> Self {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.validate_exp = true;
		if let Some(iss) = issuer {
			validation.set_issuer(&[iss]);
		}
		Self {
			key: DecodingKey::from_secret(secret.as_bytes()),
			validation,
		}
	}
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
	async fn verify(&self, token: &str) -> Result<Principal> {
		let data =
			decode::<Claims>(token, &self.key, &self.validation).context("invalid bearer token")?;
		Ok(Principal {
			subject: data.claims.sub,
			email: data.claims.email.unwrap_or_default(),
		})
	}
}
