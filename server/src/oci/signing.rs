//! OCI HTTP request signatures (draft-cavage, `rsa-sha256`)

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::{Method, Url};
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha2::{Digest, Sha256};

use super::auth::Credentials;
use super::error::OciError;

/// Headers that must be attached to a signed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub date: String,
    pub authorization: String,
    pub content_sha256: Option<String>,
    pub content_length: Option<usize>,
}

impl SignedHeaders {
    /// Flatten into header name/value pairs
    pub fn into_pairs(self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("date", self.date), ("authorization", self.authorization)];
        if let Some(sha) = self.content_sha256 {
            pairs.push(("x-content-sha256", sha));
            pairs.push(("content-type", "application/json".to_string()));
        }
        if let Some(len) = self.content_length {
            pairs.push(("content-length", len.to_string()));
        }
        pairs
    }
}

/// Methods whose body is part of the signature
fn signs_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// RFC 7231 date, as required by the `date` header
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn host_header(url: &Url) -> Result<String, OciError> {
    let host = url
        .host_str()
        .ok_or_else(|| OciError::InvalidArgument(format!("URL has no host: {}", url)))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn request_target(method: &Method, url: &Url) -> String {
    let mut target = format!("{} {}", method.as_str().to_lowercase(), url.path());
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    target
}

/// Build the string to sign and the ordered list of signed header names
pub fn signing_string(
    method: &Method,
    url: &Url,
    date: &str,
    body: Option<&[u8]>,
) -> Result<(String, Vec<&'static str>), OciError> {
    let mut names = vec!["date", "(request-target)", "host"];
    let mut lines = vec![
        format!("date: {}", date),
        format!("(request-target): {}", request_target(method, url)),
        format!("host: {}", host_header(url)?),
    ];

    if signs_body(method) {
        let body = body.unwrap_or_default();
        names.extend(["x-content-sha256", "content-type", "content-length"]);
        lines.push(format!("x-content-sha256: {}", body_digest(body)));
        lines.push("content-type: application/json".to_string());
        lines.push(format!("content-length: {}", body.len()));
    }

    Ok((lines.join("\n"), names))
}

pub fn body_digest(body: &[u8]) -> String {
    BASE64.encode(Sha256::digest(body))
}

/// Sign a request at the given instant
pub fn sign_request(
    credentials: &Credentials,
    method: &Method,
    url: &Url,
    body: Option<&[u8]>,
    now: DateTime<Utc>,
) -> Result<SignedHeaders, OciError> {
    let date = http_date(now);
    let (to_sign, names) = signing_string(method, url, &date, body)?;

    let signing_key = SigningKey::<Sha256>::new(credentials.private_key.clone());
    let signature = signing_key
        .try_sign(to_sign.as_bytes())
        .map_err(|e| OciError::Auth(format!("failed to sign request: {}", e)))?;

    let authorization = format!(
        "Signature version=\"1\",keyId=\"{}\",algorithm=\"rsa-sha256\",headers=\"{}\",signature=\"{}\"",
        credentials.key_id,
        names.join(" "),
        BASE64.encode(signature.to_bytes())
    );

    let (content_sha256, content_length) = if signs_body(method) {
        let body = body.unwrap_or_default();
        (Some(body_digest(body)), Some(body.len()))
    } else {
        (None, None)
    };

    Ok(SignedHeaders {
        date,
        authorization,
        content_sha256,
        content_length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::signature::Verifier;
    use rsa::RsaPrivateKey;

    use crate::oci::auth::AuthType;

    fn credentials() -> Credentials {
        Credentials {
            auth_type: AuthType::ApiKey,
            key_id: "tenancy/user/fp".to_string(),
            private_key: RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap(),
            tenancy_id: "tenancy".to_string(),
            region: None,
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn test_http_date() {
        assert_eq!(http_date(fixed_now()), "Tue, 02 Jan 2024 03:04:05 GMT");
    }

    #[test]
    fn test_signing_string_for_get() {
        let url = Url::parse(
            "https://operationsinsights.us-ashburn-1.oci.oraclecloud.com/20200630/databaseInsights?compartmentId=abc&limit=10",
        )
        .unwrap();
        let (text, names) = signing_string(&Method::GET, &url, "DATE", None).unwrap();

        assert_eq!(names, vec!["date", "(request-target)", "host"]);
        assert_eq!(
            text,
            "date: DATE\n\
             (request-target): get /20200630/databaseInsights?compartmentId=abc&limit=10\n\
             host: operationsinsights.us-ashburn-1.oci.oraclecloud.com"
        );
    }

    #[test]
    fn test_signing_string_for_post_includes_body() {
        let url = Url::parse("https://example.com:8443/x").unwrap();
        let (text, names) = signing_string(&Method::POST, &url, "DATE", Some(b"{}")).unwrap();

        assert_eq!(names.len(), 6);
        assert!(text.contains("host: example.com:8443"));
        assert!(text.contains(&format!("x-content-sha256: {}", body_digest(b"{}"))));
        assert!(text.ends_with("content-length: 2"));
    }

    #[test]
    fn test_signature_verifies() {
        let creds = credentials();
        let url = Url::parse("https://identity.us-ashburn-1.oci.oraclecloud.com/20160918/regions").unwrap();

        let headers = sign_request(&creds, &Method::GET, &url, None, fixed_now()).unwrap();
        assert!(headers.authorization.contains("keyId=\"tenancy/user/fp\""));
        assert!(headers.authorization.contains("headers=\"date (request-target) host\""));
        assert_eq!(headers.content_sha256, None);

        let encoded = headers
            .authorization
            .rsplit("signature=\"")
            .next()
            .unwrap()
            .trim_end_matches('"');
        let raw = BASE64.decode(encoded).unwrap();
        let signature = Signature::try_from(raw.as_slice()).unwrap();

        let (text, _) = signing_string(&Method::GET, &url, &headers.date, None).unwrap();
        let verifying = VerifyingKey::<Sha256>::new(creds.private_key.to_public_key());
        assert!(verifying.verify(text.as_bytes(), &signature).is_ok());
    }

    #[test]
    fn test_header_pairs_for_body() {
        let creds = credentials();
        let url = Url::parse("https://example.com/x").unwrap();
        let pairs = sign_request(&creds, &Method::PUT, &url, Some(b"abc"), fixed_now())
            .unwrap()
            .into_pairs();

        let names: Vec<_> = pairs.iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec!["date", "authorization", "x-content-sha256", "content-type", "content-length"]
        );
    }
}
