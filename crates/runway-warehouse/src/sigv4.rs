//! AWS Signature Version 4 request signing.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Url;
use runway_core::AwsCredentials;
use sha2::{Digest, Sha256};

use crate::error::{QueryError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Headers to attach to a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// `Authorization` header value.
    pub authorization: String,
    /// `X-Amz-Date` header value.
    pub amz_date: String,
    /// `X-Amz-Content-Sha256` header value.
    pub payload_hash: String,
    /// `X-Amz-Security-Token` header value, for temporary credentials.
    pub security_token: Option<String>,
}

/// What is being signed.
#[derive(Debug, Clone, Copy)]
pub struct SigningRequest<'a> {
    /// HTTP method, upper case.
    pub method: &'a str,
    /// Full request URL.
    pub url: &'a Url,
    /// Extra headers that must be covered by the signature (lower-case names).
    pub headers: &'a [(&'a str, &'a str)],
    /// Request body.
    pub payload: &'a [u8],
}

/// Signs `request` for `service` in `region` at time `now`.
///
/// # Errors
///
/// Returns [`QueryError::Validation`] if the URL has no host or a signing key
/// is rejected.
pub fn sign(
    request: &SigningRequest<'_>,
    credentials: &AwsCredentials,
    region: &str,
    service: &str,
    now: DateTime<Utc>,
) -> Result<SignedHeaders> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();
    let payload_hash = sha256_hex(request.payload);
    let host = host_header(request.url)?;

    let mut canonical_headers: Vec<(String, String)> = request
        .headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), (*value).to_string()))
        .collect();
    canonical_headers.push(("host".to_string(), host));
    canonical_headers.push(("x-amz-content-sha256".to_string(), payload_hash.clone()));
    canonical_headers.push(("x-amz-date".to_string(), amz_date.clone()));
    if let Some(token) = credentials.session_token() {
        canonical_headers.push(("x-amz-security-token".to_string(), token.to_string()));
    }
    canonical_headers.sort_by(|left, right| left.0.cmp(&right.0));

    let signed_headers = canonical_headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let mut canonical_headers_block = String::new();
    for (name, value) in &canonical_headers {
        let _ = writeln!(canonical_headers_block, "{name}:{}", value.trim());
    }

    let canonical_request = format!(
        "{}\n{}\n{}\n{canonical_headers_block}\n{signed_headers}\n{payload_hash}",
        request.method,
        encoded_path(request.url),
        encoded_query(request.url),
    );
    let credential_scope = format!("{date_stamp}/{region}/{service}/aws4_request");
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{}",
        sha256_hex(canonical_request.as_bytes())
    );

    let key = signing_key(credentials.secret_access_key(), &date_stamp, region, service)?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    Ok(SignedHeaders {
        authorization: format!(
            "AWS4-HMAC-SHA256 Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
            credentials.access_key_id()
        ),
        amz_date,
        payload_hash,
        security_token: credentials.session_token().map(str::to_string),
    })
}

/// Derives the SigV4 signing key for a day, region and service.
///
/// # Errors
///
/// Returns [`QueryError::Validation`] if HMAC initialization fails.
pub fn signing_key(
    secret_access_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>> {
    let mut key = format!("AWS4{secret_access_key}").into_bytes();
    for part in [date_stamp, region, service, "aws4_request"] {
        key = hmac_sha256(&key, part.as_bytes())?;
    }
    Ok(key)
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| QueryError::Validation(format!("invalid signing key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// `host[:port]` exactly as the Host header carries it.
fn host_header(url: &Url) -> Result<String> {
    let Some(host) = url.host_str() else {
        return Err(QueryError::Validation(format!(
            "endpoint URL {url} is missing a host"
        )));
    };
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// The URL path with every segment URI-encoded once more; `/` for the root.
fn encoded_path(url: &Url) -> String {
    let mut path = String::new();
    for segment in url.path().split('/').filter(|s| !s.is_empty()) {
        path.push('/');
        uri_encode_into(&mut path, segment);
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}

/// Decoded query parameters, re-encoded and ordered by name then value.
fn encoded_query(url: &Url) -> String {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, value)| (uri_encode(&name), uri_encode(&value)))
        .collect();
    params.sort_unstable();

    let mut query = String::new();
    for (name, value) in params {
        if !query.is_empty() {
            query.push('&');
        }
        let _ = write!(query, "{name}={value}");
    }
    query
}

fn uri_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    uri_encode_into(&mut out, value);
    out
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
fn uri_encode_into(out: &mut String, value: &str) {
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(char::from(byte));
            }
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const EXAMPLE_SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    fn credentials(token: Option<&str>) -> AwsCredentials {
        AwsCredentials::new("AKIDEXAMPLE", EXAMPLE_SECRET, token.map(str::to_string))
            .expect("valid credentials")
    }

    #[test]
    fn derives_documented_signing_key() {
        // Worked example from the AWS SigV4 documentation.
        let key = signing_key(EXAMPLE_SECRET, "20120215", "us-east-1", "iam").expect("key");
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn authorization_header_names_scope_and_signed_headers() {
        let url = Url::parse("https://athena.us-east-1.amazonaws.com/").expect("url");
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 6, 30, 0).single().expect("time");
        let signed = sign(
            &SigningRequest {
                method: "POST",
                url: &url,
                headers: &[
                    ("content-type", "application/x-amz-json-1.1"),
                    ("x-amz-target", "AmazonAthena.GetQueryExecution"),
                ],
                payload: b"{}",
            },
            &credentials(None),
            "us-east-1",
            "athena",
            now,
        )
        .expect("sign");

        assert_eq!(signed.amz_date, "20240302T063000Z");
        assert!(signed.authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240302/us-east-1/athena/aws4_request, "
        ));
        assert!(signed.authorization.contains(
            "SignedHeaders=content-type;host;x-amz-content-sha256;x-amz-date;x-amz-target,"
        ));
        assert_eq!(
            signed.payload_hash,
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
        assert!(signed.security_token.is_none());
    }

    #[test]
    fn session_token_is_signed_and_returned() {
        let url = Url::parse("https://athena.us-east-1.amazonaws.com/").expect("url");
        let signed = sign(
            &SigningRequest {
                method: "POST",
                url: &url,
                headers: &[],
                payload: b"",
            },
            &credentials(Some("session")),
            "us-east-1",
            "athena",
            Utc::now(),
        )
        .expect("sign");

        assert!(signed.authorization.contains("x-amz-security-token"));
        assert_eq!(signed.security_token.as_deref(), Some("session"));
    }

    #[test]
    fn signature_changes_with_payload() {
        let url = Url::parse("https://athena.us-east-1.amazonaws.com/").expect("url");
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).single().expect("time");
        let sign_body = |payload: &[u8]| {
            sign(
                &SigningRequest {
                    method: "POST",
                    url: &url,
                    headers: &[],
                    payload,
                },
                &credentials(None),
                "us-east-1",
                "athena",
                now,
            )
            .expect("sign")
            .authorization
        };
        assert_ne!(sign_body(b"{\"a\":1}"), sign_body(b"{\"a\":2}"));
    }

    #[test]
    fn signs_athena_request_deterministically() {
        let url = Url::parse("https://athena.us-east-1.amazonaws.com/").expect("url");
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 6, 30, 0).single().expect("time");
        let signed = sign(
            &SigningRequest {
                method: "POST",
                url: &url,
                headers: &[
                    ("content-type", "application/x-amz-json-1.1"),
                    ("x-amz-target", "AmazonAthena.GetQueryExecution"),
                ],
                payload: br#"{"QueryExecutionId":"abc"}"#,
            },
            &credentials(None),
            "us-east-1",
            "athena",
            now,
        )
        .expect("sign");

        assert_eq!(
            signed.authorization,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240302/us-east-1/athena/aws4_request, \
             SignedHeaders=content-type;host;x-amz-content-sha256;x-amz-date;x-amz-target, \
             Signature=e478a05322f1fb9a5be845b4e9d62ae02452f551ac33832a8322e67d85790f92"
        );
    }

    #[test]
    fn percent_encodes_reserved_bytes() {
        assert_eq!(uri_encode("a b/c=d~"), "a%20b%2Fc%3Dd~");
        let url = Url::parse("https://example.com/x%20y?b=2&a=1&a=0").expect("url");
        assert_eq!(encoded_query(&url), "a=0&a=1&b=2");
        assert_eq!(encoded_path(&url), "/x%2520y");
        let root = Url::parse("https://example.com").expect("url");
        assert_eq!(encoded_path(&root), "/");
    }

    #[test]
    fn host_keeps_explicit_port() {
        let url = Url::parse("http://localhost:4566/").expect("url");
        assert_eq!(host_header(&url).expect("host"), "localhost:4566");
    }
}
