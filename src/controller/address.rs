//! # Address Parsing
//!
//! Turns a user supplied source location (`s3://bucket/prefix` or just
//! `bucket/prefix`) into an [`Address`].

use crate::constants::S3_SCHEME;
use percent_encoding::percent_decode_str;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Bucket and key prefix a sync run is scoped to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub bucket: String,
    pub prefix: String,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{S3_SCHEME}://{}/{}", self.bucket, self.prefix)
    }
}

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("could not parse source location {input:?}: {source}")]
    Malformed {
        input: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid URI scheme {0:?}, must be one of s3/NONE")]
    InvalidScheme(String),
    #[error("source location {0:?} does not name a bucket")]
    MissingBucket(String),
    #[error("prefix of source location {input:?} is not valid UTF-8 once decoded")]
    InvalidEncoding {
        input: String,
        #[source]
        source: std::str::Utf8Error,
    },
}

/// Scheme written before `://`, if the input carries one
fn explicit_scheme(input: &str) -> Option<&str> {
    let (scheme, _) = input.split_once("://")?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

/// Parse a source location into bucket and prefix.
///
/// A missing `s3://` marker is implied and the scheme is case-insensitive.
/// The prefix is the percent-decoded path with exactly one leading `/`
/// stripped, so `s3://bucket//a` keeps the prefix `/a`.
pub fn parse_address(input: &str) -> Result<Address, AddressError> {
    let normalized = match explicit_scheme(input) {
        Some(scheme) if !scheme.eq_ignore_ascii_case(S3_SCHEME) => {
            return Err(AddressError::InvalidScheme(scheme.to_string()));
        }
        Some(_) => input.to_string(),
        None => format!("{S3_SCHEME}://{input}"),
    };

    let url = Url::parse(&normalized).map_err(|source| AddressError::Malformed {
        input: input.to_string(),
        source,
    })?;

    if url.scheme() != S3_SCHEME {
        return Err(AddressError::InvalidScheme(url.scheme().to_string()));
    }

    let bucket = url.host_str().unwrap_or_default().to_string();
    if bucket.is_empty() {
        return Err(AddressError::MissingBucket(input.to_string()));
    }

    // Url keeps the path percent-encoded; object keys are literal
    let path = percent_decode_str(url.path())
        .decode_utf8()
        .map_err(|source| AddressError::InvalidEncoding {
            input: input.to_string(),
            source,
        })?;
    let prefix = path.strip_prefix('/').unwrap_or(&path).to_string();

    Ok(Address { bucket, prefix })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_scheme() {
        let address = parse_address("s3://certs/prod/edge").unwrap();
        assert_eq!(address.bucket, "certs");
        assert_eq!(address.prefix, "prod/edge");
    }

    #[test]
    fn test_parse_without_scheme() {
        let address = parse_address("certs/prod/edge").unwrap();
        assert_eq!(
            address,
            Address {
                bucket: "certs".to_string(),
                prefix: "prod/edge".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_bucket_only() {
        let address = parse_address("s3://certs").unwrap();
        assert_eq!(address.bucket, "certs");
        assert_eq!(address.prefix, "");

        let address = parse_address("certs/").unwrap();
        assert_eq!(address.prefix, "");
    }

    #[test]
    fn test_parse_strips_exactly_one_separator() {
        let address = parse_address("certs//prod/edge").unwrap();
        assert_eq!(address.bucket, "certs");
        assert_eq!(address.prefix, "/prod/edge");
    }

    #[test]
    fn test_parse_rejects_foreign_scheme() {
        let err = parse_address("gs://certs/prod").unwrap_err();
        assert!(matches!(err, AddressError::InvalidScheme(scheme) if scheme == "gs"));
    }

    #[test]
    fn test_parse_keeps_spaces_in_prefix() {
        let address = parse_address("certs/my certs/edge").unwrap();
        assert_eq!(address.bucket, "certs");
        assert_eq!(address.prefix, "my certs/edge");

        let address = parse_address("s3://certs/my certs").unwrap();
        assert_eq!(address.prefix, "my certs");
    }

    #[test]
    fn test_parse_keeps_non_ascii_prefix() {
        let address = parse_address("certs/zertifikäte/edge").unwrap();
        assert_eq!(address.prefix, "zertifikäte/edge");
    }

    #[test]
    fn test_parse_scheme_is_case_insensitive() {
        let address = parse_address("S3://certs/edge").unwrap();
        assert_eq!(address.bucket, "certs");
        assert_eq!(address.prefix, "edge");
    }

    #[test]
    fn test_parse_separator_inside_path_is_not_a_scheme() {
        let address = parse_address("certs/a://b").unwrap();
        assert_eq!(address.bucket, "certs");
        assert_eq!(address.prefix, "a://b");
    }

    #[test]
    fn test_display_round_trips_location() {
        let address = parse_address("certs/prod").unwrap();
        assert_eq!(address.to_string(), "s3://certs/prod");
    }
}
