use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    /// Prefix applied to every key-value entry; `flush` only clears this namespace.
    pub kv_namespace: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    /// Object key prefix for uploaded resumes and their rendered previews.
    pub s3_prefix: String,
    pub aws_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    /// `username:token` pairs accepted as bearer credentials.
    pub auth_tokens: Vec<(String, String)>,
    /// Longest edge, in pixels, of the first-page preview image.
    pub raster_max_pixels: i32,
    /// Explicit pdfium shared library; the system library is used when unset.
    pub pdfium_lib_path: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            redis_url: require_env("REDIS_URL")?,
            kv_namespace: optional_env("KV_NAMESPACE", "resumind"),
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            s3_prefix: normalize_prefix(&optional_env("S3_PREFIX", "uploads/")),
            aws_region: optional_env("AWS_REGION", "us-east-1"),
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            auth_tokens: parse_auth_tokens(&require_env("AUTH_TOKENS")?)?,
            raster_max_pixels: parse_raster_max_pixels(&optional_env("RASTER_MAX_PIXELS", "2000"))?,
            pdfium_lib_path: std::env::var("PDFIUM_LIB_PATH").ok(),
            port: optional_env("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parses `alice:token-a,bob:token-b` into `(username, token)` pairs.
fn parse_auth_tokens(raw: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (username, token) = item
            .split_once(':')
            .with_context(|| format!("AUTH_TOKENS entry '{item}' must be 'username:token'"))?;
        let (username, token) = (username.trim(), token.trim());
        if username.is_empty() || token.is_empty() {
            anyhow::bail!("AUTH_TOKENS entry '{item}' has an empty username or token");
        }
        pairs.push((username.to_string(), token.to_string()));
    }
    if pairs.is_empty() {
        anyhow::bail!("AUTH_TOKENS must contain at least one 'username:token' pair");
    }
    Ok(pairs)
}

/// pdfium takes render sizes as `i32`, so the bound is `1..=i32::MAX`.
fn parse_raster_max_pixels(raw: &str) -> Result<i32> {
    let pixels = raw
        .trim()
        .parse::<i32>()
        .with_context(|| format!("RASTER_MAX_PIXELS must be a positive integer, got '{raw}'"))?;
    if pixels <= 0 {
        anyhow::bail!("RASTER_MAX_PIXELS must be a positive integer, got '{raw}'");
    }
    Ok(pixels)
}

/// Object prefixes never start with a slash and always end with one (unless empty).
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_auth_tokens_multiple_pairs() {
        let pairs = parse_auth_tokens("alice:abc123, bob:xyz").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("alice".to_string(), "abc123".to_string()),
                ("bob".to_string(), "xyz".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_auth_tokens_rejects_missing_separator() {
        assert!(parse_auth_tokens("alice").is_err());
        assert!(parse_auth_tokens("alice:").is_err());
        assert!(parse_auth_tokens(" , ").is_err());
    }

    #[test]
    fn test_raster_max_pixels_bounds() {
        assert_eq!(parse_raster_max_pixels("2000").unwrap(), 2000);
        assert_eq!(parse_raster_max_pixels("2147483647").unwrap(), i32::MAX);
        assert!(parse_raster_max_pixels("0").is_err());
        assert!(parse_raster_max_pixels("-5").is_err());
        assert!(parse_raster_max_pixels("2147483648").is_err());
        assert!(parse_raster_max_pixels("big").is_err());
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("uploads"), "uploads/");
        assert_eq!(normalize_prefix("/uploads/"), "uploads/");
        assert_eq!(normalize_prefix("a/b"), "a/b/");
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
    }
}
