//! Integration tests for the OpenAI embedding service.
//!
//! Tests that call the API are marked `#[ignore]` and need `OPENAI_API_KEY` (e.g. in the
//! workspace root `.env`). Quota and billing errors are treated as skip, not failure.
//!
//! Run with: `cargo test -p openai-embedding -- --ignored`

use std::path::Path;

use embedding::{EmbeddingProvider, EmbeddingService, EnvEmbeddingConfig};
use openai_embedding::{OpenAIEmbedding, DEFAULT_MODEL};

/// Loads `.env` from the workspace root (`crates/embedding/openai-embedding` → `../../../.env`).
fn load_root_env() {
    let root_env = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../.env");
    let _ = dotenvy::from_path(root_env);
}

fn is_quota_or_billing_error(e: &anyhow::Error) -> bool {
    let s = e.to_string();
    s.contains("quota") || s.contains("billing") || s.contains("rate_limit")
}

/// **Test: Model selection from config.**
///
/// **Setup:** Two configs, one with an explicit model and one with an empty model.
///
/// **Action:** Build services with `OpenAIEmbedding::from_config`.
///
/// **Expected:** Explicit model is kept; empty model falls back to `DEFAULT_MODEL`. No network.
#[test]
fn test_from_config_model_selection() {
    let config = EnvEmbeddingConfig {
        embedding_provider: EmbeddingProvider::OpenAI,
        embedding_model: "text-embedding-3-large".to_string(),
        openai_api_key: "sk-test".to_string(),
        openai_base_url: Some("http://localhost:9999/v1".to_string()),
    };
    assert_eq!(OpenAIEmbedding::from_config(&config).model(), "text-embedding-3-large");

    let blank = EnvEmbeddingConfig {
        embedding_model: String::new(),
        ..config
    };
    assert_eq!(OpenAIEmbedding::from_config(&blank).model(), DEFAULT_MODEL);
}

/// **Test: Empty batch short-circuits.**
///
/// **Setup:** Service pointed at an unroutable base URL.
///
/// **Action:** `embed_batch(&[])`.
///
/// **Expected:** Returns an empty vec without sending a request.
#[tokio::test]
async fn test_empty_batch_makes_no_request() {
    let service = OpenAIEmbedding::new_with_base_url(
        "sk-test".to_string(),
        DEFAULT_MODEL.to_string(),
        Some("http://127.0.0.1:1/v1"),
    );
    let result = service.embed_batch(&[]).await.unwrap();
    assert!(result.is_empty());
}

/// **Test: Single-text and batch embedding (real API).**
///
/// **Setup:** `OPENAI_API_KEY` from env; model `text-embedding-3-small`.
///
/// **Action:** `embed("Hello world")`, then `embed_batch` over three strings.
///
/// **Expected:** 1536-dim vectors, one per input. Quota errors skip the test.
#[tokio::test]
#[ignore]
async fn test_openai_embedding_real_api() {
    load_root_env();
    let api_key = std::env::var("OPENAI_API_KEY")
        .expect("OPENAI_API_KEY must be set for this test (or set in root .env)");
    let service = OpenAIEmbedding::new(api_key, DEFAULT_MODEL.to_string());

    match service.embed("Hello world").await {
        Ok(v) => assert_eq!(v.len(), 1536),
        Err(e) if is_quota_or_billing_error(&e) => {
            eprintln!("skipped: OpenAI quota/billing limit ({})", e);
            return;
        }
        Err(e) => panic!("OpenAI embed request failed: {}", e),
    }

    let texts = vec!["Hello".to_string(), "World".to_string(), "Goodbye".to_string()];
    match service.embed_batch(&texts).await {
        Ok(vs) => {
            assert_eq!(vs.len(), 3);
            assert!(vs.iter().all(|v| v.len() == 1536));
        }
        Err(e) if is_quota_or_billing_error(&e) => {
            eprintln!("skipped: OpenAI quota/billing limit ({})", e);
        }
        Err(e) => panic!("OpenAI embed_batch request failed: {}", e),
    }
}
