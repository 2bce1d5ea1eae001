use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::TranslationError;

#[async_trait]
pub trait Translate: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslationError>;
}

/// Client for the `translate_a/single` endpoint (`client=gtx`, `dj=1`).
///
/// No retries and no request timeout beyond the transport default: a hung
/// provider stalls the refresh that called it.
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Translate for GoogleTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslationError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("dt", "t"),
                ("dj", "1"),
                ("ie", "UTF-8"),
                ("sl", "auto"),
                ("tl", target_lang),
                ("q", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::Status(status));
        }

        let body = response.bytes().await?;
        join_sentences(&body)
    }
}

#[derive(Deserialize)]
struct TranslateResponse {
    sentences: Option<Vec<Sentence>>,
}

#[derive(Deserialize)]
struct Sentence {
    trans: Option<String>,
}

/// Concatenates every `sentences[].trans` fragment in order. Entries without
/// `trans` (transliterations) are ignored.
pub fn join_sentences(body: &[u8]) -> Result<String, TranslationError> {
    let response: TranslateResponse = serde_json::from_slice(body)?;
    let sentences = response.sentences.ok_or(TranslationError::Shape)?;
    Ok(sentences
        .into_iter()
        .filter_map(|sentence| sentence.trans)
        .collect())
}
