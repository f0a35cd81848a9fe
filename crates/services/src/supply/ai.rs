use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use exam_core::model::{Question, QuestionDraft};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use storage::repository::QuestionBankRepository;

use super::{FetchRequest, QuestionSupply};
use crate::error::SupplyError;

#[derive(Clone, Debug)]
pub struct AiSupplyConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl AiSupplyConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("CONCURSO_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("CONCURSO_AI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("CONCURSO_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Generates questions through an OpenAI-compatible chat completions endpoint.
///
/// Generated questions can optionally be written through to the local question bank.
#[derive(Clone)]
pub struct AiQuestionSupply {
    client: Client,
    config: Option<AiSupplyConfig>,
    bank: Option<Arc<dyn QuestionBankRepository>>,
}

impl AiQuestionSupply {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(AiSupplyConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<AiSupplyConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
            bank: None,
        }
    }

    /// Cache every generated batch in the question bank.
    #[must_use]
    pub fn with_bank(mut self, bank: Arc<dyn QuestionBankRepository>) -> Self {
        self.bank = Some(bank);
        self
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    async fn complete(&self, prompt: String) -> Result<String, SupplyError> {
        let config = self.config.as_ref().ok_or(SupplyError::Disabled)?;

        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.7,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SupplyError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(SupplyError::EmptyResponse)
    }
}

#[async_trait]
impl QuestionSupply for AiQuestionSupply {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Question>, SupplyError> {
        let content = self.complete(build_prompt(request)).await?;
        let questions = parse_questions(&content)?;
        tracing::debug!(
            requested = request.count,
            received = questions.len(),
            "generated question batch"
        );

        if let Some(bank) = &self.bank {
            if let Err(err) = bank.upsert_questions(&request.profile, &questions).await {
                tracing::warn!(error = %err, "failed to cache generated questions");
            }
        }

        Ok(questions)
    }
}

fn build_prompt(request: &FetchRequest) -> String {
    let mut prompt = format!(
        "Genera {count} preguntas de selección múltiple para el concurso docente en Colombia.\n\
         Cargo: {role}. Área: {area}.\n",
        count = request.count,
        role = request.profile.role(),
        area = request.profile.area(),
    );
    if let Some(competency) = request.competency() {
        prompt.push_str(&format!("Competencia: {competency}.\n"));
    }
    prompt.push_str(
        "Responde solo con un arreglo JSON. Cada elemento: \
         {\"id\": string, \"prompt\": string, \"context\": string|null, \
         \"options\": [{\"label\": \"A\", \"text\": string}, ...], \"correct\": \"A\", \
         \"competency\": string, \"difficulty\": \"baja\"|\"media\"|\"alta\", \
         \"reference\": {\"source\": string, \"article\": string|null, \"explanation\": string}}",
    );
    prompt
}

/// Extract questions from a model reply.
///
/// Accepts a bare JSON array or one wrapped in prose or code fences. Elements without an
/// id get a random one; elements that fail validation are skipped.
pub(crate) fn parse_questions(content: &str) -> Result<Vec<Question>, SupplyError> {
    let start = content
        .find('[')
        .ok_or_else(|| SupplyError::Parse("no JSON array in response".into()))?;
    let end = content
        .rfind(']')
        .filter(|end| *end > start)
        .ok_or_else(|| SupplyError::Parse("unterminated JSON array".into()))?;

    let items: Vec<serde_json::Value> = serde_json::from_str(&content[start..=end])
        .map_err(|e| SupplyError::Parse(e.to_string()))?;

    let mut questions = Vec::with_capacity(items.len());
    for mut item in items {
        if let Some(obj) = item.as_object_mut() {
            let has_id = obj
                .get("id")
                .and_then(serde_json::Value::as_str)
                .is_some_and(|id| !id.trim().is_empty());
            if !has_id {
                obj.insert(
                    "id".into(),
                    serde_json::Value::String(uuid::Uuid::new_v4().to_string()),
                );
            }
        }

        let parsed = serde_json::from_value::<QuestionDraft>(item)
            .map_err(|e| e.to_string())
            .and_then(|draft| draft.validate().map_err(|e| e.to_string()));
        match parsed {
            Ok(question) => questions.push(question),
            Err(reason) => tracing::warn!(%reason, "skipping invalid generated question"),
        }
    }

    Ok(questions)
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
