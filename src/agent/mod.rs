use rig::completion::Prompt;
use rig::prelude::CompletionClient;
use rig::providers::groq;
use tracing::error;

use crate::errors::AppError;

/// Standing instructions for the counsellor persona.
const PREAMBLE: &str = "\
You are an expert Academic Counselor for the School of Computer Engineering at KIIT University.
Your goal is to assist students by answering questions strictly based on the provided \"Curricula and Syllabi (2022-23)\" context.

GUIDELINES:
1. Source of Truth: Answer ONLY using the information provided in the CONTEXT. Do not make up information.
2. Course Queries: If asked about a specific subject (e.g., \"Machine Learning\"), provide its Course Code, Credits, Prerequisites, and a summary of the units or textbooks if available.
3. Semester Inquiries: If asked about a semester (e.g., \"What subjects are in Sem 6?\"), list the courses clearly with their Codes and Credits using bullet points.
4. Regulations: If asked about rules (e.g., \"Minor Degree\", \"Projects\", \"Internships\"), explain the eligibility and requirements exactly as stated in the text.
5. Missing Info: If the answer is not in the context, politely say: \"I cannot find that specific detail in the official syllabus document.\"
6. Tone: Maintain a professional, encouraging, and structured tone suitable for academic advising.";

/// Fills the per-question prompt sent alongside [`PREAMBLE`].
pub fn render_prompt(context: &str, question: &str) -> String {
    format!("CONTEXT:\n{context}\n\nQUESTION:\n{question}\n\nCOUNSELOR'S ANSWER:")
}

/// Produces an answer from retrieved context. Groq in production.
pub trait Answerer: Send + Sync {
    fn model(&self) -> &str;

    fn answer(
        &self,
        context: &str,
        question: &str,
    ) -> impl std::future::Future<Output = Result<String, AppError>> + Send;
}

/// Answers questions with a Groq-hosted model through rig.
/// A fresh agent is built per request; no chat history is replayed.
#[derive(Clone)]
pub struct GroqAgentService {
    client: groq::Client,
    model: String,
}

impl GroqAgentService {
    pub fn new(api_key: &str, model: &str) -> Result<Self, AppError> {
        let client = groq::Client::builder()
            .api_key(api_key)
            .build()
            .map_err(|e| AppError::Unexpected(format!("Failed to build Groq client: {e}")))?;
        Ok(Self { client, model: model.to_string() })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generates an answer to `question` grounded in `context`.
    pub async fn answer(&self, context: &str, question: &str) -> Result<String, AppError> {
        let agent = self
            .client
            .agent(&self.model)
            .preamble(PREAMBLE)
            .temperature(0.0)
            .build();

        agent
            .prompt(render_prompt(context, question))
            .await
            .map_err(|e| {
                error!("Groq inference failed with model {}: {e}", self.model);
                let msg = e.to_string();
                if msg.contains("Connection refused") || msg.contains("connect") {
                    AppError::LlmUnavailable { provider: "groq".to_string() }
                } else {
                    AppError::InferenceError { message: msg }
                }
            })
    }
}

impl Answerer for GroqAgentService {
    fn model(&self) -> &str {
        GroqAgentService::model(self)
    }

    async fn answer(&self, context: &str, question: &str) -> Result<String, AppError> {
        GroqAgentService::answer(self, context, question).await
    }
}
