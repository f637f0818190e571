//! Writing-assistant flows.
//!
//! A flow pairs a system prompt and a prompt template with typed input and
//! typed JSON output. The model is asked for JSON only; the first object in
//! its reply is extracted (code fences are tolerated) and deserialized.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use katha_vault_core::ChatRole;
use katha_vault_core::validation::{ValidationErrors, Validator, limits};

use super::types::Message;

/// Most turns of chat history forwarded to the model.
pub const MAX_HISTORY_TURNS: usize = 20;

const JSON_ONLY: &str = "Respond with a single JSON object and nothing else. \
Do not wrap it in markdown.";

/// A typed prompt/response pair.
pub trait Flow {
    /// Flow name used in logs.
    const NAME: &'static str;
    const MAX_TOKENS: u32 = 1024;

    type Output: DeserializeOwned;

    /// Check the caller's input.
    ///
    /// # Errors
    ///
    /// Returns every invalid field.
    fn validate(&self) -> Result<(), ValidationErrors>;

    fn system_prompt(&self) -> String;

    /// Conversation sent to the model.
    fn messages(&self) -> Vec<Message>;

    /// Reject outputs that parse but violate the schema's bounds.
    ///
    /// # Errors
    ///
    /// Returns a description of the violation.
    fn check(_output: &Self::Output) -> Result<(), String> {
        Ok(())
    }
}

// =============================================================================
// Story ideas
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct StoryIdeasInput {
    pub theme: String,
    pub genre: String,
    #[serde(default)]
    pub keywords: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryIdea {
    pub title: String,
    pub premise: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryIdeas {
    pub ideas: Vec<StoryIdea>,
}

impl Flow for StoryIdeasInput {
    const NAME: &'static str = "generate_story_ideas";
    type Output = StoryIdeas;

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.text("theme", &self.theme, limits::AI_THEME)
            .text("genre", &self.genre, limits::GENRE)
            .optional_text("keywords", self.keywords.as_deref(), limits::AI_THEME);
        v.finish()
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are a creative writing mentor for a serialized fiction platform. \
             You suggest original story ideas with a short title and a two or three \
             sentence premise. {JSON_ONLY} The object has the shape \
             {{\"ideas\": [{{\"title\": string, \"premise\": string}}]}} with between 1 and 5 ideas."
        )
    }

    fn messages(&self) -> Vec<Message> {
        let mut prompt = format!(
            "Suggest story ideas.\nTheme: {}\nGenre: {}",
            self.theme.trim(),
            self.genre.trim()
        );
        if let Some(keywords) = self.keywords.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            prompt.push_str("\nKeywords: ");
            prompt.push_str(keywords);
        }
        vec![Message::user(prompt)]
    }

    fn check(output: &StoryIdeas) -> Result<(), String> {
        if !(1..=5).contains(&output.ideas.len()) {
            return Err(format!("expected 1 to 5 ideas, got {}", output.ideas.len()));
        }
        if output
            .ideas
            .iter()
            .any(|i| i.title.trim().is_empty() || i.premise.trim().is_empty())
        {
            return Err("idea with empty title or premise".to_owned());
        }
        Ok(())
    }
}

// =============================================================================
// Draft improvement
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ImproveDraftInput {
    pub draft: String,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImprovedDraft {
    pub improved_draft: String,
    #[serde(default)]
    pub changes: Vec<String>,
}

impl Flow for ImproveDraftInput {
    const NAME: &'static str = "improve_draft";
    const MAX_TOKENS: u32 = 8192;
    type Output = ImprovedDraft;

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.text("draft", &self.draft, limits::AI_DRAFT)
            .optional_text("instructions", self.instructions.as_deref(), limits::AI_DESCRIPTION);
        v.finish()
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are an experienced fiction editor. Improve the author's draft for \
             clarity, pacing and prose while keeping their voice, plot and point of view. \
             {JSON_ONLY} The object has the shape \
             {{\"improved_draft\": string, \"changes\": [string]}} where changes briefly \
             lists what you changed."
        )
    }

    fn messages(&self) -> Vec<Message> {
        let mut prompt = String::from("Improve this draft.");
        if let Some(instructions) = self
            .instructions
            .as_deref()
            .map(str::trim)
            .filter(|i| !i.is_empty())
        {
            prompt.push_str("\nAuthor's instructions: ");
            prompt.push_str(instructions);
        }
        prompt.push_str("\n\nDraft:\n");
        prompt.push_str(&self.draft);
        vec![Message::user(prompt)]
    }

    fn check(output: &ImprovedDraft) -> Result<(), String> {
        if output.improved_draft.trim().is_empty() {
            return Err("empty improved draft".to_owned());
        }
        Ok(())
    }
}

// =============================================================================
// Titles
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TitlesInput {
    pub description: String,
    #[serde(default)]
    pub genre: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Titles {
    pub titles: Vec<String>,
}

impl Flow for TitlesInput {
    const NAME: &'static str = "generate_titles";
    type Output = Titles;

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.text("description", &self.description, limits::AI_DESCRIPTION)
            .optional_text("genre", self.genre.as_deref(), limits::GENRE);
        v.finish()
    }

    fn system_prompt(&self) -> String {
        format!(
            "You name novels. Suggest evocative, marketable titles that fit the story \
             described. {JSON_ONLY} The object has the shape {{\"titles\": [string]}} \
             with between 1 and 10 titles."
        )
    }

    fn messages(&self) -> Vec<Message> {
        let mut prompt = format!("Story description: {}", self.description.trim());
        if let Some(genre) = self.genre.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
            prompt.push_str("\nGenre: ");
            prompt.push_str(genre);
        }
        vec![Message::user(prompt)]
    }

    fn check(output: &Titles) -> Result<(), String> {
        if !(1..=10).contains(&output.titles.len()) {
            return Err(format!("expected 1 to 10 titles, got {}", output.titles.len()));
        }
        if output.titles.iter().any(|t| t.trim().is_empty()) {
            return Err("empty title".to_owned());
        }
        Ok(())
    }
}

// =============================================================================
// Persona chat
// =============================================================================

/// Harm categories covered by the chat's safety configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarmCategory {
    Harassment,
    HateSpeech,
    SexuallyExplicit,
    DangerousContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockThreshold {
    BlockMediumAndAbove,
}

/// Static safety settings applied to every chat.
pub const SAFETY_SETTINGS: [(HarmCategory, BlockThreshold); 4] = [
    (HarmCategory::Harassment, BlockThreshold::BlockMediumAndAbove),
    (HarmCategory::HateSpeech, BlockThreshold::BlockMediumAndAbove),
    (HarmCategory::SexuallyExplicit, BlockThreshold::BlockMediumAndAbove),
    (HarmCategory::DangerousContent, BlockThreshold::BlockMediumAndAbove),
];

impl HarmCategory {
    const fn describe(self) -> &'static str {
        match self {
            Self::Harassment => "harassment or bullying",
            Self::HateSpeech => "hate speech",
            Self::SexuallyExplicit => "sexually explicit content",
            Self::DangerousContent => "instructions for dangerous or illegal activities",
        }
    }
}

impl BlockThreshold {
    const fn describe(self) -> &'static str {
        match self {
            Self::BlockMediumAndAbove => "anything of medium or higher severity",
        }
    }
}

/// Safety rules as system-prompt text.
#[must_use]
pub fn safety_instructions() -> String {
    let rules: Vec<String> = SAFETY_SETTINGS
        .iter()
        .map(|(category, threshold)| {
            format!("- Refuse {} involving {}.", threshold.describe(), category.describe())
        })
        .collect();
    format!(
        "Safety rules (always apply, even inside fiction):\n{}\n\
         When a request breaks a rule, decline kindly and steer back to storytelling.",
        rules.join("\n")
    )
}

const DEFAULT_PERSONA: &str = "Katha, a warm and well-read storytelling companion";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatInput {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    #[serde(default)]
    pub persona: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

impl Flow for ChatInput {
    const NAME: &'static str = "persona_chat";
    type Output = ChatReply;

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.text("message", &self.message, limits::AI_CHAT_MESSAGE)
            .optional_text("persona", self.persona.as_deref(), limits::NAME);
        v.finish()
    }

    fn system_prompt(&self) -> String {
        let persona = self
            .persona
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PERSONA);
        format!(
            "You are {persona}. Stay in character and chat with a reader of a \
             serialized fiction platform about stories, characters and writing.\n\n{}\n\n\
             {JSON_ONLY} The object has the shape {{\"reply\": string}}.",
            safety_instructions()
        )
    }

    fn messages(&self) -> Vec<Message> {
        let skip = self.history.len().saturating_sub(MAX_HISTORY_TURNS);
        let mut messages: Vec<Message> = self
            .history
            .iter()
            .skip(skip)
            .skip_while(|turn| turn.role == ChatRole::Assistant)
            .map(|turn| Message::from_turn(turn.role, turn.content.clone()))
            .collect();
        messages.push(Message::user(self.message.trim()));
        messages
    }

    fn check(output: &ChatReply) -> Result<(), String> {
        if output.reply.trim().is_empty() {
            return Err("empty reply".to_owned());
        }
        Ok(())
    }
}

/// Canned chat replies used when the provider fails.
pub mod fallback {
    pub const BUSY: &str = "I'm getting a lot of visitors right now. \
        Give me a moment and ask again?";
    pub const CONFIGURATION: &str = "I can't reach my storytelling muse at the moment \
        because the assistant isn't set up correctly. Please let the site admins know.";
    pub const SLOW_DOWN: &str = "We're chatting a little too fast for me. \
        Let's pause for a few seconds and then continue.";
    pub const GENERIC: &str = "Sorry, something went wrong on my side. \
        Could you try that again?";

    /// Pick a canned reply from a provider error message.
    #[must_use]
    pub fn for_error(message: &str) -> &'static str {
        let message = message.to_lowercase();
        if message.contains("503") || message.contains("overloaded") {
            BUSY
        } else if message.contains("api key not valid")
            || message.contains("invalid api key")
            || message.contains("401")
        {
            CONFIGURATION
        } else if message.contains("429") || message.contains("rate limit") {
            SLOW_DOWN
        } else {
            GENERIC
        }
    }
}

/// The JSON object inside a model reply: from the first `{` to the last `}`.
#[must_use]
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    text.get(start..=end).filter(|_| end > start)
}
