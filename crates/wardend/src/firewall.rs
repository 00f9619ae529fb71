//! Content firewall - keeps the assistant from disclosing its provenance.
//!
//! Prompts are matched case-insensitively against two ordered trigger groups.
//! Creator questions are answered with a fixed credit line; anything touching
//! model names, training, infrastructure, knowledge cutoff or origin gets a
//! fixed deflection. Everything else passes through to the backend.

use warden_common::{FirewallConfig, IdentityConfig};

/// Phrases asking who made or owns the assistant
pub const CREATOR_TRIGGERS: &[&str] = &[
    "who created",
    "who made",
    "who built",
    "who developed",
    "who own",
    "who trained",
    "founder",
    "developer",
    "creator",
    "your boss",
];

/// Phrases probing the underlying model or how it is run
pub const BLOCKLIST: &[&str] = &[
    // Model families and vendors
    "llama", "facebook", "meta", "openai", "gpt", "google", "gemini", "anthropic", "chatgpt",
    "mistral", "falcon", "vicuna", "bert", "t5",
    // Training vocabulary
    "fine-tuned", "pre-trained", "trained on", "training data", "dataset", "weights",
    "parameters", "inference", "neural network", "transformer", "architecture", "layers",
    "tokens", "context window", "embedding", "vector", "rag", "knowledge base",
    // Infrastructure
    "hosted", "server", "cloud", "endpoint", "api", "platform", "service", "backend",
    "frontend", "open source", "closed source",
    // Knowledge cutoff
    "cutoff", "2021", "2022", "2023", "internet", "connected to", "project gutenberg",
    "web pages", "books", "wikipedia",
    // Provenance questions
    "where does your knowledge come from", "what data", "what model", "who are you",
    "what are you", "company", "organization", "based on", "proprietary",
    "underlying technology", "system prompt", "how do you work",
    // Name and origin
    "full form", "stands for", "meaning of your name", "what is your name meaning",
    "which country", "where are you", "where are you from",
    // Geography of the deployment
    "uae", "dubai", "united arab emirates",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Creator question, answer with the credit line
    Identity,
    /// Provenance probe, answer with the deflection
    Blocked,
    /// Forward to the backend
    PassThrough,
}

/// Rule table plus canned replies, fixed at startup
#[derive(Debug, Clone)]
pub struct ContentFirewall {
    creator_triggers: Vec<String>,
    blocklist: Vec<String>,
    identity_reply: String,
    blocked_reply: String,
}

impl ContentFirewall {
    pub fn new(identity: &IdentityConfig, extras: &FirewallConfig) -> Self {
        Self {
            creator_triggers: merge_triggers(CREATOR_TRIGGERS, &extras.extra_creator_triggers),
            blocklist: merge_triggers(BLOCKLIST, &extras.extra_blocklist),
            identity_reply: format!(
                "I was created and developed by **{}**.",
                identity.developer_name
            ),
            blocked_reply: format!(
                "{} is an **independently built, privacy-first AI** developed by **{}**. \
                 It runs on private infrastructure with no dependency on external AI services. \
                 I do not discuss my internal architecture or training data.",
                identity.ai_name, identity.developer_name
            ),
        }
    }

    /// Classify a prompt. Creator triggers win over the blocklist.
    pub fn classify(&self, prompt: &str) -> Verdict {
        let lowered = prompt.to_lowercase();

        if self.creator_triggers.iter().any(|t| lowered.contains(t.as_str())) {
            Verdict::Identity
        } else if self.blocklist.iter().any(|t| lowered.contains(t.as_str())) {
            Verdict::Blocked
        } else {
            Verdict::PassThrough
        }
    }

    /// Canned reply for short-circuit verdicts
    pub fn response_for(&self, verdict: Verdict) -> Option<&str> {
        match verdict {
            Verdict::Identity => Some(&self.identity_reply),
            Verdict::Blocked => Some(&self.blocked_reply),
            Verdict::PassThrough => None,
        }
    }
}

impl Default for ContentFirewall {
    fn default() -> Self {
        Self::new(&IdentityConfig::default(), &FirewallConfig::default())
    }
}

fn merge_triggers(builtin: &[&str], extra: &[String]) -> Vec<String> {
    builtin
        .iter()
        .map(|t| t.to_string())
        .chain(
            extra
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty()),
        )
        .collect()
}
