//! # Prompt templates
//!
//! Named, reusable prompts and generation parameters that a `chat` request can
//! reference by id.
//!
//! ```text
//! ChatDefaults ─┐
//! Template ─────┼─ overlay ─→ ChatCompletionBody { params, messages }
//! ChatRequest ──┘
//! ```
//!
//! | Item | Description |
//! |------|-------------|
//! | [`Template`] | Prompts with `{{placeholder}}` slots plus parameter overrides |
//! | [`TemplateRegistry`] | Id → template map, lock-free reads, last write wins |
//! | [`interpolate`] | Pure placeholder substitution |
//! | [`prepare_chat_body`] | Defaults ⊕ template ⊕ request merge |

mod interpolate;
mod merge;

pub use interpolate::{interpolate, placeholders};
pub use merge::{prepare_chat_body, ChatCompletionBody, ChatDefaults};

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Generation parameters a template (or the defaults) may set.
///
/// Every field is optional so a template only overrides what it names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<BTreeMap<String, f64>>,
}

impl TemplateParams {
    /// Fields set in `top` win; everything else comes from `self`.
    pub fn overlay(&self, top: &TemplateParams) -> TemplateParams {
        TemplateParams {
            model: top.model.clone().or_else(|| self.model.clone()),
            temperature: top.temperature.or(self.temperature),
            top_p: top.top_p.or(self.top_p),
            n: top.n.or(self.n),
            max_tokens: top.max_tokens.or(self.max_tokens),
            presence_penalty: top.presence_penalty.or(self.presence_penalty),
            frequency_penalty: top.frequency_penalty.or(self.frequency_penalty),
            logit_bias: top.logit_bias.clone().or_else(|| self.logit_bias.clone()),
        }
    }
}

/// A named prompt template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    #[serde(
        rename = "systemPrompt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub system_prompt: Option<String>,
    #[serde(rename = "userPrompt", default, skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
    #[serde(flatten)]
    pub params: TemplateParams,
}

impl Template {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            system_prompt: None,
            user_prompt: None,
            params: TemplateParams::default(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.user_prompt = Some(prompt.into());
        self
    }

    pub fn with_params(mut self, params: TemplateParams) -> Self {
        self.params = params;
        self
    }
}

/// Template lookup table handed to the dispatcher.
///
/// Reads take a snapshot of the current map; [`register`](Self::register)
/// publishes a new map atomically, so registering while requests are in flight
/// is safe. Re-registering an id replaces the previous definition.
pub struct TemplateRegistry {
    templates: ArcSwap<HashMap<String, Arc<Template>>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self {
            templates: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    pub fn from_templates(templates: impl IntoIterator<Item = Template>) -> Self {
        let map = templates
            .into_iter()
            .map(|t| (t.id.clone(), Arc::new(t)))
            .collect::<HashMap<_, _>>();
        Self {
            templates: ArcSwap::from_pointee(map),
        }
    }

    pub fn register(&self, template: Template) {
        let id = template.id.clone();
        let template = Arc::new(template);
        self.templates.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(id.clone(), Arc::clone(&template));
            next
        });
        tracing::debug!(template = %id, "registered template");
    }

    /// Never fails: an unknown id is simply `None`.
    pub fn get(&self, id: &str) -> Option<Arc<Template>> {
        self.templates.load().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.load().contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.templates.load().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.templates.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
