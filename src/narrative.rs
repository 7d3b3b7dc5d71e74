use crate::error::{PlaybookError, Result};
use crate::schema::{StrategyKind, StrategyPrompt};
use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const NO_STRATEGY_MESSAGE: &str = "❗ 현재 조건에 해당하는 마케팅 전략이 없습니다.";
pub const NO_ANALYSIS_PLACEHOLDER: &str = "⚠️ 해당 항목에 대한 분석 응답이 없습니다.";

/// Turns a strategy prompt into free-form marketing text.
#[async_trait]
pub trait NarrativeRenderer {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeSection {
    pub kind: StrategyKind,
    pub title: String,
    pub text: String,
    /// False when `text` is the placeholder.
    pub generated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NarrativeReport {
    NoStrategy { message: String },
    Sections { sections: Vec<NarrativeSection> },
}

impl NarrativeReport {
    pub fn sections(&self) -> &[NarrativeSection] {
        match self {
            NarrativeReport::NoStrategy { .. } => &[],
            NarrativeReport::Sections { sections } => sections,
        }
    }
}

/// Calls the renderer once per prompt, in order, each call bounded by
/// `timeout`. A failed, empty or timed out call yields a placeholder
/// section and the remaining prompts still run.
pub async fn render_narratives<R>(
    renderer: &R,
    prompts: &[StrategyPrompt],
    timeout: Duration,
) -> NarrativeReport
where
    R: NarrativeRenderer + ?Sized,
{
    if prompts.is_empty() {
        return NarrativeReport::NoStrategy {
            message: NO_STRATEGY_MESSAGE.to_string(),
        };
    }

    let mut sections = Vec::with_capacity(prompts.len());
    for (i, prompt) in prompts.iter().enumerate() {
        info!(
            "Generating narrative {}/{}: {}",
            i + 1,
            prompts.len(),
            prompt.title
        );

        let outcome = match tokio::time::timeout(timeout, renderer.generate(&prompt.body)).await {
            Ok(result) => result,
            Err(_) => Err(PlaybookError::NarrativeTimeout {
                seconds: timeout.as_secs(),
            }),
        };

        let section = match outcome {
            Ok(text) if !text.trim().is_empty() => NarrativeSection {
                kind: prompt.kind,
                title: prompt.title.clone(),
                text,
                generated: true,
            },
            Ok(_) => {
                warn!("Empty narrative for {}", prompt.title);
                placeholder(prompt)
            }
            Err(e) => {
                warn!("Narrative for {} failed: {}", prompt.title, e);
                placeholder(prompt)
            }
        };
        sections.push(section);
    }

    NarrativeReport::Sections { sections }
}

fn placeholder(prompt: &StrategyPrompt) -> NarrativeSection {
    NarrativeSection {
        kind: prompt.kind,
        title: prompt.title.clone(),
        text: NO_ANALYSIS_PLACEHOLDER.to_string(),
        generated: false,
    }
}
