// Prompt framework catalog
// Static registry of the supported prompt structures and their system instructions

use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Identifier of a supported prompt framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FrameworkId {
    #[serde(rename = "CLEAR")]
    Clear,
    #[serde(rename = "STAR")]
    Star,
    #[serde(rename = "STaC")]
    Stac,
    #[serde(rename = "PEACH")]
    Peach,
}

impl FrameworkId {
    /// Canonical display name ("CLEAR", "STAR", "STaC", "PEACH")
    pub fn name(&self) -> &'static str {
        match self {
            FrameworkId::Clear => "CLEAR",
            FrameworkId::Star => "STAR",
            FrameworkId::Stac => "STaC",
            FrameworkId::Peach => "PEACH",
        }
    }
}

impl fmt::Display for FrameworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FrameworkId {
    type Err = String;

    /// Case-insensitive, so "stac", "STAC" and "STaC" all parse
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clear" => Ok(FrameworkId::Clear),
            "star" => Ok(FrameworkId::Star),
            "stac" => Ok(FrameworkId::Stac),
            "peach" => Ok(FrameworkId::Peach),
            _ => Err(format!("Unsupported framework: {}", s)),
        }
    }
}

/// A named prompt framework
#[derive(Debug, Clone, Serialize)]
pub struct Framework {
    pub id: FrameworkId,
    pub name: &'static str,
    pub structure: &'static [&'static str],
    pub description: &'static str,
    pub use_case: &'static str,
    /// Guidance used inside the AI system instruction
    #[serde(skip)]
    pub guidance: &'static str,
}

static FRAMEWORKS: Lazy<Vec<Framework>> = Lazy::new(|| {
    vec![
        Framework {
            id: FrameworkId::Clear,
            name: "CLEAR",
            structure: &["Context", "Length", "Examples", "Audience", "Role"],
            description: "Context, Length, Examples, Audience, Role",
            use_case: "Best for content creation and writing tasks",
            guidance: "Context, Length, Examples, Audience, Role - structure the prompt with clear context, specify desired length, provide examples, define the target audience, and establish the AI's role.",
        },
        Framework {
            id: FrameworkId::Star,
            name: "STAR",
            structure: &["Situation", "Task", "Action", "Result"],
            description: "Situation, Task, Action, Result",
            use_case: "Perfect for problem-solving and analysis",
            guidance: "Situation, Task, Action, Result - describe the situation, define the task, specify the action needed, and outline the expected result.",
        },
        Framework {
            id: FrameworkId::Stac,
            name: "STaC",
            structure: &["Situation", "Task", "Context"],
            description: "Situation, Task, Context",
            use_case: "Great for quick, focused requests",
            guidance: "Situation, Task, Context - briefly describe the situation, define the specific task, and provide relevant context.",
        },
        Framework {
            id: FrameworkId::Peach,
            name: "PEACH",
            structure: &["Purpose", "Examples", "Audience", "Context", "Hope"],
            description: "Purpose, Examples, Audience, Context, Hope",
            use_case: "Ideal for creative and marketing content",
            guidance: "Purpose, Examples, Audience, Context, Hope - state the purpose clearly, provide relevant examples, define the audience, give context, and express the hoped-for outcome.",
        },
    ]
});

/// Guidance used when the framework is not in the catalog
const FALLBACK_GUIDANCE: &str = "structured approach";

/// All frameworks in display order
pub fn list_frameworks() -> &'static [Framework] {
    &FRAMEWORKS
}

/// Look up a framework by name (case-insensitive)
pub fn find(name: &str) -> Option<&'static Framework> {
    let id = name.parse::<FrameworkId>().ok()?;
    FRAMEWORKS.iter().find(|f| f.id == id)
}

/// Structure guidance for a framework; unknown names get a generic description
pub fn describe(name: &str) -> &'static str {
    find(name).map(|f| f.guidance).unwrap_or(FALLBACK_GUIDANCE)
}

/// Build the system instruction sent to the AI provider
///
/// The caller's framework spelling is kept so the model sees what the user picked.
pub fn system_instruction(framework: &str) -> String {
    format!(
        "You are an expert prompt engineer. Transform the user's casual input into a well-structured, professional prompt using the {fw} framework.

{fw} Framework: {guidance}

Make the prompt:
- Clear and specific with actionable instructions
- Well-organized according to the {fw} structure
- Professional yet engaging
- Optimized for AI interaction
- Include relevant context and examples where appropriate

Transform the input into a polished prompt that will get better AI results. Respond with ONLY the transformed prompt, no explanations or meta-commentary.",
        fw = framework,
        guidance = describe(framework),
    )
}
