// Local template-based prompt generator
//
// Offline fallback that rewrites casual input into a framework-shaped prompt
// using keyword sniffing. Never fails: every bad input produces a readable
// message instead.

use crate::frameworks::FrameworkId;

pub const EMPTY_INPUT_MESSAGE: &str = "Please provide some input text to transform.";
pub const MISSING_FRAMEWORK_MESSAGE: &str = "Please select a prompt framework.";
pub const MISSING_MODEL_MESSAGE: &str = "Please select an AI model.";

/// A keyword rule: all `needles` must appear in the lowercased input
struct Rule {
    needles: &'static [&'static str],
    sentence: &'static str,
}

const CONTEXT_RULES: &[Rule] = &[
    Rule {
        needles: &["beginner"],
        sentence: "Creating educational content for beginners who need clear, accessible guidance.",
    },
    Rule {
        needles: &["blog"],
        sentence: "Content creation for blog publishing with focus on reader engagement.",
    },
    // either word selects the gardening context
    Rule {
        needles: &["sustainable"],
        sentence: "Educational content about sustainable gardening practices and eco-friendly approaches.",
    },
    Rule {
        needles: &["gardening"],
        sentence: "Educational content about sustainable gardening practices and eco-friendly approaches.",
    },
];

const CONTEXT_FALLBACK: &str =
    "General content creation with focus on providing valuable, actionable information.";

const INTENT_RULES: &[Rule] = &[
    Rule {
        needles: &["write", "blog"],
        sentence: "Create an engaging blog post that educates readers while maintaining an accessible and encouraging tone.",
    },
    Rule {
        needles: &["sustainable gardening"],
        sentence: "Develop comprehensive content about sustainable gardening that provides practical tips and encourages environmentally conscious practices.",
    },
];

const SITUATION_RULES: &[Rule] = &[Rule {
    needles: &["beginner"],
    sentence: "You need to create content for an audience that is new to the topic and requires foundational knowledge along with practical guidance.",
}];

const SITUATION_FALLBACK: &str = "You are tasked with creating informative content that balances educational value with practical applicability.";

/// Per-model optimization tips
const MODEL_TIPS: &[(&str, &str)] = &[
    (
        "gpt-4",
        "Be specific and provide clear instructions. Use step-by-step reasoning.",
    ),
    (
        "claude-3",
        "Be conversational and provide context. Ask for explanations when needed.",
    ),
    (
        "gemini-pro",
        "Be concise and structured. Use bullet points when appropriate.",
    ),
    (
        "gpt-3.5",
        "Be direct and avoid ambiguity. Provide examples when possible.",
    ),
];

const GENERIC_TIP: &str =
    "Be clear and specific, and state the format you expect the answer in.";

fn first_match(input: &str, rules: &[Rule]) -> Option<&'static str> {
    let lower = input.to_lowercase();
    rules
        .iter()
        .find(|rule| rule.needles.iter().all(|n| lower.contains(n)))
        .map(|rule| rule.sentence)
}

pub fn extract_context(input: &str) -> String {
    first_match(input, CONTEXT_RULES)
        .unwrap_or(CONTEXT_FALLBACK)
        .to_string()
}

/// The fallback embeds the raw input so unknown requests are still carried through
pub fn extract_intent(input: &str) -> String {
    match first_match(input, INTENT_RULES) {
        Some(sentence) => sentence.to_string(),
        None => format!(
            "Based on your input: \"{}\", create comprehensive, actionable content that addresses the core request while providing valuable insights and practical guidance.",
            input
        ),
    }
}

pub fn extract_situation(input: &str) -> String {
    first_match(input, SITUATION_RULES)
        .unwrap_or(SITUATION_FALLBACK)
        .to_string()
}

/// Optimization tip for a model id; unknown ids get a generic tip
pub fn optimization_tip(model: &str) -> &'static str {
    let model = model.trim().to_lowercase();
    MODEL_TIPS
        .iter()
        .find(|(id, _)| *id == model)
        .map(|(_, tip)| *tip)
        .unwrap_or(GENERIC_TIP)
}

/// Rewrite `input` with the named framework for `model`
pub fn transform(input: &str, framework: &str, model: &str) -> String {
    if input.trim().is_empty() {
        return EMPTY_INPUT_MESSAGE.to_string();
    }
    if framework.trim().is_empty() {
        return MISSING_FRAMEWORK_MESSAGE.to_string();
    }
    if model.trim().is_empty() {
        return MISSING_MODEL_MESSAGE.to_string();
    }

    let id = match framework.parse::<FrameworkId>() {
        Ok(id) => id,
        Err(_) => return unsupported_framework_message(framework),
    };

    let tip = optimization_tip(model);
    match id {
        FrameworkId::Clear => clear_prompt(input, model, tip),
        FrameworkId::Star => star_prompt(input, model, tip),
        FrameworkId::Stac => stac_prompt(input, model, tip),
        FrameworkId::Peach => peach_prompt(input, model, tip),
    }
}

pub fn unsupported_framework_message(framework: &str) -> String {
    format!(
        "Framework \"{}\" is not supported. Choose one of CLEAR, STAR, STaC or PEACH.",
        framework
    )
}

fn clear_prompt(input: &str, model: &str, tip: &str) -> String {
    format!(
        "**Context:** {context}

**Length:** Provide a comprehensive response with detailed explanations and practical examples.

**Examples:** Include specific, actionable examples that demonstrate the concepts clearly.

**Audience:** Target beginners who are new to this topic but eager to learn and implement practical solutions.

**Role:** Act as an expert educator and practical guide who can break down complex concepts into digestible, actionable steps.

**Task:** {task}

**Additional Instructions for {model}:** {tip}

Please ensure your response is engaging, practical, and includes step-by-step guidance that a beginner can follow immediately.",
        context = extract_context(input),
        task = extract_intent(input),
    )
}

fn star_prompt(input: &str, model: &str, tip: &str) -> String {
    format!(
        "**Situation:** {situation}

**Task:** {task}

**Action:** Please provide a detailed action plan that includes:
- Step-by-step instructions
- Best practices and tips
- Common pitfalls to avoid
- Resources for further learning

**Result:** The outcome should be a comprehensive guide that enables immediate implementation and long-term success.

**Optimized for {model}:** {tip}",
        situation = extract_situation(input),
        task = extract_intent(input),
    )
}

fn stac_prompt(input: &str, model: &str, tip: &str) -> String {
    format!(
        "**Situation:** {situation}

**Task:** {task}

**Context:** {context}

**Instructions for {model}:** {tip}

Please provide a focused, actionable response that directly addresses the task within the given context.",
        situation = extract_situation(input),
        task = extract_intent(input),
        context = extract_context(input),
    )
}

fn peach_prompt(input: &str, model: &str, tip: &str) -> String {
    format!(
        "**Purpose:** {purpose}

**Examples:** Provide specific, real-world examples that illustrate key concepts and demonstrate practical application.

**Audience:** Beginners who are motivated to learn but need clear, accessible guidance without overwhelming technical jargon.

**Context:** {context}

**Hope:** The desired outcome is to create content that not only educates but inspires action and builds confidence in the reader's ability to succeed.

**Optimized for {model}:** {tip}

Please craft a response that is both informative and inspiring, with a tone that encourages and empowers the reader.",
        purpose = extract_intent(input),
        context = extract_context(input),
    )
}
