//! Prompt composition.
//!
//! Renders a [`ResolvedContext`] into the final system prompt:
//!
//! ```text
//! <role system prompt>
//!
//! <style>
//! Tone: <id> (<description>). <modifiers>
//! </style>
//!
//! <context>
//! <memory scope="knowledge" key="k1">
//! ...
//! </memory>
//! </context>
//! ```
//!
//! The `<context>` block is left out when there are no memories. Composition
//! is a pure function of its input: no clock, no I/O, same bytes every time.

use crate::resolver::ResolvedContext;

#[derive(Debug, Clone, Copy, Default)]
pub struct PromptComposer;

impl PromptComposer {
    pub fn compose(&self, context: &ResolvedContext) -> String {
        let mut prompt = String::new();

        prompt.push_str(context.role.system_prompt.trim());
        prompt.push_str("\n\n<style>\n");
        prompt.push_str(&style_line(context));
        prompt.push_str("\n</style>\n");

        if !context.memories.is_empty() {
            prompt.push_str("\n<context>\n");
            for memory in &context.memories {
                prompt.push_str(&format!(
                    "<memory scope=\"{}\" key=\"{}\">\n{}\n</memory>\n",
                    memory.scope,
                    escape_attr(&memory.key),
                    memory.value.render().trim()
                ));
            }
            prompt.push_str("</context>\n");
        }

        prompt
    }
}

/// Shorthand for `PromptComposer.compose(context)`.
pub fn compose(context: &ResolvedContext) -> String {
    PromptComposer.compose(context)
}

fn style_line(context: &ResolvedContext) -> String {
    let tone = &context.tone;
    let modifiers = tone.modifiers.trim();
    if modifiers.is_empty() {
        format!("Tone: {} ({}).", tone.id, tone.description)
    } else {
        format!("Tone: {} ({}). {}", tone.id, tone.description, modifiers)
    }
}

fn escape_attr(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvedMemory;
    use rolectx_config::seed;
    use rolectx_core::memory::{MemoryScope, MemoryValue};

    fn context(role_id: &str, memories: Vec<ResolvedMemory>) -> ResolvedContext {
        let role = seed::default_roles()
            .into_iter()
            .find(|r| r.id == role_id)
            .unwrap();
        let tone = seed::default_tones()
            .into_iter()
            .find(|t| t.id == role.tone)
            .unwrap();
        ResolvedContext {
            role,
            tone,
            memories,
            degraded: Vec::new(),
        }
    }

    fn memory(scope: MemoryScope, key: &str, value: impl Into<MemoryValue>) -> ResolvedMemory {
        ResolvedMemory {
            scope,
            key: key.into(),
            value: value.into(),
        }
    }

    #[test]
    fn no_memories_omits_context_block() {
        let prompt = compose(&context("life-coach", vec![]));
        assert!(prompt.starts_with("You are an experienced life coach"));
        assert!(prompt.contains("<style>\nTone: casual ("));
        assert!(!prompt.contains("<context>"));
        assert!(prompt.ends_with("</style>\n"));
    }

    #[test]
    fn memories_render_in_given_order() {
        let ctx = context(
            "financial-advisor",
            vec![
                memory(MemoryScope::Knowledge, "k1", "Tax law changed in 2024"),
                memory(MemoryScope::Session, "s1", "User asked about deductions"),
            ],
        );
        let prompt = compose(&ctx);

        let knowledge = prompt.find("Tax law changed in 2024").unwrap();
        let session = prompt.find("User asked about deductions").unwrap();
        assert!(knowledge < session);
        assert!(prompt.contains("<memory scope=\"knowledge\" key=\"k1\">\nTax law changed in 2024\n</memory>\n"));
        assert!(prompt.ends_with("</context>\n"));
        assert!(prompt.contains("Tone: professional ("));
    }

    #[test]
    fn sections_are_separated_by_one_blank_line() {
        let ctx = context(
            "marketing-expert",
            vec![memory(MemoryScope::User, "brand", "Acme Rockets")],
        );
        let prompt = compose(&ctx);
        assert!(prompt.contains(".\n\n<style>\n"));
        assert!(prompt.contains("</style>\n\n<context>\n"));
        assert!(!prompt.contains("\n\n\n"));
    }

    #[test]
    fn composition_is_deterministic() {
        let ctx = context(
            "financial-advisor",
            vec![
                memory(MemoryScope::Knowledge, "rates", "Prime rate is 8.5%"),
                memory(
                    MemoryScope::User,
                    "profile",
                    serde_json::json!({"risk": "low", "horizon": 10}),
                ),
            ],
        );
        let first = PromptComposer.compose(&ctx);
        for _ in 0..10 {
            assert_eq!(PromptComposer.compose(&ctx), first);
        }
    }

    #[test]
    fn document_values_render_as_json() {
        let ctx = context(
            "life-coach",
            vec![memory(
                MemoryScope::User,
                "goals",
                serde_json::json!({"goal": "run a marathon"}),
            )],
        );
        let prompt = compose(&ctx);
        assert!(prompt.contains("\"goal\""));
        assert!(prompt.contains("run a marathon"));
    }

    #[test]
    fn keys_are_attribute_escaped() {
        let ctx = context(
            "life-coach",
            vec![memory(MemoryScope::Session, "a\"b<c>", "note")],
        );
        let prompt = compose(&ctx);
        assert!(prompt.contains("key=\"a&quot;b&lt;c&gt;\""));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let mut ctx = context(
            "life-coach",
            vec![memory(MemoryScope::Session, "s", "  padded value \n")],
        );
        ctx.role.system_prompt = format!("\n  {}  \n", ctx.role.system_prompt);
        let prompt = compose(&ctx);
        assert!(prompt.starts_with("You are"));
        assert!(prompt.contains(">\npadded value\n</memory>"));
    }
}
