use nrve_core::PromptKind;

pub const PERSONA: &str = "\
You are NRVE, a supportive mental health companion. Be empathetic, brief, and practical.\n\
\n\
IMPORTANT: Only add mental health disclaimers (like \"If you're feeling overwhelmed or distressed, \
please consider reaching out to a mental health professional\") when the user is discussing serious \
mental health concerns, emotional distress, or crisis situations. For general questions, casual \
conversation, or non-mental health topics, just answer normally without adding disclaimers.\n\
\n\
You can reference the user's journal entries when relevant to provide more personalized support. \
Keep responses under 200 words.";

/// Used when the model answers with nothing but whitespace.
pub const EMPTY_REPLY: &str = "I'm here with you. Tell me more.";

pub const CANNED_REPLIES: [&str; 3] = [
    "Thanks for sharing that. What part feels most important right now?",
    "I hear you. Would it help to break this into smaller steps?",
    "What's one small, kind thing you can do for yourself today?",
];

pub fn chat_prompt(message: &str, context_block: Option<&str>) -> String {
    let mut prompt = format!("{PERSONA}\n\nUser message: {message}");
    if let Some(block) = context_block {
        prompt.push_str("\n\n");
        prompt.push_str(block);
    }
    prompt
}

pub fn guided_prompt(kind: PromptKind, input: &str) -> String {
    let task = match kind {
        PromptKind::Reflection => {
            "Help the user reflect on what they shared. Ask one or two open questions \
             that invite them to notice their feelings and needs."
        }
        PromptKind::Gratitude => {
            "Guide the user through a short gratitude exercise grounded in what they shared. \
             Suggest three specific things they could appreciate."
        }
        PromptKind::Reframe => {
            "Gently help the user reframe the thought they shared. Name the unhelpful pattern \
             if there is one and offer a balanced alternative perspective."
        }
        PromptKind::Grounding => {
            "Walk the user through a brief grounding exercise (for example 5-4-3-2-1 senses) \
             adapted to what they shared."
        }
    };
    format!("{PERSONA}\n\nExercise: {kind}. {task}\n\nUser input: {input}")
}
