//! Prompt templates for every generation type.

use chrono::NaiveDate;

use super::kind::InsightKind;
use crate::journal::JournalEntry;
use crate::model::ChatMessage;

const JOURNAL_LAYOUT: &str = "\
The user keeps nightly journals with 6 sections:
1. What I want to remember tomorrow
2. Meaningful moments from today
3. What I'm trying to understand or solve
4. What went well today (small wins)
5. What wasn't important and can be dropped
6. Intentions for tomorrow";

const INSIGHT_GUIDELINES: &str = "\
Guidelines:
- Provide 2-4 concise paragraphs
- Quote specific dates (e.g., \"On 2025-11-25, you noted...\")
- Focus on patterns that recur or evolve
- Acknowledge limited data if analyzing fewer than 3 entries";

const SUGGESTIONS_SYSTEM: &str = r#"You are an assistant turning structured journal entries into actionable suggestions.

Return ONLY a JSON object. No prose, no markdown fences, no <think> tags. Start directly with {.
Use exactly this structure:
{
  "repeatedFrictionPoints": ["suggestion", "suggestion"],
  "highlightMomentum": ["suggestion", "suggestion"],
  "emergingOpportunities": ["suggestion", "suggestion"]
}

repeatedFrictionPoints: recurring problems or stressors (sections 3 and 5). Make each one specific and actionable.
highlightMomentum: what is working and how to build on it (sections 2, 4 and 6).
emergingOpportunities: new interests or threads just starting to form, with an experiment or next step.

Each suggestion is 1-2 sentences and starts with a verb ("Try...", "Block...", "Continue...").
Give 2-4 suggestions per category. With fewer than 3 entries, say so inside the suggestions."#;

/// Role and task for one insight kind, without the shared sections.
fn insight_task(kind: InsightKind) -> &'static str {
    match kind {
        InsightKind::Themes => {
            "You are a sleep scientist analyzing structured journal entries.\n\
             Task: identify recurring themes the user marked as important (sections 1, 3 and 6).\n\
             Tone: second person, conversational, supportive and actionable."
        }
        InsightKind::Moments => {
            "You are a sleep scientist analyzing journal entries for meaningful moments.\n\
             Task: extract meaningful moments and emotional patterns such as joy, stress or \
             accomplishment from sections 2 and 4, and connect them to well-being.\n\
             Tone: second person, warm and supportive."
        }
        InsightKind::Problems => {
            "You are a cognitive psychologist analyzing journal entries for persistent challenges.\n\
             Task: identify core problems and unsolved threads from section 3. Describe the \
             patterns; do not offer solutions.\n\
             Tone: second person, empathetic but analytical."
        }
        InsightKind::Progress => {
            "You are a growth mindset coach analyzing journal entries for progress signals.\n\
             Task: identify progress, competence growth and achievements from sections 4 and 6, \
             showing how intentions turned into wins.\n\
             Tone: second person, encouraging."
        }
        InsightKind::Deprioritized => {
            "You are a cognitive load expert analyzing deprioritization patterns.\n\
             Task: identify what the user let go of (section 5), which categories are dropped \
             most often, and which patterns look healthy or unhealthy.\n\
             Tone: second person, supportive and non-judgmental."
        }
        InsightKind::RememberPatterns => {
            "You are an external cognitive analyst reviewing a month of nightly journal entries.\n\
             Task: analyze what the user repeatedly marked as worth remembering (section 1): \
             recurring ideas, skills or habits, concepts they keep refining. Explain what this \
             reveals about their real priorities.\n\
             Tone: second person, supportive, clear and analytical."
        }
        InsightKind::EmotionalThemes => {
            "You are an emotional pattern analyst reviewing a month of nightly journal entries.\n\
             Task: extract the emotional through-lines from meaningful moments (section 2): the \
             most frequent emotions, people or places tied to them, what energizes and what \
             drains, and how the tone shifted across the month.\n\
             Tone: second person, warm and reflective."
        }
        InsightKind::UnresolvedProblems => {
            "You are a cognitive psychologist reviewing a month of journal entries.\n\
             Task: from section 3, surface problems that persisted for more than a week or two, \
             questions that evolved or got answered, and struggles that faded. Focus on patterns, \
             not solutions.\n\
             Tone: second person, empathetic and grounded."
        }
        InsightKind::ProgressTrends => {
            "You are a growth and competency analyst reviewing a month of journal entries.\n\
             Task: identify skills that improved, small wins that accumulated, and situations \
             handled better as the month went on (section 4 and related intentions).\n\
             Tone: second person, encouraging and strength-focused."
        }
        InsightKind::LettingGo => {
            "You are a cognitive load specialist reviewing a month of journal entries.\n\
             Task: from section 5, identify distractions and stressors that faded, mistakes that \
             stopped being revisited, and thought patterns that were released.\n\
             Tone: second person, gentle and reassuring."
        }
    }
}

/// What the user message asks for, completed with the entry count.
fn insight_request(kind: InsightKind) -> &'static str {
    match kind {
        InsightKind::Themes => "identify recurring themes",
        InsightKind::Moments => "find meaningful moments and emotional patterns",
        InsightKind::Problems => "identify core problems and unsolved threads",
        InsightKind::Progress => "identify progress and growth",
        InsightKind::Deprioritized => "analyze what was deprioritized",
        InsightKind::RememberPatterns => {
            "identify patterns in what you repeatedly marked as important"
        }
        InsightKind::EmotionalThemes => "find emotional themes in your meaningful moments",
        InsightKind::UnresolvedProblems => {
            "identify unresolved questions and long-running problems"
        }
        InsightKind::ProgressTrends => "find progress, competence and signs of growth",
        InsightKind::LettingGo => "find patterns in what you let go of",
    }
}

fn entries_noun(count: usize) -> &'static str {
    if count == 1 {
        "entry"
    } else {
        "entries"
    }
}

/// Oldest and newest dates among `entries`, in that order.
pub fn date_range(entries: &[JournalEntry]) -> Option<(NaiveDate, NaiveDate)> {
    let oldest = entries.iter().map(|e| e.date).min()?;
    let newest = entries.iter().map(|e| e.date).max()?;
    Some((oldest, newest))
}

/// Render entries oldest first as the context block of a user message.
pub fn render_entries(entries: &[JournalEntry]) -> String {
    let mut sorted: Vec<&JournalEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.date);

    let mut out = String::from("Journal entries:\n");
    for entry in sorted {
        out.push_str(&format!("\n## {}", entry.date));
        if let Some(mood) = entry.mood {
            out.push_str(&format!(" (mood: {mood})"));
        }
        out.push('\n');
        out.push_str(entry.content.trim());
        out.push('\n');
    }
    out
}

/// System and user messages for an insight over `entries`.
pub fn insight_messages(kind: InsightKind, entries: &[JournalEntry]) -> Vec<ChatMessage> {
    let system = format!(
        "{}\n\n{JOURNAL_LAYOUT}\n\n{INSIGHT_GUIDELINES}",
        insight_task(kind)
    );

    let count = entries.len();
    let scope = match date_range(entries) {
        Some((oldest, newest)) if kind.is_monthly() => format!(
            "the journal entries from {oldest} to {newest} ({count} {})",
            entries_noun(count)
        ),
        _ => format!("the last {count} journal {}", entries_noun(count)),
    };
    let user = format!(
        "Analyze {scope} and {}. Reference specific dates.\n\n{}",
        insight_request(kind),
        render_entries(entries)
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// System and user messages for suggestions over `entries`.
pub fn suggestions_messages(entries: &[JournalEntry]) -> Vec<ChatMessage> {
    let system = format!("{SUGGESTIONS_SYSTEM}\n\n{JOURNAL_LAYOUT}");

    let count = entries.len();
    let scope = match date_range(entries) {
        Some((oldest, newest)) => format!(
            "journal entries from {oldest} to {newest} ({count} {})",
            entries_noun(count)
        ),
        None => "journal entries".to_string(),
    };
    let user = format!(
        "Analyze {scope} and generate actionable suggestions in the 3 categories. \
         Return only valid JSON.\n\n{}",
        render_entries(entries)
    );

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}
