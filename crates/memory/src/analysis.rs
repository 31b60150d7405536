//! Keyword heuristics that annotate a memory when it is created.

const EMOTION_KEYWORDS: &[(&str, &[&str])] = &[
    ("joy", &["happy", "joy", "excited", "thrilled", "delighted", "cheerful", "elated"]),
    ("love", &["love", "adore", "cherish", "treasure", "affection", "care"]),
    ("pride", &["proud", "accomplished", "achieved", "success", "victory"]),
    ("gratitude", &["grateful", "thankful", "appreciate", "blessed"]),
    ("sadness", &["sad", "disappointed", "upset", "heartbroken", "melancholy"]),
    ("anger", &["angry", "frustrated", "mad", "annoyed", "furious"]),
    ("fear", &["scared", "afraid", "worried", "anxious", "nervous"]),
    ("surprise", &["surprised", "amazed", "shocked", "astonished"]),
    ("peaceful", &["peaceful", "calm", "relaxed", "serene", "tranquil"]),
    ("nostalgic", &["remember", "nostalgia", "past", "childhood", "memories"]),
];

const IMPORTANT_KEYWORDS: &[(&str, f64)] = &[
    ("family", 0.3),
    ("work", 0.2),
    ("achievement", 0.3),
    ("milestone", 0.3),
    ("decision", 0.2),
    ("learning", 0.2),
    ("travel", 0.2),
    ("health", 0.3),
    ("relationship", 0.3),
    ("goal", 0.2),
];

const INTENSE_WORDS: &[&str] = &[
    "amazing",
    "incredible",
    "terrible",
    "wonderful",
    "devastating",
    "fantastic",
];

const TAG_KEYWORDS: &[(&str, &[&str])] = &[
    ("work", &["work", "job", "career", "project", "meeting", "office", "colleague"]),
    ("family", &["family", "mom", "dad", "sister", "brother", "parent", "child"]),
    ("friends", &["friend", "buddy", "pal", "companion"]),
    ("achievement", &["achievement", "success", "accomplished", "goal", "milestone"]),
    ("learning", &["learned", "study", "course", "education", "knowledge", "skill"]),
    ("travel", &["travel", "trip", "vacation", "visit", "journey", "adventure"]),
    ("health", &["health", "exercise", "workout", "medical", "doctor", "fitness"]),
    ("hobby", &["hobby", "interest", "passion", "creative", "art", "music"]),
    ("food", &["food", "restaurant", "cooking", "meal", "dinner", "lunch"]),
    ("technology", &["technology", "computer", "software", "app", "digital"]),
    ("nature", &["nature", "outdoor", "park", "beach", "mountain", "forest"]),
];

pub const NEUTRAL: &str = "neutral";

/// Emotion with the most keyword hits. Ties go to the earlier table entry.
pub fn analyze_emotion(content: &str) -> String {
    let lowered = content.to_lowercase();
    let mut best: Option<(&str, usize)> = None;

    for (emotion, keywords) in EMOTION_KEYWORDS {
        let score = keywords.iter().filter(|k| lowered.contains(*k)).count();
        if score > 0 && best.map_or(true, |(_, top)| score > top) {
            best = Some((*emotion, score));
        }
    }

    best.map(|(emotion, _)| emotion).unwrap_or(NEUTRAL).to_string()
}

/// Score in `[0.5, 1.0]` from length, topic keywords and intense wording.
pub fn calculate_importance(content: &str) -> f64 {
    let mut importance = 0.5;

    let length = content.chars().count();
    if length > 200 {
        importance += 0.2;
    } else if length > 100 {
        importance += 0.1;
    }

    let lowered = content.to_lowercase();
    importance += IMPORTANT_KEYWORDS
        .iter()
        .filter(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, weight)| weight)
        .sum::<f64>();

    importance += 0.1 * INTENSE_WORDS.iter().filter(|w| lowered.contains(*w)).count() as f64;

    importance.min(1.0)
}

pub fn extract_tags(content: &str) -> Vec<String> {
    let lowered = content.to_lowercase();
    TAG_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(tag, _)| tag.to_string())
        .collect()
}
