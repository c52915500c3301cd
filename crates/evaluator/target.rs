use once_cell::sync::Lazy;
use regex::Regex;

/// Specific named targets checked before any positional parsing. Color, side
/// and size qualified names take precedence because positional extraction on
/// them would pick the wrong qualifier.
const SPECIFIC_TARGETS: &[&str] = &[
    // Color-qualified objects.
    "red cup",
    "blue cup",
    "green cup",
    "white cup",
    "red book",
    "blue book",
    "green book",
    "red mug",
    "white mug",
    // Position-qualified objects.
    "left bottle",
    "center bottle",
    "middle bottle",
    "right bottle",
    "left chair",
    "right chair",
    "left door",
    "right door",
    "left trash bin",
    "center trash bin",
    "right trash bin",
    // Size-qualified objects.
    "medium box",
    "small box",
    "large box",
    // Directional objects.
    "back plant",
    "front plant",
    "back door",
    "front door",
];

/// Adjectives that appear between a position word and the real noun, as in
/// "the middle water bottle". Checked so the noun wins over the adjective.
const COMMON_ADJECTIVES: &[&str] = &[
    "water", "plastic", "glass", "metal", "wooden", "small", "large", "big", "old", "new", "red",
    "blue", "green", "white", "black",
];

/// Words that never name an object ("the left one").
const FILLER_WORDS: &[&str] = &["one", "it", "that", "this", "thing", "go", "navigate", "move"];

/// Bare nouns recognized as a last resort.
const GENERIC_OBJECTS: &[&str] = &[
    "cup", "bottle", "plant", "book", "laptop", "keys", "phone", "door", "chair", "desk", "table",
    "fridge", "trash bin", "box", "bag", "kitchen", "office", "mug",
];

static BEHIND_THE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"the\s+(\w+)\s+behind\s+(?:you|me|the robot)").unwrap());
static BEHIND_BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\s+behind\s+(?:you|me|the robot)").unwrap());
static IN_FRONT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"the\s+(\w+)\s+in\s+front\s+(?:of\s+)?(?:you|me|the robot)").unwrap());
static TO_THE_BEHIND: Lazy<Regex> = Lazy::new(|| Regex::new(r"to\s+the\s+(\w+)\s+behind").unwrap());
static ANY_BEHIND: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+).*behind").unwrap());

static POSITION_ADJ_NOUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"the\s+(left|right|center|middle)\s+(\w+)\s+(\w+)").unwrap());
static NOUN_ON_SIDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"the\s+(\w+)\s+on\s+the\s+(left|right|center|middle)\s*(?:side)?").unwrap());
static POSITION_NOUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"the\s+(left|right|center|middle)\s+(\w+)").unwrap());
static NOUN_TO_SIDE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)\s+to\s+the\s+(left|right)").unwrap());
static NAV_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:navigate to|go to|go over to|toward)\s+(.+)").unwrap());

fn is_filler(candidate: &str) -> bool {
    candidate
        .split_whitespace()
        .last()
        .is_some_and(|word| FILLER_WORDS.contains(&word))
}

/// Extracts the target object phrase from a lowercased goal description.
///
/// Resolution order: exact qualified names, directional phrases ("behind
/// you"), positional phrases ("on the right side"), then bare generic nouns.
/// "middle" is normalized to "center" to match fixture naming.
#[must_use]
pub fn extract_target(goal_lower: &str) -> Option<String> {
    for target in SPECIFIC_TARGETS {
        if goal_lower.contains(target) {
            return Some((*target).replace("middle", "center"));
        }
    }

    let directional: [(&Regex, fn(&str) -> String); 5] = [
        (&BEHIND_THE, |noun| format!("back {noun}")),
        (&BEHIND_BARE, |noun| format!("back {noun}")),
        (&IN_FRONT, |noun| format!("front {noun}")),
        (&TO_THE_BEHIND, |noun| format!("back {noun}")),
        (&ANY_BEHIND, |noun| format!("back {noun}")),
    ];
    for (pattern, build) in directional {
        if let Some(caps) = pattern.captures(goal_lower) {
            let extracted = build(&caps[1]);
            if !is_filler(&extracted) {
                return Some(extracted);
            }
        }
    }

    if let Some(caps) = POSITION_ADJ_NOUN.captures(goal_lower) {
        let position = &caps[1];
        let second = &caps[2];
        let third = &caps[3];
        let noun = if COMMON_ADJECTIVES.contains(&second) {
            third
        } else {
            second
        };
        let extracted = format!("{position} {noun}").replace("middle", "center");
        if !is_filler(&extracted) {
            return Some(extracted);
        }
    }

    let positional: [(&Regex, fn(&regex::Captures<'_>) -> String); 3] = [
        (&NOUN_ON_SIDE, |caps| format!("{} {}", &caps[2], &caps[1])),
        (&POSITION_NOUN, |caps| format!("{} {}", &caps[1], &caps[2])),
        (&NOUN_TO_SIDE, |caps| format!("{} {}", &caps[2], &caps[1])),
    ];
    for (pattern, build) in positional {
        if let Some(caps) = pattern.captures(goal_lower) {
            let extracted = build(&caps).replace("middle", "center");
            if is_filler(&extracted) {
                continue;
            }
            return Some(extracted);
        }
    }

    // Compound goals like "navigate to kitchen and count the chairs" name
    // several generic nouns; the one inside the navigation clause wins.
    if let Some(caps) = NAV_CLAUSE.captures(goal_lower) {
        let clause = caps[1].split(" and ").next().unwrap_or(&caps[1]);
        if let Some(noun) = GENERIC_OBJECTS.iter().find(|noun| clause.contains(*noun)) {
            return Some((*noun).to_string());
        }
    }

    GENERIC_OBJECTS
        .iter()
        .find(|noun| goal_lower.contains(*noun))
        .map(|noun| (*noun).to_string())
}
