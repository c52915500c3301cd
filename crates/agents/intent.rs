use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Primitive action a decision agent can request. The executor interprets
/// these; agents never manipulate the world directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Translate along the current heading.
    Forward,
    /// Translate against the current heading.
    Backward,
    /// Strafe-style turn-then-move shorthand (treated as a left turn).
    Left,
    /// Strafe-style turn-then-move shorthand (treated as a right turn).
    Right,
    /// Rotate counter-clockwise in place.
    TurnLeft,
    /// Rotate clockwise in place.
    TurnRight,
    /// Halt without moving.
    Stop,
    /// Say something aloud without moving.
    Speak,
    /// Ask the user a clarifying question; pauses execution for a reply.
    Clarify,
    /// Report what the camera currently sees.
    DescribeVision,
    /// Rotate in a full scan looking for a named object.
    FindObject,
    /// Navigate toward a named object using the camera view.
    SpatialNavigate,
    /// Anything unparseable; executed as a stop.
    #[default]
    Unknown,
}

/// Which flavor of positive friction a clarification exercises, when the
/// agent labels its own question. Used for reporting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrictionType {
    /// No friction applied.
    #[default]
    None,
    /// A question that narrows down an ambiguous reference.
    Probing,
    /// Stating an assumption aloud before acting on it.
    AssumptionReveal,
    /// Restating the command with more detail than was given.
    Overspecification,
}

/// One structured action with its parameters. Absent fields fall back to
/// executor defaults (e.g. a forward with no distance moves 0.5m).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionIntent {
    /// What to do.
    #[serde(default)]
    pub action: ActionKind,
    /// Translation distance in meters, for movement actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Rotation magnitude in degrees, for turn actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degrees: Option<f64>,
    /// Utterance, for speak/clarify actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Object name, for find/navigate actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Self-reported friction label on clarifications.
    #[serde(default, skip_serializing_if = "is_no_friction")]
    pub friction: FrictionType,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_no_friction(friction: &FrictionType) -> bool {
    *friction == FrictionType::None
}

impl ActionIntent {
    /// Creates a bare intent of the given kind.
    #[must_use]
    pub fn new(action: ActionKind) -> Self {
        Self {
            action,
            distance: None,
            degrees: None,
            message: None,
            target: None,
            friction: FrictionType::None,
        }
    }

    /// Speech intent.
    #[must_use]
    pub fn speak(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(ActionKind::Speak)
        }
    }

    /// Clarification intent.
    #[must_use]
    pub fn clarify(question: impl Into<String>, friction: FrictionType) -> Self {
        Self {
            message: Some(question.into()),
            friction,
            ..Self::new(ActionKind::Clarify)
        }
    }

    /// Movement intent with a distance.
    #[must_use]
    pub fn movement(action: ActionKind, distance: f64) -> Self {
        Self {
            distance: Some(distance),
            ..Self::new(action)
        }
    }

    /// Turn intent with a magnitude.
    #[must_use]
    pub fn turn(action: ActionKind, degrees: f64) -> Self {
        Self {
            degrees: Some(degrees),
            ..Self::new(action)
        }
    }
}

/// A decision agent's full answer for one turn: either a single action or an
/// ordered sequence executed atomically (a collision aborts the remainder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Intent {
    /// Several actions in order, with optional accompanying speech.
    Sequence {
        /// Actions executed in order.
        actions: Vec<ActionIntent>,
        /// Spoken alongside the sequence.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    /// One action.
    Single(ActionIntent),
}

/// Failure to recover a structured intent from model output.
#[derive(Debug, Error)]
pub enum IntentError {
    /// The output contained no JSON object at all.
    #[error("no JSON object found in model output")]
    NoJson,
    /// The extracted JSON did not match the intent schema.
    #[error("intent schema mismatch: {0}")]
    Schema(#[from] serde_json::Error),
}

impl Intent {
    /// All actions in execution order.
    #[must_use]
    pub fn actions(&self) -> &[ActionIntent] {
        match self {
            Self::Single(action) => std::slice::from_ref(action),
            Self::Sequence { actions, .. } => actions,
        }
    }

    /// Accompanying free text, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Single(_) => None,
            Self::Sequence { text, .. } => text.as_deref(),
        }
    }

    /// Whether the first action is a clarification.
    #[must_use]
    pub fn is_clarification(&self) -> bool {
        self.actions()
            .first()
            .is_some_and(|action| action.action == ActionKind::Clarify)
    }

    /// Parses model output into an intent. Models wrap JSON in prose and code
    /// fences; everything outside the outermost braces is discarded.
    pub fn from_llm_json(raw: &str) -> Result<Self, IntentError> {
        let start = raw.find('{').ok_or(IntentError::NoJson)?;
        let end = raw.rfind('}').ok_or(IntentError::NoJson)?;
        if end < start {
            return Err(IntentError::NoJson);
        }
        Ok(serde_json::from_str(&raw[start..=end])?)
    }

    /// Parses model output, degrading unparseable output to plain speech so
    /// an episode never aborts on a malformed reply.
    #[must_use]
    pub fn from_llm_json_or_speech(raw: &str) -> Self {
        Self::from_llm_json(raw)
            .unwrap_or_else(|_| Self::Single(ActionIntent::speak(raw.trim())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_action_parses_from_fenced_output() {
        let raw = "Here is my decision:\n```json\n{\"action\": \"forward\", \"distance\": 0.4}\n```";
        let intent = Intent::from_llm_json(raw).unwrap();
        assert_eq!(
            intent,
            Intent::Single(ActionIntent::movement(ActionKind::Forward, 0.4))
        );
    }

    #[test]
    fn sequence_parses_with_text() {
        let raw = r#"{"actions": [{"action": "turn_right", "degrees": 90},
                      {"action": "forward", "distance": 1.2}],
                      "text": "Heading to the shelf."}"#;
        let intent = Intent::from_llm_json(raw).unwrap();
        assert_eq!(intent.actions().len(), 2);
        assert_eq!(intent.text(), Some("Heading to the shelf."));
        assert!(!intent.is_clarification());
    }

    #[test]
    fn clarification_carries_friction_label() {
        let raw = r#"{"action": "clarify",
                      "message": "Which bottle do you mean?",
                      "friction": "probing"}"#;
        let intent = Intent::from_llm_json(raw).unwrap();
        assert!(intent.is_clarification());
        assert_eq!(intent.actions()[0].friction, FrictionType::Probing);
    }

    #[test]
    fn prose_without_json_degrades_to_speech() {
        let intent = Intent::from_llm_json_or_speech("I will carefully move forward now.");
        assert_eq!(
            intent,
            Intent::Single(ActionIntent::speak("I will carefully move forward now."))
        );
    }

    #[test]
    fn unknown_action_kind_is_a_schema_error() {
        assert!(Intent::from_llm_json(r#"{"action": "levitate"}"#).is_err());
    }
}
