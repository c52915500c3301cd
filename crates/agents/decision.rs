use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::intent::Intent;
use crate::llm::{ChatClient, ChatMessage, LlmError};

/// Intent schema shared by every prompt variant.
const RESPONSE_FORMAT: &str = r#"Respond with ONLY a JSON object, no prose around it.

Single action:
  {"action": "<kind>", "distance": <m>, "degrees": <deg>, "message": "<text>", "target": "<object>"}
Sequence:
  {"actions": [<action>, ...], "text": "<say this while acting>"}

Action kinds: forward, backward, turn_left, turn_right, stop, speak, clarify,
describe_vision, find_object, spatial_navigate.
Use "distance" (meters) for forward/backward, "degrees" for turns,
"message" for speak/clarify, "target" for find_object/spatial_navigate."#;

/// Prompt for the friction-trained variant.
const FRICTION_PROMPT: &str = r#"You are a small desktop robot with a camera, wheels and a voice.
You act ONLY on what the user says and what your camera shows; you have no map.

Before acting, consider whether the command is ambiguous or risky. When it is,
apply positive friction instead of guessing:
- probing: ask a short question that narrows down which object or path is meant
  ({"action": "clarify", "message": "...", "friction": "probing"})
- assumption_reveal: state the assumption you are about to act on so the user
  can correct it ({"action": "clarify", "message": "...", "friction": "assumption_reveal"})
- overspecification: restate the command with the detail you inferred and
  confirm ({"action": "clarify", "message": "...", "friction": "overspecification"})

When the command is clear and safe, act immediately. Never ask about things
your camera already answers. One clarification per ambiguity, not per turn."#;

/// Prompt for the no-friction ablation.
const NO_FRICTION_PROMPT: &str = r#"You are a small desktop robot with a camera, wheels and a voice.
You act ONLY on what the user says and what your camera shows; you have no map.

Execute the user's command immediately using your best interpretation.
NEVER ask clarifying questions. If a command is ambiguous, commit to the most
plausible reading and act."#;

/// Prompt for zero-shot variants: no behavioral guidance at all.
const ZERO_SHOT_PROMPT: &str = r#"You are a small desktop robot with a camera, wheels and a voice.
You act ONLY on what the user says and what your camera shows; you have no map."#;

/// Robot decision strategy under evaluation. Variants differ only in their
/// system prompt and how much conversation history they carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelVariant {
    /// Trained to apply positive friction on ambiguity.
    Friction,
    /// Ablation: forbidden from asking questions.
    NoFriction,
    /// No behavioral guidance, no conversation memory.
    ZeroShot,
    /// No behavioral guidance, full conversation memory.
    ZeroShotMultiturn,
}

impl ModelVariant {
    /// All variants, in reporting order.
    pub const ALL: [Self; 4] = [
        Self::Friction,
        Self::NoFriction,
        Self::ZeroShot,
        Self::ZeroShotMultiturn,
    ];

    /// One-line description for experiment summaries.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Friction => "clarifies ambiguous commands before acting",
            Self::NoFriction => "acts immediately, never asks questions",
            Self::ZeroShot => "unguided, single-turn memory",
            Self::ZeroShotMultiturn => "unguided, multi-turn memory",
        }
    }

    const fn system_prompt(self) -> &'static str {
        match self {
            Self::Friction => FRICTION_PROMPT,
            Self::NoFriction => NO_FRICTION_PROMPT,
            Self::ZeroShot | Self::ZeroShotMultiturn => ZERO_SHOT_PROMPT,
        }
    }

    const fn keeps_history(self) -> bool {
        !matches!(self, Self::ZeroShot)
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Friction => "friction",
            Self::NoFriction => "no_friction",
            Self::ZeroShot => "zero_shot",
            Self::ZeroShotMultiturn => "zero_shot_multiturn",
        };
        f.write_str(name)
    }
}

impl FromStr for ModelVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "friction" => Ok(Self::Friction),
            "no_friction" => Ok(Self::NoFriction),
            "zero_shot" => Ok(Self::ZeroShot),
            "zero_shot_multiturn" => Ok(Self::ZeroShotMultiturn),
            other => Err(format!("unknown model variant '{other}'")),
        }
    }
}

/// Everything a decision agent is allowed to see on one turn. Deliberately
/// narrower than the world: no coordinates, no object list, no goal.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    /// Objective scene text plus hazard distances.
    pub scene: &'a str,
    /// Egocentric camera view.
    pub camera_view: &'a str,
    /// Latest user utterance.
    pub user_message: &'a str,
    /// Zero-based turn index within the episode.
    pub turn_index: usize,
}

/// One robot decision strategy. Implementations own whatever per-episode
/// state they need; [`DecisionAgent::reset`] starts a fresh episode.
#[async_trait]
pub trait DecisionAgent: Send {
    /// Clears per-episode state.
    fn reset(&mut self);

    /// Produces the next intent for the given turn.
    async fn decide(&mut self, context: &DecisionContext<'_>) -> Result<Intent, LlmError>;
}

/// LLM-backed agent: one chat completion per turn, system prompt fixed by
/// the variant, history kept or dropped per the variant's policy.
pub struct LlmDecisionAgent {
    client: Box<dyn ChatClient>,
    variant: ModelVariant,
    history: Vec<ChatMessage>,
}

impl LlmDecisionAgent {
    /// Creates an agent for the given variant.
    #[must_use]
    pub fn new(client: Box<dyn ChatClient>, variant: ModelVariant) -> Self {
        Self {
            client,
            variant,
            history: Vec::new(),
        }
    }

    /// The variant this agent runs.
    #[must_use]
    pub const fn variant(&self) -> ModelVariant {
        self.variant
    }

    fn render_turn(context: &DecisionContext<'_>) -> String {
        format!(
            "{camera}\n{scene}\nUser says: \"{message}\"\n\nDecide your next action.",
            camera = context.camera_view,
            scene = context.scene,
            message = context.user_message
        )
    }
}

#[async_trait]
impl DecisionAgent for LlmDecisionAgent {
    fn reset(&mut self) {
        self.history.clear();
    }

    async fn decide(&mut self, context: &DecisionContext<'_>) -> Result<Intent, LlmError> {
        let system = format!("{}\n\n{RESPONSE_FORMAT}", self.variant.system_prompt());
        let turn = ChatMessage::user(Self::render_turn(context));

        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend(self.history.iter().cloned());
        messages.push(turn.clone());

        let reply = self.client.complete(&messages).await?;
        if self.variant.keeps_history() {
            self.history.push(turn);
            self.history.push(ChatMessage::assistant(reply.clone()));
        }
        // Malformed output becomes speech rather than aborting the episode.
        Ok(Intent::from_llm_json_or_speech(&reply))
    }
}

/// Replays a fixed intent sequence. The episode-driving tests use this to
/// exercise the orchestrator without any model in the loop.
pub struct ScriptedDecisionAgent {
    intents: VecDeque<Intent>,
    total: usize,
}

impl ScriptedDecisionAgent {
    /// Creates an agent that will emit the given intents in order.
    #[must_use]
    pub fn new<I>(intents: I) -> Self
    where
        I: IntoIterator<Item = Intent>,
    {
        let queue: VecDeque<Intent> = intents.into_iter().collect();
        let total = queue.len();
        Self {
            intents: queue,
            total,
        }
    }
}

#[async_trait]
impl DecisionAgent for ScriptedDecisionAgent {
    fn reset(&mut self) {}

    async fn decide(&mut self, _context: &DecisionContext<'_>) -> Result<Intent, LlmError> {
        self.intents
            .pop_front()
            .ok_or(LlmError::ScriptExhausted(self.total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{ActionIntent, ActionKind};
    use crate::llm::ScriptedChat;

    fn context<'a>() -> DecisionContext<'a> {
        DecisionContext {
            scene: "Scene: A desk with two cups\n",
            camera_view: "VISUAL ANALYSIS FROM CAMERA:\n- red cup at 2.0m directly ahead\n",
            user_message: "bring me the cup",
            turn_index: 0,
        }
    }

    #[tokio::test]
    async fn llm_agent_parses_structured_reply() {
        let chat = ScriptedChat::new([r#"{"action": "forward", "distance": 0.5}"#]);
        let mut agent = LlmDecisionAgent::new(Box::new(chat), ModelVariant::Friction);
        let intent = agent.decide(&context()).await.unwrap();
        assert_eq!(
            intent,
            Intent::Single(ActionIntent::movement(ActionKind::Forward, 0.5))
        );
    }

    #[tokio::test]
    async fn llm_agent_degrades_prose_to_speech() {
        let chat = ScriptedChat::new(["Sure, moving now!"]);
        let mut agent = LlmDecisionAgent::new(Box::new(chat), ModelVariant::NoFriction);
        let intent = agent.decide(&context()).await.unwrap();
        assert_eq!(intent, Intent::Single(ActionIntent::speak("Sure, moving now!")));
    }

    #[tokio::test]
    async fn zero_shot_variant_keeps_no_history() {
        let chat = ScriptedChat::new([
            r#"{"action": "stop"}"#,
            r#"{"action": "stop"}"#,
        ]);
        let mut agent = LlmDecisionAgent::new(Box::new(chat), ModelVariant::ZeroShot);
        agent.decide(&context()).await.unwrap();
        agent.decide(&context()).await.unwrap();
        assert!(agent.history.is_empty());
    }

    #[tokio::test]
    async fn multiturn_variant_accumulates_history() {
        let chat = ScriptedChat::new([
            r#"{"action": "stop"}"#,
            r#"{"action": "stop"}"#,
        ]);
        let mut agent = LlmDecisionAgent::new(Box::new(chat), ModelVariant::ZeroShotMultiturn);
        agent.decide(&context()).await.unwrap();
        agent.decide(&context()).await.unwrap();
        // Two turns, each a user/assistant pair.
        assert_eq!(agent.history.len(), 4);
        agent.reset();
        assert!(agent.history.is_empty());
    }

    #[test]
    fn variant_round_trips_through_strings() {
        for variant in ModelVariant::ALL {
            assert_eq!(variant.to_string().parse::<ModelVariant>(), Ok(variant));
        }
    }
}
