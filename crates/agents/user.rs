use crate::llm::{ChatClient, ChatMessage, LlmError};

/// Reply sentinel the user model emits when it has nothing more to say.
const DONE_SENTINEL: &str = "DONE";

/// Spelled-out quantities that count as an answer to a counting request.
const NUMBER_WORDS: &[&str] = &[
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "several", "many", "no", "none",
];

/// Named areas where arrival phrasing is looser than for small objects.
const GENERAL_AREAS: &[&str] = &["kitchen", "office", "desk", "table", "counter", "shelf"];

const COMMAND_PROMPT: &str = r#"You are a person casually instructing a small desktop robot.
Phrase the task below as you would say it out loud: short, natural, and no
more specific than a real person would bother to be. Do not mention
coordinates or distances unless the task states them. Reply with only the
spoken command."#;

const RESPONSE_PROMPT: &str = r#"You are the same person, continuing the conversation with the robot.
You can see the whole scene (state below); the robot cannot. Answer its
question or react to what it just did, in one or two short sentences.
If the robot has done what you wanted, or there is nothing useful left to
say, reply with exactly DONE."#;

/// LLM-backed stand-in for a human operator. It issues the initial command,
/// answers clarifying questions from an omniscient view of the scene, and
/// ends the episode by returning `None` when satisfied.
pub struct SimulatedUser {
    client: Box<dyn ChatClient>,
    goal: String,
    initial_state: String,
    history: Vec<ChatMessage>,
}

impl SimulatedUser {
    /// Creates a user over the given chat client.
    #[must_use]
    pub fn new(client: Box<dyn ChatClient>) -> Self {
        Self {
            client,
            goal: String::new(),
            initial_state: String::new(),
            history: Vec::new(),
        }
    }

    /// Starts a fresh episode: the goal to pursue and the omniscient view of
    /// the scene as it stands before the first command.
    pub fn reset(&mut self, goal: impl Into<String>, initial_state: impl Into<String>) {
        self.goal = goal.into();
        self.initial_state = initial_state.into();
        self.history.clear();
    }

    /// The goal driving the current episode.
    #[must_use]
    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Produces the opening command the robot hears.
    pub async fn generate_initial_command(&mut self) -> Result<String, LlmError> {
        let messages = [
            ChatMessage::system(COMMAND_PROMPT),
            ChatMessage::user(format!(
                "Task: {}\n\nWhat you can see:\n{}",
                self.goal, self.initial_state
            )),
        ];
        let command = self.client.complete(&messages).await?.trim().to_string();
        self.history.push(ChatMessage::assistant(command.clone()));
        Ok(command)
    }

    /// Reacts to the robot's latest turn. `robot_message` is what the robot
    /// said or asked (empty when it acted silently); `action_description` is
    /// the rendered action. Returns `None` to end the episode.
    pub async fn respond_to_robot(
        &mut self,
        world_state: &str,
        robot_message: &str,
        action_description: &str,
        task_complete: bool,
    ) -> Result<Option<String>, LlmError> {
        if task_complete {
            return Ok(None);
        }

        let turn = ChatMessage::user(format!(
            "Your goal: {}\n\n{world_state}\nRobot action: {action_description}\nRobot says: \"{robot_message}\"",
            self.goal
        ));
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::system(RESPONSE_PROMPT));
        messages.extend(self.history.iter().cloned());
        messages.push(turn.clone());

        let reply = self.client.complete(&messages).await?.trim().to_string();
        self.history.push(turn);

        if reply.is_empty() || reply.eq_ignore_ascii_case(DONE_SENTINEL) {
            return Ok(None);
        }
        self.history.push(ChatMessage::assistant(reply.clone()));
        Ok(Some(reply))
    }

    /// Cheap rule-based satisfaction check against the rendered action
    /// history, used to decide whether the episode can end without another
    /// model call. Conservative: unknown goal styles never read as complete.
    #[must_use]
    pub fn goal_appears_complete(&self, action_history: &[String]) -> bool {
        let goal = self.goal.to_lowercase();
        let history: Vec<String> = action_history
            .iter()
            .map(|action| action.to_lowercase())
            .collect();
        let any = |pred: &dyn Fn(&str) -> bool| history.iter().any(|action| pred(action));

        if ["describe", "report", "check", "count"]
            .iter()
            .any(|kw| goal.contains(kw))
        {
            return any(&|action| {
                action.contains("described")
                    || (action.contains("said:")
                        && (action.chars().any(|c| c.is_ascii_digit())
                            || NUMBER_WORDS.iter().any(|nw| action.contains(nw))
                            || action.len() > 20))
            });
        }

        if goal.contains("find") {
            return any(&|action| action.contains("360° scan"));
        }

        if goal.contains("navigate") || goal.contains("go to") || goal.contains("toward") {
            let area = GENERAL_AREAS.iter().find(|area| goal.contains(*area));
            return any(&|action| {
                if !action.contains("navigated to") {
                    return false;
                }
                area.map_or(true, |area| action.contains(area))
            });
        }

        if goal.contains("turn around") || goal.contains("180") {
            return any(&|action| action.contains("turned") && action.contains("180"));
        }

        if goal.contains("move forward") {
            return any(&|action| action.contains("moved forward"));
        }
        if goal.contains("move backward") || goal.contains("back up") {
            return any(&|action| action.contains("moved backward"));
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedChat;
    use parking_lot::Mutex;

    fn user_with(replies: &[&str]) -> SimulatedUser {
        SimulatedUser::new(Box::new(ScriptedChat::new(replies.iter().copied())))
    }

    /// Client that remembers the last transcript it was asked to complete.
    struct EchoingChat {
        last_prompt: std::sync::Arc<Mutex<String>>,
    }

    #[async_trait::async_trait]
    impl ChatClient for EchoingChat {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
            let transcript = messages
                .iter()
                .map(|message| message.content.clone())
                .collect::<Vec<_>>()
                .join("\n");
            *self.last_prompt.lock() = transcript;
            Ok("okay".into())
        }
    }

    #[tokio::test]
    async fn initial_command_comes_from_the_model() {
        let mut user = user_with(&["grab the cup for me"]);
        user.reset("Navigate to the red cup", "scene state");
        let command = user.generate_initial_command().await.unwrap();
        assert_eq!(command, "grab the cup for me");
    }

    #[tokio::test]
    async fn initial_command_prompt_carries_the_scene() {
        let last_prompt = std::sync::Arc::new(Mutex::new(String::new()));
        let mut user = SimulatedUser::new(Box::new(EchoingChat {
            last_prompt: std::sync::Arc::clone(&last_prompt),
        }));
        user.reset(
            "Navigate to the left bottle",
            "Objects: bottle_left at (-0.4, 2.0), bottle_right at (0.4, 2.4)",
        );
        user.generate_initial_command().await.unwrap();
        let prompt = last_prompt.lock().clone();
        assert!(prompt.contains("Task: Navigate to the left bottle"));
        assert!(prompt.contains("bottle_right at (0.4, 2.4)"));
    }

    #[tokio::test]
    async fn done_reply_ends_the_episode() {
        let mut user = user_with(&["The left one, please.", "DONE"]);
        user.reset("Navigate to the left bottle", "scene state");
        let first = user
            .respond_to_robot("state", "Which bottle?", "asked: 'Which bottle?'", false)
            .await
            .unwrap();
        assert_eq!(first.as_deref(), Some("The left one, please."));
        let second = user
            .respond_to_robot("state", "", "moved forward 0.5m", false)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn task_complete_short_circuits_without_a_model_call() {
        let mut user = user_with(&[]);
        user.reset("Navigate to the desk", "scene state");
        let reply = user
            .respond_to_robot("state", "", "navigated to desk", true)
            .await
            .unwrap();
        assert!(reply.is_none());
    }

    #[test]
    fn navigation_goal_requires_matching_area() {
        let mut user = user_with(&[]);
        user.reset("Navigate to the kitchen", "scene state");
        assert!(!user.goal_appears_complete(&["navigated to desk (moved 1.0m)".into()]));
        assert!(user.goal_appears_complete(&["navigated to kitchen (moved 2.0m)".into()]));
    }

    #[test]
    fn counting_goal_needs_a_numeric_answer() {
        let mut user = user_with(&[]);
        user.reset("Count the chairs at the table", "scene state");
        assert!(!user.goal_appears_complete(&["moved forward 0.5m".into()]));
        assert!(user.goal_appears_complete(&["said: 'I can see three chairs'".into()]));
    }

    #[test]
    fn unknown_goal_style_never_reads_complete() {
        let mut user = user_with(&[]);
        user.reset("Sing a cheerful song", "scene state");
        assert!(!user.goal_appears_complete(&["said: 'la la la'".into()]));
    }
}
