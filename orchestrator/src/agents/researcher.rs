// Research Agent: ReAct loop over the web search tools

use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{AgentError, Result};
use crate::llm::ChatModel;
use crate::models::ChatMessage;
use crate::tools::Tool;

const FINAL_ANSWER_MARKER: &str = "Final Answer:";
const OBSERVATION_STOP: &str = "\nObservation";

lazy_static! {
    static ref ACTION_RE: Regex = Regex::new(
        r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)"
    )
    .expect("valid action regex");
}

#[derive(Debug, Clone, PartialEq)]
enum AgentStep {
    Action {
        tool: String,
        input: String,
        log: String,
    },
    Finish(String),
}

pub struct ResearchAgent {
    llm: Arc<dyn ChatModel>,
    tools: Vec<Arc<dyn Tool>>,
    max_iterations: usize,
}

impl ResearchAgent {
    pub fn new(llm: Arc<dyn ChatModel>, tools: Vec<Arc<dyn Tool>>, max_iterations: usize) -> Self {
        Self {
            llm,
            tools,
            max_iterations,
        }
    }

    /// Runs think/act/observe until the model emits a final answer.
    pub async fn research(&self, query: &str) -> Result<String> {
        info!("Research: investigating query: {}", query);

        let mut scratchpad = String::new();

        for iteration in 1..=self.max_iterations {
            let prompt = self.render_prompt(query, &scratchpad);
            let completion = self
                .llm
                .complete(&[ChatMessage::user(prompt)], &[OBSERVATION_STOP])
                .await?;

            match parse_step(&completion.content)? {
                AgentStep::Finish(answer) => {
                    info!("Research: final answer after {} iteration(s)", iteration);
                    return Ok(answer);
                }
                AgentStep::Action { tool, input, log } => {
                    debug!("Research: step {} -> {}({:?})", iteration, tool, input);
                    let observation = self.call_tool(&tool, &input).await?;
                    scratchpad.push_str(&log);
                    scratchpad.push_str("\nObservation: ");
                    scratchpad.push_str(&observation);
                    scratchpad.push_str("\nThought: ");
                }
            }
        }

        Err(AgentError::IterationLimit(self.max_iterations))
    }

    async fn call_tool(&self, name: &str, input: &str) -> Result<String> {
        match self.tools.iter().find(|t| t.name() == name) {
            Some(tool) => tool.run(input).await,
            None => {
                // Reported back to the model so it can pick a valid tool.
                warn!("Research: model asked for unknown tool {:?}", name);
                Ok(format!(
                    "{name} is not a valid tool, try one of [{}].",
                    self.tool_names()
                ))
            }
        }
    }

    fn tool_names(&self) -> String {
        self.tools
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn render_prompt(&self, query: &str, scratchpad: &str) -> String {
        let tools = self
            .tools
            .iter()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Answer the following questions as best you can. You have access to the following tools:

{tools}

Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

Begin!

Question: {input}
Thought:{agent_scratchpad}",
            tool_names = self.tool_names(),
            input = query,
            agent_scratchpad = scratchpad,
        )
    }
}

fn parse_step(text: &str) -> Result<AgentStep> {
    let includes_answer = text.contains(FINAL_ANSWER_MARKER);

    if let Some(caps) = ACTION_RE.captures(text) {
        if includes_answer {
            return Err(AgentError::OutputParseError(format!(
                "both a final answer and a parse-able action: {text}"
            )));
        }
        let tool = caps[1].trim().to_string();
        let input = caps[2].trim().trim_matches('"').to_string();
        return Ok(AgentStep::Action {
            tool,
            input,
            log: text.to_string(),
        });
    }

    if includes_answer {
        let answer = text
            .rsplit(FINAL_ANSWER_MARKER)
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        return Ok(AgentStep::Finish(answer));
    }

    Err(AgentError::OutputParseError(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatCompletion;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct ScriptedModel {
        replies: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().rev().map(|s| s.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, messages: &[ChatMessage], stop: &[&str]) -> Result<ChatCompletion> {
            assert_eq!(stop, &[OBSERVATION_STOP]);
            self.prompts.lock().unwrap().push(messages[0].content.clone());
            let content = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| "Thought: still thinking".to_string());
            Ok(ChatCompletion {
                content,
                ..Default::default()
            })
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "wikipedia"
        }

        fn description(&self) -> &str {
            "Looks things up."
        }

        async fn run(&self, input: &str) -> Result<String> {
            Ok(format!("Page: {input}\nSummary: A city."))
        }
    }

    #[test]
    fn parses_action_with_quoted_input() {
        let step = parse_step("I should search.\nAction: wikipedia\nAction Input: \"Paris\"").unwrap();
        assert_eq!(
            step,
            AgentStep::Action {
                tool: "wikipedia".to_string(),
                input: "Paris".to_string(),
                log: "I should search.\nAction: wikipedia\nAction Input: \"Paris\"".to_string(),
            }
        );
    }

    #[test]
    fn parses_final_answer() {
        let step = parse_step("I now know the final answer\nFinal Answer: Visit the Louvre.").unwrap();
        assert_eq!(step, AgentStep::Finish("Visit the Louvre.".to_string()));
    }

    #[test]
    fn rejects_unparseable_and_ambiguous_output() {
        assert!(matches!(
            parse_step("I am not sure."),
            Err(AgentError::OutputParseError(_))
        ));
        assert!(matches!(
            parse_step("Action: wikipedia\nAction Input: x\nFinal Answer: y"),
            Err(AgentError::OutputParseError(_))
        ));
    }

    #[tokio::test]
    async fn loop_feeds_observations_back_to_the_model() {
        let model = Arc::new(ScriptedModel::new(&[
            " I should look it up.\nAction: wikipedia\nAction Input: Paris",
            " I now know the final answer\nFinal Answer: Paris hosts events in May.",
        ]));
        let agent = ResearchAgent::new(model.clone(), vec![Arc::new(EchoTool)], 5);

        let answer = agent.research("3-day trip to Paris in May").await.unwrap();
        assert_eq!(answer, "Paris hosts events in May.");

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Question: 3-day trip to Paris in May"));
        assert!(prompts[0].contains("wikipedia: Looks things up."));
        assert!(prompts[1].ends_with(
            "Action Input: Paris\nObservation: Page: Paris\nSummary: A city.\nThought: "
        ));
    }

    #[tokio::test]
    async fn placeholder_text_in_question_is_not_expanded() {
        let model = Arc::new(ScriptedModel::new(&[
            "Action: wikipedia\nAction Input: Paris",
            "Final Answer: done",
        ]));
        let agent = ResearchAgent::new(model.clone(), vec![Arc::new(EchoTool)], 5);

        agent.research("Paris {agent_scratchpad} {tools}").await.unwrap();

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[1].contains("Question: Paris {agent_scratchpad} {tools}\nThought:"));
        assert_eq!(prompts[1].matches("Observation: Page: Paris").count(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_becomes_an_observation() {
        let model = Arc::new(ScriptedModel::new(&[
            "Action: google\nAction Input: Paris",
            "Final Answer: done",
        ]));
        let agent = ResearchAgent::new(model.clone(), vec![Arc::new(EchoTool)], 5);

        assert_eq!(agent.research("Paris").await.unwrap(), "done");
        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[1].contains("google is not a valid tool, try one of [wikipedia]."));
    }

    #[tokio::test]
    async fn exceeding_iteration_budget_is_an_error() {
        let model = Arc::new(ScriptedModel::new(&[
            "Action: wikipedia\nAction Input: a",
            "Action: wikipedia\nAction Input: b",
            "Action: wikipedia\nAction Input: c",
        ]));
        let agent = ResearchAgent::new(model, vec![Arc::new(EchoTool)], 2);

        assert!(matches!(
            agent.research("Paris").await,
            Err(AgentError::IterationLimit(2))
        ));
    }
}
