//! Prompt text for the planner, replanner and step agent.

use crate::models::{numbered, PastStep};

/// System prompt for the tool-calling step agent.
pub const AGENT_SYSTEM_PROMPT: &str = r#"You are an expert code architect and analyst.
You are executing one step of a larger analysis plan.

## Available Tools

- `list_files(query)` - list a workspace directory
- `read_file(query)` - read a workspace source file
- `search_code(query)` - find lines containing a text pattern
- `web_search(query)` - search the web for best practices and common patterns

Gather the information the current step needs, then answer with a concise,
factual summary of what you found for that step only. Do not start later steps."#;

/// System prompt for the planner.
pub const PLANNER_SYSTEM_PROMPT: &str = r#"You are a code analysis expert. For the given objective, create a step-by-step analysis plan.
Each step should focus on understanding code architecture, patterns, and potential improvements.
Consider:
1. Code structure and organization
2. Dependency relationships
3. Design patterns used
4. Potential technical debt
5. Performance considerations
6. Security implications

Make each step specific and actionable, and do not add superfluous steps.
The result of the final step should be the final answer: concrete recommendations."#;

/// Task message for the step agent: the full plan, with step 1 marked active.
pub fn step_task(plan: &[String], step: &str) -> String {
    format!(
        "Following this analysis plan:\n{}\n\nExecute step 1: {}",
        numbered(plan),
        step
    )
}

/// Message sent when the step agent runs out of tool turns.
pub const FINAL_ANSWER_NUDGE: &str =
    "You have used all available tool calls for this step. Answer the step now with what you have gathered.";

/// Replanning prompt over the full session context.
pub fn replan_prompt(objective: &str, plan: &[String], past_steps: &[PastStep]) -> String {
    let completed = if past_steps.is_empty() {
        "(none)".to_string()
    } else {
        past_steps
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{}. {}\nResult: {}", i + 1, p.step, p.result))
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!(
        r#"Analyze the current progress and determine next steps.
Consider what additional information is needed about:
- Code architecture
- Implementation patterns
- Best practices
- Potential improvements

Original objective:
{objective}

Current plan:
{plan}

Completed steps:
{completed}

If the completed steps answer the objective, respond with the final recommendations.
Otherwise return a plan containing only the steps that still need to be done."#,
        objective = objective,
        plan = numbered(plan),
        completed = completed,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_task_marks_first_step() {
        let plan = vec!["List all imports".to_string(), "Build dependency graph".to_string()];
        let task = step_task(&plan, &plan[0]);
        assert!(task.contains("1. List all imports\n2. Build dependency graph"));
        assert!(task.ends_with("Execute step 1: List all imports"));
    }

    #[test]
    fn test_replan_prompt_includes_history() {
        let prompt = replan_prompt(
            "analyze deps",
            &["Summarize coupling".to_string()],
            &[PastStep::new("List all imports", "12 crates")],
        );
        assert!(prompt.contains("analyze deps"));
        assert!(prompt.contains("1. Summarize coupling"));
        assert!(prompt.contains("1. List all imports\nResult: 12 crates"));

        let empty = replan_prompt("x", &[], &[]);
        assert!(empty.contains("Completed steps:\n(none)"));
    }
}
