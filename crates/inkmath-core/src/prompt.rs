//! Prompt construction for the Completion capability.
//!
//! The rubric examples anchor the model's judgment on the handful of
//! manipulations a linear-equation solution actually uses: moving terms,
//! combining like terms, dividing through, and substitution checks.

use crate::model::StepRecord;

/// System instruction for single-step validation. JSON-only output.
pub const STEP_SYSTEM_PROMPT: &str = "You are a friendly algebra tutor checking one handwritten step of a student's work. Respond ONLY with a JSON object: {\"isCorrect\": boolean, \"feedback\": string, \"explanation\": string (optional, include when incorrect), \"confidence\": number between 0 and 1}. No markdown, no prose outside the JSON.";

/// System instruction for hints. Plain text output.
pub const HINT_SYSTEM_PROMPT: &str = "You are a friendly algebra tutor. Give ONE short hint (a single sentence) nudging the student toward the next step. Never reveal the final answer.";

/// System instruction for whole-solution evaluation. JSON-only output.
pub const EVAL_SYSTEM_PROMPT: &str = "You are an algebra teacher grading a complete worked solution. Respond ONLY with a JSON object: {\"score\": number from 0 to 100, \"feedback\": string, \"suggestions\": array of strings}. No markdown, no prose outside the JSON.";

const RUBRIC: &str = "\
Judging examples:
- CORRECT: from \"2x + 3 = 11\", writing \"2x = 11 - 3\" (moving +3 across '=' flips it to -3).
- CORRECT: \"3x + 2x = 11\" rewritten as \"5x = 11\" (combining like terms).
- CORRECT: from \"2x = 8\", writing \"x = 4\" (dividing both sides by 2).
- CORRECT: \"2(4) + 3 = 11\" as a check of x = 4 in 2x + 3 = 11 (substitution).
- INCORRECT: from \"2x + 3 = 11\", writing \"2x = 11 + 3\" (sign not flipped).
- INCORRECT: \"5 + 3 = 9\" (arithmetic error; 5 + 3 = 8).";

/// Build the user prompt for validating one step.
pub fn build_step_prompt(latex: &str, context: Option<&str>) -> String {
    let problem = context.unwrap_or("(no problem statement provided)");
    format!(
        "Problem: {problem}\n\nThe student wrote this step:\n{latex}\n\n{RUBRIC}\n\nIs the student's step mathematically valid as a move in solving the problem?"
    )
}

/// Build the user prompt for a hint about the next step.
pub fn build_hint_prompt(latex: &str, context: Option<&str>) -> String {
    let problem = context.unwrap_or("(no problem statement provided)");
    format!(
        "Problem: {problem}\n\nThe student's latest step is:\n{latex}\n\nGive one short hint for what to try next."
    )
}

/// Build the user prompt for evaluating a full solution.
pub fn build_solution_prompt(problem: &str, steps: &[StepRecord]) -> String {
    let mut listing = String::new();
    for step in steps {
        let mark = if step.is_correct { "✓" } else { "✗" };
        listing.push_str(&format!(
            "{}. [{}] {}  ({})\n",
            step.step_number, mark, step.latex, step.feedback
        ));
    }
    format!(
        "Problem: {problem}\n\nThe student's full solution, step by step:\n{listing}\nGrade the solution overall: a score from 0 to 100, short narrative feedback, and concrete improvement suggestions."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_prompt_embeds_context_and_step() {
        let prompt = build_step_prompt("2x = 8", Some("Solve 2x + 3 = 11"));
        assert!(prompt.contains("Solve 2x + 3 = 11"));
        assert!(prompt.contains("2x = 8"));
        assert!(prompt.contains("sign not flipped"));
    }

    #[test]
    fn step_prompt_placeholder_without_context() {
        let prompt = build_step_prompt("x = 4", None);
        assert!(prompt.contains("(no problem statement provided)"));
    }

    #[test]
    fn solution_prompt_lists_steps_in_order() {
        let steps = vec![
            StepRecord {
                step_number: 1,
                latex: "2x = 8".into(),
                is_correct: true,
                feedback: "good".into(),
            },
            StepRecord {
                step_number: 2,
                latex: "x = 4".into(),
                is_correct: true,
                feedback: "solved".into(),
            },
        ];
        let prompt = build_solution_prompt("Solve 2x + 3 = 11", &steps);
        let first = prompt.find("1. [✓] 2x = 8").unwrap();
        let second = prompt.find("2. [✓] x = 4").unwrap();
        assert!(first < second);
    }
}
