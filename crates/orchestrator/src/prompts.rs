use codeforge_core::CodingTask;

pub struct TaskPrompts;

impl TaskPrompts {
    /// System prompt appended to the in-container agent invocation.
    pub fn system() -> &'static str {
        r#"You are an autonomous coding agent implementing a requested change.

1. **Quality**: Write clean code following existing patterns in the repository.
2. **Testing**: If tests are required, write appropriate tests for your changes.
3. **Scope**: Only modify files necessary to complete the task.
4. **Security**: Never expose credentials, API keys, or sensitive data.
5. **Compatibility**: Follow the existing code style and conventions.

Do NOT modify:
- Configuration files holding secrets (.env, keys)
- CI/CD configurations unless explicitly requested
- Dependencies without justification

When complete, summarize the files modified, the changes made, and any
follow-up items."#
    }

    /// Prompt sent to the task-assessment oracle for non-trivial tasks.
    pub fn assessment(task: &CodingTask) -> String {
        format!(
            r#"Analyze this coding task and provide:

1. **Complexity Assessment**: trivial, simple, moderate, complex, or very_complex
2. **Estimated Files**: how many files will likely be modified
3. **Implementation Plan**: brief step-by-step approach

Task: {description}

Repository: {repository}
Base Branch: {base_branch}
Context: {context}

Respond in JSON:
```json
{{
  "complexity": "moderate",
  "estimated_files": 3,
  "implementation_steps": [
    "Step 1...",
    "Step 2..."
  ]
}}
```"#,
            description = task.description,
            repository = task.repository,
            base_branch = task.base_branch,
            context = serde_json::to_string(&task.context).unwrap_or_else(|_| "{}".to_string()),
        )
    }

    /// Prompt for a retry attempt after a quality-gate rejection.
    pub fn retry_with_feedback(task: &CodingTask, feedback: &str) -> String {
        format!(
            r#"Your previous implementation did not pass the quality gate.

## Task
{description}

## Quality Gate Feedback
{feedback}

Address each issue in the feedback, keep the rest of your changes
intact, and update tests where needed."#,
            description = task.description,
            feedback = feedback,
        )
    }
}
