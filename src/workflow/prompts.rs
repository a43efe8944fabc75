// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Prompt rendering per step kind
//!
//! Prompts are assembled from the request and the step's context slice.
//! Rendering is pure: same request, same slice, same prompt.

use crate::provider::adapter::Prompt;
use crate::validation::Issue;
use crate::workflow::step::StepKind;
use crate::workflow::{Complexity, ContentType, GenerationRequest};

const SYSTEM_PROMPT: &str = "You are an experienced instructional designer. \
Produce clear, well-structured educational material in Markdown. \
Follow the requested format exactly and do not add commentary.";

fn complexity_label(complexity: Complexity) -> &'static str {
    match complexity {
        Complexity::Introductory => "introductory",
        Complexity::Intermediate => "intermediate",
        Complexity::Advanced => "advanced",
    }
}

fn push_request_header(body: &mut String, request: &GenerationRequest) {
    body.push_str(&format!("Topic: {}\n", request.topic));
    body.push_str(&format!("Audience: {}\n", request.audience));
    body.push_str(&format!(
        "Lesson duration: {} minutes\n",
        request.duration_minutes
    ));
    body.push_str(&format!(
        "Complexity: {}\n",
        complexity_label(request.complexity)
    ));
    if !request.learning_objectives.is_empty() {
        body.push_str("Learning objectives:\n");
        for objective in &request.learning_objectives {
            body.push_str(&format!("- {objective}\n"));
        }
    }
}

fn push_context(body: &mut String, slice: &str) {
    if !slice.is_empty() {
        body.push_str("\nEarlier work in this session:\n\n");
        body.push_str(slice);
        body.push('\n');
    }
}

fn content_instruction(content_type: &ContentType) -> &'static str {
    match content_type {
        ContentType::Slides => {
            "Write a slide deck in Markdown. Separate slides with `---`. \
             Each slide has a `#` title and at most five bullet points."
        }
        ContentType::Notes => {
            "Write lecture notes in Markdown with `##` section headings, \
             worked examples, and a short summary at the end."
        }
        ContentType::Worksheet => {
            "Write a practice worksheet in Markdown. Number every exercise \
             and order them from easiest to hardest."
        }
        ContentType::Quiz => {
            "Write a quiz in Markdown. Number every question. Mix \
             multiple-choice and short-answer items. Do not include answers."
        }
        ContentType::Rubric => {
            "Write a grading rubric as a Markdown table with criteria rows \
             and performance-level columns."
        }
        ContentType::AnswerKey => {
            "Write an answer key in Markdown for the assessment shown above. \
             Number answers to match the questions and explain each briefly."
        }
        ContentType::InstructorGuide => {
            "Write an instructor guide in Markdown: pacing suggestions, \
             discussion prompts, and common misconceptions to watch for."
        }
    }
}

/// Render the prompt for a provider-backed step
pub fn render(kind: &StepKind, request: &GenerationRequest, slice: &str) -> Prompt {
    let mut body = String::new();
    push_request_header(&mut body, request);
    push_context(&mut body, slice);

    match kind {
        StepKind::ObjectiveAnalysis => {
            body.push_str(
                "\nAnalyze the learning objectives for this lesson. Break them \
                 into teachable units, note prerequisites, and flag objectives \
                 that are too broad for the duration. If no objectives were \
                 given, propose suitable ones for the topic and audience.\n",
            );
        }
        StepKind::Planning => {
            body.push_str(
                "\nUsing the objective analysis above, write a lesson plan \
                 scaffold: an ordered outline of sections with the time to \
                 spend on each and which objective each section serves.\n",
            );
        }
        StepKind::ContentGeneration { content_type } => {
            body.push('\n');
            body.push_str(content_instruction(content_type));
            body.push('\n');
        }
        // Remediation prompts carry the artifact and issues; rendered below
        _ => {}
    }

    Prompt::new(body).with_system(SYSTEM_PROMPT)
}

/// Render the prompt for a remediation step
///
/// Carries the artifact being reworked and the issues to fix; the model
/// rewrites the whole artifact rather than patching it.
pub fn render_remediation(
    content_type: &ContentType,
    request: &GenerationRequest,
    slice: &str,
    artifact_content: &str,
    issues: &[Issue],
) -> Prompt {
    let mut body = String::new();
    push_request_header(&mut body, request);
    push_context(&mut body, slice);

    body.push_str(&format!(
        "\nThe {content_type} below was reviewed and needs rework. \
         Rewrite it in full, fixing every listed issue while keeping \
         everything that already works.\n"
    ));
    body.push_str("\nIssues found:\n");
    for issue in issues {
        body.push_str(&format!("- {}\n", issue.message));
    }
    body.push_str("\nCurrent version:\n\n");
    body.push_str(artifact_content);
    body.push('\n');

    Prompt::new(body).with_system(SYSTEM_PROMPT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{IssueKind, Severity};

    fn request() -> GenerationRequest {
        GenerationRequest::new("Photosynthesis", vec![ContentType::Quiz])
            .with_audience("8th grade")
            .with_objectives(vec!["Explain the light reactions".to_string()])
    }

    #[test]
    fn test_render_carries_request_fields() {
        let prompt = render(&StepKind::ObjectiveAnalysis, &request(), "");
        assert!(prompt.user.contains("Photosynthesis"));
        assert!(prompt.user.contains("8th grade"));
        assert!(prompt.user.contains("Explain the light reactions"));
        assert!(prompt.system.is_some());
    }

    #[test]
    fn test_render_includes_context_slice() {
        let prompt = render(
            &StepKind::Planning,
            &request(),
            "## objective analysis\nunit 1: light reactions",
        );
        assert!(prompt.user.contains("unit 1: light reactions"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let a = render(&StepKind::Planning, &request(), "slice");
        let b = render(&StepKind::Planning, &request(), "slice");
        assert_eq!(a.user, b.user);
        assert_eq!(a.system, b.system);
    }

    #[test]
    fn test_quiz_prompt_forbids_answers() {
        let prompt = render(
            &StepKind::ContentGeneration {
                content_type: ContentType::Quiz,
            },
            &request(),
            "",
        );
        assert!(prompt.user.contains("Do not include answers"));
    }

    #[test]
    fn test_remediation_prompt_carries_issues_and_content() {
        let issues = vec![Issue {
            kind: IssueKind::Readability,
            severity: Severity::Warning,
            message: "sentences run too long for the audience".to_string(),
            location: None,
            remediation_id: None,
        }];
        let prompt = render_remediation(
            &ContentType::Quiz,
            &request(),
            "",
            "Q1: Elucidate the mechanism...",
            &issues,
        );
        assert!(prompt.user.contains("sentences run too long"));
        assert!(prompt.user.contains("Elucidate the mechanism"));
        assert!(prompt.user.contains("Rewrite it in full"));
    }
}
