// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Plan expansion
//!
//! Deterministically expands a request into the ordered step list:
//! validation, objective analysis, planning, one content-generation step per
//! requested type in request order, option-gated extras, formatting,
//! packaging. Remediation steps are synthesized later by the validation
//! pipeline, never here.

use crate::workflow::step::{Step, StepKind};
use crate::workflow::{ContentType, GenerationRequest};

/// Expand a request into its ordered steps
pub fn expand(request: &GenerationRequest) -> Vec<Step> {
    let mut steps = vec![
        Step::new(StepKind::Validation),
        Step::new(StepKind::ObjectiveAnalysis),
        Step::new(StepKind::Planning),
    ];

    for content_type in &request.content_types {
        steps.push(Step::new(StepKind::ContentGeneration {
            content_type: content_type.clone(),
        }));
    }

    if request.options.include_answer_key {
        steps.push(Step::new(StepKind::ContentGeneration {
            content_type: ContentType::AnswerKey,
        }));
    }
    if request.options.include_instructor_guide {
        steps.push(Step::new(StepKind::ContentGeneration {
            content_type: ContentType::InstructorGuide,
        }));
    }
    if request.options.include_rubric && !request.content_types.contains(&ContentType::Rubric) {
        steps.push(Step::new(StepKind::ContentGeneration {
            content_type: ContentType::Rubric,
        }));
    }

    steps.push(Step::new(StepKind::Formatting));
    steps.push(Step::new(StepKind::Packaging));
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::AdditionalOptions;

    #[test]
    fn test_one_generation_step_per_type_in_request_order() {
        let request = GenerationRequest::new(
            "Topic",
            vec![ContentType::Quiz, ContentType::Slides, ContentType::Notes],
        );
        let steps = expand(&request);

        let generated: Vec<&ContentType> = steps
            .iter()
            .filter_map(|s| match &s.kind {
                StepKind::ContentGeneration { content_type } => Some(content_type),
                _ => None,
            })
            .collect();
        assert_eq!(
            generated,
            vec![&ContentType::Quiz, &ContentType::Slides, &ContentType::Notes]
        );
    }

    #[test]
    fn test_fixed_scaffold_around_content() {
        let request = GenerationRequest::new("Topic", vec![ContentType::Quiz]);
        let steps = expand(&request);

        assert_eq!(steps[0].kind, StepKind::Validation);
        assert_eq!(steps[1].kind, StepKind::ObjectiveAnalysis);
        assert_eq!(steps[2].kind, StepKind::Planning);
        assert_eq!(steps[steps.len() - 2].kind, StepKind::Formatting);
        assert_eq!(steps[steps.len() - 1].kind, StepKind::Packaging);
    }

    #[test]
    fn test_expansion_is_deterministic() {
        let request = GenerationRequest::new(
            "Topic",
            vec![ContentType::Slides, ContentType::Quiz],
        );
        let a: Vec<StepKind> = expand(&request).into_iter().map(|s| s.kind).collect();
        let b: Vec<StepKind> = expand(&request).into_iter().map(|s| s.kind).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_option_gated_steps() {
        let request = GenerationRequest::new("Topic", vec![ContentType::Quiz]).with_options(
            AdditionalOptions {
                include_answer_key: true,
                include_instructor_guide: true,
                include_rubric: true,
            },
        );
        let steps = expand(&request);

        let generated: Vec<&ContentType> = steps
            .iter()
            .filter_map(|s| s.kind.content_type())
            .collect();
        assert!(generated.contains(&&ContentType::AnswerKey));
        assert!(generated.contains(&&ContentType::InstructorGuide));
        assert!(generated.contains(&&ContentType::Rubric));
    }

    #[test]
    fn test_rubric_option_not_duplicated() {
        let request = GenerationRequest::new("Topic", vec![ContentType::Rubric]).with_options(
            AdditionalOptions {
                include_rubric: true,
                ..Default::default()
            },
        );
        let steps = expand(&request);
        let rubric_count = steps
            .iter()
            .filter(|s| s.kind.content_type() == Some(&ContentType::Rubric))
            .count();
        assert_eq!(rubric_count, 1);
    }

    #[test]
    fn test_no_remediation_steps_in_plan() {
        let request = GenerationRequest::new("Topic", vec![ContentType::Quiz]);
        assert!(expand(&request)
            .iter()
            .all(|s| !matches!(s.kind, StepKind::Remediation { .. })));
    }
}
