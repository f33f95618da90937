// All LLM prompt templates for the recommendation pipeline.
// Placeholders in `{braces}` are filled by `render` before sending.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Fills `{name}` placeholders in a single pass, so braces inside substituted
/// student text are never expanded again. Unknown placeholders are left as-is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let placeholder = PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"));

    placeholder
        .replace_all(template, |caps: &Captures| {
            let key = &caps[1];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Stage 1: department selection.
/// Replace: {advisor_description}, {conversation_transcript}, {skills}, {departments},
///          {foundational_rule}
pub const DEPARTMENT_SELECTION_TEMPLATE: &str = r#"You are an expert academic advisor analyzing student profiles to recommend university departments from MIT.

STUDENT PROFILE:
Advisor Assessment: {advisor_description}

Conversation Context: {conversation_transcript}

Current Skills and Levels:
{skills}

AVAILABLE DEPARTMENTS:
{departments}

CRITICAL SELECTION RULES:
1. Select 1-3 departments maximum (only high-confidence matches)
2. Quality over quantity - don't force 3 if fewer are appropriate
{foundational_rule}4. Consider student's interests, current skill level, and learning goals
5. Only select departments you're highly confident will benefit the student
6. Use department names EXACTLY as written in the list above

RESPONSE FORMAT:
Return ONLY a JSON array of department names, for example:
["Mathematics", "Physics", "Electrical_Engineering_and_Computer_Science"]

Analyze the student profile and select the most appropriate departments."#;

/// Rule 3 of stage 1. Replace: {departments}
pub const FOUNDATIONAL_RULE_TEMPLATE: &str = "3. MANDATORY: If student has low/beginner STEM skills but wants STEM field, MUST include foundational departments:\n{departments}\n";

/// Stage 2: course and prerequisite selection, one department at a time.
/// Replace: {department}, {advisor_description}, {conversation_transcript}, {skills}, {courses}
pub const COURSE_SELECTION_TEMPLATE: &str = r#"You are selecting specific courses from {department} department for a student based on their profile.

STUDENT PROFILE:
Advisor Assessment: {advisor_description}

Conversation Context: {conversation_transcript}

Current Skills and Levels:
{skills}

AVAILABLE COURSES IN {department}:
{courses}

SELECTION REQUIREMENTS:
1. Select courses that closely match student interests and goals
2. Consider skill level for difficulty appropriateness
3. For each selected course, identify ALL necessary prerequisites based on student's current skill level
4. CRITICAL: Prerequisites must be ACTUAL course titles from the available courses, not generic names
5. Prerequisite Logic:
   - Beginner STEM students: Include foundational courses (Precalculus, Calculus, Basic Physics, etc.)
   - Intermediate students: Some foundational courses, can skip very basics
   - Advanced students: Direct access to advanced courses with minimal prerequisites
6. Only select courses you're confident will benefit this specific student
7. Quality over quantity - better to select fewer, more relevant courses

RESPONSE FORMAT:
Return ONLY a JSON array of course objects:
[
  {
    "course_title": "Actual Course Title from List",
    "course_description": "Course description",
    "department": "{department}",
    "prerequisites": ["Prerequisite Course 1", "Prerequisite Course 2"]
  }
]

Select appropriate courses with complete prerequisite chains for this student."#;

/// Stage 3: roadmap assembly.
/// Replace: {profile_context}, {courses}
pub const ROADMAP_TEMPLATE: &str = r#"Create a structured learning roadmap from the selected courses and their prerequisites.

{profile_context}

COURSES WITH PREREQUISITES:
{courses}

ROADMAP REQUIREMENTS:
1. Analyze all courses and their prerequisite relationships
2. Create a level-based learning progression (Foundation → Intermediate → Advanced)
3. Ensure proper course sequencing - prerequisites must come before dependent courses
4. Group courses into logical learning levels
5. Estimate realistic timeframes for each level
6. Provide clear learning path summary

RESPONSE FORMAT:
Return ONLY a JSON object with this exact structure:
{
  "roadmap": {
    "levels": [
      {
        "level": 1,
        "level_name": "Foundation",
        "estimated_duration": "X months",
        "courses": [
          {
            "course_title": "Course Name",
            "description": "Course description",
            "department": "Department Name",
            "estimated_duration": "X weeks"
          }
        ]
      },
      {
        "level": 2,
        "level_name": "Intermediate",
        "estimated_duration": "X months",
        "courses": [...]
      },
      {
        "level": 3,
        "level_name": "Advanced",
        "estimated_duration": "X months",
        "courses": [...]
      }
    ]
  },
  "total_estimated_time": "X months/years",
  "learning_path_summary": "Comprehensive description of the complete learning journey and how courses build upon each other"
}

Create an optimal learning sequence with proper dependencies."#;
