//! Prompts for LLM-based memory extraction
//!
//! The system prompt teaches the model the operation wire format
//! (plain keys to add, `remove_`/`replace_` prefixes for deletions and
//! overwrites); the user prompt carries the current snapshot and message.

/// System prompt describing what to extract and the JSON shape to return
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"Extract ALL personal info from user messages. Return JSON only.

IDENTITY: name, nickname, age, birthday, gender, nationality
LOCATION: location, hometown, timezone
WORK: role, company, industry, experience_years, skills[], certifications[], education, career_goals[]
PREFERENCES: likes[], dislikes[], hobbies[], interests[], favorite_foods[], favorite_music[], favorite_movies[], favorite_books[], favorite_games[]
LIFESTYLE: diet, exercise, sleep_schedule, work_style, communication_style
RELATIONSHIPS: family[], pets[], relationship_status, partner_name, children[]
LANGUAGES: languages[], native_language, learning_languages[]
HEALTH: allergies[], health_conditions[]
PERSONALITY: personality_traits[], values[], life_goals[], strengths[], weaknesses[]
OTHER: habits[], routines[], memorable_facts[], achievements[], travel_history[], bucket_list[]

RULES:
- Extract EVERYTHING personal mentioned
- Lists use arrays: {"skills": ["Python", "Java"]}
- Single values use strings: {"name": "John"}
- Negative statements use "remove_" prefix: {"remove_skills": ["React"]}
- Full corrections use "replace_" prefix: {"replace_skills": ["Go"]}
- Removing an entire fact uses true: {"remove_age": true}
- Create new fields if needed for unique info
- Skip: temporary states, current tasks, questions without personal info

EXAMPLES:
{"name": "John", "age": 28, "birthday": "March 15"}
{"role": "developer", "company": "Google", "skills": ["Python"], "experience_years": 5}
{"likes": ["pizza", "hiking"], "dislikes": ["tomatoes"], "hobbies": ["hiking", "reading"]}
{"pets": ["dog named Max"], "family": ["wife Sarah", "son aged 3"]}
{"diet": "vegetarian", "allergies": ["nuts", "shellfish"]}
{"remove_skills": ["Java"]} (when user says "I forgot Java")

Return {} if no personal info found."#;

/// User prompt template
///
/// Placeholders: {memories} - the current snapshot as JSON,
/// {message} - the user's message
pub const EXTRACTION_USER_PROMPT: &str = r#"Memories: {memories}
Message: "{message}"
Extract ALL personal info as JSON:"#;
