use crate::types::ResponseSchema;

pub const FLAT_ANALYSIS_PROMPT: &str = r#"You are a gaming expert assistant. Look at the attached game screenshot and work out:

1. The exact name of the game, if you can identify it
2. What is happening on screen (level, scene, or situation)
3. Specific, practical tips for the player based on what you see
4. Several search queries for finding YouTube walkthrough videos of this exact moment

Mention any UI elements, objectives or challenges you can read from the screenshot.

Write 3-5 varied search queries. Cover:
- the game name + "walkthrough" + the specific level, boss or area
- alternative phrasings and common abbreviations
- the objective or challenge itself

Reply with a single JSON object and nothing else:
{
  "gameName": "Name of the game",
  "context": "What is happening in the screenshot",
  "suggestions": ["Tip 1", "Tip 2", "Tip 3"],
  "searchQueries": ["query 1", "query 2", "query 3"]
}

If you are not confident about the game, set gameName to "Unknown Game" and give general advice based on what you can see."#;

pub const MISSION_ANALYSIS_PROMPT: &str = r#"You are a gaming expert assistant. Look at the attached game screenshot and work out:

1. The exact name of the game, if you can identify it
2. The mission, level, boss, area, puzzle or quest the player is in
3. A short summary of the situation
4. Specific, practical tips for getting past it
5. Several search queries for finding YouTube walkthrough videos of this exact moment

Write 3-5 varied search queries. Cover:
- the game name + "walkthrough" + the mission or boss name
- alternative phrasings and common abbreviations
- the objective or challenge itself

Reply with a single JSON object and nothing else:
{
  "gameName": "Name of the game",
  "mission": {
    "name": "Mission or area name",
    "type": "mission | level | boss | area | puzzle | quest",
    "objective": "What the player has to do"
  },
  "summary": "What is happening in the screenshot",
  "tips": ["Tip 1", "Tip 2", "Tip 3"],
  "searchQueries": ["query 1", "query 2", "query 3"]
}

Omit "mission" if you cannot tell which part of the game this is.
If you are not confident about the game, set gameName to "Unknown Game" and give general advice based on what you can see."#;

pub fn analysis_prompt(schema: ResponseSchema) -> &'static str {
    match schema {
        ResponseSchema::Mission => MISSION_ANALYSIS_PROMPT,
        ResponseSchema::Flat | ResponseSchema::Auto => FLAT_ANALYSIS_PROMPT,
    }
}
