//! Prompt text sent to the language model.
//!
//! Answers are decoded by [`crate::core::sanitizer`], so the prompts only
//! need to steer the model toward a JSON list; they do not rely on the model
//! following the format exactly.

use crate::models::episode::CanonicalEpisode;

/// Prompt asking the model to split an anthology title into episode segments.
pub fn anthology_prompt(
    show: &str,
    season: u16,
    filename: &str,
    episodes: &[CanonicalEpisode],
) -> String {
    let listing = episodes
        .iter()
        .map(|ep| format!("- S{:02}E{:02}: {}", ep.season, ep.episode, ep.title))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You split TV filenames that contain several episodes into their episode titles.

Show: {show}
Season: {season}
Filename: {filename}

Known episodes of this season:
{listing}

Return a JSON list with one object per episode contained in the filename, in the order they appear:
[{{"episode": "S01E01", "title": "<exact title from the list above>"}}]

Rules:
- Use titles exactly as written in the list above
- Only include episodes that are really in the filename
- Return only the JSON list, no explanation"#
    )
}

/// Prompt asking the model to pick the intended title among candidates.
pub fn disambiguation_prompt(show: &str, segment: &str, candidates: &[String]) -> String {
    let listing = candidates
        .iter()
        .map(|c| format!("- {}", c))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"A filename of the show "{show}" refers to the episode title "{segment}".

Which of these canonical titles does it mean?
{listing}

Return a JSON list containing the matching titles copied exactly, best match first.
Return [] if none of them match. Return only the JSON list."#
    )
}
