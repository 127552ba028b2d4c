pub fn build_extraction_prompt(chunk_text: &str) -> String {
    format!(
        r#"You are a top-tier algorithm designed for extracting information in structured formats to build a knowledge graph.

INSTRUCTIONS:
1. Identify the entities (nodes) mentioned in the text: people, groups, organizations, platforms, tools, concepts, features
2. Identify the relationships between those entities
3. Output ONLY valid JSON, nothing else
4. Use the exact schema below

SCHEMA:
{{
  "nodes": [
    {{"id": "Human readable entity name", "type": "EntityType", "properties": {{}}}}
  ],
  "relationships": [
    {{"source": "source node id", "source_type": "EntityType", "target": "target node id", "target_type": "EntityType", "type": "RELATION_TYPE"}}
  ]
}}

RULES:
- Node ids are human readable names taken from the text, never integers or placeholders
- Always refer to the same entity with the same id
- Node types are basic, general labels such as Person, Group, Platform, Tool, Concept
- Relationship types are UPPER_SNAKE_CASE verbs such as USED_BY, PROVIDED_BY, NEED_HELP_WITH
- Every relationship source and target must appear in "nodes"
- Output ONLY the JSON object, no markdown, no explanations

TEXT:
{}

JSON OUTPUT:"#,
        chunk_text
    )
}

pub fn build_retry_prompt(invalid_json: &str) -> String {
    format!(
        r#"The following JSON is invalid:

{}

Fix this JSON. Output only valid JSON with no markdown formatting, no code blocks, no explanations. Just the raw JSON object."#,
        invalid_json
    )
}
