//! The prompt forwarded to the AI backend after a successful run.

use super::store::ArtifactKind;

const INSTRUCTIONS: &str = "\
Implement this request following the structured context above:

1. **Follow the Constitution**: adhere to the project principles
2. **Meet the Specification**: address every requirement and user story
3. **Execute the Plan**: build according to the technical plan
4. **Complete the Tasks**: work through the task list in order
5. **Document Progress**: update the implementation log as you go
";

/// Request plus every artifact, under its own heading.
pub fn enhanced_prompt(request: &str, role: &str, artifacts: &[(ArtifactKind, String)]) -> String {
    let context = artifacts
        .iter()
        .filter(|(_, content)| !content.trim().is_empty())
        .map(|(kind, content)| format!("### {}\n\n{}", heading(*kind), content.trim()))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    format!(
        "# Spec-Driven Development Request\n\n\
         You are working in spec-driven mode as **{role}**.\n\n\
         ## Original Request\n\n{request}\n\n\
         ## Structured Context\n\n{context}\n\n\
         ## Instructions\n\n{INSTRUCTIONS}"
    )
}

fn heading(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Constitution => "Constitution",
        ArtifactKind::Specification => "Specification",
        ArtifactKind::Plan => "Technical Plan",
        ArtifactKind::Tasks => "Tasks",
        ArtifactKind::Implementation => "Implementation Log",
        ArtifactKind::Clarifications => "Clarifications",
    }
}
