//! Built-in assistant roles.
//!
//! A role selects the system prompt sent to the AI backend and is recorded
//! in each feature's metadata.

use serde::Serialize;

/// A named persona with its system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Role {
    /// Identifier used on the command line
    pub id: &'static str,

    /// Human-readable name
    pub name: &'static str,

    /// System prompt sent with every generation request
    pub system_prompt: &'static str,
}

/// Role used when none is specified.
pub const DEFAULT_ROLE: &str = "assistant";

static ROLES: &[Role] = &[
    Role {
        id: "assistant",
        name: "Helpful Assistant",
        system_prompt: "You are a helpful, harmless, and honest AI assistant. Provide clear, \
                        accurate, and concise responses.",
    },
    Role {
        id: "developer",
        name: "Software Developer",
        system_prompt: "You are an experienced software developer. Provide practical, \
                        well-structured code and technical explanations that follow \
                        established conventions.",
    },
    Role {
        id: "data-scientist",
        name: "Data Scientist",
        system_prompt: "You are a seasoned data scientist. Analyze data with statistical rigor, \
                        provide actionable insights and explain complex concepts clearly.",
    },
    Role {
        id: "writer",
        name: "Content Writer",
        system_prompt: "You are a professional content writer. Write clear, engaging and \
                        well-structured content for the target audience.",
    },
    Role {
        id: "teacher",
        name: "Patient Teacher",
        system_prompt: "You are a patient teacher. Explain concepts with examples and analogies \
                        and break complex topics into digestible parts.",
    },
    Role {
        id: "analyst",
        name: "Business Analyst",
        system_prompt: "You are a strategic business analyst. Provide data-driven insights and \
                        actionable recommendations.",
    },
    Role {
        id: "researcher",
        name: "Research Assistant",
        system_prompt: "You are a thorough research assistant. Provide accurate, well-sourced \
                        information and acknowledge the limits of what is known.",
    },
    Role {
        id: "debugger",
        name: "Code Debugger",
        system_prompt: "You are an expert debugger. Identify issues, explain root causes and \
                        propose clear fixes, considering edge cases.",
    },
    Role {
        id: "architect",
        name: "Software Architect",
        system_prompt: "You are a senior software architect. Design robust, maintainable systems \
                        and explain the trade-offs behind each decision.",
    },
    Role {
        id: "copywriter",
        name: "Marketing Copywriter",
        system_prompt: "You are a creative marketing copywriter. Write persuasive copy that \
                        fits the audience and brand voice.",
    },
    Role {
        id: "consultant",
        name: "Technical Consultant",
        system_prompt: "You are an experienced technical consultant. Advise on technology \
                        choices with business context and practical constraints in mind.",
    },
    Role {
        id: "reviewer",
        name: "Code Reviewer",
        system_prompt: "You are a thorough code reviewer. Review for correctness, efficiency \
                        and readability, and suggest concrete improvements.",
    },
];

/// All built-in roles, in display order.
pub fn all() -> &'static [Role] {
    ROLES
}

/// Look up a role by id (case-insensitive).
pub fn find(id: &str) -> Option<&'static Role> {
    ROLES.iter().find(|r| r.id.eq_ignore_ascii_case(id.trim()))
}

/// Look up a role, falling back to the default assistant.
pub fn resolve(id: &str) -> &'static Role {
    find(id).unwrap_or(&ROLES[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_role_exists() {
        assert_eq!(resolve(DEFAULT_ROLE).id, "assistant");
    }

    #[test]
    fn test_find_is_case_insensitive() {
        assert_eq!(find("Architect").map(|r| r.name), Some("Software Architect"));
        assert!(find("astronaut").is_none());
    }

    #[test]
    fn test_unknown_role_falls_back() {
        assert_eq!(resolve("astronaut").id, DEFAULT_ROLE);
    }

    #[test]
    fn test_role_ids_unique() {
        let mut ids: Vec<_> = all().iter().map(|r| r.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), all().len());
    }
}
