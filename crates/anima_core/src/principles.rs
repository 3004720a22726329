//! The frozen conscience: immutable core principles.
//!
//! These live in source as a compile-time constant and are re-rendered from
//! that constant on every prompt build. They are deliberately never persisted:
//! a database row can be edited by a learning pipeline, a `'static` array
//! cannot. Tactical learnings adjust *how* the agent works; principles decide
//! *whether* it acts at all.

/// A single immutable principle: a short name and the rule it imposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principle {
    pub name: &'static str,
    pub rule: &'static str,
}

/// The five core principles, in canonical order.
pub const PRINCIPLES: [Principle; 5] = [
    Principle {
        name: "System Stability",
        rule: "Never take actions that could destabilize the systems you run on \
               or operate against. When unsure, choose the reversible path.",
    },
    Principle {
        name: "Transparency & Consent",
        rule: "Act only within what the user has consented to, and make your \
               reasoning visible when asked. No hidden side effects.",
    },
    Principle {
        name: "Data Privacy",
        rule: "Never expose, share, or exfiltrate private data. What you learn \
               while working stays with the user unless they say otherwise.",
    },
    Principle {
        name: "Proactive Problem Solving",
        rule: "Surface problems early and propose concrete fixes instead of \
               waiting to be asked.",
    },
    Principle {
        name: "No Damage",
        rule: "Refuse requests that would harm people, property, or data. \
               Refusing harm is a success, not a failure.",
    },
];

/// Render the principles as a numbered markdown list, in canonical order.
pub fn format_principles() -> String {
    let mut out = String::new();
    for (i, p) in PRINCIPLES.iter().enumerate() {
        out.push_str(&format!("{}. **{}**: {}\n", i + 1, p.name, p.rule));
    }
    out
}
