//! Natural-language element query parsing
//!
//! Turns loose phrases like `the blue "Sign in" button in the header` into a
//! structured [`ParsedQuery`] through keyword-to-taxonomy lookup plus light
//! pattern extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]+)"|'([^']+)'|“([^”]+)”"#).expect("static regex"));
static WORDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("static regex"));

/// Fixed element taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Button,
    Input,
    Link,
    Search,
    Login,
    Form,
    Menu,
    Image,
    Video,
    Any,
}

impl ElementType {
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Button => "button",
            ElementType::Input => "input",
            ElementType::Link => "link",
            ElementType::Search => "search",
            ElementType::Login => "login",
            ElementType::Form => "form",
            ElementType::Menu => "menu",
            ElementType::Image => "image",
            ElementType::Video => "video",
            ElementType::Any => "any",
        }
    }

    /// Keywords that select this type. Lookup order matters: the more
    /// specific intents (login, search) come before generic widgets.
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            ElementType::Login => &["login", "log in", "signin", "sign in", "sign-in", "logon"],
            ElementType::Search => &["search", "find", "lookup", "query"],
            ElementType::Button => &["button", "btn", "submit", "click", "press"],
            ElementType::Input => &[
                "input", "field", "textbox", "text box", "textarea", "enter", "type", "fill",
            ],
            ElementType::Link => &["link", "anchor", "href", "hyperlink"],
            ElementType::Form => &["form"],
            ElementType::Menu => &["menu", "nav", "navigation", "dropdown", "navbar"],
            ElementType::Image => &["image", "img", "picture", "photo", "logo", "icon"],
            ElementType::Video => &["video", "player", "movie"],
            ElementType::Any => &[],
        }
    }

    fn lookup_order() -> [ElementType; 9] {
        [
            ElementType::Login,
            ElementType::Search,
            ElementType::Button,
            ElementType::Input,
            ElementType::Link,
            ElementType::Form,
            ElementType::Menu,
            ElementType::Image,
            ElementType::Video,
        ]
    }

    /// Tags and roles known to represent this type
    pub fn selectors(&self) -> &'static [&'static str] {
        match self {
            ElementType::Button => &[
                "button",
                "input[type=\"button\"]",
                "input[type=\"submit\"]",
                "[role=\"button\"]",
            ],
            ElementType::Input => &[
                "input",
                "textarea",
                "[contenteditable=\"true\"]",
                "[role=\"textbox\"]",
            ],
            ElementType::Link => &["a[href]", "[role=\"link\"]"],
            ElementType::Search => &[
                "input[type=\"search\"]",
                "[role=\"search\"]",
                "[role=\"searchbox\"]",
                "input[name*=\"search\"]",
                "input[name=\"q\"]",
            ],
            ElementType::Login => &[
                "input[type=\"password\"]",
                "form[action*=\"login\"]",
                "button[type=\"submit\"]",
                "input[type=\"submit\"]",
            ],
            ElementType::Form => &["form", "[role=\"form\"]"],
            ElementType::Menu => &[
                "nav",
                "[role=\"menu\"]",
                "[role=\"menubar\"]",
                "[role=\"navigation\"]",
                "select",
            ],
            ElementType::Image => &["img", "svg", "picture", "[role=\"img\"]"],
            ElementType::Video => &["video", "iframe[src*=\"youtube\"]", "[role=\"video\"]"],
            ElementType::Any => &[],
        }
    }

    /// ARIA roles considered equivalent to this type
    pub fn roles(&self) -> &'static [&'static str] {
        match self {
            ElementType::Button => &["button"],
            ElementType::Input => &["textbox", "combobox", "spinbutton"],
            ElementType::Link => &["link"],
            ElementType::Search => &["search", "searchbox"],
            ElementType::Login => &["form", "button"],
            ElementType::Form => &["form"],
            ElementType::Menu => &["menu", "menubar", "menuitem", "navigation"],
            ElementType::Image => &["img", "image"],
            ElementType::Video => &["video"],
            ElementType::Any => &[],
        }
    }
}

/// Screen region hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionHint {
    Top,
    Bottom,
    Left,
    Right,
    Center,
    Header,
    Footer,
}

impl PositionHint {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "top" | "upper" => Some(PositionHint::Top),
            "bottom" | "lower" => Some(PositionHint::Bottom),
            "left" => Some(PositionHint::Left),
            "right" => Some(PositionHint::Right),
            "center" | "centre" | "middle" => Some(PositionHint::Center),
            "header" => Some(PositionHint::Header),
            "footer" => Some(PositionHint::Footer),
            _ => None,
        }
    }
}

const COLORS: &[&str] = &[
    "red", "green", "blue", "yellow", "orange", "purple", "black", "white", "gray", "grey", "pink",
];

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "on", "in", "at", "to", "of", "for", "with", "and", "or", "that", "this",
    "which", "is", "it", "its", "page", "element", "click", "find", "please", "me", "my", "from",
    "by", "into", "near", "called", "named", "labeled", "labelled",
];

const TYPE_NOUNS: &[&str] = &[
    "button", "btn", "link", "field", "input", "textbox", "box", "icon", "image", "img",
];

/// Structured form of a loose element query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub element_type: ElementType,
    pub terms: Vec<String>,
    pub target_text: Option<String>,
    pub color: Option<String>,
    pub position: Option<PositionHint>,
}

impl ParsedQuery {
    pub fn parse(query: &str) -> Self {
        let lower = query.to_lowercase();

        let target_text = QUOTED.captures(query).and_then(|caps| {
            caps.iter()
                .skip(1)
                .flatten()
                .next()
                .map(|m| m.as_str().trim().to_string())
                .filter(|text| !text.is_empty())
        });

        let words: Vec<String> = WORDS
            .find_iter(&lower)
            .map(|m| m.as_str().to_string())
            .collect();

        let element_type = ElementType::lookup_order()
            .into_iter()
            .find(|ty| {
                ty.keywords().iter().any(|keyword| {
                    if keyword.contains(' ') {
                        lower.contains(keyword)
                    } else {
                        words.iter().any(|word| word == keyword)
                    }
                })
            })
            .unwrap_or(ElementType::Any);

        let color = words
            .iter()
            .find(|word| COLORS.contains(&word.as_str()))
            .map(|word| if word == "grey" { "gray".to_string() } else { word.clone() });

        let position = words.iter().find_map(|word| PositionHint::from_word(word));

        let mut terms: Vec<String> = Vec::new();
        for word in &words {
            if word.chars().count() < 2
                || STOP_WORDS.contains(&word.as_str())
                || TYPE_NOUNS.contains(&word.as_str())
                || COLORS.contains(&word.as_str())
                || PositionHint::from_word(word).is_some()
            {
                continue;
            }
            if !terms.contains(word) {
                terms.push(word.clone());
            }
        }

        Self {
            element_type,
            terms,
            target_text,
            color,
            position,
        }
    }

    /// Fold extra context words into the term list
    pub fn with_context(mut self, context: Option<&str>) -> Self {
        if let Some(context) = context {
            let extra = ParsedQuery::parse(context);
            for term in extra.terms {
                if !self.terms.contains(&term) {
                    self.terms.push(term);
                }
            }
        }
        self
    }
}
