//! Element kinds and the static kind table.
//!
//! Every behavior that differs between kinds (whether the element can hold
//! children, what it starts with, which fields the property panel shows) is
//! looked up here rather than branched on at call sites.

#[cfg(test)]
#[path = "kind_test.rs"]
mod kind_test;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Semantic type of a placed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// The page root. Never offered in the palette.
    Canvas,
    /// Generic block container.
    Container,
    /// Page section container.
    Section,
    /// Paragraph text.
    Text,
    /// Top-level heading.
    Heading,
    Button,
    Image,
    Link,
    Input,
}

/// Input widget the property panel should render for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldInput {
    Text,
    Url,
    TextArea,
}

/// One editable property shown by the property panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyField {
    /// Key in `ElementNode::properties`.
    pub key: &'static str,
    pub label: &'static str,
    pub input: FieldInput,
}

/// Row of the kind table.
#[derive(Debug)]
pub struct KindSpec {
    pub tag: &'static str,
    pub label: &'static str,
    pub container: bool,
    pub defaults: &'static [(&'static str, &'static str)],
    pub fields: &'static [PropertyField],
}

/// Placeholder source for freshly dropped images.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/300x200";

const COMMON_FIELDS: &[PropertyField] = &[
    PropertyField { key: "id", label: "ID", input: FieldInput::Text },
    PropertyField { key: "className", label: "Class Name", input: FieldInput::TextArea },
];

const TEXT_CONTENT: PropertyField = PropertyField { key: "textContent", label: "Text Content", input: FieldInput::Text };

const CONTAINER_FIELDS: &[PropertyField] = &[PropertyField {
    key: "padding",
    label: "Padding (e.g., 16px, 1rem, or leave empty)",
    input: FieldInput::Text,
}];

const CANVAS: KindSpec = KindSpec { tag: "div", label: "Canvas", container: true, defaults: &[], fields: &[] };

const CONTAINER: KindSpec =
    KindSpec { tag: "div", label: "Container", container: true, defaults: &[], fields: CONTAINER_FIELDS };

const SECTION: KindSpec =
    KindSpec { tag: "section", label: "Section", container: true, defaults: &[], fields: CONTAINER_FIELDS };

const TEXT: KindSpec = KindSpec {
    tag: "p",
    label: "Text",
    container: false,
    defaults: &[("textContent", "Text content")],
    fields: &[TEXT_CONTENT],
};

const HEADING: KindSpec = KindSpec {
    tag: "h1",
    label: "Heading",
    container: false,
    defaults: &[("textContent", "Heading")],
    fields: &[TEXT_CONTENT],
};

const BUTTON: KindSpec = KindSpec {
    tag: "button",
    label: "Button",
    container: false,
    defaults: &[("textContent", "Button")],
    fields: &[PropertyField { key: "textContent", label: "Button Text", input: FieldInput::Text }],
};

const IMAGE: KindSpec = KindSpec {
    tag: "img",
    label: "Image",
    container: false,
    defaults: &[("src", PLACEHOLDER_IMAGE_URL), ("alt", "Image")],
    fields: &[
        PropertyField { key: "src", label: "Image URL", input: FieldInput::Url },
        PropertyField { key: "alt", label: "Alt Text", input: FieldInput::Text },
    ],
};

const LINK: KindSpec = KindSpec {
    tag: "a",
    label: "Link",
    container: false,
    defaults: &[("href", "#"), ("textContent", "Link")],
    fields: &[
        PropertyField { key: "href", label: "URL", input: FieldInput::Url },
        PropertyField { key: "textContent", label: "Link Text", input: FieldInput::Text },
    ],
};

const INPUT: KindSpec = KindSpec {
    tag: "input",
    label: "Input",
    container: false,
    defaults: &[("type", "text"), ("placeholder", "Input field")],
    fields: &[PropertyField { key: "placeholder", label: "Placeholder", input: FieldInput::Text }],
};

impl ElementKind {
    /// Kinds offered by the component palette, in display order.
    pub const PALETTE: [ElementKind; 8] = [
        Self::Container,
        Self::Text,
        Self::Heading,
        Self::Button,
        Self::Image,
        Self::Link,
        Self::Input,
        Self::Section,
    ];

    #[must_use]
    pub fn spec(self) -> &'static KindSpec {
        match self {
            Self::Canvas => &CANVAS,
            Self::Container => &CONTAINER,
            Self::Section => &SECTION,
            Self::Text => &TEXT,
            Self::Heading => &HEADING,
            Self::Button => &BUTTON,
            Self::Image => &IMAGE,
            Self::Link => &LINK,
            Self::Input => &INPUT,
        }
    }

    /// Whether elements of this kind accept nested drops.
    #[must_use]
    pub fn is_container(self) -> bool {
        self.spec().container
    }

    /// HTML tag used to render this kind.
    #[must_use]
    pub fn tag(self) -> &'static str {
        self.spec().tag
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        self.spec().label
    }

    /// Property map a freshly created element of this kind starts with.
    #[must_use]
    pub fn default_properties(self) -> Map<String, Value> {
        self.spec()
            .defaults
            .iter()
            .map(|(k, v)| ((*k).to_string(), Value::String((*v).to_string())))
            .collect()
    }

    /// Fields the property panel renders: common fields first, then kind-specific ones.
    #[must_use]
    pub fn panel_fields(self) -> Vec<PropertyField> {
        if self == Self::Canvas {
            return Vec::new();
        }
        COMMON_FIELDS.iter().chain(self.spec().fields).copied().collect()
    }

    /// Map a palette `data-component-type` tag to a kind.
    ///
    /// `div` resolves to [`ElementKind::Container`]; the canvas is never a palette entry.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "div" => Some(Self::Container),
            "section" | "article" => Some(Self::Section),
            "p" => Some(Self::Text),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some(Self::Heading),
            "button" => Some(Self::Button),
            "img" => Some(Self::Image),
            "a" => Some(Self::Link),
            "input" => Some(Self::Input),
            _ => None,
        }
    }
}
