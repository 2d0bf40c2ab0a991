//! Block type registry.
//!
//! The palette is a closed set: every block a document may reference is a
//! `BlockKind` variant, mapped at compile time to its canonical name, its
//! default props and whether it accepts children. Documents written before
//! the `…Block` naming convention use the short legacy names; those resolve
//! through a fixed alias table consulted before the main lookup.

use crate::model::Props;
use serde_json::{Value, json};
use std::fmt;

/// Every block the editor palette can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockKind {
    Container,
    Text,
    Heading,
    Button,
    Image,
    Video,
    Link,
    Divider,
    Spacer,
    Icon,
    List,
    Grid,
    Flexbox,
    Tabs,
    Accordion,
    Carousel,
    Form,
    Input,
}

/// Static description of one block kind.
#[derive(Debug)]
pub struct BlockSpec {
    pub kind: BlockKind,
    /// Canonical `resolvedName` written into serialized documents.
    pub name: &'static str,
    /// Label shown in layer views when a node has no custom display name.
    pub display_name: &'static str,
    /// Whether nodes of this kind may contain children.
    pub is_canvas: bool,
    default_props: fn() -> Value,
}

impl BlockSpec {
    /// A fresh copy of this block's default property bag.
    pub fn default_props(&self) -> Props {
        match (self.default_props)() {
            Value::Object(map) => map,
            _ => Props::new(),
        }
    }
}

static SPECS: &[BlockSpec] = &[
    BlockSpec {
        kind: BlockKind::Container,
        name: "ContainerBlock",
        display_name: "Container",
        is_canvas: true,
        default_props: || {
            json!({
                "background": "#ffffff",
                "padding": [20, 20, 20, 20],
                "margin": [0, 0, 0, 0],
                "width": "100%",
                "minHeight": "200px",
                "flexDirection": "column",
            })
        },
    },
    BlockSpec {
        kind: BlockKind::Text,
        name: "TextBlock",
        display_name: "Text",
        is_canvas: false,
        default_props: || json!({ "text": "Edit me", "fontSize": 16, "color": "#1f2937", "textAlign": "left" }),
    },
    BlockSpec {
        kind: BlockKind::Heading,
        name: "HeadingBlock",
        display_name: "Heading",
        is_canvas: false,
        default_props: || json!({ "text": "Heading", "level": 2, "color": "#111827", "fontWeight": "700" }),
    },
    BlockSpec {
        kind: BlockKind::Button,
        name: "ButtonBlock",
        display_name: "Button",
        is_canvas: false,
        default_props: || {
            json!({
                "text": "Click me",
                "href": "",
                "variant": "primary",
                "background": "#2563eb",
                "color": "#ffffff",
                "borderRadius": 6,
            })
        },
    },
    BlockSpec {
        kind: BlockKind::Image,
        name: "ImageBlock",
        display_name: "Image",
        is_canvas: false,
        default_props: || json!({ "src": "", "alt": "", "width": "100%", "objectFit": "cover" }),
    },
    BlockSpec {
        kind: BlockKind::Video,
        name: "VideoBlock",
        display_name: "Video",
        is_canvas: false,
        default_props: || json!({ "src": "", "autoplay": false, "controls": true, "width": "100%" }),
    },
    BlockSpec {
        kind: BlockKind::Link,
        name: "LinkBlock",
        display_name: "Link",
        is_canvas: false,
        default_props: || json!({ "text": "Link", "href": "#", "target": "_self" }),
    },
    BlockSpec {
        kind: BlockKind::Divider,
        name: "DividerBlock",
        display_name: "Divider",
        is_canvas: false,
        default_props: || json!({ "color": "#e5e7eb", "thickness": 1 }),
    },
    BlockSpec {
        kind: BlockKind::Spacer,
        name: "SpacerBlock",
        display_name: "Spacer",
        is_canvas: false,
        default_props: || json!({ "height": 32 }),
    },
    BlockSpec {
        kind: BlockKind::Icon,
        name: "IconBlock",
        display_name: "Icon",
        is_canvas: false,
        default_props: || json!({ "icon": "star", "size": 24, "color": "#111827" }),
    },
    BlockSpec {
        kind: BlockKind::List,
        name: "ListBlock",
        display_name: "List",
        is_canvas: false,
        default_props: || json!({ "items": ["First item", "Second item"], "ordered": false }),
    },
    BlockSpec {
        kind: BlockKind::Grid,
        name: "GridBlock",
        display_name: "Grid",
        is_canvas: true,
        default_props: || json!({ "columns": 2, "gap": 16, "padding": [10, 10, 10, 10] }),
    },
    BlockSpec {
        kind: BlockKind::Flexbox,
        name: "FlexboxBlock",
        display_name: "Flexbox",
        is_canvas: true,
        default_props: || {
            json!({
                "flexDirection": "row",
                "justifyContent": "flex-start",
                "alignItems": "stretch",
                "gap": 12,
                "wrap": false,
            })
        },
    },
    BlockSpec {
        kind: BlockKind::Tabs,
        name: "TabsBlock",
        display_name: "Tabs",
        is_canvas: true,
        default_props: || json!({ "tabs": ["Tab 1", "Tab 2"], "activeTab": 0 }),
    },
    BlockSpec {
        kind: BlockKind::Accordion,
        name: "AccordionBlock",
        display_name: "Accordion",
        is_canvas: true,
        default_props: || {
            json!({
                "items": [
                    { "title": "Section 1", "content": "Content 1" },
                    { "title": "Section 2", "content": "Content 2" },
                ],
                "allowMultiple": false,
            })
        },
    },
    BlockSpec {
        kind: BlockKind::Carousel,
        name: "CarouselBlock",
        display_name: "Carousel",
        is_canvas: true,
        default_props: || json!({ "slides": [], "autoplay": true, "interval": 5000, "showDots": true }),
    },
    BlockSpec {
        kind: BlockKind::Form,
        name: "FormBlock",
        display_name: "Form",
        is_canvas: true,
        default_props: || json!({ "action": "", "method": "post", "submitText": "Submit" }),
    },
    BlockSpec {
        kind: BlockKind::Input,
        name: "InputBlock",
        display_name: "Input",
        is_canvas: false,
        default_props: || json!({ "label": "Label", "name": "field", "inputType": "text", "placeholder": "", "required": false }),
    },
];

/// Legacy short names → canonical kind. Static and explicit; no fuzzy matching.
static ALIASES: &[(&str, BlockKind)] = &[
    ("Container", BlockKind::Container),
    ("Text", BlockKind::Text),
    ("Heading", BlockKind::Heading),
    ("Button", BlockKind::Button),
    ("Image", BlockKind::Image),
    ("Video", BlockKind::Video),
    ("Link", BlockKind::Link),
    ("Divider", BlockKind::Divider),
    ("Spacer", BlockKind::Spacer),
    ("Icon", BlockKind::Icon),
    ("List", BlockKind::List),
    ("Grid", BlockKind::Grid),
    ("Flexbox", BlockKind::Flexbox),
    ("FlexBox", BlockKind::Flexbox),
    ("Tabs", BlockKind::Tabs),
    ("Accordion", BlockKind::Accordion),
    ("Carousel", BlockKind::Carousel),
    ("Form", BlockKind::Form),
    ("Input", BlockKind::Input),
];

impl BlockKind {
    pub const ALL: [BlockKind; 18] = [
        BlockKind::Container,
        BlockKind::Text,
        BlockKind::Heading,
        BlockKind::Button,
        BlockKind::Image,
        BlockKind::Video,
        BlockKind::Link,
        BlockKind::Divider,
        BlockKind::Spacer,
        BlockKind::Icon,
        BlockKind::List,
        BlockKind::Grid,
        BlockKind::Flexbox,
        BlockKind::Tabs,
        BlockKind::Accordion,
        BlockKind::Carousel,
        BlockKind::Form,
        BlockKind::Input,
    ];

    /// The static spec for this kind.
    pub fn spec(self) -> &'static BlockSpec {
        // SPECS is declared in enum order.
        &SPECS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn is_canvas(self) -> bool {
        self.spec().is_canvas
    }

    /// Short prefix for generated node ids (`text_3`).
    pub fn id_prefix(self) -> &'static str {
        match self {
            BlockKind::Container => "container",
            BlockKind::Text => "text",
            BlockKind::Heading => "heading",
            BlockKind::Button => "button",
            BlockKind::Image => "image",
            BlockKind::Video => "video",
            BlockKind::Link => "link",
            BlockKind::Divider => "divider",
            BlockKind::Spacer => "spacer",
            BlockKind::Icon => "icon",
            BlockKind::List => "list",
            BlockKind::Grid => "grid",
            BlockKind::Flexbox => "flex",
            BlockKind::Tabs => "tabs",
            BlockKind::Accordion => "accordion",
            BlockKind::Carousel => "carousel",
            BlockKind::Form => "form",
            BlockKind::Input => "input",
        }
    }

    /// The outer HTML element used by structural (static) renderers.
    pub fn html_tag(self) -> &'static str {
        match self {
            BlockKind::Text => "p",
            BlockKind::Heading => "h2",
            BlockKind::Button => "button",
            BlockKind::Image => "img",
            BlockKind::Video => "video",
            BlockKind::Link => "a",
            BlockKind::Divider => "hr",
            BlockKind::List => "ul",
            BlockKind::Form => "form",
            BlockKind::Input => "input",
            BlockKind::Icon => "span",
            BlockKind::Container
            | BlockKind::Spacer
            | BlockKind::Grid
            | BlockKind::Flexbox
            | BlockKind::Tabs
            | BlockKind::Accordion
            | BlockKind::Carousel => "div",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve a `resolvedName` (canonical or legacy alias) to its spec.
///
/// Returns `None` for names outside the palette; callers treat that as a
/// recoverable condition and keep the node as an unresolved placeholder.
pub fn resolve(type_name: &str) -> Option<&'static BlockSpec> {
    if let Some((_, kind)) = ALIASES.iter().find(|(alias, _)| *alias == type_name) {
        return Some(kind.spec());
    }
    SPECS.iter().find(|spec| spec.name == type_name)
}

/// Every palette block, in palette order.
pub fn all() -> &'static [BlockSpec] {
    SPECS
}

/// Whether `type_name` is a legacy alias rather than a canonical name.
pub fn is_legacy_alias(type_name: &str) -> bool {
    ALIASES.iter().any(|(alias, _)| *alias == type_name)
}
