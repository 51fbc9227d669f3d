//! ARIA Support
//!
//! Role parsing and the implicit-role table used by local inspection.

use lens_dom::{Document, NodeId};

/// ARIA role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AriaRole {
    // Landmark roles
    Banner,
    Complementary,
    ContentInfo,
    Form,
    Main,
    Navigation,
    Region,
    Search,

    // Widget roles
    Alert,
    AlertDialog,
    Button,
    Checkbox,
    ComboBox,
    Dialog,
    GridCell,
    Link,
    ListBox,
    Menu,
    MenuBar,
    MenuItem,
    MenuItemCheckbox,
    MenuItemRadio,
    Option,
    ProgressBar,
    Radio,
    RadioGroup,
    ScrollBar,
    SearchBox,
    Slider,
    SpinButton,
    Status,
    Switch,
    Tab,
    TabList,
    TabPanel,
    TextBox,
    ToolTip,
    Tree,
    TreeGrid,
    TreeItem,

    // Document structure
    Article,
    Cell,
    ColumnHeader,
    Figure,
    Generic,
    Grid,
    Group,
    Heading,
    Img,
    List,
    ListItem,
    Meter,
    Paragraph,
    Presentation,
    Row,
    RowGroup,
    RowHeader,
    Separator,
    Table,
    Toolbar,
}

impl AriaRole {
    /// Parse a single role token
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_lowercase().as_str() {
            "banner" => Self::Banner,
            "complementary" => Self::Complementary,
            "contentinfo" => Self::ContentInfo,
            "form" => Self::Form,
            "main" => Self::Main,
            "navigation" => Self::Navigation,
            "region" => Self::Region,
            "search" => Self::Search,
            "alert" => Self::Alert,
            "alertdialog" => Self::AlertDialog,
            "button" => Self::Button,
            "checkbox" => Self::Checkbox,
            "combobox" => Self::ComboBox,
            "dialog" => Self::Dialog,
            "gridcell" => Self::GridCell,
            "link" => Self::Link,
            "listbox" => Self::ListBox,
            "menu" => Self::Menu,
            "menubar" => Self::MenuBar,
            "menuitem" => Self::MenuItem,
            "menuitemcheckbox" => Self::MenuItemCheckbox,
            "menuitemradio" => Self::MenuItemRadio,
            "option" => Self::Option,
            "progressbar" => Self::ProgressBar,
            "radio" => Self::Radio,
            "radiogroup" => Self::RadioGroup,
            "scrollbar" => Self::ScrollBar,
            "searchbox" => Self::SearchBox,
            "slider" => Self::Slider,
            "spinbutton" => Self::SpinButton,
            "status" => Self::Status,
            "switch" => Self::Switch,
            "tab" => Self::Tab,
            "tablist" => Self::TabList,
            "tabpanel" => Self::TabPanel,
            "textbox" => Self::TextBox,
            "tooltip" => Self::ToolTip,
            "tree" => Self::Tree,
            "treegrid" => Self::TreeGrid,
            "treeitem" => Self::TreeItem,
            "article" => Self::Article,
            "cell" => Self::Cell,
            "columnheader" => Self::ColumnHeader,
            "figure" => Self::Figure,
            "generic" => Self::Generic,
            "grid" => Self::Grid,
            "group" => Self::Group,
            "heading" => Self::Heading,
            "img" | "image" => Self::Img,
            "list" => Self::List,
            "listitem" => Self::ListItem,
            "meter" => Self::Meter,
            "paragraph" => Self::Paragraph,
            "none" | "presentation" => Self::Presentation,
            "row" => Self::Row,
            "rowgroup" => Self::RowGroup,
            "rowheader" => Self::RowHeader,
            "separator" => Self::Separator,
            "table" => Self::Table,
            "toolbar" => Self::Toolbar,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Banner => "banner",
            Self::Complementary => "complementary",
            Self::ContentInfo => "contentinfo",
            Self::Form => "form",
            Self::Main => "main",
            Self::Navigation => "navigation",
            Self::Region => "region",
            Self::Search => "search",
            Self::Alert => "alert",
            Self::AlertDialog => "alertdialog",
            Self::Button => "button",
            Self::Checkbox => "checkbox",
            Self::ComboBox => "combobox",
            Self::Dialog => "dialog",
            Self::GridCell => "gridcell",
            Self::Link => "link",
            Self::ListBox => "listbox",
            Self::Menu => "menu",
            Self::MenuBar => "menubar",
            Self::MenuItem => "menuitem",
            Self::MenuItemCheckbox => "menuitemcheckbox",
            Self::MenuItemRadio => "menuitemradio",
            Self::Option => "option",
            Self::ProgressBar => "progressbar",
            Self::Radio => "radio",
            Self::RadioGroup => "radiogroup",
            Self::ScrollBar => "scrollbar",
            Self::SearchBox => "searchbox",
            Self::Slider => "slider",
            Self::SpinButton => "spinbutton",
            Self::Status => "status",
            Self::Switch => "switch",
            Self::Tab => "tab",
            Self::TabList => "tablist",
            Self::TabPanel => "tabpanel",
            Self::TextBox => "textbox",
            Self::ToolTip => "tooltip",
            Self::Tree => "tree",
            Self::TreeGrid => "treegrid",
            Self::TreeItem => "treeitem",
            Self::Article => "article",
            Self::Cell => "cell",
            Self::ColumnHeader => "columnheader",
            Self::Figure => "figure",
            Self::Generic => "generic",
            Self::Grid => "grid",
            Self::Group => "group",
            Self::Heading => "heading",
            Self::Img => "img",
            Self::List => "list",
            Self::ListItem => "listitem",
            Self::Meter => "meter",
            Self::Paragraph => "paragraph",
            Self::Presentation => "presentation",
            Self::Row => "row",
            Self::RowGroup => "rowgroup",
            Self::RowHeader => "rowheader",
            Self::Separator => "separator",
            Self::Table => "table",
            Self::Toolbar => "toolbar",
        }
    }

    /// Roles whose accessible name may come from their text content
    pub fn name_from_content(&self) -> bool {
        matches!(
            self,
            Self::Button
                | Self::Cell
                | Self::Checkbox
                | Self::ColumnHeader
                | Self::GridCell
                | Self::Heading
                | Self::Link
                | Self::MenuItem
                | Self::MenuItemCheckbox
                | Self::MenuItemRadio
                | Self::Option
                | Self::Radio
                | Self::Row
                | Self::RowHeader
                | Self::Switch
                | Self::Tab
                | Self::ToolTip
                | Self::TreeItem
        )
    }

    /// Roles that expose a current value
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            Self::Meter | Self::ProgressBar | Self::ScrollBar | Self::Slider | Self::SpinButton
        )
    }

    /// Roles that carry `checked`
    pub fn is_checkable(&self) -> bool {
        matches!(
            self,
            Self::Checkbox | Self::MenuItemCheckbox | Self::MenuItemRadio | Self::Radio | Self::Switch
        )
    }

    /// Roles that group their descendants for the `group` field
    pub fn is_grouping(&self) -> bool {
        matches!(self, Self::Group | Self::RadioGroup)
    }
}

/// First recognised token of an explicit `role` attribute
pub fn explicit_role(doc: &Document, element: NodeId) -> Option<AriaRole> {
    doc.attribute(element, "role")?
        .split_whitespace()
        .find_map(AriaRole::parse)
}

/// Role an element has without an explicit `role` attribute
pub fn implicit_role(doc: &Document, element: NodeId) -> Option<AriaRole> {
    let tag = doc.tag_name(element)?;
    let input_type = doc
        .attribute(element, "type")
        .map(|t| t.trim().to_ascii_lowercase())
        .unwrap_or_default();

    Some(match tag {
        "a" | "area" if doc.has_attribute(element, "href") => AriaRole::Link,
        "a" | "area" => AriaRole::Generic,
        "article" => AriaRole::Article,
        "aside" => AriaRole::Complementary,
        "button" => AriaRole::Button,
        "details" | "fieldset" | "optgroup" => AriaRole::Group,
        "dialog" => AriaRole::Dialog,
        "div" | "span" | "section" | "header" | "footer" | "b" | "i" | "small" => AriaRole::Generic,
        "figure" => AriaRole::Figure,
        "form" => AriaRole::Form,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => AriaRole::Heading,
        "hr" => AriaRole::Separator,
        "img" => match doc.attribute(element, "alt") {
            Some(alt) if alt.is_empty() => AriaRole::Presentation,
            _ => AriaRole::Img,
        },
        "input" => match input_type.as_str() {
            "button" | "submit" | "reset" | "image" => AriaRole::Button,
            "checkbox" => AriaRole::Checkbox,
            "radio" => AriaRole::Radio,
            "range" => AriaRole::Slider,
            "number" => AriaRole::SpinButton,
            "search" if !doc.has_attribute(element, "list") => AriaRole::SearchBox,
            "hidden" => return None,
            _ if doc.has_attribute(element, "list") => AriaRole::ComboBox,
            _ => AriaRole::TextBox,
        },
        "li" => AriaRole::ListItem,
        "main" => AriaRole::Main,
        "menu" | "ol" | "ul" => AriaRole::List,
        "meter" => AriaRole::Meter,
        "nav" => AriaRole::Navigation,
        "option" => AriaRole::Option,
        "p" => AriaRole::Paragraph,
        "progress" => AriaRole::ProgressBar,
        "select" => {
            let size = doc
                .attribute(element, "size")
                .and_then(|s| s.trim().parse::<u32>().ok())
                .unwrap_or(0);
            if doc.has_attribute(element, "multiple") || size > 1 {
                AriaRole::ListBox
            } else {
                AriaRole::ComboBox
            }
        }
        "table" => AriaRole::Table,
        "tbody" | "thead" | "tfoot" => AriaRole::RowGroup,
        "td" => AriaRole::Cell,
        "textarea" => AriaRole::TextBox,
        "th" => AriaRole::ColumnHeader,
        "tr" => AriaRole::Row,
        _ => return None,
    })
}

/// Effective role: explicit first, implicit otherwise
pub fn effective_role(doc: &Document, element: NodeId) -> Option<AriaRole> {
    explicit_role(doc, element).or_else(|| implicit_role(doc, element))
}

/// `<select multiple>` or a listbox with `aria-multiselectable="true"`
pub fn is_multi_select(doc: &Document, element: NodeId) -> bool {
    match doc.tag_name(element) {
        Some("select") => doc.has_attribute(element, "multiple"),
        Some(_) => {
            effective_role(doc, element) == Some(AriaRole::ListBox)
                && doc.attribute(element, "aria-multiselectable") == Some("true")
        }
        None => false,
    }
}

/// Native `<input type=checkbox>`
pub fn is_native_checkbox(doc: &Document, element: NodeId) -> bool {
    doc.tag_name(element) == Some("input")
        && doc
            .attribute(element, "type")
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("checkbox"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(AriaRole::parse("button"), Some(AriaRole::Button));
        assert_eq!(AriaRole::parse("RadioGroup"), Some(AriaRole::RadioGroup));
        assert_eq!(AriaRole::parse("none"), Some(AriaRole::Presentation));
        assert_eq!(AriaRole::parse("widget"), None);
        assert!(AriaRole::Button.name_from_content());
        assert!(!AriaRole::TextBox.name_from_content());
    }

    #[test]
    fn test_explicit_role_skips_unknown_tokens() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.set_attribute(div, "role", "fancy switch").unwrap();
        assert_eq!(explicit_role(&doc, div), Some(AriaRole::Switch));
        assert_eq!(effective_role(&doc, div), Some(AriaRole::Switch));
    }

    #[test]
    fn test_implicit_roles() {
        let mut doc = Document::new();
        let checkbox = doc.create_element("input");
        doc.set_attribute(checkbox, "type", "Checkbox").unwrap();
        let link = doc.create_element("a");
        doc.set_attribute(link, "href", "/home").unwrap();
        let select = doc.create_element("select");
        doc.set_attribute(select, "multiple", "").unwrap();
        let text = doc.create_element("input");

        assert_eq!(implicit_role(&doc, checkbox), Some(AriaRole::Checkbox));
        assert_eq!(implicit_role(&doc, link), Some(AriaRole::Link));
        assert_eq!(implicit_role(&doc, select), Some(AriaRole::ListBox));
        assert_eq!(implicit_role(&doc, text), Some(AriaRole::TextBox));
        assert!(is_multi_select(&doc, select));
        assert!(is_native_checkbox(&doc, checkbox));
    }
}
