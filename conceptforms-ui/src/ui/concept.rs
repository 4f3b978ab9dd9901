use serde::{Deserialize, Serialize};

use conceptforms_core::config::FormsConfig;
use conceptforms_core::query::{deserialize_identifier, QueryDocument};

// ─── Views ──────────────────────────────────────────────────────────────────

/// Who renders a view. Builtin views are assembled from [ViewElement]s by the
/// presentation layer; custom views bring their own code (`js`, `css`).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    #[default]
    Builtin,
    Custom,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChartData {
    pub datatype: String,
    #[serde(default)]
    pub coords: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Pie,
    Bar,
}

/// Building block of a builtin view.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ViewElement {
    Form,
    Chart { data: ChartData },
    #[serde(other)]
    Other,
}

impl ViewElement {
    /// Chart used to draw the element: decimal data as a line, choices as a pie
    /// when there are few categories and as bars otherwise.
    pub fn chart_kind(&self, config: &FormsConfig) -> Option<ChartKind> {
        match self {
            ViewElement::Chart { data } => match data.datatype.as_str() {
                "decimal" => Some(ChartKind::Line),
                "choice" if data.coords.len() <= config.pie_chart_max_categories => {
                    Some(ChartKind::Pie)
                }
                "choice" => Some(ChartKind::Bar),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ViewSpec {
    #[serde(alias = "tabname")]
    pub name: String,
    #[serde(rename = "type", default)]
    pub view_type: ViewType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js: Option<String>,
    #[serde(default)]
    pub elements: Vec<ViewElement>,
}

impl ViewSpec {
    pub fn builtin(name: &str, elements: Vec<ViewElement>) -> Self {
        ViewSpec {
            name: name.to_owned(),
            view_type: ViewType::Builtin,
            css: None,
            js: None,
            elements,
        }
    }

    pub fn custom(name: &str, js: &str) -> Self {
        ViewSpec {
            name: name.to_owned(),
            view_type: ViewType::Custom,
            css: None,
            js: Some(js.to_owned()),
            elements: Vec::new(),
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.view_type == ViewType::Builtin
    }
}

// ─── Concept ────────────────────────────────────────────────────────────────

/// Concept as delivered by the server: its views and, when it is already part
/// of the user's query, the query restricting it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Concept {
    #[serde(alias = "pk", deserialize_with = "deserialize_identifier")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub views: Vec<ViewSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryDocument>,
    /// Markup replacing the default commit control.
    #[serde(rename = "static", default, skip_serializing_if = "Option::is_none")]
    pub static_content: Option<String>,
}

impl Concept {
    pub fn new(id: &str, name: &str) -> Self {
        Concept {
            id: id.to_owned(),
            name: name.to_owned(),
            views: Vec::new(),
            query: None,
            static_content: None,
        }
    }

    pub fn with_view(mut self, view: ViewSpec) -> Self {
        self.views.push(view);
        self
    }

    pub fn with_query(mut self, query: QueryDocument) -> Self {
        self.query = Some(query);
        self
    }

    /// All views are builtin; the framework then owns the commit control.
    pub fn is_builtin(&self) -> bool {
        self.views.iter().all(|view| view.is_builtin())
    }

    pub fn tab_names(&self) -> Vec<String> {
        self.views.iter().map(|view| view.name.clone()).collect()
    }

    pub fn from_json(json: &str) -> Result<Self, conceptforms_core::Error> {
        serde_json::from_str(json).map_err(|e| conceptforms_core::Error::parse_error("concept", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_server_concept() -> Result<(), Box<dyn std::error::Error>> {
        let concept = Concept::from_json(
            &json!({
                "pk": 7,
                "name": "Age",
                "views": [
                    {"tabname": "Form", "type": "builtin", "elements": [{"type": "form", "fields": [12]}]},
                    {"tabname": "Plot", "type": "custom", "js": "plot.js", "css": "plot.css"}
                ],
                "query": {"operator": "exact", "id": 12, "value": 3, "concept_id": 7}
            })
            .to_string(),
        )?;
        assert_eq!(concept.id, "7");
        assert_eq!(concept.tab_names(), vec!["Form", "Plot"]);
        assert_eq!(concept.views[0].elements, vec![ViewElement::Form]);
        assert_eq!(concept.views[1].view_type, ViewType::Custom);
        assert!(!concept.is_builtin());
        assert!(concept.query.is_some());
        Ok(())
    }

    #[test]
    fn chart_kinds() -> Result<(), Box<dyn std::error::Error>> {
        let config = FormsConfig::default();
        let chart = |datatype: &str, n: usize| ViewElement::Chart {
            data: ChartData {
                datatype: datatype.to_owned(),
                coords: vec![json!(0); n],
            },
        };
        assert_eq!(chart("decimal", 10).chart_kind(&config), Some(ChartKind::Line));
        assert_eq!(chart("choice", 3).chart_kind(&config), Some(ChartKind::Pie));
        assert_eq!(chart("choice", 4).chart_kind(&config), Some(ChartKind::Bar));
        assert_eq!(chart("date", 4).chart_kind(&config), None);
        assert_eq!(ViewElement::Form.chart_kind(&config), None);
        Ok(())
    }

    #[test]
    fn unknown_elements_are_kept_as_other() -> Result<(), Box<dyn std::error::Error>> {
        let view: ViewSpec = serde_json::from_value(json!({
            "name": "Map",
            "elements": [{"type": "map", "zoom": 3}]
        }))?;
        assert_eq!(view.elements, vec![ViewElement::Other]);
        assert!(view.is_builtin());
        Ok(())
    }
}
