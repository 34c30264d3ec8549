use serde_json::Value;

use crate::chat::ContentItem;

type ShapeMatcher = fn(&Value) -> Option<Vec<ContentItem>>;

/// One known layout of a flow run response.
///
/// The flow's output shape depends on which component produced the terminal
/// output, so shapes are probed in order and the first match wins.
#[derive(Clone, Copy)]
pub struct ResponseShape {
    pub name: &'static str,
    matcher: ShapeMatcher,
}

impl ResponseShape {
    pub fn extract(&self, response: &Value) -> Option<Vec<ContentItem>> {
        (self.matcher)(response)
    }
}

impl std::fmt::Debug for ResponseShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseShape")
            .field("name", &self.name)
            .finish()
    }
}

pub const RESPONSE_SHAPES: &[ResponseShape] = &[
    ResponseShape {
        name: "error",
        matcher: match_error,
    },
    ResponseShape {
        name: "results_message_text",
        matcher: match_results_message_text,
    },
    ResponseShape {
        name: "results_message_image",
        matcher: match_results_message_image,
    },
    ResponseShape {
        name: "message_text",
        matcher: match_message_text,
    },
    ResponseShape {
        name: "component_outputs",
        matcher: match_component_outputs,
    },
];

pub const UNRECOGNIZED_SHAPE: &str = "unrecognized";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedResponse {
    pub shape: &'static str,
    pub items: Vec<ContentItem>,
}

/// Extracts displayable content from a flow response. Never returns an
/// empty item list: an unrecognized payload yields a single error item
/// carrying the raw response.
pub fn normalize_response(response: &Value) -> NormalizedResponse {
    RESPONSE_SHAPES
        .iter()
        .find_map(|shape| {
            shape.extract(response).map(|items| NormalizedResponse {
                shape: shape.name,
                items,
            })
        })
        .unwrap_or_else(|| NormalizedResponse {
            shape: UNRECOGNIZED_SHAPE,
            items: vec![unrecognized_item(response)],
        })
}

fn match_error(response: &Value) -> Option<Vec<ContentItem>> {
    let error = response.as_object()?.get("error")?;
    let message = match error {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    Some(vec![ContentItem::Error(message)])
}

fn match_results_message_text(response: &Value) -> Option<Vec<ContentItem>> {
    let text = first_component(response)?
        .get("results")?
        .get("message")?
        .get("text")
        .and_then(non_empty_str)?;
    Some(vec![ContentItem::text(text)])
}

fn match_results_message_image(response: &Value) -> Option<Vec<ContentItem>> {
    let image = first_component(response)?
        .get("results")?
        .get("message")?
        .get("image")
        .and_then(non_empty_str)?;
    Some(vec![ContentItem::image(image)])
}

fn match_message_text(response: &Value) -> Option<Vec<ContentItem>> {
    let text = first_component(response)?
        .get("message")?
        .get("text")
        .and_then(non_empty_str)?;
    Some(vec![ContentItem::text(text)])
}

fn match_component_outputs(response: &Value) -> Option<Vec<ContentItem>> {
    let rows = first_component(response)?.get("outputs")?.as_array()?;
    let items = rows
        .iter()
        .filter_map(classify_output_row)
        .collect::<Vec<ContentItem>>();
    if items.is_empty() {
        return None;
    }
    Some(items)
}

fn classify_output_row(row: &Value) -> Option<ContentItem> {
    match row {
        Value::String(text) => Some(ContentItem::text(text)),
        Value::Object(obj) => {
            if let Some(text) = obj
                .get("message")
                .and_then(|message| message.get("text"))
                .and_then(Value::as_str)
            {
                return Some(ContentItem::text(text));
            }
            obj.get("image").and_then(Value::as_str).map(ContentItem::image)
        }
        _ => None,
    }
}

/// `outputs[0].outputs[0]`: the terminal component of the first run output.
fn first_component(response: &Value) -> Option<&Value> {
    first_output(response)?
        .get("outputs")?
        .as_array()?
        .first()
}

fn first_output(response: &Value) -> Option<&Value> {
    response.get("outputs")?.as_array()?.first()
}

/// An empty string does not count as a match; whitespace does.
fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|text| !text.is_empty())
}

fn unrecognized_item(response: &Value) -> ContentItem {
    let reason = if first_output(response).is_none() {
        "no 'outputs' key in the response"
    } else if first_component(response).is_none() {
        "no 'outputs' key in the first output"
    } else {
        "no recognised message in the first component output"
    };
    ContentItem::Error(format!(
        "Could not retrieve the output from the flow API ({reason}). Response: {response}"
    ))
}
