use serde_json::Value;

use super::Output;

/// Format one server envelope for the terminal.
pub fn render(raw: &str, output: Output) -> String {
    match output {
        Output::Json => raw.to_string(),
        Output::Human => match serde_json::from_str::<Value>(raw) {
            Ok(envelope) => humanize(&envelope).unwrap_or_else(|| raw.to_string()),
            Err(_) => raw.to_string(),
        },
    }
}

fn humanize(envelope: &Value) -> Option<String> {
    let function = envelope.get("function").and_then(Value::as_str);
    let data = envelope.get("data");
    let field = |key: &str| data.and_then(|d| d.get(key)).map(text);

    if envelope.get("status")?.as_str()? != "success" {
        let error = envelope.get("error").and_then(Value::as_str).unwrap_or("");
        return Some(match function {
            Some(function) => format!("{function} failed: {error}"),
            None => format!("error: {error}"),
        });
    }

    Some(match function? {
        "SUBSCRIBE_TOPIC" => format!("subscribed to '{}'", field("topic")?),
        "UNSUBSCRIBE_TOPIC" => format!("unsubscribed from '{}'", field("topic")?),
        "PUBLISH_TOPIC" => format!("published to '{}': {}", field("topic")?, field("message")?),
        "GET_TOPIC_STATUS" => format!(
            "'{}': {}, {} subscriber(s), last update {}",
            field("topic")?,
            field("topic_status")?,
            field("subscribers")?,
            field("last_update")?
        ),
        "LIST_TOPICS" => {
            let topics: Vec<String> = data?.get("topic_list")?.as_array()?.iter().map(text).collect();
            if topics.is_empty() {
                "no topics".to_string()
            } else {
                format!("topics: {}", topics.join(", "))
            }
        }
        "UPDATE_TOPIC" => format!(
            "[{}] {}: {}",
            field("timestamp")?,
            field("name")?,
            field("message")?
        ),
        _ => return None,
    })
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
