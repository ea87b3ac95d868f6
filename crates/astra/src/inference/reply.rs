use serde_json::Value;

/// First JSON object in a model reply, tolerating code fences and surrounding prose.
pub fn extract_json(reply: &str) -> Option<Value> {
    let trimmed = reply.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let mut search = trimmed;
    while let Some(start) = search.find('{') {
        let candidate = &search[start..];
        let mut stream = serde_json::Deserializer::from_str(candidate).into_iter::<Value>();
        if let Some(Ok(value @ Value::Object(_))) = stream.next() {
            return Some(value);
        }
        search = &candidate[1..];
    }
    None
}
