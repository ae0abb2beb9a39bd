//! Draining paged list endpoints
//!
//! OCI list calls return either a bare JSON array or an object with an
//! `items` array, and hand out the next page token in `opc-next-page`.

use serde_json::Value;
use tracing::debug;

use super::client::OciClient;
use super::endpoints::Service;
use super::error::OciError;

/// Default upper bound on items collected by one listing
pub const DEFAULT_MAX_ITEMS: usize = 1000;

/// Items gathered from one or more pages
#[derive(Debug, Clone, Default)]
pub struct Collected {
    pub items: Vec<Value>,
    pub pages: usize,
    pub truncated: bool,
}

/// Pull the item array out of one page body
pub fn page_items(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Follow `opc-next-page` until exhausted or `max_items` are collected
pub async fn list_all(
    client: &OciClient,
    service: Service,
    path: &str,
    query: &[(String, String)],
    max_items: usize,
) -> Result<Collected, OciError> {
    let mut collected = Collected::default();
    let mut page: Option<String> = None;

    loop {
        let mut params = query.to_vec();
        if let Some(token) = &page {
            params.push(("page".to_string(), token.clone()));
        }

        let response = client.get(service, path, &params).await?;
        collected.pages += 1;
        collected.items.extend(page_items(response.body));

        if collected.items.len() >= max_items {
            collected.truncated = collected.items.len() > max_items || response.next_page.is_some();
            collected.items.truncate(max_items);
            break;
        }

        match response.next_page {
            Some(token) if !token.is_empty() => page = Some(token),
            _ => break,
        }
    }

    debug!(
        path,
        pages = collected.pages,
        items = collected.items.len(),
        truncated = collected.truncated,
        "Listing drained"
    );

    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_items_array_and_object() {
        assert_eq!(page_items(json!([1, 2])).len(), 2);
        assert_eq!(page_items(json!({"items": [1, 2, 3]})).len(), 3);
        assert!(page_items(json!({"other": 1})).is_empty());
        assert!(page_items(Value::Null).is_empty());
    }
}
