//! List command implementation.

use super::{descriptor, CommandResult, Format};
use cytomine_core::{Collection, FieldMap, Session};
use serde::Serialize;
use std::sync::Arc;

/// Arguments of one list invocation.
#[derive(Debug, Clone)]
pub struct ListRequest {
    /// Resource kind.
    pub kind: String,
    /// Filters in command-line order.
    pub filters: Vec<(String, String)>,
    /// Page size; 0 fetches everything in one request.
    pub page_size: u32,
    /// Page to fetch, or `None` for every page.
    pub page: Option<u64>,
}

/// List result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult {
    /// Resource kind.
    pub kind: &'static str,
    /// Page fetched last.
    pub page: u64,
    /// Page size used.
    pub page_size: u32,
    /// Total items reported by the service.
    pub total_items: Option<u64>,
    /// Total pages reported by the service.
    pub total_pages: Option<u64>,
    /// Fetched items.
    pub items: Vec<FieldMap>,
}

/// Runs the list command.
pub async fn run(
    session: &Arc<Session>,
    request: ListRequest,
    format: Format,
) -> CommandResult<String> {
    let descriptor = descriptor(&request.kind)?;
    let mut collection = Collection::new(session, descriptor).with_page_size(request.page_size);
    for (key, value) in request.filters {
        collection.set_filter(key, value);
    }

    match request.page {
        Some(page) => collection.fetch_page(Some(page)).await?,
        None => collection.fetch_all().await?,
    };

    let cursor = *collection.cursor();
    let result = ListResult {
        kind: descriptor.kind.as_str(),
        page: cursor.page(),
        page_size: cursor.page_size(),
        total_items: cursor.total_items(),
        total_pages: cursor.total_pages(),
        items: collection.iter().map(|e| e.fields().clone()).collect(),
    };

    match format {
        Format::Json => Ok(serde_json::to_string_pretty(&result)?),
        Format::Text => {
            let mut lines: Vec<String> = collection.iter().map(|e| e.to_string()).collect();
            let total = result
                .total_items
                .map_or_else(|| "?".to_string(), |t| t.to_string());
            lines.push(format!(
                "{} of {total} {} (page {} of {})",
                result.items.len(),
                result.kind,
                result.page + 1,
                result.total_pages.unwrap_or(1).max(1),
            ));
            Ok(lines.join("\n"))
        }
    }
}
