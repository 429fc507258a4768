use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use answerbook_core::{ImageUpload, UpsertMode, UpsertRequest};
use tracing::{info, warn};

// Import argument structs from the cli module
use crate::{
    AppContext,
    cli::{EntryArgs, ServeArgs, ShowArgs},
    server,
};

// --- Handler Functions ---

pub async fn handle_serve(args: ServeArgs, cx: AppContext) -> Result<()> {
    if let Err(e) = &cx.store {
        warn!("Store not configured; well-formed requests will fail with ConfigMissing: {:#}", e);
    }
    server::serve(Arc::new(cx), args.bind, args.max_upload).await
}

pub async fn handle_upsert(mode: UpsertMode, args: EntryArgs, cx: AppContext) -> Result<()> {
    let image = match &args.image {
        Some(path) => Some(read_image(path).await?),
        None => None,
    };
    let request = UpsertRequest {
        category: args.category,
        key: args.key,
        name: args.name,
        desc: args.desc,
        image,
    };
    let (category, key) = (request.category.clone(), request.key.clone());

    request.validate(mode)?;
    cx.upserter()?.upsert(mode, request).await?;

    info!(%mode, %category, %key, "Upsert committed");
    println!("{} {}/{}", if mode.allows_create() { "Saved" } else { "Updated" }, category, key);
    Ok(())
}

async fn read_image(path: &Path) -> Result<ImageUpload> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Image path has no usable file name: {}", path.display()))?
        .to_string();
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    Ok(ImageUpload { bytes, filename })
}

pub async fn handle_show(args: ShowArgs, cx: AppContext) -> Result<()> {
    let (document, revision) = cx.upserter()?.fetch_document().await?;
    match &revision {
        Some(revision) => info!(%revision, "Fetched document"),
        None => info!("Document does not exist yet"),
    }

    let output = match (args.category.as_deref(), args.key.as_deref()) {
        (None, _) => document.to_pretty_json()?,
        (Some(category), None) => {
            let entries = document
                .category(category)
                .with_context(|| format!("No category '{}'", category))?;
            serde_json::to_string_pretty(entries)?
        }
        (Some(category), Some(key)) => {
            let entry = document
                .entry_value(category, key)
                .with_context(|| format!("No entry '{}' in category '{}'", key, category))?;
            serde_json::to_string_pretty(entry)?
        }
    };
    println!("{}", output);
    Ok(())
}
