use anyhow::{anyhow, Context};
use chrono::Utc;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const TREE_PREFIX: &str = "tree/";
pub const BUNDLE_FORMAT: &str = "ecoclass-workspace-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub file_count: usize,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub file_count: usize,
}

/// Bundle the whole workspace content tree (Concepts, Saved Classes, any
/// sibling notes) into one zip with a manifest of per-file sha256 digests.
pub fn export_workspace_bundle(
    workspace_path: &Path,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    if !workspace_path.is_dir() {
        return Err(anyhow!(
            "workspace not found: {}",
            workspace_path.to_string_lossy()
        ));
    }
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let mut files: Vec<PathBuf> = Vec::new();
    collect_files(workspace_path, out_path, &mut files)?;
    files.sort();

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = Vec::with_capacity(files.len());
    for file in &files {
        let rel = file
            .strip_prefix(workspace_path)
            .context("file left the workspace during walk")?;
        let rel_name = zip_entry_name(rel)?;
        let bytes = std::fs::read(file)
            .with_context(|| format!("failed to read {}", file.to_string_lossy()))?;
        zip.start_file(format!("{}{}", TREE_PREFIX, rel_name), opts)
            .with_context(|| format!("failed to start entry {}", rel_name))?;
        zip.write_all(&bytes)
            .with_context(|| format!("failed to write entry {}", rel_name))?;
        entries.push(json!({
            "path": rel_name,
            "sha256": hex_digest(&bytes),
        }));
    }

    let manifest = json!({
        "format": BUNDLE_FORMAT,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": Utc::now().to_rfc3339(),
        "entries": entries,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT.to_string(),
        file_count: files.len(),
    })
}

/// Restore a bundle into the workspace. Existing files are overwritten
/// (last write wins, matching the store's save semantics); every entry is
/// digest-checked against the manifest before it is accepted.
pub fn import_workspace_bundle(
    in_path: &Path,
    workspace_path: &Path,
) -> anyhow::Result<ImportSummary> {
    std::fs::create_dir_all(workspace_path).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace_path.to_string_lossy()
        )
    })?;

    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }
    let entries = manifest
        .get("entries")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("manifest has no entries list"))?;

    let mut file_count = 0usize;
    for entry in entries {
        let rel = entry
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("manifest entry missing path"))?;
        let expected = entry
            .get("sha256")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("manifest entry missing sha256"))?;
        let dest = safe_join(workspace_path, rel)?;

        let mut bytes = Vec::new();
        archive
            .by_name(&format!("{}{}", TREE_PREFIX, rel))
            .with_context(|| format!("bundle missing entry {}", rel))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to read entry {}", rel))?;
        if hex_digest(&bytes) != expected {
            return Err(anyhow!("digest mismatch for entry {}", rel));
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create directory {}", parent.to_string_lossy())
            })?;
        }
        std::fs::write(&dest, &bytes)
            .with_context(|| format!("failed to write {}", dest.to_string_lossy()))?;
        file_count += 1;
    }

    Ok(ImportSummary {
        bundle_format_detected: BUNDLE_FORMAT.to_string(),
        file_count,
    })
}

fn collect_files(dir: &Path, skip: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.to_string_lossy()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, skip, out)?;
        } else if path.is_file() && path != skip {
            // The bundle itself may live inside the workspace; never pack it.
            out.push(path);
        }
    }
    Ok(())
}

fn zip_entry_name(rel: &Path) -> anyhow::Result<String> {
    let mut parts = Vec::new();
    for component in rel.components() {
        match component.as_os_str().to_str() {
            Some(p) => parts.push(p),
            None => return Err(anyhow!("non-utf8 path in workspace: {:?}", rel)),
        }
    }
    Ok(parts.join("/"))
}

fn safe_join(workspace: &Path, rel: &str) -> anyhow::Result<PathBuf> {
    if rel.is_empty() || rel.starts_with('/') || rel.split('/').any(|p| p == ".." || p.is_empty()) {
        return Err(anyhow!("unsafe entry path in bundle: {}", rel));
    }
    Ok(workspace.join(rel))
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
