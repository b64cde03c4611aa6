//! Reproducible archive assembly
//!
//! Entries are written in archive-path order with zeroed timestamps and ownership, and the
//! gzip header carries no mtime, so the same inputs always produce the same bytes. The archive
//! is written to a temporary file in the output directory and renamed into place.

use crate::core::error::{ResultExt, YardResult};
use crate::dist::manifest::DistributionManifest;
use flate2::{Compression, GzBuilder};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Fixed gzip level for every distribution archive
const COMPRESSION_LEVEL: u32 = 6;

#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
  pub path: PathBuf,
  pub entries: usize,
  pub sha256: String,
}

/// Assemble the distribution archive described by `manifest`
pub fn assemble(manifest: &DistributionManifest) -> YardResult<PackageReport> {
  let entries = manifest.collect_entries()?;
  fs::create_dir_all(&manifest.output_dir)
    .with_context(|| format!("Failed to create {}", manifest.output_dir.display()))?;

  let final_path = manifest.archive_path();
  let temp_path = manifest.output_dir.join(format!(".{}.partial", manifest.archive_name));

  let file = File::create(&temp_path).with_context(|| format!("Failed to create {}", temp_path.display()))?;
  let encoder = GzBuilder::new()
    .mtime(0)
    .write(BufWriter::new(file), Compression::new(COMPRESSION_LEVEL));
  let mut builder = tar::Builder::new(encoder);

  for entry in &entries {
    let data = fs::read(&entry.source).with_context(|| format!("Failed to read {}", entry.source.display()))?;
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mode(if entry.executable { 0o755 } else { 0o644 });
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    builder
      .append_data(&mut header, &entry.archive_path, data.as_slice())
      .with_context(|| format!("Failed to add {} to archive", entry.archive_path))?;
  }

  let encoder = builder.into_inner().context("Failed to finish tar stream")?;
  let mut writer = encoder.finish().context("Failed to finish gzip stream")?;
  writer.flush().context("Failed to flush archive")?;
  drop(writer);

  fs::rename(&temp_path, &final_path).with_context(|| format!("Failed to move archive to {}", final_path.display()))?;

  let sha256 = file_sha256(&final_path)?;
  let checksum_path = checksum_path(&final_path);
  fs::write(&checksum_path, format!("{}  {}\n", sha256, manifest.archive_name))
    .with_context(|| format!("Failed to write {}", checksum_path.display()))?;

  tracing::info!(archive = %final_path.display(), entries = entries.len(), "distribution archive written");

  Ok(PackageReport {
    path: final_path,
    entries: entries.len(),
    sha256,
  })
}

/// `<archive>.sha256`
pub fn checksum_path(archive: &Path) -> PathBuf {
  let mut name = archive.as_os_str().to_os_string();
  name.push(".sha256");
  PathBuf::from(name)
}

fn file_sha256(path: &Path) -> YardResult<String> {
  let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
  Ok(format!("{:x}", Sha256::digest(&bytes)))
}
