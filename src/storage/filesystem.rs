// Copyright 2026 channel-recorder contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Single-file record log.
///
/// # Format
///
/// The file starts with an ASCII header line for debuggability:
///
/// ```text
/// CHANNEL_RECORD_LOG|version=1|created={rfc3339}\n
/// ```
///
/// followed by framed records, little-endian throughout:
///
/// - channel registration: kind byte `0x01`, then length-prefixed
///   (u32) name, message type and schema descriptor
/// - message: kind byte `0x02`, then length-prefixed name, a u64
///   receipt timestamp in nanoseconds and the length-prefixed payload
use super::backend::RecordLog;
use anyhow::{bail, Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const FILE_HEADER_MAGIC: &str = "CHANNEL_RECORD_LOG";
pub const FORMAT_VERSION: u32 = 1;
pub const RECORD_KIND_CHANNEL: u8 = 0x01;
pub const RECORD_KIND_MESSAGE: u8 = 0x02;

/// Record log backed by a single local file, created exclusively so two
/// sessions can never interleave writes into the same destination.
pub struct FileRecordLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileRecordLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_field(writer: &mut impl Write, bytes: &[u8]) -> std::io::Result<()> {
    writer.write_all(&(bytes.len() as u32).to_le_bytes())?;
    writer.write_all(bytes)
}

impl RecordLog for FileRecordLog {
    fn open(&mut self) -> Result<()> {
        if self.writer.is_some() {
            bail!("record log already open: {}", self.path.display());
        }
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .with_context(|| format!("failed to create record file: {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);
        writeln!(
            writer,
            "{}|version={}|created={}",
            FILE_HEADER_MAGIC,
            FORMAT_VERSION,
            chrono::Utc::now().to_rfc3339()
        )
        .context("failed to write record file header")?;
        self.writer = Some(writer);
        info!(path = %self.path.display(), "record file opened");
        Ok(())
    }

    fn write_channel(
        &mut self,
        name: &str,
        message_type: &str,
        schema_descriptor: &[u8],
    ) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .with_context(|| format!("record log not open: {}", self.path.display()))?;
        writer.write_all(&[RECORD_KIND_CHANNEL])?;
        write_field(writer, name.as_bytes())?;
        write_field(writer, message_type.as_bytes())?;
        write_field(writer, schema_descriptor)?;
        Ok(())
    }

    fn write_message(&mut self, name: &str, payload: &[u8], timestamp_ns: u64) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .with_context(|| format!("record log not open: {}", self.path.display()))?;
        writer.write_all(&[RECORD_KIND_MESSAGE])?;
        write_field(writer, name.as_bytes())?;
        writer.write_all(&timestamp_ns.to_le_bytes())?;
        write_field(writer, payload)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .with_context(|| format!("failed to flush record file: {}", self.path.display()))?;
            info!(path = %self.path.display(), "record file closed");
        }
        Ok(())
    }

    fn discard(&mut self) -> Result<()> {
        let was_open = self.writer.take().is_some();
        if was_open && self.path.exists() {
            std::fs::remove_file(&self.path).with_context(|| {
                format!("failed to remove record file: {}", self.path.display())
            })?;
            debug!(path = %self.path.display(), "record file discarded");
        }
        Ok(())
    }

    fn backend_type(&self) -> &str {
        "filesystem"
    }
}
